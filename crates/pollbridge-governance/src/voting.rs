//! Weighted vote recording.
//!
//! Each member votes at most once. A vote carries the voter's own unit
//! plus one unit per member currently delegating to them.

use std::collections::HashMap;
use pollbridge_types::Address;
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// A recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub option_index: u32,
    pub weight: u64,
}

/// Per-poll vote records and option tallies.
#[derive(Debug, Clone)]
pub struct VoteBook {
    tallies: Vec<u64>,
    ballots: HashMap<Address, Ballot>,
}

/// Weight of a vote given the number of incoming delegations.
pub fn vote_weight(incoming: usize) -> Result<u64, GovernanceError> {
    u64::try_from(incoming)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or(GovernanceError::WeightOverflow)
}

impl VoteBook {
    /// Create an empty book for `option_count` options.
    pub fn new(option_count: u32) -> Self {
        Self {
            tallies: vec![0; option_count as usize],
            ballots: HashMap::new(),
        }
    }

    /// Record `voter`'s vote for `option_index` with `weight`.
    pub fn record(
        &mut self,
        voter: Address,
        option_index: u32,
        weight: u64,
    ) -> Result<(), GovernanceError> {
        let option_count = self.option_count();
        let tally = self
            .tallies
            .get_mut(option_index as usize)
            .ok_or(GovernanceError::InvalidOption { index: option_index, option_count })?;

        if self.ballots.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted(voter));
        }

        *tally = tally.checked_add(weight).ok_or(GovernanceError::WeightOverflow)?;
        self.ballots.insert(voter, Ballot { option_index, weight });

        Ok(())
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.ballots.contains_key(voter)
    }

    pub fn ballot(&self, voter: &Address) -> Option<Ballot> {
        self.ballots.get(voter).copied()
    }

    /// Weight summed on one option; zero for an unknown index.
    pub fn tally(&self, option_index: u32) -> u64 {
        self.tallies.get(option_index as usize).copied().unwrap_or(0)
    }

    pub fn tallies(&self) -> &[u64] {
        &self.tallies
    }

    pub fn option_count(&self) -> u32 {
        self.tallies.len() as u32
    }

    /// Number of members who cast a vote (not weighted).
    pub fn voter_count(&self) -> usize {
        self.ballots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    #[test]
    fn test_record_vote() {
        let mut book = VoteBook::new(3);
        book.record(addr(1), 2, 3).unwrap();

        assert!(book.has_voted(&addr(1)));
        assert_eq!(book.tally(2), 3);
        assert_eq!(book.ballot(&addr(1)), Some(Ballot { option_index: 2, weight: 3 }));
        assert_eq!(book.voter_count(), 1);
    }

    #[test]
    fn test_double_vote_fails() {
        let mut book = VoteBook::new(2);
        book.record(addr(1), 0, 1).unwrap();
        assert_eq!(book.record(addr(1), 1, 1), Err(GovernanceError::AlreadyVoted(addr(1))));
        assert_eq!(book.tallies(), &[1, 0]);
    }

    #[test]
    fn test_invalid_option() {
        let mut book = VoteBook::new(2);
        assert_eq!(
            book.record(addr(1), 2, 1),
            Err(GovernanceError::InvalidOption { index: 2, option_count: 2 })
        );
        assert!(!book.has_voted(&addr(1)));
    }

    #[test]
    fn test_tally_overflow_leaves_book_unchanged() {
        let mut book = VoteBook::new(1);
        book.record(addr(1), 0, u64::MAX).unwrap();
        assert_eq!(book.record(addr(2), 0, 1), Err(GovernanceError::WeightOverflow));
        assert!(!book.has_voted(&addr(2)));
    }

    #[test]
    fn test_vote_weight() {
        assert_eq!(vote_weight(0).unwrap(), 1);
        assert_eq!(vote_weight(4).unwrap(), 5);
    }
}
