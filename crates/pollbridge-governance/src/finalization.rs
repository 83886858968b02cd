//! Poll finalization.
//!
//! A poll moves from open to finalized exactly once, after its end time.
//! The winner is the option with the highest weight, the lowest index on
//! ties. A poll with no votes never passes.

use pollbridge_types::Hash;
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;
use crate::poll::Poll;
use crate::quorum::required_count;
use crate::voting::VoteBook;

/// Outcome status of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResultStatus {
    NotFinalized = 0,
    Passed = 1,
    FailedQuorum = 2,
}

impl ResultStatus {
    /// Decode a wire byte. Out-of-range values yield `None`.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ResultStatus::NotFinalized),
            1 => Some(ResultStatus::Passed),
            2 => Some(ResultStatus::FailedQuorum),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, ResultStatus::Passed)
    }
}

/// Immutable result of a finalized poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    pub poll_id: u64,
    pub group_id: u64,
    pub finalized: bool,
    pub status: ResultStatus,
    pub winning_option: u32,
    pub total_votes: u64,
    pub finalized_at: u64,
}

impl PollResult {
    /// Digest forwarded to L1 alongside the status.
    pub fn result_hash(&self) -> Hash {
        Hash::compute_multi(&[
            &self.group_id.to_le_bytes(),
            &self.poll_id.to_le_bytes(),
            &[self.status.as_u8()],
            &self.winning_option.to_le_bytes(),
            &self.total_votes.to_le_bytes(),
        ])
    }
}

/// First-max winner and total weight of a tally vector.
pub fn tally_winner(tallies: &[u64]) -> Result<(u32, u64), GovernanceError> {
    let mut winning = 0u32;
    let mut max = 0u64;
    let mut total = 0u64;

    for (index, &weight) in tallies.iter().enumerate() {
        // Strictly greater keeps the first index on ties
        if weight > max {
            max = weight;
            winning = index as u32;
        }
        total = total.checked_add(weight).ok_or(GovernanceError::WeightOverflow)?;
    }

    Ok((winning, total))
}

/// Compute the result of `poll` from its vote book.
///
/// The caller is responsible for rejecting a second finalization.
pub fn finalize(poll: &Poll, votes: &VoteBook, now: u64) -> Result<PollResult, GovernanceError> {
    poll.ensure_ended(now)?;
    if poll.option_count == 0 {
        return Err(GovernanceError::ZeroOptions);
    }

    let (winning_option, total_votes) = tally_winner(votes.tallies())?;

    let mut status = ResultStatus::Passed;
    if poll.quorum_enabled {
        let required = required_count(poll.eligible_count_snapshot, poll.quorum_bps)?;
        if total_votes < required {
            status = ResultStatus::FailedQuorum;
        }
    }
    // Applies with quorum disabled too
    if total_votes == 0 {
        status = ResultStatus::FailedQuorum;
    }

    Ok(PollResult {
        poll_id: poll.id,
        group_id: poll.group_id,
        finalized: true,
        status,
        winning_option,
        total_votes,
        finalized_at: now,
    })
}
