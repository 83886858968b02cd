//! Poll metadata and the membership collaborator.
//!
//! A poll is created once, with its eligible-voter count frozen at that
//! moment. Later membership changes affect who may act, never the quorum
//! denominator.

use std::collections::{HashMap, HashSet};
use pollbridge_types::Address;
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;
use crate::quorum::validate_bps;

/// Group membership as seen by the voting core.
pub trait Membership {
    /// Whether `who` currently belongs to `group_id`.
    fn is_member(&self, group_id: u64, who: &Address) -> bool;

    /// Number of members allowed to vote in `group_id`.
    /// Read only when a poll is created.
    fn eligible_count(&self, group_id: u64) -> u64;
}

/// In-memory allow-list membership.
#[derive(Debug, Default, Clone)]
pub struct StaticMembership {
    groups: HashMap<u64, HashSet<Address>>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a group from a member list.
    pub fn with_group(mut self, group_id: u64, members: impl IntoIterator<Item = Address>) -> Self {
        self.groups.entry(group_id).or_default().extend(members);
        self
    }

    pub fn add_member(&mut self, group_id: u64, member: Address) -> bool {
        self.groups.entry(group_id).or_default().insert(member)
    }

    pub fn remove_member(&mut self, group_id: u64, member: &Address) -> bool {
        self.groups
            .get_mut(&group_id)
            .map(|m| m.remove(member))
            .unwrap_or(false)
    }
}

impl Membership for StaticMembership {
    fn is_member(&self, group_id: u64, who: &Address) -> bool {
        self.groups
            .get(&group_id)
            .map(|m| m.contains(who))
            .unwrap_or(false)
    }

    fn eligible_count(&self, group_id: u64) -> u64 {
        self.groups.get(&group_id).map(|m| m.len() as u64).unwrap_or(0)
    }
}

/// Parameters supplied by the poll creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollParams {
    pub group_id: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub option_count: u32,
    pub quorum_enabled: bool,
    /// Participation threshold in basis points of the eligible snapshot
    pub quorum_bps: u16,
}

impl PollParams {
    /// Validate before any state is touched.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.start_time >= self.end_time {
            return Err(GovernanceError::InvalidPoll(format!(
                "start {} must be before end {}",
                self.start_time, self.end_time
            )));
        }
        if self.option_count == 0 {
            return Err(GovernanceError::ZeroOptions);
        }
        validate_bps(self.quorum_bps)
    }
}

/// A created poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: u64,
    pub group_id: u64,
    pub creator: Address,
    pub start_time: u64,
    pub end_time: u64,
    pub option_count: u32,
    pub quorum_enabled: bool,
    pub quorum_bps: u16,
    /// Eligible voters at creation; never recomputed
    pub eligible_count_snapshot: u64,
}

impl Poll {
    pub fn new(id: u64, creator: Address, params: &PollParams, eligible_count_snapshot: u64) -> Self {
        Self {
            id,
            group_id: params.group_id,
            creator,
            start_time: params.start_time,
            end_time: params.end_time,
            option_count: params.option_count,
            quorum_enabled: params.quorum_enabled,
            quorum_bps: params.quorum_bps,
            eligible_count_snapshot,
        }
    }

    /// Require `start_time <= now < end_time`.
    pub fn ensure_open(&self, now: u64) -> Result<(), GovernanceError> {
        if now < self.start_time {
            return Err(GovernanceError::PollNotStarted { now, start_time: self.start_time });
        }
        if now >= self.end_time {
            return Err(GovernanceError::PollEnded { now, end_time: self.end_time });
        }
        Ok(())
    }

    /// Require `now >= end_time`.
    pub fn ensure_ended(&self, now: u64) -> Result<(), GovernanceError> {
        if now < self.end_time {
            return Err(GovernanceError::PollNotEnded { now, end_time: self.end_time });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PollParams {
        PollParams {
            group_id: 1,
            start_time: 100,
            end_time: 200,
            option_count: 3,
            quorum_enabled: true,
            quorum_bps: 5000,
        }
    }

    #[test]
    fn test_params_validation() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.end_time = 100;
        assert!(matches!(p.validate(), Err(GovernanceError::InvalidPoll(_))));

        let mut p = params();
        p.option_count = 0;
        assert_eq!(p.validate(), Err(GovernanceError::ZeroOptions));

        let mut p = params();
        p.quorum_bps = 10_001;
        assert_eq!(p.validate(), Err(GovernanceError::BadBps(10_001)));
    }

    #[test]
    fn test_poll_window() {
        let poll = Poll::new(1, Address::ZERO, &params(), 10);

        assert_eq!(
            poll.ensure_open(99),
            Err(GovernanceError::PollNotStarted { now: 99, start_time: 100 })
        );
        assert!(poll.ensure_open(100).is_ok());
        assert!(poll.ensure_open(199).is_ok());
        assert_eq!(
            poll.ensure_open(200),
            Err(GovernanceError::PollEnded { now: 200, end_time: 200 })
        );

        assert!(poll.ensure_ended(199).is_err());
        assert!(poll.ensure_ended(200).is_ok());
    }

    #[test]
    fn test_static_membership() {
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        let mut members = StaticMembership::new().with_group(7, [alice]);

        assert!(members.is_member(7, &alice));
        assert!(!members.is_member(7, &bob));
        assert!(!members.is_member(8, &alice));

        assert!(members.add_member(7, bob));
        assert_eq!(members.eligible_count(7), 2);
        assert!(members.remove_member(7, &alice));
        assert_eq!(members.eligible_count(7), 1);
        assert_eq!(members.eligible_count(99), 0);
    }
}
