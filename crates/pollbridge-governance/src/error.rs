use pollbridge_types::Address;
use thiserror::Error;

/// Errors that can occur in governance operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Invalid basis points: {0} > 10000")]
    BadBps(u16),

    #[error("Quorum overflow: {total} * {bps} exceeds u64")]
    QuorumOverflow { total: u64, bps: u16 },

    #[error("Invalid poll parameters: {0}")]
    InvalidPoll(String),

    #[error("Poll not found: {0}")]
    PollNotFound(u64),

    #[error("Poll not started: now {now} < start {start_time}")]
    PollNotStarted { now: u64, start_time: u64 },

    #[error("Poll ended: now {now} >= end {end_time}")]
    PollEnded { now: u64, end_time: u64 },

    #[error("Poll not ended: now {now} < end {end_time}")]
    PollNotEnded { now: u64, end_time: u64 },

    #[error("Poll has no options")]
    ZeroOptions,

    #[error("Poll already finalized")]
    AlreadyFinalized,

    #[error("Invalid option {index}: poll has {option_count} options")]
    InvalidOption { index: u32, option_count: u32 },

    #[error("Not a member of the poll's group: {0:?}")]
    NotMember(Address),

    #[error("Already voted: {0:?}")]
    AlreadyVoted(Address),

    #[error("Voter has delegated their vote: {0:?}")]
    VoterHasDelegated(Address),

    #[error("Self-delegation not allowed")]
    SelfDelegation,

    #[error("Delegate cannot be the zero address")]
    ZeroDelegate,

    #[error("Delegator already voted")]
    DelegatorVoted,

    #[error("Delegate already voted")]
    DelegateVoted,

    #[error("Delegate has delegated their own vote")]
    DelegateHasDelegated,

    #[error("Delegator already receives delegations")]
    DelegatorHasDelegators,

    #[error("Delegation unchanged")]
    DelegationUnchanged,

    #[error("No active delegation")]
    NoDelegation,

    #[error("Delegation locked: current delegate already voted")]
    DelegationLocked,

    #[error("Weight overflow")]
    WeightOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::BadBps(10_001);
        assert!(err.to_string().contains("10001"));
    }

    #[test]
    fn test_poll_not_ended_carries_timestamps() {
        let err = GovernanceError::PollNotEnded { now: 99, end_time: 100 };
        assert!(err.to_string().contains("99"));
        assert!(err.to_string().contains("100"));
    }
}
