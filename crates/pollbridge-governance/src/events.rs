//! Events emitted by the voting core for indexers and audits.

use pollbridge_types::Address;
use serde::Serialize;
use crate::finalization::ResultStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum GovernanceEvent {
    PollCreated {
        poll_id: u64,
        group_id: u64,
        creator: Address,
        eligible_count_snapshot: u64,
    },
    Delegated {
        poll_id: u64,
        delegator: Address,
        delegate: Address,
        previous: Option<Address>,
    },
    DelegationRevoked {
        poll_id: u64,
        delegator: Address,
        delegate: Address,
    },
    VoteCast {
        poll_id: u64,
        voter: Address,
        option_index: u32,
        weight: u64,
    },
    PollFinalized {
        poll_id: u64,
        status: ResultStatus,
        winning_option: u32,
        total_votes: u64,
    },
}
