//! Events emitted by the settlement contracts on both chains.

use pollbridge_governance::ResultStatus;
use pollbridge_types::{Address, Amount, Hash, MessageId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum SettlementEvent {
    EscrowOpened {
        poll_id: u64,
        creator: Address,
        deposited: Amount,
        reserved_relay_fee: Amount,
        reserved_platform: Amount,
    },
    EscrowToppedUp {
        poll_id: u64,
        from: Address,
        amount: Amount,
        deposited: Amount,
    },
    ResultSent {
        poll_id: u64,
        group_id: u64,
        status: ResultStatus,
        fee: Amount,
        message_id: MessageId,
    },
    AckReceived {
        group_id: u64,
        poll_id: u64,
        status: ResultStatus,
        message_id: MessageId,
    },
    LeftoverWithdrawn {
        poll_id: u64,
        creator: Address,
        amount: Amount,
    },
    PlatformFeeClaimed {
        poll_id: u64,
        treasury: Address,
        amount: Amount,
    },
    ResultRecorded {
        group_id: u64,
        poll_id: u64,
        status: ResultStatus,
        result_hash: Hash,
        inbound_message_id: MessageId,
    },
    AckSent {
        group_id: u64,
        poll_id: u64,
        fee: Amount,
        message_id: MessageId,
    },
    ConfigUpdated {
        version: u64,
    },
    OwnershipTransferred {
        previous: Address,
        owner: Address,
    },
}
