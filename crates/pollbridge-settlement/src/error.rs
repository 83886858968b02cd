use pollbridge_governance::GovernanceError;
use pollbridge_types::{Address, Amount, ChainSelector, TypesError};
use thiserror::Error;
use crate::relay::RelayError;
use crate::token::TokenError;

/// Errors that can occur while settling results across chains.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettlementError {
    #[error("Bad config: {0}")]
    BadConfig(String),

    #[error("No escrow for poll {0}")]
    MissingEscrow(u64),

    #[error("Escrow already open for poll {0}")]
    EscrowExists(u64),

    #[error("Insufficient funding: provided {provided}, required {required}")]
    InsufficientFunding { provided: Amount, required: Amount },

    #[error("Amount must be non-zero")]
    ZeroAmount,

    #[error("Result for poll {0} already sent")]
    AlreadySent(u64),

    #[error("Poll {0} not finalized")]
    NotFinalized(u64),

    #[error("Insufficient escrow: available {available}, required {required}")]
    InsufficientEscrow { available: Amount, required: Amount },

    #[error("Cannot top up poll {0} after its result was sent")]
    TopUpAfterSend(u64),

    #[error("Caller is not the poll creator: {0:?}")]
    NotCreator(Address),

    #[error("Caller is not the owner: {0:?}")]
    NotOwner(Address),

    #[error("No acknowledgement received for poll {0}")]
    AckNotReceived(u64),

    #[error("Poll {0} did not pass")]
    NotPassed(u64),

    #[error("Callback not from relay router: {0:?}")]
    UnauthorizedRouter(Address),

    #[error("Unauthorized ack source chain: {0}")]
    UnauthorizedAckSource(ChainSelector),

    #[error("Unauthorized ack sender: 0x{0}")]
    UnauthorizedAckSender(String),

    #[error("Unauthorized source chain: {0}")]
    UnauthorizedSource(ChainSelector),

    #[error("Unauthorized sender: 0x{0}")]
    UnauthorizedSender(String),

    #[error("Ack already processed for group {group_id} poll {poll_id}")]
    AckAlreadyProcessed { group_id: u64, poll_id: u64 },

    #[error("Ack for group {acked} does not match escrow group {expected}")]
    AckMismatch { expected: u64, acked: u64 },

    #[error("Ack for poll {0} arrived before its result was sent")]
    AckBeforeSend(u64),

    #[error("Ack for poll {poll_id} carries status {acked}, sent status was {expected}")]
    AckStatusMismatch { poll_id: u64, expected: u8, acked: u8 },

    #[error("Ack for poll {poll_id} answers a message that was not sent")]
    AckMessageMismatch { poll_id: u64 },

    #[error("Leftover for poll {0} already withdrawn")]
    LeftoverAlreadyWithdrawn(u64),

    #[error("Invalid poll id")]
    InvalidPollId,

    #[error("Invalid status: {0}")]
    InvalidStatus(u8),

    #[error("Ack config not set")]
    AckConfigNotSet,

    #[error("Result already recorded for group {group_id} poll {poll_id}")]
    AlreadyRecorded { group_id: u64, poll_id: u64 },

    #[error("Insufficient fee-token balance: available {available}, required {required}")]
    InsufficientFeeBalance { available: Amount, required: Amount },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("Types error: {0}")]
    Types(#[from] TypesError),
}
