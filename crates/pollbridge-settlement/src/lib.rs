//! Pollbridge Settlement - Cross-chain delivery of finalized poll results.
//!
//! The flow is a saga across two chains:
//! 1. L2: a poll's escrow pays the relay fee and `ResultSender::send`
//!    forwards the finalized status.
//! 2. L1: `ResultRegistry::receive` records the status once per
//!    (group, poll) and replies with an acknowledgement.
//! 3. L2: `ResultSender::receive_ack` marks the poll acknowledged, which
//!    makes the platform fee claimable.
//!
//! Every intermediate state is valid on its own. Duplicate deliveries
//! fail instead of being applied twice.

pub mod config;
pub mod escrow;
pub mod message;
pub mod token;
pub mod relay;
pub mod sender;
pub mod receiver;
pub mod events;
pub mod error;

pub use config::{AllowlistConfig, FeeSchedule, RouteConfig, SettlementConfig};
pub use escrow::{EscrowAccount, EscrowLedger, Reservation};
pub use message::{record_key, AckPayload, ResultPayload};
pub use token::{FeeToken, TokenError, TokenLedger};
pub use relay::{Delivery, InboundMessage, LoopbackRelay, OutboundMessage, RelayError, RelayFees, RelayRuntime};
pub use sender::{AckRecord, ResultSender};
pub use receiver::{L1Record, ResultRegistry};
pub use events::SettlementEvent;
pub use error::SettlementError;
