//! Pollbridge Governance - Weighted-delegation polls with quorum finalization.
//!
//! This crate provides:
//! - Quorum threshold math in basis points
//! - A per-poll single-hop delegation graph
//! - One-vote-per-member weighted tallies
//! - Finalization into an immutable poll result
//! - A registry that scopes all of the above to a poll id

pub mod quorum;
pub mod poll;
pub mod delegation;
pub mod voting;
pub mod finalization;
pub mod registry;
pub mod events;
pub mod error;

pub use quorum::{meets_quorum, required_count, validate_bps};
pub use poll::{Membership, Poll, PollParams, StaticMembership};
pub use delegation::DelegationGraph;
pub use voting::VoteBook;
pub use finalization::{PollResult, ResultStatus};
pub use registry::PollRegistry;
pub use events::GovernanceEvent;
pub use error::GovernanceError;
