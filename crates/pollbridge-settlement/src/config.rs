//! On-chain configuration of the settlement contracts.
//!
//! Each struct is all-or-nothing: a value is either fully valid or
//! rejected with `BadConfig` before any state changes.

use pollbridge_types::{Address, Amount, ChainSelector, MAX_BPS};
use serde::{Deserialize, Serialize};
use crate::error::SettlementError;

/// The only (source chain, sender) pair a contract accepts messages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllowlistConfig {
    pub source_selector: ChainSelector,
    pub sender: Address,
}

impl AllowlistConfig {
    pub fn is_set(&self) -> bool {
        !self.source_selector.is_zero() && !self.sender.is_zero()
    }

    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.source_selector.is_zero() {
            return Err(SettlementError::BadConfig("allowed source selector is zero".into()));
        }
        if self.sender.is_zero() {
            return Err(SettlementError::BadConfig("allowed sender is the zero address".into()));
        }
        Ok(())
    }
}

/// Where and how a contract sends its outbound message.
///
/// Used for results on L2 and for acknowledgements on L1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteConfig {
    pub destination_selector: ChainSelector,
    pub receiver: Address,
    pub fee_token: Address,
    pub gas_limit: u64,
}

impl RouteConfig {
    /// True only when every field is set.
    pub fn is_complete(&self) -> bool {
        !self.destination_selector.is_zero()
            && !self.receiver.is_zero()
            && !self.fee_token.is_zero()
            && self.gas_limit != 0
    }

    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.destination_selector.is_zero() {
            return Err(SettlementError::BadConfig("destination selector is zero".into()));
        }
        if self.receiver.is_zero() {
            return Err(SettlementError::BadConfig("receiver is the zero address".into()));
        }
        if self.fee_token.is_zero() {
            return Err(SettlementError::BadConfig("fee token is the zero address".into()));
        }
        if self.gas_limit == 0 {
            return Err(SettlementError::BadConfig("gas limit is zero".into()));
        }
        Ok(())
    }
}

/// Fees taken from every poll escrow on L2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Receives the flat ops fee and claimed platform fees
    pub treasury: Address,
    /// Flat fee paid to the treasury when the escrow opens
    pub ops_fee: Amount,
    /// Platform share of the funded remainder
    pub platform_fee_bps: u16,
    /// Head-room added on top of the quoted relay fee
    pub relay_margin_bps: u16,
}

impl FeeSchedule {
    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.treasury.is_zero() {
            return Err(SettlementError::BadConfig("treasury is the zero address".into()));
        }
        if self.platform_fee_bps > MAX_BPS {
            return Err(SettlementError::BadConfig(format!(
                "platform fee {} bps exceeds 100%",
                self.platform_fee_bps
            )));
        }
        if self.relay_margin_bps > MAX_BPS {
            return Err(SettlementError::BadConfig(format!(
                "relay margin {} bps exceeds 100%",
                self.relay_margin_bps
            )));
        }
        Ok(())
    }
}

/// Process-wide messaging configuration of one contract instance.
///
/// `allowlist` filters inbound messages and `route` addresses the
/// outbound one. Every accepted write bumps `version`. Message handlers
/// read this value afresh on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementConfig {
    pub allowlist: AllowlistConfig,
    pub route: RouteConfig,
    pub version: u64,
}

impl SettlementConfig {
    pub fn set_allowlist(&mut self, allowlist: AllowlistConfig) -> Result<u64, SettlementError> {
        allowlist.validate()?;
        self.allowlist = allowlist;
        self.version += 1;
        Ok(self.version)
    }

    pub fn set_route(&mut self, route: RouteConfig) -> Result<u64, SettlementError> {
        route.validate()?;
        self.route = route;
        self.version += 1;
        Ok(self.version)
    }
}

/// `amount * bps / 10000`, rounded down.
pub fn apply_bps(amount: Amount, bps: u32) -> Result<Amount, SettlementError> {
    amount
        .checked_mul(Amount::from(bps))
        .map(|v| v / Amount::from(MAX_BPS))
        .ok_or(SettlementError::Overflow)
}
