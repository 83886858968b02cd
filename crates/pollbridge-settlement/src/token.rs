//! Fee-token collaborator.
//!
//! The settlement contracts only move an existing token around; they
//! never mint or burn it. Callers are passed explicitly since there is
//! no ambient message sender.

use std::collections::HashMap;
use pollbridge_types::{Address, Amount};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("Insufficient allowance: available {available}, required {required}")]
    InsufficientAllowance { available: Amount, required: Amount },

    #[error("Transfer to the zero address")]
    ZeroAddress,

    #[error("Balance overflow")]
    Overflow,
}

/// Standard transfer/approve semantics.
pub trait FeeToken {
    /// Token contract address, as referenced in relay configuration.
    fn address(&self) -> Address;

    fn balance_of(&self, who: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount);

    /// Move `amount` from `from` (the caller) to `to`.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

/// In-memory token with a fixed genesis allocation.
#[derive(Debug, Clone)]
pub struct TokenLedger {
    address: Address,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl TokenLedger {
    pub fn new(address: Address, allocations: impl IntoIterator<Item = (Address, Amount)>) -> Self {
        let mut balances = HashMap::new();
        for (who, amount) in allocations {
            *balances.entry(who).or_insert(0) += amount;
        }
        Self {
            address,
            balances,
            allowances: HashMap::new(),
        }
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Amount {
        self.balances.values().sum()
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TokenError::InsufficientBalance { available, required: amount });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl FeeToken for TokenLedger {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, who: &Address) -> Amount {
        self.balances.get(who).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(&from, &spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance { available: allowed, required: amount });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, spender), allowed - amount);
        Ok(())
    }
}
