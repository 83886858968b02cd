//! Per-poll fee-token escrow.
//!
//! Each poll funds its own relay fee and platform cut. Nothing is pooled
//! across polls: every amount below belongs to exactly one poll id.

use std::collections::HashMap;
use pollbridge_governance::ResultStatus;
use pollbridge_types::{Address, Amount, MessageId, MAX_BPS};
use serde::Serialize;
use tracing::{debug, info};
use crate::config::{apply_bps, FeeSchedule};
use crate::error::SettlementError;
use crate::token::FeeToken;

/// Escrow state of one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscrowAccount {
    pub poll_id: u64,
    pub group_id: u64,
    pub creator: Address,
    /// Tokens held for this poll, platform reservation included
    pub deposited: Amount,
    /// Relay fee set aside when the escrow opened
    pub reserved_relay_fee: Amount,
    /// Platform cut, released only after an acknowledged pass
    pub reserved_platform: Amount,
    pub sent: bool,
    pub message_id: MessageId,
    pub final_status: Option<ResultStatus>,
    pub ack_received: bool,
    pub leftover_withdrawn: bool,
}

/// How an initial funding amount is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub deposited: Amount,
    pub reserved_relay_fee: Amount,
    pub reserved_platform: Amount,
}

impl Reservation {
    /// Split `initial_funding` after the flat ops fee.
    ///
    /// The relay reservation is the estimate plus margin, capped at what
    /// remains once the platform share is taken.
    pub fn plan(
        initial_funding: Amount,
        relay_estimate: Amount,
        schedule: &FeeSchedule,
    ) -> Result<Self, SettlementError> {
        schedule.validate()?;
        if initial_funding < schedule.ops_fee {
            return Err(SettlementError::InsufficientFunding {
                provided: initial_funding,
                required: schedule.ops_fee,
            });
        }

        let deposited = initial_funding - schedule.ops_fee;
        let reserved_platform = apply_bps(deposited, u32::from(schedule.platform_fee_bps))?;
        let with_margin = apply_bps(
            relay_estimate,
            u32::from(MAX_BPS) + u32::from(schedule.relay_margin_bps),
        )?;
        let reserved_relay_fee = with_margin.min(deposited - reserved_platform);

        Ok(Self {
            deposited,
            reserved_relay_fee,
            reserved_platform,
        })
    }
}

/// All poll escrows held by one contract.
#[derive(Debug)]
pub struct EscrowLedger {
    /// Address that custodies the tokens
    holder: Address,
    accounts: HashMap<u64, EscrowAccount>,
}

impl EscrowLedger {
    pub fn new(holder: Address) -> Self {
        Self {
            holder,
            accounts: HashMap::new(),
        }
    }

    pub fn holder(&self) -> Address {
        self.holder
    }

    pub fn account(&self, poll_id: u64) -> Option<&EscrowAccount> {
        self.accounts.get(&poll_id)
    }

    fn account_mut(&mut self, poll_id: u64) -> Result<&mut EscrowAccount, SettlementError> {
        self.accounts
            .get_mut(&poll_id)
            .ok_or(SettlementError::MissingEscrow(poll_id))
    }

    /// Pull `initial_funding` from `creator`, pay the ops fee to the
    /// treasury and reserve the rest for `poll_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn open_for_poll<T: FeeToken>(
        &mut self,
        token: &mut T,
        poll_id: u64,
        group_id: u64,
        creator: Address,
        initial_funding: Amount,
        relay_estimate: Amount,
        schedule: &FeeSchedule,
    ) -> Result<&EscrowAccount, SettlementError> {
        if self.accounts.contains_key(&poll_id) {
            return Err(SettlementError::EscrowExists(poll_id));
        }
        let plan = Reservation::plan(initial_funding, relay_estimate, schedule)?;

        token.transfer_from(self.holder, creator, self.holder, initial_funding)?;
        if schedule.ops_fee > 0 {
            token.transfer(self.holder, schedule.treasury, schedule.ops_fee)?;
        }

        info!(
            poll_id,
            deposited = plan.deposited,
            reserved_relay_fee = plan.reserved_relay_fee,
            reserved_platform = plan.reserved_platform,
            "escrow opened"
        );

        Ok(self.accounts.entry(poll_id).or_insert(EscrowAccount {
            poll_id,
            group_id,
            creator,
            deposited: plan.deposited,
            reserved_relay_fee: plan.reserved_relay_fee,
            reserved_platform: plan.reserved_platform,
            sent: false,
            message_id: MessageId::ZERO,
            final_status: None,
            ack_received: false,
            leftover_withdrawn: false,
        }))
    }

    /// Add `amount` from `from` to an unsent poll's escrow.
    pub fn top_up<T: FeeToken>(
        &mut self,
        token: &mut T,
        poll_id: u64,
        from: Address,
        amount: Amount,
    ) -> Result<Amount, SettlementError> {
        let holder = self.holder;
        let account = self.account_mut(poll_id)?;
        if account.sent {
            return Err(SettlementError::TopUpAfterSend(poll_id));
        }
        if amount == 0 {
            return Err(SettlementError::ZeroAmount);
        }
        let deposited = account
            .deposited
            .checked_add(amount)
            .ok_or(SettlementError::Overflow)?;

        token.transfer_from(holder, from, holder, amount)?;
        account.deposited = deposited;

        debug!(poll_id, amount, deposited, "escrow topped up");
        Ok(deposited)
    }

    /// Charge the actual relay fee and mark the poll sent.
    ///
    /// Returns the account as it was before the debit so the caller can
    /// put it back if the relay rejects the message.
    pub fn debit_for_send(
        &mut self,
        poll_id: u64,
        actual_fee: Amount,
        status: ResultStatus,
    ) -> Result<EscrowAccount, SettlementError> {
        let account = self.account_mut(poll_id)?;
        if account.sent {
            return Err(SettlementError::AlreadySent(poll_id));
        }
        if account.deposited < actual_fee {
            return Err(SettlementError::InsufficientEscrow {
                available: account.deposited,
                required: actual_fee,
            });
        }

        let previous = account.clone();
        account.deposited -= actual_fee;
        account.reserved_relay_fee = 0;
        account.sent = true;
        account.final_status = Some(status);
        account.reserved_platform = if status.is_passed() {
            account.reserved_platform.min(account.deposited)
        } else {
            // No platform cut on a poll that did not pass
            0
        };

        Ok(previous)
    }

    /// Undo a debit whose relay submission failed.
    pub fn restore(&mut self, previous: EscrowAccount) {
        self.accounts.insert(previous.poll_id, previous);
    }

    pub fn set_message_id(&mut self, poll_id: u64, message_id: MessageId) -> Result<(), SettlementError> {
        self.account_mut(poll_id)?.message_id = message_id;
        Ok(())
    }

    /// Record that L1 acknowledged this poll's result.
    ///
    /// The ack must answer the message actually sent and echo its status.
    pub fn mark_acknowledged(
        &mut self,
        poll_id: u64,
        group_id: u64,
        status: ResultStatus,
        result_message_id: MessageId,
    ) -> Result<(), SettlementError> {
        let account = self.account_mut(poll_id)?;
        if account.group_id != group_id {
            return Err(SettlementError::AckMismatch {
                expected: account.group_id,
                acked: group_id,
            });
        }
        if !account.sent {
            return Err(SettlementError::AckBeforeSend(poll_id));
        }
        if account.message_id != result_message_id {
            return Err(SettlementError::AckMessageMismatch { poll_id });
        }
        let expected = account.final_status.unwrap_or(ResultStatus::NotFinalized);
        if expected != status {
            return Err(SettlementError::AckStatusMismatch {
                poll_id,
                expected: expected.as_u8(),
                acked: status.as_u8(),
            });
        }
        account.ack_received = true;
        Ok(())
    }

    /// Return everything except the platform reservation to the creator.
    pub fn withdraw_leftover<T: FeeToken>(
        &mut self,
        token: &mut T,
        poll_id: u64,
        caller: Address,
    ) -> Result<Amount, SettlementError> {
        let holder = self.holder;
        let account = self.account_mut(poll_id)?;
        if !account.sent {
            return Err(SettlementError::BadConfig(format!(
                "result for poll {} not sent yet",
                poll_id
            )));
        }
        if caller != account.creator {
            return Err(SettlementError::NotCreator(caller));
        }
        if account.leftover_withdrawn {
            return Err(SettlementError::LeftoverAlreadyWithdrawn(poll_id));
        }

        let payout = account.deposited.saturating_sub(account.reserved_platform);
        if payout > 0 {
            token.transfer(holder, account.creator, payout)?;
        }
        account.deposited = 0;
        account.leftover_withdrawn = true;

        info!(poll_id, payout, "leftover escrow withdrawn");
        Ok(payout)
    }

    /// Pay the platform reservation to the treasury.
    pub fn claim_platform_fee<T: FeeToken>(
        &mut self,
        token: &mut T,
        poll_id: u64,
        caller: Address,
        owner: Address,
        treasury: Address,
    ) -> Result<Amount, SettlementError> {
        let holder = self.holder;
        let account = self.account_mut(poll_id)?;
        if account.reserved_platform == 0 {
            return Err(SettlementError::BadConfig(format!(
                "no platform fee reserved for poll {}",
                poll_id
            )));
        }
        if !account.ack_received {
            return Err(SettlementError::AckNotReceived(poll_id));
        }
        if account.final_status != Some(ResultStatus::Passed) {
            return Err(SettlementError::NotPassed(poll_id));
        }
        if caller != owner {
            return Err(SettlementError::NotOwner(caller));
        }

        let amount = account.reserved_platform;
        token.transfer(holder, treasury, amount)?;
        account.reserved_platform = 0;
        // Leftover may already have been withdrawn
        account.deposited = account.deposited.saturating_sub(amount);

        info!(poll_id, amount, "platform fee claimed");
        Ok(amount)
    }
}
