//! L2 side of the settlement saga.
//!
//! `ResultSender` owns the poll registry together with the per-poll
//! escrow. It forwards each finalized result exactly once and later
//! accepts the matching acknowledgement from L1.

use std::collections::HashMap;
use pollbridge_governance::{Membership, PollParams, PollRegistry, ResultStatus};
use pollbridge_types::{Address, Amount, Hash, MessageId};
use serde::Serialize;
use tracing::{info, warn};
use crate::config::{AllowlistConfig, FeeSchedule, RouteConfig, SettlementConfig};
use crate::error::SettlementError;
use crate::escrow::{EscrowAccount, EscrowLedger, Reservation};
use crate::events::SettlementEvent;
use crate::message::{record_key, AckPayload, ResultPayload};
use crate::relay::{InboundMessage, OutboundMessage, RelayRuntime};
use crate::token::{FeeToken, TokenError};

/// An acknowledgement accepted from L1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckRecord {
    pub group_id: u64,
    pub poll_id: u64,
    pub status: ResultStatus,
    pub result_hash: Hash,
    /// Id of the result message L1 answered
    pub result_message_id: MessageId,
    /// Id of the ack message itself
    pub ack_message_id: MessageId,
}

/// The L2 contract.
#[derive(Debug)]
pub struct ResultSender<M: Membership> {
    address: Address,
    owner: Address,
    router: Address,
    /// `allowlist` accepts acks, `route` addresses results
    config: SettlementConfig,
    fee_schedule: FeeSchedule,
    polls: PollRegistry<M>,
    escrow: EscrowLedger,
    acks: HashMap<Hash, AckRecord>,
    events: Vec<SettlementEvent>,
}

impl<M: Membership> ResultSender<M> {
    /// Deploy at `address`. Destination and ack allow-list are set later
    /// through the owner setters.
    pub fn new(
        address: Address,
        owner: Address,
        router: Address,
        fee_schedule: FeeSchedule,
        membership: M,
    ) -> Result<Self, SettlementError> {
        if address.is_zero() || owner.is_zero() || router.is_zero() {
            return Err(SettlementError::BadConfig(
                "contract, owner and router must be non-zero".into(),
            ));
        }
        fee_schedule.validate()?;

        Ok(Self {
            address,
            owner,
            router,
            config: SettlementConfig::default(),
            fee_schedule,
            polls: PollRegistry::new(membership),
            escrow: EscrowLedger::new(address),
            acks: HashMap::new(),
            events: Vec::new(),
        })
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), SettlementError> {
        if caller != self.owner {
            return Err(SettlementError::NotOwner(caller));
        }
        Ok(())
    }

    fn config_updated(&mut self, version: u64) {
        info!(version, "sender config updated");
        self.events.push(SettlementEvent::ConfigUpdated { version });
    }

    pub fn set_destination(&mut self, caller: Address, route: RouteConfig) -> Result<u64, SettlementError> {
        self.ensure_owner(caller)?;
        let version = self.config.set_route(route)?;
        self.config_updated(version);
        Ok(version)
    }

    pub fn set_ack_allowlist(
        &mut self,
        caller: Address,
        allowlist: AllowlistConfig,
    ) -> Result<u64, SettlementError> {
        self.ensure_owner(caller)?;
        let version = self.config.set_allowlist(allowlist)?;
        self.config_updated(version);
        Ok(version)
    }

    /// Applies to escrows opened afterwards. Open escrows keep their split.
    pub fn set_fee_schedule(
        &mut self,
        caller: Address,
        schedule: FeeSchedule,
    ) -> Result<u64, SettlementError> {
        self.ensure_owner(caller)?;
        schedule.validate()?;
        self.fee_schedule = schedule;
        self.config.version += 1;
        let version = self.config.version;
        self.config_updated(version);
        Ok(version)
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), SettlementError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(SettlementError::BadConfig("new owner is the zero address".into()));
        }
        let previous = std::mem::replace(&mut self.owner, new_owner);
        info!(%previous, owner = %new_owner, "sender ownership transferred");
        self.events.push(SettlementEvent::OwnershipTransferred { previous, owner: new_owner });
        Ok(())
    }

    /// Relay fee for a result message under the current route.
    fn quote_result_fee<R: RelayRuntime>(&self, relay: &R, payload: &[u8]) -> Result<Amount, SettlementError> {
        let route = &self.config.route;
        if !route.is_complete() {
            return Err(SettlementError::BadConfig("result destination not configured".into()));
        }
        Ok(relay.quote_fee(route.destination_selector, payload, route.gas_limit)?)
    }

    /// Create a poll and fund its escrow from `creator` in one step.
    ///
    /// `creator` must have approved this contract for `initial_funding`.
    pub fn create_poll_with_escrow<T: FeeToken, R: RelayRuntime>(
        &mut self,
        token: &mut T,
        relay: &R,
        creator: Address,
        params: PollParams,
        initial_funding: Amount,
    ) -> Result<u64, SettlementError> {
        // Results encode to a fixed size, so any payload gives the quote
        let sample = ResultPayload::new(params.group_id, 1, ResultStatus::Passed, Hash::ZERO).encode()?;
        let estimate = self.quote_result_fee(relay, &sample)?;
        Reservation::plan(initial_funding, estimate, &self.fee_schedule)?;

        let available = token.balance_of(&creator);
        if available < initial_funding {
            return Err(TokenError::InsufficientBalance { available, required: initial_funding }.into());
        }
        let allowance = token.allowance(&creator, &self.address);
        if allowance < initial_funding {
            return Err(TokenError::InsufficientAllowance { available: allowance, required: initial_funding }.into());
        }

        let poll_id = self.polls.create_poll(creator, params)?;
        let account = self.escrow.open_for_poll(
            token,
            poll_id,
            params.group_id,
            creator,
            initial_funding,
            estimate,
            &self.fee_schedule,
        )?;

        self.events.push(SettlementEvent::EscrowOpened {
            poll_id,
            creator,
            deposited: account.deposited,
            reserved_relay_fee: account.reserved_relay_fee,
            reserved_platform: account.reserved_platform,
        });
        Ok(poll_id)
    }

    /// Add funds to a poll's escrow before its result is sent.
    pub fn top_up_link<T: FeeToken>(
        &mut self,
        token: &mut T,
        poll_id: u64,
        from: Address,
        amount: Amount,
    ) -> Result<Amount, SettlementError> {
        let deposited = self.escrow.top_up(token, poll_id, from, amount)?;
        self.events.push(SettlementEvent::EscrowToppedUp { poll_id, from, amount, deposited });
        Ok(deposited)
    }

    /// Forward a finalized result to L1, paying the relay from escrow.
    ///
    /// Anyone may call this. The relay fee is taken from the poll's own
    /// escrow and the escrow is left untouched if the relay rejects the
    /// message.
    pub fn send<T: FeeToken, R: RelayRuntime>(
        &mut self,
        token: &mut T,
        relay: &mut R,
        poll_id: u64,
    ) -> Result<MessageId, SettlementError> {
        let account = self
            .escrow
            .account(poll_id)
            .ok_or(SettlementError::MissingEscrow(poll_id))?;
        if account.sent {
            return Err(SettlementError::AlreadySent(poll_id));
        }
        let result = self
            .polls
            .result(poll_id)?
            .ok_or(SettlementError::NotFinalized(poll_id))?;

        let payload = ResultPayload::new(result.group_id, poll_id, result.status, result.result_hash());
        let bytes = payload.encode()?;
        let fee = self.quote_result_fee(relay, &bytes)?;

        let route = self.config.route;
        let status = result.status;
        let previous = self.escrow.debit_for_send(poll_id, fee, status)?;

        let outbound = OutboundMessage {
            destination: route.destination_selector,
            receiver: route.receiver,
            payload: bytes,
            fee_token: route.fee_token,
            gas_limit: route.gas_limit,
        };
        let message_id = match relay.submit(token, self.address, outbound) {
            Ok(id) => id,
            Err(e) => {
                warn!(poll_id, error = %e, "result submission failed, escrow restored");
                self.escrow.restore(previous);
                return Err(e.into());
            }
        };
        self.escrow.set_message_id(poll_id, message_id)?;

        info!(poll_id, group_id = payload.group_id, ?status, fee, %message_id, "result sent");
        self.events.push(SettlementEvent::ResultSent {
            poll_id,
            group_id: payload.group_id,
            status,
            fee,
            message_id,
        });
        Ok(message_id)
    }

    /// Relay callback delivering an acknowledgement from L1.
    pub fn receive_ack(&mut self, caller: Address, message: &InboundMessage) -> Result<(), SettlementError> {
        if caller != self.router {
            warn!(%caller, "ack from unknown router rejected");
            return Err(SettlementError::UnauthorizedRouter(caller));
        }
        let allowlist = self.config.allowlist;
        if !allowlist.is_set() || message.source_selector != allowlist.source_selector {
            warn!(source = %message.source_selector, "ack from unexpected chain rejected");
            return Err(SettlementError::UnauthorizedAckSource(message.source_selector));
        }
        let sender = Address::from_slice(&message.sender)
            .map_err(|_| SettlementError::UnauthorizedAckSender(hex::encode(&message.sender)))?;
        if sender != allowlist.sender {
            warn!(%sender, "ack from unexpected sender rejected");
            return Err(SettlementError::UnauthorizedAckSender(hex::encode(&message.sender)));
        }

        let ack = AckPayload::decode(&message.payload)?;
        let status = ack.status()?;
        let key = ack.key();
        if self.acks.contains_key(&key) {
            warn!(group_id = ack.group_id, poll_id = ack.poll_id, "duplicate ack rejected");
            return Err(SettlementError::AckAlreadyProcessed {
                group_id: ack.group_id,
                poll_id: ack.poll_id,
            });
        }
        // Rejected acks leave the key free for the genuine one
        self.escrow
            .mark_acknowledged(ack.poll_id, ack.group_id, status, ack.inbound_message_id)?;

        self.acks.insert(
            key,
            AckRecord {
                group_id: ack.group_id,
                poll_id: ack.poll_id,
                status,
                result_hash: ack.result_hash,
                result_message_id: ack.inbound_message_id,
                ack_message_id: message.message_id,
            },
        );

        info!(group_id = ack.group_id, poll_id = ack.poll_id, ?status, "ack received");
        self.events.push(SettlementEvent::AckReceived {
            group_id: ack.group_id,
            poll_id: ack.poll_id,
            status,
            message_id: message.message_id,
        });
        Ok(())
    }

    /// Return unused escrow to the poll creator after the result is sent.
    pub fn withdraw_leftover<T: FeeToken>(
        &mut self,
        token: &mut T,
        poll_id: u64,
        caller: Address,
    ) -> Result<Amount, SettlementError> {
        let amount = self.escrow.withdraw_leftover(token, poll_id, caller)?;
        self.events.push(SettlementEvent::LeftoverWithdrawn { poll_id, creator: caller, amount });
        Ok(amount)
    }

    /// Release the platform cut of an acknowledged, passed poll.
    pub fn claim_platform_fee<T: FeeToken>(
        &mut self,
        token: &mut T,
        poll_id: u64,
        caller: Address,
    ) -> Result<Amount, SettlementError> {
        let treasury = self.fee_schedule.treasury;
        let amount = self
            .escrow
            .claim_platform_fee(token, poll_id, caller, self.owner, treasury)?;
        self.events.push(SettlementEvent::PlatformFeeClaimed { poll_id, treasury, amount });
        Ok(amount)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn fee_schedule(&self) -> &FeeSchedule {
        &self.fee_schedule
    }

    pub fn polls(&self) -> &PollRegistry<M> {
        &self.polls
    }

    /// Voting, delegation and finalization go through the registry.
    pub fn polls_mut(&mut self) -> &mut PollRegistry<M> {
        &mut self.polls
    }

    pub fn escrow(&self, poll_id: u64) -> Option<&EscrowAccount> {
        self.escrow.account(poll_id)
    }

    /// Id of the result message, once sent.
    pub fn message_id(&self, poll_id: u64) -> Option<MessageId> {
        self.escrow
            .account(poll_id)
            .filter(|account| account.sent)
            .map(|account| account.message_id)
    }

    pub fn is_acked(&self, group_id: u64, poll_id: u64) -> bool {
        self.acks.contains_key(&record_key(group_id, poll_id))
    }

    pub fn ack(&self, group_id: u64, poll_id: u64) -> Option<&AckRecord> {
        self.acks.get(&record_key(group_id, poll_id))
    }

    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SettlementEvent> {
        std::mem::take(&mut self.events)
    }
}
