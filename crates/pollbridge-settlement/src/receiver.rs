//! L1 side of the settlement saga.
//!
//! `ResultRegistry` records each inbound result at most once per
//! (group, poll) and answers it with an acknowledgement paid from its own
//! fee-token balance.

use std::collections::HashMap;
use pollbridge_governance::ResultStatus;
use pollbridge_types::{Address, Hash, MessageId};
use serde::Serialize;
use tracing::{info, warn};
use crate::config::{AllowlistConfig, RouteConfig, SettlementConfig};
use crate::error::SettlementError;
use crate::events::SettlementEvent;
use crate::message::{record_key, AckPayload, ResultPayload};
use crate::relay::{InboundMessage, OutboundMessage, RelayRuntime};
use crate::token::FeeToken;

/// A recorded poll result, in the layout external indexers read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct L1Record {
    pub recorded: bool,
    pub group_id: u64,
    pub poll_id: u64,
    pub status: ResultStatus,
    pub result_hash: Hash,
    pub inbound_message_id: MessageId,
    pub ack_message_id: MessageId,
}

/// The L1 contract.
#[derive(Debug)]
pub struct ResultRegistry {
    address: Address,
    owner: Address,
    router: Address,
    /// `allowlist` accepts results, `route` addresses acks
    config: SettlementConfig,
    records: HashMap<Hash, L1Record>,
    events: Vec<SettlementEvent>,
}

impl ResultRegistry {
    /// Deploy with the result allow-list. The ack route is set later.
    pub fn new(
        address: Address,
        owner: Address,
        router: Address,
        allowlist: AllowlistConfig,
    ) -> Result<Self, SettlementError> {
        if address.is_zero() || owner.is_zero() || router.is_zero() {
            return Err(SettlementError::BadConfig(
                "contract, owner and router must be non-zero".into(),
            ));
        }
        let mut config = SettlementConfig::default();
        config.set_allowlist(allowlist)?;

        Ok(Self {
            address,
            owner,
            router,
            config,
            records: HashMap::new(),
            events: Vec::new(),
        })
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), SettlementError> {
        if caller != self.owner {
            return Err(SettlementError::NotOwner(caller));
        }
        Ok(())
    }

    pub fn set_ack_config(&mut self, caller: Address, route: RouteConfig) -> Result<u64, SettlementError> {
        self.ensure_owner(caller)?;
        let version = self.config.set_route(route)?;
        info!(version, "registry ack config updated");
        self.events.push(SettlementEvent::ConfigUpdated { version });
        Ok(version)
    }

    pub fn set_allowlist(&mut self, caller: Address, allowlist: AllowlistConfig) -> Result<u64, SettlementError> {
        self.ensure_owner(caller)?;
        let version = self.config.set_allowlist(allowlist)?;
        info!(version, "registry allow-list updated");
        self.events.push(SettlementEvent::ConfigUpdated { version });
        Ok(version)
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), SettlementError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(SettlementError::BadConfig("new owner is the zero address".into()));
        }
        let previous = std::mem::replace(&mut self.owner, new_owner);
        info!(%previous, owner = %new_owner, "registry ownership transferred");
        self.events.push(SettlementEvent::OwnershipTransferred { previous, owner: new_owner });
        Ok(())
    }

    /// Relay callback delivering a result from L2.
    ///
    /// Records the result and submits the acknowledgement in one step.
    /// If the acknowledgement cannot be submitted nothing is recorded, so
    /// a redelivery can succeed later.
    pub fn receive<T: FeeToken, R: RelayRuntime>(
        &mut self,
        caller: Address,
        message: &InboundMessage,
        token: &mut T,
        relay: &mut R,
    ) -> Result<MessageId, SettlementError> {
        if caller != self.router {
            warn!(%caller, "result from unknown router rejected");
            return Err(SettlementError::UnauthorizedRouter(caller));
        }
        let allowlist = self.config.allowlist;
        if message.source_selector != allowlist.source_selector {
            warn!(source = %message.source_selector, "result from unexpected chain rejected");
            return Err(SettlementError::UnauthorizedSource(message.source_selector));
        }
        let sender = Address::from_slice(&message.sender)
            .map_err(|_| SettlementError::UnauthorizedSender(hex::encode(&message.sender)))?;
        if sender != allowlist.sender {
            warn!(%sender, "result from unexpected sender rejected");
            return Err(SettlementError::UnauthorizedSender(hex::encode(&message.sender)));
        }

        let payload = ResultPayload::decode(&message.payload)?;
        if payload.poll_id == 0 {
            return Err(SettlementError::InvalidPollId);
        }
        let status = payload.status()?;

        let route = self.config.route;
        if !route.is_complete() {
            return Err(SettlementError::AckConfigNotSet);
        }
        let key = payload.key();
        if self.records.contains_key(&key) {
            warn!(group_id = payload.group_id, poll_id = payload.poll_id, "duplicate result rejected");
            return Err(SettlementError::AlreadyRecorded {
                group_id: payload.group_id,
                poll_id: payload.poll_id,
            });
        }

        let ack = AckPayload::new(&payload, message.message_id).encode()?;
        let fee = relay.quote_fee(route.destination_selector, &ack, route.gas_limit)?;
        let available = token.balance_of(&self.address);
        if available < fee {
            return Err(SettlementError::InsufficientFeeBalance { available, required: fee });
        }

        let ack_message_id = relay.submit(
            token,
            self.address,
            OutboundMessage {
                destination: route.destination_selector,
                receiver: route.receiver,
                payload: ack,
                fee_token: route.fee_token,
                gas_limit: route.gas_limit,
            },
        )?;

        self.records.insert(
            key,
            L1Record {
                recorded: true,
                group_id: payload.group_id,
                poll_id: payload.poll_id,
                status,
                result_hash: payload.result_hash,
                inbound_message_id: message.message_id,
                ack_message_id,
            },
        );

        info!(
            group_id = payload.group_id,
            poll_id = payload.poll_id,
            ?status,
            %ack_message_id,
            "result recorded"
        );
        self.events.push(SettlementEvent::ResultRecorded {
            group_id: payload.group_id,
            poll_id: payload.poll_id,
            status,
            result_hash: payload.result_hash,
            inbound_message_id: message.message_id,
        });
        self.events.push(SettlementEvent::AckSent {
            group_id: payload.group_id,
            poll_id: payload.poll_id,
            fee,
            message_id: ack_message_id,
        });
        Ok(ack_message_id)
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

    pub fn record(&self, group_id: u64, poll_id: u64) -> Option<&L1Record> {
        self.records.get(&record_key(group_id, poll_id))
    }

    pub fn is_recorded(&self, group_id: u64, poll_id: u64) -> bool {
        self.records.contains_key(&record_key(group_id, poll_id))
    }

    /// All records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &L1Record> {
        self.records.values()
    }

    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SettlementEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollbridge_types::ChainSelector;
    use crate::relay::{LoopbackRelay, RelayError, RelayFees};
    use crate::token::TokenLedger;

    const L1: ChainSelector = ChainSelector(200);
    const L2: ChainSelector = ChainSelector(100);

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn contract() -> Address { addr(20) }
    fn owner() -> Address { addr(21) }
    fn router() -> Address { addr(12) }
    fn l2_sender() -> Address { addr(10) }
    fn token_address() -> Address { addr(50) }

    fn ack_route() -> RouteConfig {
        RouteConfig {
            destination_selector: L2,
            receiver: l2_sender(),
            fee_token: token_address(),
            gas_limit: 100_000,
        }
    }

    fn setup() -> (ResultRegistry, TokenLedger, LoopbackRelay) {
        let allowlist = AllowlistConfig { source_selector: L2, sender: l2_sender() };
        let mut registry = ResultRegistry::new(contract(), owner(), router(), allowlist).unwrap();
        registry.set_ack_config(owner(), ack_route()).unwrap();

        let fees = RelayFees { base_fee: 100, per_byte_fee: 1, gas_price: 0 };
        let mut relay = LoopbackRelay::new(router(), addr(14), token_address(), fees);
        relay.register_endpoint(L2, l2_sender());
        relay.register_endpoint(L1, contract());

        let token = TokenLedger::new(token_address(), [(contract(), 10_000)]);
        (registry, token, relay)
    }

    fn result_message(group_id: u64, poll_id: u64, status: u8) -> InboundMessage {
        let payload = ResultPayload {
            group_id,
            poll_id,
            status,
            result_hash: Hash::compute(b"result"),
        };
        InboundMessage {
            message_id: Hash::compute(&poll_id.to_le_bytes()),
            source_selector: L2,
            sender: l2_sender().to_vec(),
            payload: payload.encode().unwrap(),
        }
    }

    #[test]
    fn test_constructor_validates_allowlist() {
        let zero = AllowlistConfig { source_selector: ChainSelector::UNSET, sender: l2_sender() };
        assert!(matches!(
            ResultRegistry::new(contract(), owner(), router(), zero),
            Err(SettlementError::BadConfig(_))
        ));
        let zero_sender = AllowlistConfig { source_selector: L2, sender: Address::ZERO };
        assert!(matches!(
            ResultRegistry::new(contract(), owner(), router(), zero_sender),
            Err(SettlementError::BadConfig(_))
        ));
    }

    #[test]
    fn test_receive_records_and_acks() {
        let (mut registry, mut token, mut relay) = setup();
        let message = result_message(3, 1, ResultStatus::Passed.as_u8());

        let ack_id = registry.receive(router(), &message, &mut token, &mut relay).unwrap();

        let record = registry.record(3, 1).unwrap();
        assert!(record.recorded);
        assert_eq!(record.status, ResultStatus::Passed);
        assert_eq!(record.inbound_message_id, message.message_id);
        assert_eq!(record.ack_message_id, ack_id);

        // 81-byte ack payload
        assert_eq!(token.balance_of(&contract()), 10_000 - 181);

        let delivery = relay.deliver_next().unwrap();
        assert_eq!(delivery.receiver, l2_sender());
        let ack = AckPayload::decode(&delivery.message.payload).unwrap();
        assert_eq!(ack.inbound_message_id, message.message_id);
        assert_eq!((ack.group_id, ack.poll_id), (3, 1));
    }

    #[test]
    fn test_receive_once_per_key() {
        let (mut registry, mut token, mut relay) = setup();
        let message = result_message(3, 1, ResultStatus::FailedQuorum.as_u8());
        registry.receive(router(), &message, &mut token, &mut relay).unwrap();

        assert_eq!(
            registry.receive(router(), &message, &mut token, &mut relay),
            Err(SettlementError::AlreadyRecorded { group_id: 3, poll_id: 1 })
        );
        assert_eq!(relay.pending(), 1);

        // Same poll id under another group is a different key
        registry
            .receive(router(), &result_message(4, 1, 1), &mut token, &mut relay)
            .unwrap();
        assert!(registry.is_recorded(4, 1));
    }

    #[test]
    fn test_receive_rejects_bad_messages() {
        let (mut registry, mut token, mut relay) = setup();
        let good = result_message(3, 1, 1);

        assert_eq!(
            registry.receive(addr(99), &good, &mut token, &mut relay),
            Err(SettlementError::UnauthorizedRouter(addr(99)))
        );

        let wrong_source = InboundMessage { source_selector: L1, ..good.clone() };
        assert_eq!(
            registry.receive(router(), &wrong_source, &mut token, &mut relay),
            Err(SettlementError::UnauthorizedSource(L1))
        );

        let wrong_sender = InboundMessage { sender: addr(77).to_vec(), ..good.clone() };
        assert!(matches!(
            registry.receive(router(), &wrong_sender, &mut token, &mut relay),
            Err(SettlementError::UnauthorizedSender(_))
        ));

        assert_eq!(
            registry.receive(router(), &result_message(3, 0, 1), &mut token, &mut relay),
            Err(SettlementError::InvalidPollId)
        );
        assert_eq!(
            registry.receive(router(), &result_message(3, 1, 3), &mut token, &mut relay),
            Err(SettlementError::InvalidStatus(3))
        );

        let garbage = InboundMessage { payload: vec![1, 2, 3], ..good };
        assert!(matches!(
            registry.receive(router(), &garbage, &mut token, &mut relay),
            Err(SettlementError::Decode(_))
        ));
        assert_eq!(registry.records().count(), 0);
    }

    #[test]
    fn test_receive_requires_ack_config() {
        let allowlist = AllowlistConfig { source_selector: L2, sender: l2_sender() };
        let mut registry = ResultRegistry::new(contract(), owner(), router(), allowlist).unwrap();
        let (_, mut token, mut relay) = setup();

        assert_eq!(
            registry.receive(router(), &result_message(3, 1, 1), &mut token, &mut relay),
            Err(SettlementError::AckConfigNotSet)
        );
    }

    #[test]
    fn test_failed_ack_writes_nothing() {
        let (mut registry, mut token, mut relay) = setup();
        let message = result_message(3, 1, 1);

        relay.set_paused(true);
        assert_eq!(
            registry.receive(router(), &message, &mut token, &mut relay),
            Err(SettlementError::Relay(RelayError::Paused))
        );
        assert!(!registry.is_recorded(3, 1));

        relay.set_paused(false);
        registry.receive(router(), &message, &mut token, &mut relay).unwrap();
        assert!(registry.is_recorded(3, 1));
    }

    #[test]
    fn test_receive_requires_fee_balance() {
        let (mut registry, _, mut relay) = setup();
        let mut poor = TokenLedger::new(token_address(), [(contract(), 10)]);
        assert_eq!(
            registry.receive(router(), &result_message(3, 1, 1), &mut poor, &mut relay),
            Err(SettlementError::InsufficientFeeBalance { available: 10, required: 181 })
        );
    }

    #[test]
    fn test_ack_config_is_owner_only() {
        let (mut registry, _, _) = setup();
        assert_eq!(
            registry.set_ack_config(addr(1), ack_route()),
            Err(SettlementError::NotOwner(addr(1)))
        );
        assert!(matches!(
            registry.set_ack_config(owner(), RouteConfig { fee_token: Address::ZERO, ..ack_route() }),
            Err(SettlementError::BadConfig(_))
        ));
        assert_eq!(registry.config().version, 2);
    }

    #[test]
    fn test_record_json_layout() {
        let (mut registry, mut token, mut relay) = setup();
        registry
            .receive(router(), &result_message(3, 1, 1), &mut token, &mut relay)
            .unwrap();

        let json = serde_json::to_value(registry.record(3, 1).unwrap()).unwrap();
        assert_eq!(json["recorded"], true);
        assert_eq!(json["groupId"], 3);
        assert_eq!(json["pollId"], 1);
        assert_eq!(json["status"], "Passed");
        assert!(json["ackMessageId"].as_str().unwrap().starts_with("0x"));
    }
}
