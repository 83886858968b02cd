//! Relay runtime collaborator and an in-process loopback relay.
//!
//! The relay carries opaque payloads between chains. It quotes a fee,
//! charges it in the configured fee token, assigns a message id and later
//! invokes the receiving contract with the source chain and sender bytes.

use std::collections::{HashMap, HashSet, VecDeque};
use pollbridge_types::{Address, Amount, ChainSelector, Hash, MessageId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use crate::token::{FeeToken, TokenError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelayError {
    #[error("Unsupported destination chain: {0}")]
    UnsupportedDestination(ChainSelector),

    #[error("Unknown endpoint: {0:?}")]
    UnknownEndpoint(Address),

    #[error("Fee token {0:?} not accepted")]
    UnsupportedFeeToken(Address),

    #[error("Relay paused")]
    Paused,

    #[error("Fee overflow")]
    Overflow,

    #[error("Fee payment failed: {0}")]
    FeePayment(#[from] TokenError),
}

/// Message handed to the relay for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub destination: ChainSelector,
    pub receiver: Address,
    pub payload: Vec<u8>,
    pub fee_token: Address,
    pub gas_limit: u64,
}

/// Message as presented to the receiving contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub source_selector: ChainSelector,
    /// Encoded sender address on the source chain
    pub sender: Vec<u8>,
    pub payload: Vec<u8>,
}

/// Cross-chain messaging service.
pub trait RelayRuntime {
    /// Address the relay uses when invoking receive callbacks.
    fn router(&self) -> Address;

    fn quote_fee(
        &self,
        destination: ChainSelector,
        payload: &[u8],
        gas_limit: u64,
    ) -> Result<Amount, RelayError>;

    /// Charge `payer` the quoted fee and enqueue `message`.
    fn submit<T: FeeToken>(
        &mut self,
        token: &mut T,
        payer: Address,
        message: OutboundMessage,
    ) -> Result<MessageId, RelayError>;
}

/// Loopback relay pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFees {
    pub base_fee: Amount,
    pub per_byte_fee: Amount,
    pub gas_price: Amount,
}

impl Default for RelayFees {
    fn default() -> Self {
        Self {
            base_fee: 1_000,
            per_byte_fee: 2,
            gas_price: 1,
        }
    }
}

/// A message waiting to be handed to its receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub destination: ChainSelector,
    pub receiver: Address,
    pub message: InboundMessage,
}

/// In-process relay connecting registered endpoints on several chains.
#[derive(Debug)]
pub struct LoopbackRelay {
    router: Address,
    fee_vault: Address,
    fee_token: Address,
    fees: RelayFees,
    /// contract -> chain it lives on
    endpoints: HashMap<Address, ChainSelector>,
    chains: HashSet<ChainSelector>,
    outbox: VecDeque<Delivery>,
    nonce: u64,
    paused: bool,
}

impl LoopbackRelay {
    pub fn new(router: Address, fee_vault: Address, fee_token: Address, fees: RelayFees) -> Self {
        Self {
            router,
            fee_vault,
            fee_token,
            fees,
            endpoints: HashMap::new(),
            chains: HashSet::new(),
            outbox: VecDeque::new(),
            nonce: 0,
            paused: false,
        }
    }

    /// Make `contract` on `chain` able to send and receive.
    pub fn register_endpoint(&mut self, chain: ChainSelector, contract: Address) {
        self.chains.insert(chain);
        self.endpoints.insert(contract, chain);
    }

    /// Reject submissions until resumed.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn fee_vault(&self) -> Address {
        self.fee_vault
    }

    /// Next queued message, oldest first.
    pub fn deliver_next(&mut self) -> Option<Delivery> {
        self.outbox.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Queued messages without removing them.
    pub fn peek(&self) -> impl Iterator<Item = &Delivery> {
        self.outbox.iter()
    }
}

impl RelayRuntime for LoopbackRelay {
    fn router(&self) -> Address {
        self.router
    }

    fn quote_fee(
        &self,
        destination: ChainSelector,
        payload: &[u8],
        gas_limit: u64,
    ) -> Result<Amount, RelayError> {
        if !self.chains.contains(&destination) {
            return Err(RelayError::UnsupportedDestination(destination));
        }

        let bytes = self
            .fees
            .per_byte_fee
            .checked_mul(payload.len() as Amount)
            .ok_or(RelayError::Overflow)?;
        let gas = self
            .fees
            .gas_price
            .checked_mul(Amount::from(gas_limit))
            .ok_or(RelayError::Overflow)?;

        self.fees
            .base_fee
            .checked_add(bytes)
            .and_then(|fee| fee.checked_add(gas))
            .ok_or(RelayError::Overflow)
    }

    fn submit<T: FeeToken>(
        &mut self,
        token: &mut T,
        payer: Address,
        message: OutboundMessage,
    ) -> Result<MessageId, RelayError> {
        if self.paused {
            return Err(RelayError::Paused);
        }
        let source = *self
            .endpoints
            .get(&payer)
            .ok_or(RelayError::UnknownEndpoint(payer))?;
        if message.fee_token != self.fee_token || token.address() != self.fee_token {
            return Err(RelayError::UnsupportedFeeToken(message.fee_token));
        }

        let fee = self.quote_fee(message.destination, &message.payload, message.gas_limit)?;
        token.transfer(payer, self.fee_vault, fee)?;

        self.nonce += 1;
        let message_id = Hash::compute_multi(&[
            b"pollbridge-loopback",
            &self.nonce.to_le_bytes(),
            &source.value().to_le_bytes(),
            &message.destination.value().to_le_bytes(),
            message.receiver.as_bytes(),
            &message.payload,
        ]);

        debug!(%message_id, %source, destination = %message.destination, fee, "relay message queued");
        self.outbox.push_back(Delivery {
            destination: message.destination,
            receiver: message.receiver,
            message: InboundMessage {
                message_id,
                source_selector: source,
                sender: payer.to_vec(),
                payload: message.payload,
            },
        });

        Ok(message_id)
    }
}
