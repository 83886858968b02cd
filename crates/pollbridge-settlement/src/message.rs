//! Wire format of the two cross-chain messages.
//!
//! Payloads are borsh-encoded. The status travels as a raw byte and is
//! only turned into a `ResultStatus` through an explicit range check.

use borsh::{BorshDeserialize, BorshSerialize};
use pollbridge_governance::ResultStatus;
use pollbridge_types::{Hash, MessageId};
use crate::error::SettlementError;

/// L2 -> L1: a finalized poll result.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ResultPayload {
    pub group_id: u64,
    pub poll_id: u64,
    pub status: u8,
    pub result_hash: Hash,
}

/// L1 -> L2: acknowledgement that a result was recorded.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AckPayload {
    pub group_id: u64,
    pub poll_id: u64,
    pub status: u8,
    pub result_hash: Hash,
    /// Id of the result message this ack answers
    pub inbound_message_id: MessageId,
}

/// Idempotency key shared by both sides.
pub fn record_key(group_id: u64, poll_id: u64) -> Hash {
    Hash::compute_multi(&[&group_id.to_be_bytes(), &poll_id.to_be_bytes()])
}

fn decode_status(raw: u8) -> Result<ResultStatus, SettlementError> {
    ResultStatus::from_u8(raw).ok_or(SettlementError::InvalidStatus(raw))
}

impl ResultPayload {
    pub fn new(group_id: u64, poll_id: u64, status: ResultStatus, result_hash: Hash) -> Self {
        Self {
            group_id,
            poll_id,
            status: status.as_u8(),
            result_hash,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SettlementError> {
        borsh::to_vec(self).map_err(|e| SettlementError::Decode(e.to_string()))
    }

    /// Decode without validating field values.
    pub fn decode(bytes: &[u8]) -> Result<Self, SettlementError> {
        borsh::from_slice(bytes).map_err(|e| SettlementError::Decode(e.to_string()))
    }

    pub fn status(&self) -> Result<ResultStatus, SettlementError> {
        decode_status(self.status)
    }

    pub fn key(&self) -> Hash {
        record_key(self.group_id, self.poll_id)
    }
}

impl AckPayload {
    pub fn new(result: &ResultPayload, inbound_message_id: MessageId) -> Self {
        Self {
            group_id: result.group_id,
            poll_id: result.poll_id,
            status: result.status,
            result_hash: result.result_hash,
            inbound_message_id,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SettlementError> {
        borsh::to_vec(self).map_err(|e| SettlementError::Decode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SettlementError> {
        borsh::from_slice(bytes).map_err(|e| SettlementError::Decode(e.to_string()))
    }

    pub fn status(&self) -> Result<ResultStatus, SettlementError> {
        decode_status(self.status)
    }

    pub fn key(&self) -> Hash {
        record_key(self.group_id, self.poll_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_payload_layout() {
        let payload = ResultPayload::new(7, 3, ResultStatus::Passed, Hash::compute(b"r"));
        let bytes = payload.encode().unwrap();
        // u64 + u64 + u8 + 32
        assert_eq!(bytes.len(), 49);
        assert_eq!(bytes[16], 1);
        assert_eq!(ResultPayload::decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_out_of_range_status_is_rejected() {
        let mut payload = ResultPayload::new(7, 3, ResultStatus::Passed, Hash::ZERO);
        payload.status = 3;
        let decoded = ResultPayload::decode(&payload.encode().unwrap()).unwrap();
        assert_eq!(decoded.status(), Err(SettlementError::InvalidStatus(3)));
    }

    #[test]
    fn test_truncated_and_trailing_bytes_fail() {
        let bytes = ResultPayload::new(1, 1, ResultStatus::FailedQuorum, Hash::ZERO)
            .encode()
            .unwrap();
        assert!(matches!(ResultPayload::decode(&bytes[..40]), Err(SettlementError::Decode(_))));

        let mut longer = bytes.clone();
        longer.push(0);
        assert!(matches!(ResultPayload::decode(&longer), Err(SettlementError::Decode(_))));
    }

    #[test]
    fn test_ack_echoes_result() {
        let result = ResultPayload::new(7, 3, ResultStatus::FailedQuorum, Hash::compute(b"r"));
        let inbound = Hash::compute(b"msg");
        let ack = AckPayload::new(&result, inbound);

        let decoded = AckPayload::decode(&ack.encode().unwrap()).unwrap();
        assert_eq!(decoded.status().unwrap(), ResultStatus::FailedQuorum);
        assert_eq!(decoded.inbound_message_id, inbound);
        assert_eq!(decoded.key(), result.key());
    }

    #[test]
    fn test_record_key_separates_group_and_poll() {
        assert_ne!(record_key(1, 2), record_key(2, 1));
        assert_eq!(record_key(1, 2), record_key(1, 2));
    }
}
