//!
//! # Transaction
//!
//! Consensus [`Transaction`] structure and related types.
//!

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::hashing;
use crate::subnets::SubnetworkId;
use crate::Hash;

/// A 32-byte transaction identifier. Unlike the transaction hash, the id
/// does not commit to signature scripts so it is stable under malleation.
pub type TransactionId = Hash;

pub type TransactionIndexType = u32;

/// Script paying to an output, together with its script-engine version
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPublicKey {
    pub version: u16,
    #[serde(with = "serde_bytes")]
    pub script: Vec<u8>,
}

impl ScriptPublicKey {
    pub fn new(version: u16, script: Vec<u8>) -> Self {
        Self { version, script }
    }
}

/// Reference to an output of a previous transaction
#[derive(Eq, Default, Hash, PartialEq, Debug, Copy, Clone, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: TransactionIndexType,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

/// A transaction input, weakly referencing the output it spends
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    #[serde(with = "serde_bytes")]
    pub signature_script: Vec<u8>,
    pub sequence: u64,
    pub sig_op_count: u8,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: Vec<u8>, sequence: u64, sig_op_count: u8) -> Self {
        Self { previous_outpoint, signature_script, sequence, sig_op_count }
    }
}

/// A transaction output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { value, script_public_key }
    }
}

/// A consensus transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
    pub subnetwork_id: SubnetworkId,
    pub gas: u64,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(
        version: u16,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u64,
        subnetwork_id: SubnetworkId,
        gas: u64,
        payload: Vec<u8>,
    ) -> Self {
        Self { version, inputs, outputs, lock_time, subnetwork_id, gas, payload }
    }

    /// Malleation-stable identifier (signature scripts zeroed)
    pub fn id(&self) -> TransactionId {
        hashing::tx::id(self)
    }

    /// Full hash including signature scripts
    pub fn hash(&self) -> Hash {
        hashing::tx::hash(self)
    }

    pub fn is_coinbase(&self) -> bool {
        self.subnetwork_id.is_coinbase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subnets::{SUBNETWORK_ID_COINBASE, SUBNETWORK_ID_NATIVE};

    fn sample_tx() -> Transaction {
        Transaction::new(
            0,
            vec![TransactionInput::new(
                TransactionOutpoint::new(Hash::from_u64_word(7), 0),
                vec![1, 2, 3],
                u64::MAX,
                1,
            )],
            vec![TransactionOutput::new(1000, ScriptPublicKey::new(0, vec![0xaa]))],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        )
    }

    #[test]
    fn id_ignores_signature_script() {
        let tx = sample_tx();
        let mut malleated = tx.clone();
        malleated.inputs[0].signature_script = vec![9, 9, 9];
        assert_eq!(tx.id(), malleated.id());
        assert_ne!(tx.hash(), malleated.hash());
    }

    #[test]
    fn coinbase_detection() {
        let mut tx = sample_tx();
        assert!(!tx.is_coinbase());
        tx.subnetwork_id = SUBNETWORK_ID_COINBASE;
        assert!(tx.is_coinbase());
    }
}
