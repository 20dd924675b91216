use vanta_hashes::hashers::{HasherBase, TransactionHash, TransactionId};

use crate::tx::{Transaction, TransactionId as TxId};
use crate::Hash;

/// Computes the transaction id: signature scripts are excluded so the id
/// is stable under script malleation.
pub fn id(tx: &Transaction) -> TxId {
    let mut hasher = TransactionId::new();
    write_transaction(&mut hasher, tx, false);
    hasher.finalize()
}

/// Computes the full transaction hash, committing to signature scripts
pub fn hash(tx: &Transaction) -> Hash {
    let mut hasher = TransactionHash::new();
    write_transaction(&mut hasher, tx, true);
    hasher.finalize()
}

fn write_transaction<T: HasherBase>(hasher: &mut T, tx: &Transaction, include_signature_scripts: bool) {
    hasher.update(tx.version.to_le_bytes());

    hasher.update((tx.inputs.len() as u64).to_le_bytes());
    for input in &tx.inputs {
        hasher.update(input.previous_outpoint.transaction_id.as_bytes());
        hasher.update(input.previous_outpoint.index.to_le_bytes());
        if include_signature_scripts {
            hasher.update((input.signature_script.len() as u64).to_le_bytes());
            hasher.update(&input.signature_script);
            hasher.update([input.sig_op_count]);
        } else {
            hasher.update(0u64.to_le_bytes());
        }
        hasher.update(input.sequence.to_le_bytes());
    }

    hasher.update((tx.outputs.len() as u64).to_le_bytes());
    for output in &tx.outputs {
        hasher.update(output.value.to_le_bytes());
        hasher.update(output.script_public_key.version.to_le_bytes());
        hasher.update((output.script_public_key.script.len() as u64).to_le_bytes());
        hasher.update(&output.script_public_key.script);
    }

    hasher.update(tx.lock_time.to_le_bytes());
    hasher.update(tx.subnetwork_id.as_bytes());
    hasher.update(tx.gas.to_le_bytes());
    hasher.update((tx.payload.len() as u64).to_le_bytes());
    hasher.update(&tx.payload);
}
