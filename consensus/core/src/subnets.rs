use serde::{Deserialize, Serialize};
use std::fmt;

pub const SUBNETWORK_ID_SIZE: usize = 20;

/// The domain a transaction belongs to. Almost all transactions live on the
/// native subnetwork; coinbase transactions are tagged with a reserved id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubnetworkId([u8; SUBNETWORK_ID_SIZE]);

pub const SUBNETWORK_ID_NATIVE: SubnetworkId = SubnetworkId([0; SUBNETWORK_ID_SIZE]);
pub const SUBNETWORK_ID_COINBASE: SubnetworkId = SubnetworkId([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

impl SubnetworkId {
    pub const fn from_bytes(bytes: [u8; SUBNETWORK_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SUBNETWORK_ID_SIZE] {
        &self.0
    }

    pub fn is_native(&self) -> bool {
        *self == SUBNETWORK_ID_NATIVE
    }

    pub fn is_coinbase(&self) -> bool {
        *self == SUBNETWORK_ID_COINBASE
    }
}

impl fmt::Display for SubnetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_distinct() {
        assert!(SUBNETWORK_ID_NATIVE.is_native());
        assert!(SUBNETWORK_ID_COINBASE.is_coinbase());
        assert_ne!(SUBNETWORK_ID_NATIVE, SUBNETWORK_ID_COINBASE);
    }
}
