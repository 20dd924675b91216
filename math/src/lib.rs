use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign};

/// 192-bit unsigned integer implemented as 3 little-endian u64 limbs.
/// Wide enough to accumulate blue work over the lifetime of the DAG;
/// provides the small API the consensus layer needs (From<u64>, Add,
/// ordering, byte round-trips).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Uint192([u64; 3]);

impl Uint192 {
    pub const ZERO: Uint192 = Uint192([0; 3]);
    pub const MAX: Uint192 = Uint192([u64::MAX; 3]);

    /// Returns little-endian bytes (24 bytes)
    pub fn to_le_bytes(&self) -> [u8; 24] {
        let mut out = [0u8; 24];
        out[0..8].copy_from_slice(&self.0[0].to_le_bytes());
        out[8..16].copy_from_slice(&self.0[1].to_le_bytes());
        out[16..24].copy_from_slice(&self.0[2].to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; 24]) -> Self {
        Self([
            u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
        ])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 3]
    }

    /// Wrapping addition over the 192-bit space
    pub fn wrapping_add(self, rhs: Self) -> Self {
        let (r0, c0) = self.0[0].overflowing_add(rhs.0[0]);
        let (r1, c1a) = self.0[1].overflowing_add(rhs.0[1]);
        let (r1, c1b) = r1.overflowing_add(c0 as u64);
        let (r2, _) = self.0[2].overflowing_add(rhs.0[2]);
        let (r2, _) = r2.overflowing_add((c1a | c1b) as u64);
        Self([r0, r1, r2])
    }
}

impl From<u64> for Uint192 {
    fn from(v: u64) -> Self {
        Self([v, 0, 0])
    }
}

impl AddAssign for Uint192 {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.wrapping_add(rhs);
    }
}

impl Add for Uint192 {
    type Output = Uint192;
    fn add(self, rhs: Self) -> Self::Output {
        self.wrapping_add(rhs)
    }
}

// Limb 0 is the low word, so a derived ordering would compare backwards.
impl Ord for Uint192 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for Uint192 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Uint192 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_le_bytes();
        for byte in bytes.iter().rev() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
