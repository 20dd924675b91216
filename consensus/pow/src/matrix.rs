use crate::xoshiro::XoShiRo256PlusPlus;
use std::array;
use vanta_hashes::{pow_hashers, Hash};

/// 64x64 matrix of 4-bit values used by the heavy-hash transform
pub struct Matrix([[u16; 64]; 64]);

impl Matrix {
    /// Derives the matrix for a given pre-pow hash. Degenerate (rank
    /// deficient) matrices would lose digest entropy through the linear
    /// transform, so candidates are regenerated until one has full rank.
    pub fn generate(hash: Hash) -> Self {
        let mut generator = XoShiRo256PlusPlus::new(hash);
        loop {
            let matrix = Self::rand_matrix_no_rank_check(&mut generator);
            if matrix.compute_rank() == 64 {
                return matrix;
            }
        }
    }

    fn rand_matrix_no_rank_check(generator: &mut XoShiRo256PlusPlus) -> Self {
        Self(array::from_fn(|_| {
            let mut val = 0;
            array::from_fn(|j| {
                let shift = j % 16;
                if shift == 0 {
                    val = generator.u64();
                }
                (val >> (4 * shift) & 0x0f) as u16
            })
        }))
    }

    fn convert_to_float(&self) -> [[f64; 64]; 64] {
        array::from_fn(|i| array::from_fn(|j| self.0[i][j] as f64))
    }

    pub fn compute_rank(&self) -> usize {
        const EPS: f64 = 1e-9;
        let mut mat_float = self.convert_to_float();
        let mut rank = 0;
        let mut row_selected = [false; 64];
        for i in 0..64 {
            let mut j = 0;
            while j < 64 {
                if !row_selected[j] && mat_float[j][i].abs() > EPS {
                    break;
                }
                j += 1;
            }
            if j != 64 {
                rank += 1;
                row_selected[j] = true;
                for p in (i + 1)..64 {
                    mat_float[j][p] /= mat_float[j][i];
                }
                for k in 0..64 {
                    if k != j && mat_float[k][i].abs() > EPS {
                        for p in (i + 1)..64 {
                            mat_float[k][p] -= mat_float[j][p] * mat_float[k][i];
                        }
                    }
                }
            }
        }
        rank
    }

    /// The heavy-hash step: nibble-decompose the digest, multiply by the
    /// matrix, fold the products back into nibbles, XOR with the digest
    /// and run the final domain hash.
    pub fn heavy_hash(&self, hash: Hash) -> Hash {
        let nibbles: [u16; 64] = {
            let bytes = hash.as_bytes();
            let mut arr = [0u16; 64];
            for (i, &byte) in bytes.iter().enumerate() {
                arr[2 * i] = (byte >> 4) as u16;
                arr[2 * i + 1] = (byte & 0x0f) as u16;
            }
            arr
        };

        let mut product = [0u8; 32];
        for (i, byte) in product.iter_mut().enumerate() {
            let mut sum1 = 0u16;
            let mut sum2 = 0u16;
            for (j, &elem) in nibbles.iter().enumerate() {
                sum1 += self.0[2 * i][j] * elem;
                sum2 += self.0[2 * i + 1][j] * elem;
            }
            // Each sum is at most 64 * 15 * 15 < 2^14; the top nibble is bits 10..14
            *byte = (((sum1 >> 10) << 4) as u8) | ((sum2 >> 10) as u8);
        }

        product.iter_mut().zip(hash.as_bytes()).for_each(|(p, h)| *p ^= h);
        pow_hashers::heavy_hash(&product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_matrix_has_full_rank() {
        let matrix = Matrix::generate(Hash::from_u64_word(42));
        assert_eq!(matrix.compute_rank(), 64);
    }

    #[test]
    fn generation_is_deterministic() {
        let seed = Hash::from_le_u64([5, 6, 7, 8]);
        let a = Matrix::generate(seed);
        let b = Matrix::generate(seed);
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn heavy_hash_depends_on_matrix_and_input() {
        let m1 = Matrix::generate(Hash::from_u64_word(1));
        let m2 = Matrix::generate(Hash::from_u64_word(2));
        let digest = Hash::from_u64_word(99);
        assert_eq!(m1.heavy_hash(digest), m1.heavy_hash(digest));
        assert_ne!(m1.heavy_hash(digest), m2.heavy_hash(digest));
        assert_ne!(m1.heavy_hash(digest), m1.heavy_hash(Hash::from_u64_word(100)));
    }

    #[test]
    fn zero_matrix_has_zero_rank() {
        let matrix = Matrix([[0u16; 64]; 64]);
        assert_eq!(matrix.compute_rank(), 0);
    }
}
