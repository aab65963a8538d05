//! Offset derivation
//!
//! Expands a 64-bit seed into a deterministic list of digit offsets using
//! AES-128 in counter mode. The construction is part of the key format:
//! changing it changes every key ever generated.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};

/// Offsets fall in `[0, MAX_OFFSET)`
pub const MAX_OFFSET: u64 = 1_000_000_000;

/// Domain tag completing the 16-byte AES key
const KEY_TAG: &[u8; 8] = b"tcoffset";

/// Largest multiple of `MAX_OFFSET` representable in a u64; draws at or above
/// it are rejected so every offset is equally likely.
const ACCEPT_BOUND: u64 = (u64::MAX / MAX_OFFSET) * MAX_OFFSET;

/// Seed-keyed offset generator
pub struct OffsetDeriver {
    cipher: Aes128,
}

impl OffsetDeriver {
    /// Create a deriver keyed by `seed`
    pub fn new(seed: u64) -> Self {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&seed.to_le_bytes());
        key[8..].copy_from_slice(KEY_TAG);
        Self {
            cipher: Aes128::new(&key.into()),
        }
    }

    /// Raw 64-bit draw for one counter value
    fn draw(&self, counter: u64) -> u64 {
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&counter.to_le_bytes());

        let mut encrypted = Block::from(block);
        self.cipher.encrypt_block(&mut encrypted);

        let mut word = [0u8; 8];
        word.copy_from_slice(&encrypted[..8]);
        u64::from_le_bytes(word)
    }

    /// Infinite stream of accepted offsets, in counter order
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0u64..)
            .map(|counter| self.draw(counter))
            .filter(|v| *v < ACCEPT_BOUND)
            .map(|v| v % MAX_OFFSET)
    }

    /// First `count` offsets
    pub fn offsets(&self, count: usize) -> Vec<u64> {
        self.iter().take(count).collect()
    }
}

/// Derive `count` offsets from `seed` (convenience function)
pub fn derive(seed: u64, count: usize) -> Vec<u64> {
    OffsetDeriver::new(seed).offsets(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_deterministic() {
        let a = derive(42, 100);
        let b = derive(42, 100);
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn test_different_seeds() {
        assert_ne!(derive(1, 50), derive(2, 50));
    }

    #[test]
    fn test_offsets_in_range() {
        let offsets = derive(u64::MAX, 10_000);
        assert!(offsets.iter().all(|&o| o < MAX_OFFSET));
    }

    #[test]
    fn test_zero_count() {
        assert!(derive(7, 0).is_empty());
    }

    #[test]
    fn test_offsets_spread() {
        // 2000 uniform draws over 10^9 should cover both halves of the range
        let offsets = derive(123, 2_000);
        let low = offsets.iter().filter(|&&o| o < MAX_OFFSET / 2).count();
        assert!(low > 800 && low < 1_200, "low half count {low}");
    }

    #[test]
    fn test_accept_bound() {
        assert_eq!(ACCEPT_BOUND % MAX_OFFSET, 0);
        assert!(u64::MAX - ACCEPT_BOUND < MAX_OFFSET);
    }

    proptest! {
        #[test]
        fn prop_derive_is_prefix_stable(seed in any::<u64>(), n in 0usize..64, m in 0usize..64) {
            let short = derive(seed, n);
            let long = derive(seed, n + m);
            prop_assert_eq!(&short[..], &long[..n]);
        }
    }
}
