//! Symmetric key derivation from a verification token

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// AES-256 key length
pub const KEY_LEN: usize = 32;

/// Expand `token || salt` into `key_len` bytes.
///
/// `h0 = SHA-256(token || salt)`, `h(n+1) = SHA-256(h(n) || token || salt)`;
/// the blocks are concatenated and truncated.
pub fn derive_symmetric_key(token: &str, salt: &str, key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(key_len + 32));
    let mut block = Sha256::new()
        .chain_update(token.as_bytes())
        .chain_update(salt.as_bytes())
        .finalize();
    out.extend_from_slice(&block);

    while out.len() < key_len {
        block = Sha256::new()
            .chain_update(block)
            .chain_update(token.as_bytes())
            .chain_update(salt.as_bytes())
            .finalize();
        out.extend_from_slice(&block);
    }

    out.truncate(key_len);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_block_is_plain_hash() {
        let key = derive_symmetric_key("abc", "salt", 32);
        assert_eq!(&key[..], &Sha256::digest(b"abcsalt")[..]);
    }

    #[test]
    fn test_longer_keys_extend_shorter() {
        let short = derive_symmetric_key("token", "00ff", 16);
        let long = derive_symmetric_key("token", "00ff", 80);
        assert_eq!(long.len(), 80);
        assert_eq!(&long[..16], &short[..]);

        let h0 = Sha256::digest(b"token00ff");
        let h1 = Sha256::new()
            .chain_update(h0)
            .chain_update(b"token00ff")
            .finalize();
        assert_eq!(&long[32..64], &h1[..]);
    }

    #[test]
    fn test_salt_changes_key() {
        assert_ne!(
            derive_symmetric_key("token", "a", KEY_LEN),
            derive_symmetric_key("token", "b", KEY_LEN)
        );
    }

    #[test]
    fn test_zero_length() {
        assert!(derive_symmetric_key("token", "salt", 0).is_empty());
    }
}
