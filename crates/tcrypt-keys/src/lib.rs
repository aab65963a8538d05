//! tcrypt keys - key material, token binding and envelope encryption
//!
//! Private key material (two seeds and a pattern) reproduces a list of pattern
//! matches in a synthetic stream. The public key is a hash of those matches'
//! follow sequences. Envelopes are AES-256-CBC encrypted under a key expanded
//! from the public token.

pub mod binder;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;

pub use binder::KeyBinder;
pub use envelope::{
    decrypt_data, decrypt_file, decrypt_message, encrypt_data, encrypt_file, encrypt_message,
    Envelope,
};
pub use error::{KeyError, Result};
pub use kdf::derive_symmetric_key;
pub use keys::{KeyParams, PrivateKeyMaterial, PublicKeyMaterial};
