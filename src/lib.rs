//! tcrypt - transcendental digit stream cryptography
//!
//! Re-exports the engine ([`engine`]) and the key/envelope layer ([`keys`]).
//!
//! ```no_run
//! use tcrypt::engine::{DigitSource, EngineConfig, Pattern};
//! use tcrypt::keys::{encrypt_message, decrypt_message, KeyBinder, PrivateKeyMaterial};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let source = DigitSource::from_config(&config)?;
//! let binder = KeyBinder::new(&source, config);
//!
//! let pattern = Pattern::new(vec![3, 1, 4], Some(vec![5, 2]))?;
//! let private = PrivateKeyMaterial::new(12345, 67890, pattern);
//! let public = binder.bind(&private, 5)?;
//!
//! let envelope = encrypt_message("hello", &public)?;
//! assert_eq!(decrypt_message(&envelope, &private, &binder, None)?, "hello");
//! # Ok(())
//! # }
//! ```

pub use tcrypt_core as engine;
pub use tcrypt_keys as keys;

pub use tcrypt_core::{DigitSource, EngineConfig, Pattern, PatternMatcher};
pub use tcrypt_keys::{KeyBinder, PrivateKeyMaterial, PublicKeyMaterial};
