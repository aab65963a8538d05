//! tcrypt core - the digit stream and pattern engine
//!
//! This crate provides:
//! - Random access over the digits of pi and e ([`DigitSource`])
//! - Seed-keyed offset derivation ([`offsets::derive`])
//! - Parallel synthesis of combined digit streams ([`StreamSynthesizer`])
//! - Gapped pattern search and follow-sequence hashing ([`PatternMatcher`])

pub mod cancel;
pub mod config;
pub mod digits;
pub mod error;
pub mod fixtures;
pub mod offsets;
pub mod pattern;
pub mod stream;

pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use digits::{Constant, DigitFiles, DigitSource};
pub use error::{Error, Result};
pub use offsets::{OffsetDeriver, MAX_OFFSET};
pub use pattern::{hash_follow_sequences, hash_matches, Match, Pattern, PatternMatcher};
pub use stream::{compare_streams, StreamGenerator, StreamSynthesizer, SyntheticStream};

/// Default number of offsets drawn per constant
pub const DEFAULT_NUM_OFFSETS: usize = 100;

/// Default stream modulus (decimal digits)
pub const DEFAULT_MODULUS: u16 = 10;

/// Default follow sequence length
pub const DEFAULT_FOLLOW_DIGITS: usize = 25;

/// Default number of matches bound into a public key
pub const DEFAULT_MAX_POSITIONS: usize = 5;
