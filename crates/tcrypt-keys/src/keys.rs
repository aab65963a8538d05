//! Private and public key material

use std::fmt;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use tcrypt_core::{
    Pattern, DEFAULT_FOLLOW_DIGITS, DEFAULT_MAX_POSITIONS, DEFAULT_MODULUS, DEFAULT_NUM_OFFSETS,
};

use crate::error::Result;
use crate::kdf;

fn default_num_offsets() -> usize {
    DEFAULT_NUM_OFFSETS
}

fn default_modulus() -> u16 {
    DEFAULT_MODULUS
}

fn default_follow_digits() -> usize {
    DEFAULT_FOLLOW_DIGITS
}

fn default_max_positions() -> usize {
    DEFAULT_MAX_POSITIONS
}

/// Sibling path `<file name>.tmp` used while writing `path`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write JSON through a temp file so a crash never leaves half a key behind
fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let content = Zeroizing::new(serde_json::to_string_pretty(value)?);
    let temp_path = temp_path(path);
    std::fs::write(&temp_path, content.as_bytes())?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Parameters for drawing fresh private key material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParams {
    pub pattern_length: usize,
    pub use_spacing: bool,
    pub max_spacing: usize,
    pub num_offsets: usize,
    pub modulus: u16,
    pub follow_digits: usize,
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            pattern_length: 3,
            use_spacing: true,
            max_spacing: 10,
            num_offsets: DEFAULT_NUM_OFFSETS,
            modulus: DEFAULT_MODULUS,
            follow_digits: DEFAULT_FOLLOW_DIGITS,
        }
    }
}

/// Everything needed to reproduce a key's matches.
///
/// Seeds are wiped when the value is dropped and never shown by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PrivateKeyMaterial {
    #[serde(rename = "seedA")]
    pub seed_a: u64,
    #[serde(rename = "seedB")]
    pub seed_b: u64,
    pub pattern: Pattern,
    pub num_offsets: usize,
    pub modulus: u16,
    pub follow_digits: usize,
}

/// Pattern fields as stored, before shape checks
#[derive(Deserialize)]
struct PatternRecord {
    digits: Vec<u8>,
    #[serde(default)]
    spacing: Option<Vec<usize>>,
}

/// Private key file as stored; older files use `pi_seed`/`e_seed`
#[derive(Deserialize)]
struct PrivateKeyRecord {
    #[serde(rename = "seedA", alias = "pi_seed")]
    seed_a: u64,
    #[serde(rename = "seedB", alias = "e_seed")]
    seed_b: u64,
    pattern: PatternRecord,
    #[serde(default = "default_num_offsets")]
    num_offsets: usize,
    #[serde(default = "default_modulus")]
    modulus: u16,
    #[serde(default = "default_follow_digits")]
    follow_digits: usize,
}

impl Drop for PrivateKeyRecord {
    fn drop(&mut self) {
        self.seed_a.zeroize();
        self.seed_b.zeroize();
    }
}

impl PrivateKeyMaterial {
    /// Key material with default offsets, modulus and follow length
    pub fn new(seed_a: u64, seed_b: u64, pattern: Pattern) -> Self {
        Self {
            seed_a,
            seed_b,
            pattern,
            num_offsets: DEFAULT_NUM_OFFSETS,
            modulus: DEFAULT_MODULUS,
            follow_digits: DEFAULT_FOLLOW_DIGITS,
        }
    }

    pub fn with_num_offsets(mut self, num_offsets: usize) -> Self {
        self.num_offsets = num_offsets;
        self
    }

    pub fn with_modulus(mut self, modulus: u16) -> Self {
        self.modulus = modulus;
        self
    }

    pub fn with_follow_digits(mut self, follow_digits: usize) -> Self {
        self.follow_digits = follow_digits;
        self
    }

    /// Random seeds and a random pattern
    pub fn generate<R: Rng>(params: &KeyParams, rng: &mut R) -> Result<Self> {
        let pattern = Pattern::random(
            params.pattern_length,
            params.max_spacing,
            params.use_spacing,
            params.modulus,
            rng,
        )?;
        Ok(Self {
            seed_a: rng.gen(),
            seed_b: rng.gen(),
            pattern,
            num_offsets: params.num_offsets,
            modulus: params.modulus,
            follow_digits: params.follow_digits,
        })
    }

    /// Pattern digits must fit the modulus
    pub fn validate(&self) -> Result<()> {
        self.pattern.validate_for(self.modulus)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(serde_json::to_string(self)?))
    }

    /// Parse and check key JSON; bad pattern shapes are `InvalidPattern`
    pub fn from_json(json: &str) -> Result<Self> {
        let record: PrivateKeyRecord = serde_json::from_str(json)?;
        let pattern = Pattern::new(
            record.pattern.digits.clone(),
            record.pattern.spacing.clone(),
        )?;
        let key = Self::new(record.seed_a, record.seed_b, pattern)
            .with_num_offsets(record.num_offsets)
            .with_modulus(record.modulus)
            .with_follow_digits(record.follow_digits);
        key.validate()?;
        Ok(key)
    }

    /// Load from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = Zeroizing::new(std::fs::read_to_string(path)?);
        Self::from_json(&content)
    }

    /// Save to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref())
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("seed_a", &"<redacted>")
            .field("seed_b", &"<redacted>")
            .field("pattern", &"<redacted>")
            .field("num_offsets", &self.num_offsets)
            .field("modulus", &self.modulus)
            .field("follow_digits", &self.follow_digits)
            .finish()
    }
}

impl Drop for PrivateKeyMaterial {
    fn drop(&mut self) {
        self.seed_a.zeroize();
        self.seed_b.zeroize();
    }
}

/// Verification token plus the counts needed to recompute it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyMaterial {
    pub verification_token: String,
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
    #[serde(default = "default_follow_digits")]
    pub follow_digits: usize,
}

impl PublicKeyMaterial {
    pub fn new(verification_token: String, max_positions: usize, follow_digits: usize) -> Self {
        Self {
            verification_token,
            max_positions,
            follow_digits,
        }
    }

    /// Symmetric key bytes for `salt`
    pub fn derive_encryption_key(&self, salt: &str, key_len: usize) -> Zeroizing<Vec<u8>> {
        kdf::derive_symmetric_key(&self.verification_token, salt, key_len)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref())
    }
}
