//! AES-256-CBC envelopes keyed by a verification token
//!
//! The envelope carries everything a holder of the matching private key needs
//! besides the key itself: the ciphertext, the IV, the salt fed to the key
//! derivation and the public verification token.

use std::path::Path;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use tcrypt_core::pattern::constant_time_eq;
use tcrypt_core::{Error as CoreError, DEFAULT_MAX_POSITIONS};

use crate::binder::KeyBinder;
use crate::error::{KeyError, Result};
use crate::kdf::{self, KEY_LEN};
use crate::keys::{PrivateKeyMaterial, PublicKeyMaterial};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// IV length for AES-CBC
pub const IV_LEN: usize = 16;

/// Random salt bytes (hex encoded in the envelope)
pub const SALT_LEN: usize = 16;

/// Encrypted payload plus decryption metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64 ciphertext
    pub ciphertext: String,
    /// Base64 IV
    pub iv: String,
    /// Hex salt
    pub salt: String,
    pub verification_token: String,
}

impl Envelope {
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
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn decode_iv(&self) -> Result<[u8; IV_LEN]> {
        let iv = STANDARD
            .decode(&self.iv)
            .map_err(|e| KeyError::InvalidEnvelope(format!("iv: {e}")))?;
        iv.as_slice().try_into().map_err(|_| {
            KeyError::InvalidEnvelope(format!("iv must be {IV_LEN} bytes, got {}", iv.len()))
        })
    }

    fn decode_ciphertext(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.ciphertext)
            .map_err(|e| KeyError::InvalidEnvelope(format!("ciphertext: {e}")))
    }
}

/// Encrypt `data` for the holder of the private key behind `public`
pub fn encrypt_data(data: &[u8], public: &PublicKeyMaterial) -> Result<Envelope> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    encrypt_with(data, public, &hex::encode(salt), iv)
}

fn encrypt_with(
    data: &[u8],
    public: &PublicKeyMaterial,
    salt: &str,
    iv: [u8; IV_LEN],
) -> Result<Envelope> {
    let key = public.derive_encryption_key(salt, KEY_LEN);
    let cipher = Aes256CbcEnc::new_from_slices(&key, &iv)
        .map_err(|e| KeyError::InvalidEnvelope(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(data);

    tracing::debug!(bytes = data.len(), "Encrypted payload");
    Ok(Envelope {
        ciphertext: STANDARD.encode(ciphertext),
        iv: STANDARD.encode(iv),
        salt: salt.to_string(),
        verification_token: public.verification_token.clone(),
    })
}

/// Decrypt an envelope with private key material.
///
/// The key's token is recomputed over `max_positions` matches (5 when not
/// given) and must equal the envelope's token.
pub fn decrypt_data(
    envelope: &Envelope,
    key: &PrivateKeyMaterial,
    binder: &KeyBinder<'_>,
    max_positions: Option<usize>,
) -> Result<Vec<u8>> {
    let max_positions = max_positions.unwrap_or(DEFAULT_MAX_POSITIONS);
    let token = match binder.token(key, max_positions) {
        Ok(token) => token,
        Err(KeyError::Core(CoreError::InsufficientStream { found, .. })) => {
            tracing::debug!(found, "Private key cannot reproduce the envelope token");
            return Err(KeyError::VerificationMismatch);
        }
        Err(e) => return Err(e),
    };
    if !constant_time_eq(token.as_bytes(), envelope.verification_token.as_bytes()) {
        return Err(KeyError::VerificationMismatch);
    }

    let iv = envelope.decode_iv()?;
    let ciphertext = envelope.decode_ciphertext()?;
    let key = kdf::derive_symmetric_key(&envelope.verification_token, &envelope.salt, KEY_LEN);
    let cipher = Aes256CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| KeyError::InvalidEnvelope(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| KeyError::Decryption("bad padding".into()))
}

/// Encrypt UTF-8 text; returns the envelope as JSON
pub fn encrypt_message(message: &str, public: &PublicKeyMaterial) -> Result<String> {
    encrypt_data(message.as_bytes(), public)?.to_json()
}

/// Decrypt an envelope JSON produced by [`encrypt_message`]
pub fn decrypt_message(
    envelope_json: &str,
    key: &PrivateKeyMaterial,
    binder: &KeyBinder<'_>,
    max_positions: Option<usize>,
) -> Result<String> {
    let envelope = Envelope::from_json(envelope_json)?;
    let data = decrypt_data(&envelope, key, binder, max_positions)?;
    Ok(String::from_utf8(data)?)
}

/// Encrypt a whole file into an envelope file
pub fn encrypt_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    public: &PublicKeyMaterial,
) -> Result<()> {
    let data = std::fs::read(input.as_ref())?;
    encrypt_data(&data, public)?.save(output.as_ref())?;
    tracing::info!(
        input = %input.as_ref().display(),
        output = %output.as_ref().display(),
        bytes = data.len(),
        "Encrypted file"
    );
    Ok(())
}

/// Decrypt an envelope file back into the original bytes
pub fn decrypt_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    key: &PrivateKeyMaterial,
    binder: &KeyBinder<'_>,
    max_positions: Option<usize>,
) -> Result<()> {
    let envelope = Envelope::load(input.as_ref())?;
    let data = decrypt_data(&envelope, key, binder, max_positions)?;
    std::fs::write(output.as_ref(), &data)?;
    tracing::info!(
        input = %input.as_ref().display(),
        output = %output.as_ref().display(),
        bytes = data.len(),
        "Decrypted file"
    );
    Ok(())
}
