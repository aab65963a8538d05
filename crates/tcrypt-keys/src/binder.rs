//! Binding private key material to its public verification token

use rand::Rng;

use tcrypt_core::pattern::{constant_time_eq, hash_matches};
use tcrypt_core::{
    DigitSource, EngineConfig, Error as CoreError, Match, PatternMatcher, StreamGenerator,
};

use crate::error::{KeyError, Result};
use crate::keys::{KeyParams, PrivateKeyMaterial, PublicKeyMaterial};

/// Fresh key material drawn before giving up on a key pair
pub const MAX_GENERATE_ATTEMPTS: usize = 16;

/// Recomputes pattern matches for key material against one digit source
pub struct KeyBinder<'a> {
    source: &'a DigitSource,
    config: EngineConfig,
    matcher: PatternMatcher,
}

impl<'a> KeyBinder<'a> {
    pub fn new(source: &'a DigitSource, config: EngineConfig) -> Self {
        let matcher = PatternMatcher::from_config(&config);
        Self {
            source,
            config,
            matcher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The first `max_positions` matches of the key's pattern.
    ///
    /// The stream starts at `stream_length` cells and doubles until it holds
    /// `max_positions` matches whose last follow sequence is complete. Past
    /// `max_stream_length` the key fails with `InsufficientStream`.
    pub fn matches(&self, key: &PrivateKeyMaterial, max_positions: usize) -> Result<Vec<Match>> {
        key.validate()?;

        let mut generator = StreamGenerator::from_seeds(
            self.source,
            key.seed_a,
            key.seed_b,
            key.num_offsets,
            key.modulus,
            self.config.threads,
        )?;

        let max_length = self.config.max_stream_length;
        let mut length = self.config.stream_length.min(max_length);
        loop {
            let stream = generator.generate(length)?;
            let found = self
                .matcher
                .find(&key.pattern, &stream, max_positions, 0, key.follow_digits);

            let complete = found
                .last()
                .map_or(true, |m| m.follow.len() == key.follow_digits);
            if found.len() >= max_positions && complete {
                tracing::debug!(stream_length = length, matches = found.len(), "Key matches found");
                return Ok(found);
            }

            if length >= max_length {
                return Err(CoreError::InsufficientStream {
                    required: max_positions,
                    found: found.len(),
                    stream_length: length,
                }
                .into());
            }

            tracing::debug!(
                stream_length = length,
                matches = found.len(),
                required = max_positions,
                "Growing stream"
            );
            length = length.saturating_mul(2).min(max_length);
        }
    }

    /// Verification token over the key's first `max_positions` matches
    pub fn token(&self, key: &PrivateKeyMaterial, max_positions: usize) -> Result<String> {
        let matches = self.matches(key, max_positions)?;
        Ok(hash_matches(&matches))
    }

    /// Derive the public half of `key`
    pub fn bind(&self, key: &PrivateKeyMaterial, max_positions: usize) -> Result<PublicKeyMaterial> {
        let token = self.token(key, max_positions)?;
        Ok(PublicKeyMaterial::new(
            token,
            max_positions,
            key.follow_digits,
        ))
    }

    /// True if `key` reproduces the public token.
    ///
    /// A key whose stream cannot supply enough matches does not verify.
    pub fn verify(&self, key: &PrivateKeyMaterial, public: &PublicKeyMaterial) -> Result<bool> {
        let token = match self.token(key, public.max_positions) {
            Ok(token) => token,
            Err(KeyError::Core(CoreError::InsufficientStream { found, .. })) => {
                tracing::debug!(found, "Key cannot reproduce enough matches");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        Ok(constant_time_eq(
            token.as_bytes(),
            public.verification_token.as_bytes(),
        ))
    }

    /// Draw fresh key material until a pair binds, up to
    /// [`MAX_GENERATE_ATTEMPTS`] times
    pub fn generate_pair<R: Rng>(
        &self,
        params: &KeyParams,
        max_positions: usize,
        rng: &mut R,
    ) -> Result<(PrivateKeyMaterial, PublicKeyMaterial)> {
        let mut attempt = 1;
        loop {
            let key = PrivateKeyMaterial::generate(params, rng)?;
            match self.bind(&key, max_positions) {
                Ok(public) => return Ok((key, public)),
                Err(KeyError::Core(CoreError::InsufficientStream { found, .. }))
                    if attempt < MAX_GENERATE_ATTEMPTS =>
                {
                    tracing::warn!(attempt, found, "Pattern too rare, drawing new key material");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tcrypt_core::{fixtures, Pattern};

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_threads(2)
            .with_stream_length(2_000)
            .with_max_stream_length(64_000)
    }

    fn key() -> PrivateKeyMaterial {
        let pattern = Pattern::new(vec![3, 1, 4], Some(vec![2, 1])).unwrap();
        PrivateKeyMaterial::new(1001, 2002, pattern).with_num_offsets(20)
    }

    #[test]
    fn test_bind_then_verify() {
        let source = fixtures::source(50_000).unwrap();
        let binder = KeyBinder::new(&source, config());

        let private = key();
        let public = binder.bind(&private, 5).unwrap();
        assert_eq!(public.verification_token.len(), 64);
        assert_eq!(public.max_positions, 5);
        assert_eq!(public.follow_digits, 25);
        assert!(binder.verify(&private, &public).unwrap());

        // Binding is deterministic
        assert_eq!(binder.bind(&private, 5).unwrap(), public);
    }

    #[test]
    fn test_mutations_fail_verification() {
        let source = fixtures::source(50_000).unwrap();
        let binder = KeyBinder::new(&source, config());
        let private = key();
        let public = binder.bind(&private, 5).unwrap();

        let mut seed_a = private.clone();
        seed_a.seed_a += 1;
        let mut seed_b = private.clone();
        seed_b.seed_b ^= 1 << 40;
        let mut digit = private.clone();
        digit.pattern = Pattern::new(vec![3, 1, 5], Some(vec![2, 1])).unwrap();
        let mut gap = private.clone();
        gap.pattern = Pattern::new(vec![3, 1, 4], Some(vec![2, 2])).unwrap();
        let modulus = private.clone().with_modulus(11);

        for mutated in [seed_a, seed_b, digit, gap, modulus] {
            assert!(!binder.verify(&mutated, &public).unwrap(), "{mutated:?}");
        }
    }

    #[test]
    fn test_matches_are_complete() {
        let source = fixtures::source(50_000).unwrap();
        let binder = KeyBinder::new(&source, config());
        let matches = binder.matches(&key(), 7).unwrap();
        assert_eq!(matches.len(), 7);
        assert!(matches.iter().all(|m| m.follow.len() == 25));
        assert!(matches.windows(2).all(|w| w[0].position < w[1].position));
    }

    #[test]
    fn test_stream_grows_for_rare_patterns() {
        let source = fixtures::source(50_000).unwrap();
        let binder = KeyBinder::new(&source, config().with_stream_length(100));
        // Five-digit patterns average one hit per 100k cells at modulus 10
        let rare = PrivateKeyMaterial::new(
            5,
            6,
            Pattern::contiguous(vec![9, 8, 7, 6, 5]).unwrap(),
        )
        .with_num_offsets(10);
        let err = binder.matches(&rare, 30).unwrap_err();
        assert!(matches!(
            err,
            KeyError::Core(CoreError::InsufficientStream {
                required: 30,
                stream_length: 64_000,
                ..
            })
        ));

        // A common pattern is found once the stream has grown
        let common = PrivateKeyMaterial::new(5, 6, Pattern::contiguous(vec![1]).unwrap())
            .with_num_offsets(10)
            .with_modulus(2);
        let matches = binder.matches(&common, 200).unwrap();
        assert_eq!(matches.len(), 200);
    }

    #[test]
    fn test_zero_positions_hash_empty_list() {
        let source = fixtures::source(5_000).unwrap();
        let binder = KeyBinder::new(&source, config());
        let public = binder.bind(&key(), 0).unwrap();
        assert_eq!(
            public.verification_token,
            tcrypt_core::hash_follow_sequences(Vec::<Vec<u8>>::new())
        );
    }

    #[test]
    fn test_generate_pair() {
        let source = fixtures::source(50_000).unwrap();
        let binder = KeyBinder::new(&source, config());
        let mut rng = StdRng::seed_from_u64(77);
        let params = KeyParams {
            num_offsets: 10,
            max_spacing: 4,
            ..KeyParams::default()
        };

        let (private, public) = binder.generate_pair(&params, 3, &mut rng).unwrap();
        assert!(binder.verify(&private, &public).unwrap());
        assert_eq!(public.max_positions, 3);
    }
}
