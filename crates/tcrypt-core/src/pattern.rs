//! Pattern search over synthetic streams
//!
//! A pattern is a short digit template with optional gaps. Digit `i` of the
//! pattern must appear at cell `p + c_i` of the stream, where `c_0 = 0` and
//! `c_i = c_{i-1} + 1 + spacing[i-1]`. The cells right after the last matched
//! digit form the match's follow sequence.

use std::fmt;
use std::fmt::Write as _;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cancel::{CancelToken, CHECK_INTERVAL};
use crate::config::{EngineConfig, DEFAULT_PARALLEL_THRESHOLD};
use crate::error::{Error, Result};
use crate::stream::MAX_MODULUS;

/// Smallest number of candidates handed to one search worker
pub const MIN_SEARCH_CHUNK: usize = 1000;

#[derive(Deserialize)]
struct PatternRepr {
    digits: Vec<u8>,
    #[serde(default)]
    spacing: Option<Vec<usize>>,
}

impl TryFrom<PatternRepr> for Pattern {
    type Error = Error;

    fn try_from(repr: PatternRepr) -> Result<Self> {
        Pattern::new(repr.digits, repr.spacing)
    }
}

/// Digit template with optional gaps between consecutive digits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatternRepr")]
pub struct Pattern {
    digits: Vec<u8>,
    spacing: Option<Vec<usize>>,
    /// Cell offset of each digit relative to the match position
    #[serde(skip)]
    cells: Vec<usize>,
}

impl Pattern {
    /// Build a pattern, rejecting empty digit lists and mismatched spacing
    pub fn new(digits: Vec<u8>, spacing: Option<Vec<usize>>) -> Result<Self> {
        if digits.is_empty() {
            return Err(Error::InvalidPattern("pattern has no digits".into()));
        }
        if let Some(gaps) = &spacing {
            if gaps.len() != digits.len() - 1 {
                return Err(Error::InvalidPattern(format!(
                    "{} digits need {} gaps, got {}",
                    digits.len(),
                    digits.len() - 1,
                    gaps.len()
                )));
            }
        }

        let mut cells = Vec::with_capacity(digits.len());
        let mut cell = 0usize;
        cells.push(cell);
        for i in 1..digits.len() {
            let gap = spacing.as_ref().map_or(0, |gaps| gaps[i - 1]);
            cell = cell
                .checked_add(1 + gap)
                .ok_or_else(|| Error::InvalidPattern("spacing overflows".into()))?;
            cells.push(cell);
        }

        Ok(Self {
            digits,
            spacing,
            cells,
        })
    }

    pub fn contiguous(digits: Vec<u8>) -> Result<Self> {
        Self::new(digits, None)
    }

    /// Random pattern: digits uniform in `[0, modulus)`, gaps in `[0, max_spacing]`
    pub fn random<R: Rng>(
        length: usize,
        max_spacing: usize,
        use_spacing: bool,
        modulus: u16,
        rng: &mut R,
    ) -> Result<Self> {
        if modulus == 0 || modulus > MAX_MODULUS {
            return Err(Error::InvalidParameter(format!(
                "modulus must be in 1..={MAX_MODULUS}, got {modulus}"
            )));
        }
        let digits = (0..length)
            .map(|_| rng.gen_range(0..modulus) as u8)
            .collect::<Vec<_>>();
        let spacing = (use_spacing && length > 1).then(|| {
            (0..length - 1)
                .map(|_| rng.gen_range(0..=max_spacing))
                .collect()
        });
        Self::new(digits, spacing)
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn spacing(&self) -> Option<&[usize]> {
        self.spacing.as_deref()
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Stream cells covered from the first to the last matched digit
    pub fn span(&self) -> usize {
        self.cells.last().map_or(0, |c| c + 1)
    }

    pub fn is_contiguous(&self) -> bool {
        self.spacing
            .as_ref()
            .map_or(true, |gaps| gaps.iter().all(|&g| g == 0))
    }

    /// Reject digits that cannot occur in a stream reduced mod `modulus`
    pub fn validate_for(&self, modulus: u16) -> Result<()> {
        match self.digits.iter().find(|&&d| u16::from(d) >= modulus) {
            Some(d) => Err(Error::InvalidPattern(format!(
                "digit {d} out of range for modulus {modulus}"
            ))),
            None => Ok(()),
        }
    }

    /// End position (exclusive) if the pattern matches at `position`
    pub fn match_at(&self, stream: &[u8], position: usize) -> Option<usize> {
        let matched = self.cells.iter().zip(&self.digits).all(|(&c, &d)| {
            position
                .checked_add(c)
                .and_then(|cell| stream.get(cell))
                .is_some_and(|&v| v == d)
        });
        matched.then(|| position + self.span())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.digits.iter().enumerate() {
            if i > 0 {
                if let Some(gaps) = &self.spacing {
                    write!(f, "[{}]", gaps[i - 1])?;
                }
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// One pattern occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Stream index of the pattern's first digit
    pub position: usize,
    /// Up to `follow_digits` cells after the last matched digit
    pub follow: Vec<u8>,
}

fn follow_at(stream: &[u8], end: usize, follow_digits: usize) -> Vec<u8> {
    let start = end.min(stream.len());
    let stop = end.saturating_add(follow_digits).min(stream.len());
    stream[start..stop].to_vec()
}

/// Searches synthetic streams for a pattern
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    threads: usize,
    parallel_threshold: usize,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PatternMatcher {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.threads).with_parallel_threshold(config.parallel_threshold)
    }

    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    fn use_parallel(&self, stream_len: usize) -> bool {
        self.threads > 1 && stream_len > self.parallel_threshold
    }

    /// First `max_positions` matches at or after `start_from`, ascending.
    pub fn find(
        &self,
        pattern: &Pattern,
        stream: &[u8],
        max_positions: usize,
        start_from: usize,
        follow_digits: usize,
    ) -> Vec<Match> {
        let search = Search {
            pattern,
            stream,
            max_positions,
            follow_digits,
            token: None,
        };
        // Without a token a search cannot fail
        self.run(&search, start_from).unwrap_or_default()
    }

    /// Like [`find`](Self::find), stopping with `Cancelled` or
    /// `DeadlineExceeded` when `token` says so
    pub fn find_with(
        &self,
        pattern: &Pattern,
        stream: &[u8],
        max_positions: usize,
        start_from: usize,
        follow_digits: usize,
        token: &CancelToken,
    ) -> Result<Vec<Match>> {
        let search = Search {
            pattern,
            stream,
            max_positions,
            follow_digits,
            token: Some(token),
        };
        self.run(&search, start_from)
    }

    fn run(&self, search: &Search<'_>, start_from: usize) -> Result<Vec<Match>> {
        let span = search.pattern.span();
        if search.max_positions == 0 || span > search.stream.len() {
            return Ok(Vec::new());
        }
        let last = search.stream.len() - span;
        if start_from > last {
            return Ok(Vec::new());
        }

        if !self.use_parallel(search.stream.len()) {
            return search.scan(start_from, last);
        }

        let candidates = last - start_from + 1;
        let chunk = (candidates / self.threads).max(MIN_SEARCH_CHUNK);
        let ranges: Vec<(usize, usize)> = (start_from..=last)
            .step_by(chunk)
            .map(|lo| (lo, (lo + chunk - 1).min(last)))
            .collect();

        tracing::debug!(
            stream_len = search.stream.len(),
            candidates,
            chunks = ranges.len(),
            "Parallel pattern search"
        );

        let parts: Vec<Result<Vec<Match>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .iter()
                .map(|&(lo, hi)| scope.spawn(move || search.scan(lo, hi)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut matches = Vec::new();
        for part in parts {
            matches.extend(part?);
        }
        matches.sort_by_key(|m| m.position);
        matches.truncate(search.max_positions);
        Ok(matches)
    }
}

/// Read-only inputs of one search, shared by every worker
struct Search<'a> {
    pattern: &'a Pattern,
    stream: &'a [u8],
    max_positions: usize,
    follow_digits: usize,
    token: Option<&'a CancelToken>,
}

impl Search<'_> {
    /// Scan candidates `lo..=hi` left to right
    fn scan(&self, lo: usize, hi: usize) -> Result<Vec<Match>> {
        let mut matches = Vec::new();
        for position in lo..=hi {
            if let Some(token) = self.token {
                if (position - lo) % CHECK_INTERVAL == 0 {
                    token.check()?;
                }
            }
            if let Some(end) = self.pattern.match_at(self.stream, position) {
                matches.push(Match {
                    position,
                    follow: follow_at(self.stream, end, self.follow_digits),
                });
                // Later candidates in this range can only rank lower
                if matches.len() == self.max_positions {
                    break;
                }
            }
        }
        Ok(matches)
    }
}

/// SHA-256 over `"seq1|seq2|...|"` with each sequence rendered as decimal
/// digits, as lowercase hex
pub fn hash_follow_sequences<I, S>(sequences: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut joined = String::new();
    for sequence in sequences {
        for d in sequence.as_ref() {
            let _ = write!(joined, "{d}");
        }
        joined.push('|');
    }
    hex::encode(Sha256::digest(joined.as_bytes()))
}

/// Token over the follow sequences of `matches`, in order
pub fn hash_matches(matches: &[Match]) -> String {
    hash_follow_sequences(matches.iter().map(|m| &m.follow))
}

/// True if the pattern occurs at every expected position with the same
/// follow sequence
pub fn verify_matches(
    pattern: &Pattern,
    stream: &[u8],
    expected: &[Match],
    follow_digits: usize,
) -> bool {
    expected.iter().all(|m| {
        pattern
            .match_at(stream, m.position)
            .is_some_and(|end| follow_at(stream, end, follow_digits) == m.follow)
    })
}

/// Recompute a token and compare it against `expected_token` in constant time
pub fn verify_follow_hash<I, S>(sequences: I, expected_token: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let token = hash_follow_sequences(sequences);
    constant_time_eq(token.as_bytes(), expected_token.as_bytes())
}

/// Equality whose timing depends only on the lengths
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
