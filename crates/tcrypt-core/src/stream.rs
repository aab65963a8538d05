//! Synthetic stream generation
//!
//! A synthetic stream sums, cell by cell, one digit run per offset from both
//! constants and reduces modulo `modulus`:
//!
//! ```text
//! stream[i] = (sum over a of pi[a + i] + sum over b of e[b + i]) mod modulus
//! ```
//!
//! Every cell depends only on its own index, so disjoint index ranges are
//! computed on separate threads and concatenated in order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::digits::{Constant, DigitSource};
use crate::error::{Error, Result};
use crate::offsets;

/// Largest supported modulus; stream cells are stored as bytes
pub const MAX_MODULUS: u16 = 256;

/// Streams memoized per [`StreamGenerator`]
pub const GENERATOR_CACHE_CAPACITY: usize = 10;

/// Shared, immutable stream
pub type SyntheticStream = Arc<[u8]>;

fn check_modulus(modulus: u16) -> Result<()> {
    if modulus == 0 || modulus > MAX_MODULUS {
        return Err(Error::InvalidParameter(format!(
            "modulus must be in 1..={MAX_MODULUS}, got {modulus}"
        )));
    }
    Ok(())
}

/// Combines offset runs of both constants into synthetic streams
pub struct StreamSynthesizer<'a> {
    source: &'a DigitSource,
    threads: usize,
}

impl<'a> StreamSynthesizer<'a> {
    pub fn new(source: &'a DigitSource, threads: usize) -> Self {
        Self {
            source,
            threads: threads.max(1),
        }
    }

    /// Compute `stream[0..length)`
    pub fn synthesize(
        &self,
        offsets_a: &[u64],
        offsets_b: &[u64],
        modulus: u16,
        length: usize,
    ) -> Result<Vec<u8>> {
        self.synthesize_range(offsets_a, offsets_b, modulus, 0, length)
    }

    /// Compute `stream[start..end)`; identical to the same slice of a full stream
    pub fn synthesize_range(
        &self,
        offsets_a: &[u64],
        offsets_b: &[u64],
        modulus: u16,
        start: usize,
        end: usize,
    ) -> Result<Vec<u8>> {
        if offsets_a.is_empty() && offsets_b.is_empty() {
            return Err(Error::NoOffsets);
        }
        if end <= start {
            return Err(Error::InvalidRange {
                start: start as u64,
                length: end.saturating_sub(start),
            });
        }
        check_modulus(modulus)?;

        let length = end - start;
        let chunk = (length / self.threads).max(1);
        let ranges: Vec<(usize, usize)> = (start..end)
            .step_by(chunk)
            .map(|s| (s, (s + chunk).min(end)))
            .collect();

        tracing::debug!(
            length,
            offsets = offsets_a.len() + offsets_b.len(),
            chunks = ranges.len(),
            "Synthesizing stream"
        );

        if ranges.len() == 1 {
            return self.compute(offsets_a, offsets_b, modulus, start, end);
        }

        let parts: Vec<Result<Vec<u8>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .iter()
                .map(|&(s, e)| {
                    scope.spawn(move || self.compute(offsets_a, offsets_b, modulus, s, e))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut stream = Vec::with_capacity(length);
        for part in parts {
            stream.extend_from_slice(&part?);
        }
        Ok(stream)
    }

    /// Single-threaded computation of one range
    fn compute(
        &self,
        offsets_a: &[u64],
        offsets_b: &[u64],
        modulus: u16,
        start: usize,
        end: usize,
    ) -> Result<Vec<u8>> {
        let length = end - start;
        let mut acc = vec![0u16; length];
        let mut run = Vec::with_capacity(length);

        for (constant, offsets) in [(Constant::Pi, offsets_a), (Constant::E, offsets_b)] {
            let period = self.source.period(constant) as u64;
            for &offset in offsets {
                // Reduced first so any u64 offset lands on its cycle position
                let first = offset % period + start as u64;
                self.source.read_into(constant, first, length, &mut run)?;
                for (cell, &digit) in acc.iter_mut().zip(&run) {
                    *cell = (*cell + u16::from(digit)) % modulus;
                }
            }
        }

        // Every cell is below modulus <= 256
        Ok(acc.into_iter().map(|cell| cell as u8).collect())
    }
}

/// Stream source for one key: fixed offsets, modulus and worker count.
///
/// Generated streams are memoized by length (up to
/// [`GENERATOR_CACHE_CAPACITY`] of them) and handed out as shared buffers.
pub struct StreamGenerator<'a> {
    synthesizer: StreamSynthesizer<'a>,
    offsets_a: Vec<u64>,
    offsets_b: Vec<u64>,
    modulus: u16,
    cache: HashMap<usize, SyntheticStream>,
}

impl<'a> StreamGenerator<'a> {
    pub fn new(
        source: &'a DigitSource,
        offsets_a: Vec<u64>,
        offsets_b: Vec<u64>,
        modulus: u16,
        threads: usize,
    ) -> Result<Self> {
        if offsets_a.is_empty() && offsets_b.is_empty() {
            return Err(Error::NoOffsets);
        }
        check_modulus(modulus)?;
        Ok(Self {
            synthesizer: StreamSynthesizer::new(source, threads),
            offsets_a,
            offsets_b,
            modulus,
            cache: HashMap::new(),
        })
    }

    /// Derive `num_offsets` offsets for each constant from a seed pair
    pub fn from_seeds(
        source: &'a DigitSource,
        seed_a: u64,
        seed_b: u64,
        num_offsets: usize,
        modulus: u16,
        threads: usize,
    ) -> Result<Self> {
        Self::new(
            source,
            offsets::derive(seed_a, num_offsets),
            offsets::derive(seed_b, num_offsets),
            modulus,
            threads,
        )
    }

    pub fn modulus(&self) -> u16 {
        self.modulus
    }

    /// Stream of `length` cells.
    ///
    /// A longer request extends the longest memoized stream instead of
    /// starting again from cell 0.
    pub fn generate(&mut self, length: usize) -> Result<SyntheticStream> {
        if let Some(stream) = self.cache.get(&length) {
            return Ok(Arc::clone(stream));
        }

        let prefix = self
            .cache
            .values()
            .filter(|s| s.len() < length)
            .max_by_key(|s| s.len())
            .cloned();
        let stream: SyntheticStream = match prefix {
            Some(prefix) => {
                tracing::debug!(from = prefix.len(), to = length, "Extending stream");
                let mut cells = Vec::with_capacity(length);
                cells.extend_from_slice(&prefix);
                cells.extend(self.generate_range(prefix.len(), length)?);
                cells.into()
            }
            None => self
                .synthesizer
                .synthesize(&self.offsets_a, &self.offsets_b, self.modulus, length)?
                .into(),
        };
        if self.cache.len() < GENERATOR_CACHE_CAPACITY {
            self.cache.insert(length, Arc::clone(&stream));
        }
        Ok(stream)
    }

    /// Cells `[start, end)` without touching the memo
    pub fn generate_range(&self, start: usize, end: usize) -> Result<Vec<u8>> {
        self.synthesizer
            .synthesize_range(&self.offsets_a, &self.offsets_b, self.modulus, start, end)
    }
}

/// Fraction of equal cells over the common prefix of two streams
pub fn compare_streams(a: &[u8], b: &[u8]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
    same as f64 / n as f64
}
