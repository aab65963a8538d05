//! Digit sources: random access over the decimal expansions of pi and e
//!
//! Each constant is backed by a plain text file such as `3.14159...`. The
//! fractional digits are addressed from index 0. The address space is cyclic:
//! once the stored digits run out the cursor resumes at the first digit of the
//! text (the leading integer digit), then continues with the fractional digits
//! again. The period of a constant is therefore the number of ASCII digits in
//! its file.
//!
//! Files whose fractional part is a single unbroken run of digits are indexed
//! straight out of the memory map. Anything else (line breaks, spaces) is
//! compacted into an owned buffer once, at open time.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Known-correct beginning of pi, checked when a source is opened
pub const PI_PREFIX: &str = "3.1415926535897932384626433832795028841971693993751058209749445923078164062862089986280348253421170679";

/// Known-correct beginning of e, checked when a source is opened
pub const E_PREFIX: &str = "2.7182818284590452353602874713526624977572470936999595749669676277240766303535475945713821785251664274";

/// Default number of cached ranges per constant
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// One of the two constants backing the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constant {
    /// Constant A
    Pi,
    /// Constant B
    E,
}

impl Constant {
    pub const ALL: [Constant; 2] = [Constant::Pi, Constant::E];

    /// Known-correct text prefix for this constant
    pub fn prefix(self) -> &'static str {
        match self {
            Constant::Pi => PI_PREFIX,
            Constant::E => E_PREFIX,
        }
    }

    /// Digit cycle length of a source holding only [`prefix`](Self::prefix)
    pub fn prefix_period(self) -> usize {
        self.prefix().bytes().filter(u8::is_ascii_digit).count()
    }

    /// File name used inside a data directory
    pub fn file_name(self) -> &'static str {
        match self {
            Constant::Pi => "pi_1m.txt",
            Constant::E => "e_1m.txt",
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Pi => write!(f, "pi"),
            Constant::E => write!(f, "e"),
        }
    }
}

/// Where the fractional digits live
enum Backing {
    /// Digits read directly from the map, `frac_len` bytes from `frac_start`
    Mapped {
        map: Mmap,
        frac_start: usize,
        frac_len: usize,
    },
    /// Digit values (0-9) compacted out of a formatted or in-memory text
    Owned(Vec<u8>),
}

impl Backing {
    fn len(&self) -> usize {
        match self {
            Backing::Mapped { frac_len, .. } => *frac_len,
            Backing::Owned(digits) => digits.len(),
        }
    }

    fn get(&self, pos: usize) -> u8 {
        match self {
            Backing::Mapped {
                map, frac_start, ..
            } => map[frac_start + pos] - b'0',
            Backing::Owned(digits) => digits[pos],
        }
    }

    fn extend_into(&self, out: &mut Vec<u8>, pos: usize, n: usize) {
        match self {
            Backing::Mapped {
                map, frac_start, ..
            } => {
                let start = frac_start + pos;
                out.extend(map[start..start + n].iter().map(|b| b - b'0'));
            }
            Backing::Owned(digits) => out.extend_from_slice(&digits[pos..pos + n]),
        }
    }
}

/// Bounded `(start, length)` cache. Full caches stop admitting new entries.
struct RangeCache {
    capacity: usize,
    entries: HashMap<(u64, usize), Arc<[u8]>>,
}

impl RangeCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    fn get(&self, key: &(u64, usize)) -> Option<Arc<[u8]>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: (u64, usize), digits: Arc<[u8]>) {
        if self.entries.len() < self.capacity {
            self.entries.insert(key, digits);
        }
    }
}

/// Layout of a validated digit text
struct Layout {
    /// Digit values before the radix point
    lead: Vec<u8>,
    /// Byte offset of the first fractional character
    frac_start: usize,
    /// True when every byte after the radix point is an ASCII digit
    compact: bool,
}

/// Validate a digit text and locate its parts.
///
/// The prefix check compares the significant characters of the text (digits
/// and the radix point) against the known-correct prefix, so line-wrapped
/// files are accepted as long as their digits are right.
fn inspect(constant: Constant, text: &[u8]) -> Result<Layout> {
    let corrupt = |reason: &str| Error::SourceCorrupt {
        constant,
        reason: reason.to_string(),
    };

    if text.is_empty() {
        return Err(corrupt("empty digit text"));
    }

    let prefix = constant.prefix().as_bytes();
    let significant: Vec<u8> = text
        .iter()
        .copied()
        .filter(|b| b.is_ascii_digit() || *b == b'.')
        .take(prefix.len())
        .collect();
    if significant[..] != prefix[..significant.len()] {
        return Err(corrupt("leading digits do not match the known prefix"));
    }

    let dot = text
        .iter()
        .position(|&b| b == b'.')
        .ok_or_else(|| corrupt("missing radix point"))?;
    let lead: Vec<u8> = text[..dot]
        .iter()
        .filter(|b| b.is_ascii_digit())
        .map(|b| b - b'0')
        .collect();

    let frac = &text[dot + 1..];
    if !frac.iter().any(u8::is_ascii_digit) {
        return Err(corrupt("no fractional digits"));
    }

    Ok(Layout {
        lead,
        frac_start: dot + 1,
        compact: frac.iter().all(u8::is_ascii_digit),
    })
}

fn compact_digits(frac: &[u8]) -> Vec<u8> {
    frac.iter()
        .filter(|b| b.is_ascii_digit())
        .map(|b| b - b'0')
        .collect()
}

/// Digits of one constant plus its range cache
struct ConstantDigits {
    constant: Constant,
    backing: Backing,
    lead: Vec<u8>,
    cache: Mutex<RangeCache>,
}

impl ConstantDigits {
    fn open(constant: Constant, path: &Path, cache_capacity: usize) -> Result<Self> {
        let unavailable = |source| Error::SourceUnavailable {
            constant,
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unavailable)?;
        let size = file.metadata().map_err(unavailable)?.len();
        if size == 0 {
            return Err(Error::SourceCorrupt {
                constant,
                reason: format!("{} is empty", path.display()),
            });
        }

        // Read-only map; the digit files are never written while open.
        let map = unsafe { Mmap::map(&file) }.map_err(unavailable)?;
        let layout = inspect(constant, &map)?;

        let backing = if layout.compact {
            Backing::Mapped {
                frac_len: map.len() - layout.frac_start,
                frac_start: layout.frac_start,
                map,
            }
        } else {
            tracing::warn!(
                %constant,
                path = %path.display(),
                "Digit file contains formatting, compacting digits into memory"
            );
            Backing::Owned(compact_digits(&map[layout.frac_start..]))
        };

        let digits = Self::with_backing(constant, backing, layout.lead, cache_capacity);
        tracing::info!(
            %constant,
            path = %path.display(),
            period = digits.period(),
            "Opened digit source"
        );
        Ok(digits)
    }

    fn from_text(constant: Constant, text: &[u8], cache_capacity: usize) -> Result<Self> {
        let layout = inspect(constant, text)?;
        let backing = Backing::Owned(compact_digits(&text[layout.frac_start..]));
        Ok(Self::with_backing(constant, backing, layout.lead, cache_capacity))
    }

    fn with_backing(
        constant: Constant,
        backing: Backing,
        lead: Vec<u8>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            constant,
            backing,
            lead,
            cache: Mutex::new(RangeCache::new(cache_capacity)),
        }
    }

    fn period(&self) -> usize {
        self.backing.len() + self.lead.len()
    }

    fn digit(&self, index: u64) -> u8 {
        let pos = (index % self.period() as u64) as usize;
        let frac_len = self.backing.len();
        if pos < frac_len {
            self.backing.get(pos)
        } else {
            self.lead[pos - frac_len]
        }
    }

    /// Append `run` digits starting at cycle position `pos`; `pos + run <= period`
    fn extend_run(&self, out: &mut Vec<u8>, mut pos: usize, mut run: usize) {
        let frac_len = self.backing.len();
        while run > 0 {
            if pos < frac_len {
                let n = run.min(frac_len - pos);
                self.backing.extend_into(out, pos, n);
                pos += n;
                run -= n;
            } else {
                let i = pos - frac_len;
                let n = run.min(self.lead.len() - i);
                out.extend_from_slice(&self.lead[i..i + n]);
                pos += n;
                run -= n;
            }
        }
    }

    /// Append `length` digits from `start` to `out`, wrapping around the cycle
    fn read_into(&self, start: u64, length: usize, out: &mut Vec<u8>) {
        let period = self.period();
        let target = out.len() + length;
        let mut pos = (start % period as u64) as usize;
        while out.len() < target {
            let run = (period - pos).min(target - out.len());
            self.extend_run(out, pos, run);
            pos = (pos + run) % period;
        }
    }

    fn digits_at(&self, start: u64, length: usize) -> Result<Arc<[u8]>> {
        if length == 0 {
            return Err(Error::InvalidRange { start, length });
        }

        let key = (start, length);
        if let Some(hit) = self.lock_cache().get(&key) {
            return Ok(hit);
        }

        tracing::trace!(constant = %self.constant, start, length, "Digit range cache miss");
        let mut out = Vec::with_capacity(length);
        self.read_into(start, length, &mut out);

        let digits: Arc<[u8]> = out.into();
        self.lock_cache().insert(key, Arc::clone(&digits));
        Ok(digits)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, RangeCache> {
        // A poisoned cache only ever holds complete entries.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read-only view over the digits of both constants.
///
/// Opened once and shared by reference; safe to use from many threads.
pub struct DigitSource {
    pi: ConstantDigits,
    e: ConstantDigits,
}

impl DigitSource {
    /// Open `pi_1m.txt` and `e_1m.txt` from a data directory
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_files(&DigitFiles::in_dir(data_dir), DEFAULT_CACHE_CAPACITY)
    }

    /// Open the data directory and cache size named by an engine config
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::open_files(&DigitFiles::in_dir(&config.data_dir), config.cache_capacity)
    }

    /// Open explicit digit files
    pub fn open_files(files: &DigitFiles, cache_capacity: usize) -> Result<Self> {
        Ok(Self {
            pi: ConstantDigits::open(Constant::Pi, &files.pi, cache_capacity)?,
            e: ConstantDigits::open(Constant::E, &files.e, cache_capacity)?,
        })
    }

    /// Build a source from in-memory texts (same validation as files)
    pub fn from_texts(pi: &[u8], e: &[u8]) -> Result<Self> {
        Self::from_texts_with_capacity(pi, e, DEFAULT_CACHE_CAPACITY)
    }

    pub fn from_texts_with_capacity(pi: &[u8], e: &[u8], cache_capacity: usize) -> Result<Self> {
        Ok(Self {
            pi: ConstantDigits::from_text(Constant::Pi, pi, cache_capacity)?,
            e: ConstantDigits::from_text(Constant::E, e, cache_capacity)?,
        })
    }

    fn constant(&self, constant: Constant) -> &ConstantDigits {
        match constant {
            Constant::Pi => &self.pi,
            Constant::E => &self.e,
        }
    }

    /// Read `length` digits of `constant` starting at fractional index `start`.
    ///
    /// Indices past the stored digits wrap around the cycle. Repeated identical
    /// requests are served from the cache as the same shared buffer.
    pub fn digits_at(&self, constant: Constant, start: u64, length: usize) -> Result<Arc<[u8]>> {
        self.constant(constant).digits_at(start, length)
    }

    /// Replace the contents of `out` with `length` digits, bypassing the cache.
    ///
    /// Bulk readers (stream synthesis) use this so one-off chunk reads do not
    /// crowd the cache.
    pub fn read_into(
        &self,
        constant: Constant,
        start: u64,
        length: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        if length == 0 {
            return Err(Error::InvalidRange { start, length });
        }
        out.clear();
        out.reserve(length);
        self.constant(constant).read_into(start, length, out);
        Ok(())
    }

    /// Single digit lookup, bypassing the cache
    pub fn digit(&self, constant: Constant, index: u64) -> u8 {
        self.constant(constant).digit(index)
    }

    /// Number of digits in one cycle of `constant`
    pub fn period(&self, constant: Constant) -> usize {
        self.constant(constant).period()
    }

    /// Number of ranges currently cached for `constant`
    pub fn cache_len(&self, constant: Constant) -> usize {
        self.constant(constant).lock_cache().entries.len()
    }
}

impl fmt::Debug for DigitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitSource")
            .field("pi_period", &self.pi.period())
            .field("e_period", &self.e.period())
            .finish()
    }
}

/// Locations of the two digit files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitFiles {
    pub pi: PathBuf,
    pub e: PathBuf,
}

impl DigitFiles {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            pi: dir.join(Constant::Pi.file_name()),
            e: dir.join(Constant::E.file_name()),
        }
    }

    pub fn path(&self, constant: Constant) -> &Path {
        match constant {
            Constant::Pi => &self.pi,
            Constant::E => &self.e,
        }
    }

    /// Install digit files.
    ///
    /// Copies from `from` when that directory holds the file, otherwise writes
    /// the known-correct prefix. Existing files are kept unless `force` is set.
    pub fn install(&self, from: Option<&Path>, force: bool) -> Result<()> {
        for constant in Constant::ALL {
            let target = self.path(constant);
            if target.exists() && !force {
                tracing::debug!(%constant, path = %target.display(), "Digit file present");
                continue;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let source = from
                .map(|dir| dir.join(constant.file_name()))
                .filter(|p| p.exists());
            match source {
                Some(source) => {
                    tracing::info!(
                        %constant,
                        from = %source.display(),
                        to = %target.display(),
                        "Copying digit file"
                    );
                    std::fs::copy(&source, target)?;
                }
                None => {
                    tracing::warn!(
                        %constant,
                        to = %target.display(),
                        period = constant.prefix_period(),
                        "No digit file to copy, writing the known-correct prefix only; \
                         offsets will cycle over this short period"
                    );
                    std::fs::write(target, constant.prefix())?;
                }
            }
        }
        Ok(())
    }

    /// Open both files and run the prefix check
    pub fn verify(&self) -> Result<()> {
        DigitSource::open_files(self, 0).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn prefix_source() -> DigitSource {
        DigitSource::from_texts(PI_PREFIX.as_bytes(), E_PREFIX.as_bytes()).unwrap()
    }

    fn write_temp(text: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_first_fractional_digits() {
        let source = prefix_source();
        let pi = source.digits_at(Constant::Pi, 0, 10).unwrap();
        assert_eq!(&pi[..], &[1, 4, 1, 5, 9, 2, 6, 5, 3, 5]);

        let e = source.digits_at(Constant::E, 0, 5).unwrap();
        assert_eq!(&e[..], &[7, 1, 8, 2, 8]);
    }

    #[test]
    fn test_period_counts_every_digit() {
        let source = prefix_source();
        // 100 fractional digits plus the leading integer digit
        assert_eq!(source.period(Constant::Pi), 101);
        assert_eq!(source.period(Constant::E), 101);
    }

    #[test]
    fn test_wraps_through_leading_digit() {
        let source = prefix_source();
        // ...0679 | 3 | 1415...
        let wrapped = source.digits_at(Constant::Pi, 98, 5).unwrap();
        assert_eq!(&wrapped[..], &[7, 9, 3, 1, 4]);

        // A start beyond the period lands on the same cycle position
        let far = source.digits_at(Constant::Pi, 101 * 7 + 2, 3).unwrap();
        let near = source.digits_at(Constant::Pi, 2, 3).unwrap();
        assert_eq!(far, near);
    }

    #[test]
    fn test_length_longer_than_period() {
        let source = prefix_source();
        let digits = source.digits_at(Constant::E, 0, 250).unwrap();
        assert_eq!(digits.len(), 250);
        assert_eq!(digits[0], digits[101]);
        assert_eq!(digits[100], 2); // the leading "2." of e
    }

    #[test]
    fn test_zero_length_is_invalid_range() {
        let source = prefix_source();
        let err = source.digits_at(Constant::Pi, 5, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { start: 5, length: 0 }));
    }

    #[test]
    fn test_cache_returns_shared_snapshot() {
        let source = prefix_source();
        let first = source.digits_at(Constant::Pi, 3, 20).unwrap();
        let second = source.digits_at(Constant::Pi, 3, 20).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.cache_len(Constant::Pi), 1);
        assert_eq!(source.cache_len(Constant::E), 0);
    }

    #[test]
    fn test_cache_is_bounded() {
        let (pi, e) = fixtures::texts(1_000, 1);
        let source = DigitSource::from_texts_with_capacity(&pi, &e, 4).unwrap();
        for start in 0..10 {
            source.digits_at(Constant::E, start, 8).unwrap();
        }
        assert!(source.cache_len(Constant::E) <= 4);

        // Uncached reads are still correct
        let digits = source.digits_at(Constant::E, 9, 8).unwrap();
        let expected: Vec<u8> = (9..17).map(|i| source.digit(Constant::E, i)).collect();
        assert_eq!(&digits[..], &expected[..]);
    }

    #[test]
    fn test_read_into_bypasses_cache() {
        let source = prefix_source();
        let mut buf = vec![9, 9, 9];
        source.read_into(Constant::Pi, 99, 4, &mut buf).unwrap();
        assert_eq!(buf, vec![9, 3, 1, 4]);
        assert_eq!(source.cache_len(Constant::Pi), 0);
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        // Short but correct texts are accepted
        DigitSource::from_texts(b"3.1415926535897932384626433832795", E_PREFIX.as_bytes()).unwrap();

        let err = DigitSource::from_texts(b"3.1415000000", E_PREFIX.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::SourceCorrupt {
                constant: Constant::Pi,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_swapped_constants() {
        let err = DigitSource::from_texts(E_PREFIX.as_bytes(), PI_PREFIX.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::SourceCorrupt { .. }));
    }

    #[test]
    fn test_rejects_missing_fraction() {
        let err = DigitSource::from_texts(b"3", E_PREFIX.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::SourceCorrupt { .. }));

        let err = DigitSource::from_texts(b"3.", E_PREFIX.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::SourceCorrupt { .. }));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = DigitSource::open(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::SourceUnavailable {
                constant: Constant::Pi,
                ..
            }
        ));
    }

    #[test]
    fn test_mapped_file_matches_in_memory() {
        let (pi, e) = fixtures::texts(5_000, 7);
        let pi_file = write_temp(&pi);
        let e_file = write_temp(&e);
        let files = DigitFiles {
            pi: pi_file.path().to_path_buf(),
            e: e_file.path().to_path_buf(),
        };

        let mapped = DigitSource::open_files(&files, DEFAULT_CACHE_CAPACITY).unwrap();
        let owned = DigitSource::from_texts(&pi, &e).unwrap();

        assert_eq!(mapped.period(Constant::Pi), owned.period(Constant::Pi));
        for constant in Constant::ALL {
            let a = mapped.digits_at(constant, 4_990, 40).unwrap();
            let b = owned.digits_at(constant, 4_990, 40).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_formatted_file_is_compacted() {
        let mut pi = Vec::new();
        for (i, b) in PI_PREFIX.bytes().enumerate() {
            pi.push(b);
            if i > 2 && i % 10 == 0 {
                pi.extend_from_slice(b"\r\n");
            }
        }
        let pi_file = write_temp(&pi);
        let e_file = write_temp(E_PREFIX.as_bytes());
        let files = DigitFiles {
            pi: pi_file.path().to_path_buf(),
            e: e_file.path().to_path_buf(),
        };

        let source = DigitSource::open_files(&files, 0).unwrap();
        assert_eq!(source.period(Constant::Pi), 101);
        let digits = source.digits_at(Constant::Pi, 0, 101).unwrap();
        assert_eq!(&digits[..10], &[1, 4, 1, 5, 9, 2, 6, 5, 3, 5]);
        assert_eq!(digits[100], 3);
    }

    #[test]
    fn test_install_writes_prefix_and_verifies() {
        let dir = TempDir::new().unwrap();
        let files = DigitFiles::in_dir(dir.path().join("data"));

        assert!(files.verify().is_err());
        files.install(None, false).unwrap();
        files.verify().unwrap();

        let written = std::fs::read_to_string(&files.e).unwrap();
        assert_eq!(written, E_PREFIX);

        let source = DigitSource::open_files(&files, 0).unwrap();
        for constant in Constant::ALL {
            assert_eq!(constant.prefix_period(), 101);
            assert_eq!(source.period(constant), constant.prefix_period());
        }
    }

    #[test]
    fn test_concurrent_cached_reads() {
        let (pi, e) = fixtures::texts(2_000, 5);
        let capacity = 16;
        let source = DigitSource::from_texts_with_capacity(&pi, &e, capacity).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..8u64 {
                let source = &source;
                scope.spawn(move || {
                    for round in 0..200u64 {
                        // Overlapping keys across workers, some past the period
                        let start = (round * 7 + worker) % 40 * 61;
                        let length = 1 + ((round + worker) % 5) as usize * 9;
                        for constant in Constant::ALL {
                            let digits = source.digits_at(constant, start, length).unwrap();
                            let expected: Vec<u8> = (start..start + length as u64)
                                .map(|i| source.digit(constant, i))
                                .collect();
                            assert_eq!(&digits[..], &expected[..]);
                        }
                    }
                });
            }
        });

        for constant in Constant::ALL {
            let cached = source.cache_len(constant);
            assert!(cached > 0 && cached <= capacity, "{constant}: {cached}");
        }
    }

    #[test]
    fn test_install_copies_and_respects_force() {
        let staging = TempDir::new().unwrap();
        let (pi, e) = fixtures::texts(300, 3);
        std::fs::write(staging.path().join("pi_1m.txt"), &pi).unwrap();
        std::fs::write(staging.path().join("e_1m.txt"), &e).unwrap();

        let target = TempDir::new().unwrap();
        let files = DigitFiles::in_dir(target.path());
        files.install(None, false).unwrap();

        // Existing files are kept without force
        files.install(Some(staging.path()), false).unwrap();
        assert_eq!(std::fs::read(&files.pi).unwrap(), PI_PREFIX.as_bytes());

        files.install(Some(staging.path()), true).unwrap();
        assert_eq!(std::fs::read(&files.pi).unwrap(), pi);
        files.verify().unwrap();
    }

    proptest! {
        #[test]
        fn prop_digit_continuity(start in 0u64..5_000, l1 in 1usize..400, l2 in 1usize..400) {
            let (pi, e) = fixtures::texts(700, 11);
            let source = DigitSource::from_texts(&pi, &e).unwrap();
            for constant in Constant::ALL {
                let head = source.digits_at(constant, start, l1).unwrap();
                let tail = source.digits_at(constant, start + l1 as u64, l2).unwrap();
                let whole = source.digits_at(constant, start, l1 + l2).unwrap();
                let joined: Vec<u8> = head.iter().chain(tail.iter()).copied().collect();
                prop_assert_eq!(&joined[..], &whole[..]);
            }
        }

        #[test]
        fn prop_range_agrees_with_single_digits(start in 0u64..2_000_000_000, len in 1usize..64) {
            let source = prefix_source();
            let range = source.digits_at(Constant::E, start, len).unwrap();
            for (i, d) in range.iter().enumerate() {
                prop_assert_eq!(*d, source.digit(Constant::E, start + i as u64));
            }
        }
    }
}
