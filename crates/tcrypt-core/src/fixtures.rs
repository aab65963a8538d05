//! Synthetic digit texts for tests and benchmarks
//!
//! Each text is the known-correct prefix of its constant followed by a
//! deterministic pseudo-random tail, so it passes the open-time prefix check
//! while still giving the engine a long, varied digit cycle to work with.

use crate::digits::{Constant, DigitSource};
use crate::error::Result;

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Digit text for one constant with `tail_len` extra digits
pub fn text(constant: Constant, tail_len: usize, salt: u64) -> Vec<u8> {
    let prefix = constant.prefix().as_bytes();
    let mut out = Vec::with_capacity(prefix.len() + tail_len);
    out.extend_from_slice(prefix);

    let mut state = salt ^ (constant as u64 + 1).wrapping_mul(0x5851_f42d_4c95_7f2d);
    out.extend((0..tail_len).map(|_| b'0' + (splitmix64(&mut state) % 10) as u8));
    out
}

/// `(pi, e)` texts with `tail_len` extra digits each
pub fn texts(tail_len: usize, salt: u64) -> (Vec<u8>, Vec<u8>) {
    (
        text(Constant::Pi, tail_len, salt),
        text(Constant::E, tail_len, salt),
    )
}

/// In-memory source built from [`texts`]
pub fn source(tail_len: usize) -> Result<DigitSource> {
    let (pi, e) = texts(tail_len, 0);
    DigitSource::from_texts(&pi, &e)
}
