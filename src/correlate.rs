/*! Sliding-window bit-pattern correlator, used both for FX.25's
correlation-tag search and for IL2P's sync-word search.

Re-scans the whole window every bit rather than maintaining an
incremental Hamming distance; kept simple since the window is always
small (64 bits for a CTAG, 24 for IL2P's sync word) and a
Boyer-Moore-style skip table wouldn't pay for itself at this scale.
*/

use std::collections::VecDeque;

/// Slides a fixed-length bit pattern (`code`) over an incoming bit stream,
/// reporting a match whenever the Hamming distance to the window falls to
/// `allowed_diffs` or below.
#[derive(Debug, Clone)]
pub struct Correlator {
    code: Vec<u8>,
    window: VecDeque<u8>,
    allowed_diffs: usize,
}

impl Correlator {
    /// `code` is the target bit pattern (one element per bit, 0 or 1).
    #[must_use]
    pub fn new(code: Vec<u8>, allowed_diffs: usize) -> Self {
        let len = code.len();
        Self {
            code,
            window: VecDeque::with_capacity(len),
            allowed_diffs,
        }
    }

    /// Feed one bit. Returns `Some(diffs)` (the Hamming distance, `<=
    /// allowed_diffs`) once the window is full and matches; `None`
    /// otherwise.
    pub fn push(&mut self, bit: u8) -> Option<usize> {
        self.window.push_back(bit & 1);
        if self.window.len() > self.code.len() {
            self.window.pop_front();
        }
        if self.window.len() < self.code.len() {
            return None;
        }
        let diffs = self
            .window
            .iter()
            .zip(&self.code)
            .filter(|(a, b)| *a != b)
            .count();
        (diffs <= self.allowed_diffs).then_some(diffs)
    }

    /// Drop any partially-accumulated window (e.g. after a match is consumed
    /// and the caller wants to avoid re-triggering on overlapping bits).
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Pattern length in bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// `true` if the pattern is zero-length (degenerate, always matches).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Unpack a byte slice into MSB-first bits, for building a `Correlator`
/// target pattern out of a sync word / correlation tag given as bytes.
#[must_use]
pub fn bytes_to_bits_msb(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        for i in (0..8).rev() {
            out.push((b >> i) & 1);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_fires_with_zero_diffs() {
        let code = vec![1, 0, 1, 1, 0];
        let mut c = Correlator::new(code.clone(), 0);
        let mut last = None;
        for &b in &code {
            last = c.push(b);
        }
        assert_eq!(last, Some(0));
    }

    #[test]
    fn near_match_within_tolerance() {
        let code = vec![1, 0, 1, 1, 0, 0, 1, 0];
        let mut noisy = code.clone();
        noisy[2] ^= 1;
        let mut c = Correlator::new(code, 1);
        let mut last = None;
        for &b in &noisy {
            last = c.push(b);
        }
        assert_eq!(last, Some(1));
    }

    #[test]
    fn over_tolerance_no_match() {
        let code = vec![1, 0, 1, 1, 0, 0, 1, 0];
        let mut noisy = code.clone();
        noisy[2] ^= 1;
        noisy[5] ^= 1;
        let mut c = Correlator::new(code, 1);
        let mut last = None;
        for &b in &noisy {
            last = c.push(b);
        }
        assert_eq!(last, None);
    }

    #[test]
    fn bytes_to_bits_msb_order() {
        assert_eq!(bytes_to_bits_msb(&[0b1010_0001]), vec![1, 0, 1, 0, 0, 0, 0, 1]);
    }
}
