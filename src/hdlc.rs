/*! Bit-level HDLC receiver and transmitter.

NRZI decode, bit destuffing, flag detection, and a single-bit "fix bits"
retry on FCS mismatch, generalized into a per-origin receiver a `Core` can
hold many of, plus the transmit direction. Also carries the EAS
byte-oriented variant: no HDLC framing at all, just `"ZCZC"`..`"NNNN"`
ASCII capture.
*/

use log::{debug, trace, warn};

use crate::crc;
use crate::error::Result;

const FLAG: u8 = 0x7e;
const MAX_FIXABLE_BYTES: usize = 64;

/// NRZI-S decoder: a signal *toggle* decodes to 0, a *held* level decodes
/// to 1 (the convention AX.25 Bell 202 and G3RUH both use).
#[derive(Debug, Clone, Copy, Default)]
pub struct NrziDecode {
    last: u8,
}

impl NrziDecode {
    /// Decode one channel symbol bit into one NRZI-decoded bit.
    pub fn process_one(&mut self, a: u8) -> u8 {
        let tmp = self.last;
        self.last = a & 1;
        1 ^ (a & 1) ^ tmp
    }
}

/// NRZI-S encoder, the inverse of [`NrziDecode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NrziEncode {
    last: u8,
}

impl NrziEncode {
    /// Encode one destuffed bit into one channel symbol bit.
    pub fn process_one(&mut self, bit: u8) -> u8 {
        let out = if bit & 1 == 0 { 1 ^ self.last } else { self.last };
        self.last = out;
        out
    }
}

/// Try to account for a single bit error, either in the data or in the
/// received CRC itself. Returns `(corrected_data, correct_crc, was_fixed)`.
fn find_right_crc(data: &[u8], got: u16, fix_bits: bool) -> (Option<Vec<u8>>, u16, bool) {
    let computed = crc::fcs(data);
    if got == computed {
        return (None, computed, false);
    }
    if !fix_bits || data.len() > MAX_FIXABLE_BYTES {
        return (None, computed, false);
    }
    let mut copy = data.to_vec();
    for byte in 0..data.len() {
        for bit in 0..8 {
            let mask = 1 << bit;
            copy[byte] ^= mask;
            if crc::fcs(&copy) == got {
                debug!("hdlc: fixed single-bit error at byte {byte} bit {bit}");
                return (Some(copy), got, true);
            }
            copy[byte] ^= mask;
        }
    }
    // A single flipped bit in the transmitted CRC itself: the data was
    // fine, our received CRC wasn't.
    for crcbit in 0..16 {
        let candidate = got ^ (1 << crcbit);
        if candidate == computed {
            debug!("hdlc: fixed single-bit error in received CRC");
            return (None, computed, true);
        }
    }
    (None, computed, false)
}

fn bits2byte(bits: &[u8]) -> u8 {
    debug_assert_eq!(bits.len(), 8);
    bits.iter().enumerate().fold(0u8, |acc, (i, &b)| acc | (b << i))
}

#[derive(Debug, Clone)]
enum State {
    Unsynced(u8),
    Synced { ones: u8, bits: Vec<u8> },
    FinalCheck(Vec<u8>),
}

impl Default for State {
    fn default() -> Self {
        State::Unsynced(0xff)
    }
}

/// A decoded HDLC frame, with diagnostics about how it got decoded.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Payload octets (addresses through info, FCS stripped).
    pub data: Vec<u8>,
    /// `true` if a fix-bits retry was needed to make the FCS match.
    pub bitfixed: bool,
}

/// Per-origin HDLC bit receiver: NRZI decode (optional; some front ends
/// hand over already-decoded bits), descramble (optional; plain AFSK links
/// don't scramble), bit-destuffing, flag detection, fix-bits retry.
#[derive(Debug, Clone)]
pub struct HdlcReceiver {
    nrzi: Option<NrziDecode>,
    descrambler: Option<crate::descramble::Lfsr>,
    state: State,
    min_frame_len: usize,
    max_frame_len: usize,
    fix_bits: bool,
    keep_checksum: bool,
    pub(crate) decoded: u64,
    pub(crate) crc_error: u64,
    pub(crate) bitfixed: u64,
}

impl HdlcReceiver {
    /// Build a receiver. `nrzi`/`scrambled` select the optional front-end
    /// stages; `min_frame_len`/`max_frame_len` bound the destuffed payload
    /// (including its 2-byte FCS) in octets.
    #[must_use]
    pub fn new(nrzi: bool, scrambled: bool, min_frame_len: usize, max_frame_len: usize) -> Self {
        Self {
            nrzi: nrzi.then(NrziDecode::default),
            descrambler: scrambled.then(crate::descramble::Lfsr::g3ruh),
            state: State::default(),
            min_frame_len,
            max_frame_len,
            fix_bits: false,
            keep_checksum: false,
            decoded: 0,
            crc_error: 0,
            bitfixed: 0,
        }
    }

    /// Enable fix-bits single-bit-error retry on FCS mismatch.
    pub fn set_fix_bits(&mut self, v: bool) {
        self.fix_bits = v;
    }

    /// Keep the 2-byte FCS on the returned payload instead of stripping and
    /// verifying it (diagnostic use only).
    pub fn set_keep_checksum(&mut self, v: bool) {
        self.keep_checksum = v;
    }

    /// Descrambler register state, for a `RawBitBuffer` snapshot.
    #[must_use]
    pub fn descrambler_state(&self) -> u64 {
        self.descrambler.as_ref().map_or(0, crate::descramble::Lfsr::state)
    }

    /// Feed one raw channel bit through the front end and the HDLC state
    /// machine. Returns a decoded frame whenever a closing flag completes
    /// one.
    pub fn rec_bit(&mut self, raw_bit: u8) -> Result<Option<DecodedFrame>> {
        let mut bit = raw_bit & 1;
        if let Some(n) = &mut self.nrzi {
            bit = n.process_one(bit);
        }
        if let Some(d) = &mut self.descrambler {
            bit = d.next(bit);
        }
        self.update_state(bit)
    }

    fn update_state(&mut self, bit: u8) -> Result<Option<DecodedFrame>> {
        let old = std::mem::replace(&mut self.state, State::Unsynced(0xff));
        let (new_state, out) = match old {
            State::Unsynced(v) => {
                let n = (v >> 1) | (bit << 7);
                if n == FLAG {
                    trace!("hdlc: flag found, synced");
                    (State::Synced { ones: 0, bits: Vec::with_capacity(self.max_frame_len * 8) }, None)
                } else {
                    (State::Unsynced(n), None)
                }
            }
            State::Synced { ones, mut bits } => {
                if bits.len() > self.max_frame_len * 8 {
                    warn!("hdlc: frame exceeded max length, resyncing");
                    (State::Unsynced(0xff), None)
                } else if bit > 0 {
                    bits.push(1);
                    if ones == 5 {
                        (State::FinalCheck(bits), None)
                    } else {
                        (State::Synced { ones: ones + 1, bits }, None)
                    }
                } else if ones == 5 {
                    trace!("hdlc: discarding stuffed bit");
                    (State::Synced { ones: 0, bits }, None)
                } else {
                    bits.push(0);
                    (State::Synced { ones: 0, bits }, None)
                }
            }
            State::FinalCheck(mut bits) => {
                if bit == 1 {
                    // 7 ones in a row: invalid, abort back to hunting.
                    (State::Unsynced(0xff), None)
                } else if bits.len() < 7 {
                    (State::Unsynced(0xff), None)
                } else {
                    bits.truncate(bits.len() - 7);
                    let out = self.emit(&bits);
                    (State::Synced { ones: 0, bits: Vec::with_capacity(self.max_frame_len * 8) }, out)
                }
            }
        };
        self.state = new_state;
        Ok(out)
    }

    fn emit(&mut self, bits: &[u8]) -> Option<DecodedFrame> {
        if !bits.len().is_multiple_of(8) {
            trace!("hdlc: packet length {} not a multiple of 8", bits.len());
            return None;
        }
        let nbytes = bits.len() / 8;
        if nbytes < self.min_frame_len {
            trace!("hdlc: packet too short ({nbytes} < {})", self.min_frame_len);
            return None;
        }
        let bytes: Vec<u8> = (0..bits.len()).step_by(8).map(|i| bits2byte(&bits[i..i + 8])).collect();
        if self.keep_checksum {
            self.decoded += 1;
            return Some(DecodedFrame { data: bytes, bitfixed: false });
        }
        if bytes.len() < 2 {
            return None;
        }
        let data = &bytes[..bytes.len() - 2];
        let got_crc = u16::from_le_bytes([bytes[bytes.len() - 2], bytes[bytes.len() - 1]]);
        let (newdata, crc, fixed) = find_right_crc(data, got_crc, self.fix_bits);
        if fixed {
            self.bitfixed += 1;
        }
        let data = newdata.as_deref().unwrap_or(data);
        if crc != got_crc {
            self.crc_error += 1;
            debug!("hdlc: CRC mismatch, want {crc:04x} got {got_crc:04x}");
            return None;
        }
        self.decoded += 1;
        Some(DecodedFrame { data: data.to_vec(), bitfixed: fixed })
    }
}

impl Drop for HdlcReceiver {
    fn drop(&mut self) {
        debug!(
            "hdlc: decoded {} (incl {} bitfixes), CRC error {}",
            self.decoded, self.bitfixed, self.crc_error
        );
    }
}

/// Bit-stuff a destuffed bit sequence: insert a 0 after every run of five
/// consecutive 1s.
#[must_use]
pub fn bit_stuff(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len() + bits.len() / 5 + 1);
    let mut ones = 0u8;
    for &b in bits {
        out.push(b & 1);
        if b & 1 == 1 {
            ones += 1;
            if ones == 5 {
                out.push(0);
                ones = 0;
            }
        } else {
            ones = 0;
        }
    }
    out
}

fn byte_to_bits_lsb(byte: u8) -> [u8; 8] {
    std::array::from_fn(|i| (byte >> i) & 1)
}

/// Transmit-side HDLC encoder: frame octets -> stuffed, flag-delimited,
/// NRZI-encoded channel bits.
#[derive(Debug, Clone)]
pub struct HdlcTransmitter {
    scrambler: Option<crate::descramble::Lfsr>,
    nrzi: NrziEncode,
}

impl HdlcTransmitter {
    /// Build a transmitter; `scrambled` matches the corresponding
    /// [`HdlcReceiver::new`] setting.
    #[must_use]
    pub fn new(scrambled: bool) -> Self {
        Self {
            scrambler: scrambled.then(crate::descramble::Lfsr::g3ruh),
            nrzi: NrziEncode::default(),
        }
    }

    /// Encode `data` (addresses through info; FCS is appended here) into
    /// channel bits, with opening and closing flags.
    #[must_use]
    pub fn encode_frame(&mut self, data: &[u8]) -> Vec<u8> {
        let fcs = crc::fcs(data);
        let mut payload_bits = Vec::with_capacity((data.len() + 2) * 8);
        for &byte in data.iter().chain(fcs.to_le_bytes().iter()) {
            payload_bits.extend_from_slice(&byte_to_bits_lsb(byte));
        }
        let stuffed = bit_stuff(&payload_bits);
        let flag_bits = byte_to_bits_lsb(FLAG);

        let mut bits = Vec::with_capacity(stuffed.len() + 16);
        bits.extend_from_slice(&flag_bits);
        bits.extend_from_slice(&stuffed);
        bits.extend_from_slice(&flag_bits);

        bits.iter()
            .map(|&b| {
                let mut bit = b;
                if let Some(s) = &mut self.scrambler {
                    bit = s.next(bit);
                }
                self.nrzi.process_one(bit)
            })
            .collect()
    }
}

const EAS_MAX_MESSAGE: usize = 268;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EasState {
    Searching,
    Capturing,
}

/// EAS byte-oriented variant receiver: not HDLC-framed. Looks for literal
/// `"ZCZC"`, then free-runs byte-at-a-time until `"NNNN"`, a disallowed
/// byte, or the length bailout.
#[derive(Debug, Clone)]
pub struct EasReceiver {
    state: EasState,
    buf: Vec<u8>,
}

impl Default for EasReceiver {
    fn default() -> Self {
        Self {
            state: EasState::Searching,
            buf: Vec::new(),
        }
    }
}

impl EasReceiver {
    /// Build a fresh EAS receiver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte-aligned symbol. Returns a completed message (the bytes
    /// from `"ZCZC"` through just before the terminating `"NNNN"`) once one
    /// closes out.
    pub fn rec_byte(&mut self, byte: u8) -> Option<Vec<u8>> {
        match self.state {
            EasState::Searching => {
                self.buf.push(byte);
                if self.buf.len() > 4 {
                    self.buf.remove(0);
                }
                if self.buf == b"ZCZC" {
                    self.state = EasState::Capturing;
                }
                None
            }
            EasState::Capturing => {
                let printable = (0x20..=0x7e).contains(&byte) || byte == 0x0d || byte == 0x0a;
                if !printable {
                    warn!("eas: non-printable byte mid-message, aborting capture");
                    self.buf.clear();
                    self.state = EasState::Searching;
                    return None;
                }
                self.buf.push(byte);
                if self.buf.ends_with(b"NNNN") {
                    let msg = self.buf[..self.buf.len() - 4].to_vec();
                    self.buf.clear();
                    self.state = EasState::Searching;
                    return Some(msg);
                }
                if self.buf.len() > EAS_MAX_MESSAGE {
                    warn!("eas: message exceeded max length without NNNN, aborting");
                    self.buf.clear();
                    self.state = EasState::Searching;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str2bits(s: &str) -> Vec<u8> {
        s.chars()
            .map(|ch| match ch {
                '1' => 1,
                '0' => 0,
                _ => panic!("invalid bitstring: {s}"),
            })
            .collect()
    }

    #[test]
    fn find_simple_frame() {
        let bits = "01111110010101011110000001111110";
        let mut r = HdlcReceiver::new(false, false, 1, 10);
        r.set_keep_checksum(true);
        let mut out = None;
        for b in str2bits(bits) {
            if let Some(f) = r.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().data, vec![0xaa, 0x7]);
    }

    #[test]
    fn bitstuffed() {
        let bits = "01111110111110111110111110101111110";
        let mut r = HdlcReceiver::new(false, false, 1, 10);
        r.set_keep_checksum(true);
        let mut out = None;
        for b in str2bits(bits) {
            if let Some(f) = r.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().data, vec![0xff, 0xff]);
    }

    #[test]
    fn too_short_is_discarded() {
        let bits = "01111110111110111110111110101111110";
        let mut r = HdlcReceiver::new(false, false, 3, 10);
        r.set_keep_checksum(true);
        let mut out = None;
        for b in str2bits(bits) {
            if let Some(f) = r.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert!(out.is_none());
    }

    #[test]
    fn checks_crc() {
        let bits = "0111111010101010000010101010111101111110";
        let mut r = HdlcReceiver::new(false, false, 1, 10);
        let mut out = None;
        for b in str2bits(bits) {
            if let Some(f) = r.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().data, vec![0x55]);
    }

    #[test]
    fn transmit_then_receive_round_trip() {
        let data = b"\x82\xa0\xa4\xa6\x40\x40\x60\x9c\x6e\xa2\x9c\xb0\x61\x03\xf0Hello";
        let mut tx = HdlcTransmitter::new(false);
        let bits = tx.encode_frame(data);
        let mut rx = HdlcReceiver::new(true, false, 1, 1024);
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().data, data);
    }

    #[test]
    fn fix_bits_recovers_single_flip() {
        let data = b"\x82\xa0\xa4\xa6\x40\x40\x60\x9c\x6e\xa2\x9c\xb0\x61\x03\xf0Hello";
        let mut tx = HdlcTransmitter::new(false);
        let bits = tx.encode_frame(data);
        // Flip one destuffed-equivalent bit deep in the payload region
        // (well clear of flags) by corrupting the channel bitstream.
        let mut corrupted = bits.clone();
        let idx = corrupted.len() / 2;
        corrupted[idx] ^= 1;
        let mut rx = HdlcReceiver::new(true, false, 1, 1024);
        rx.set_fix_bits(true);
        let mut out = None;
        for b in corrupted {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        // With fix_bits on, a single flip should either self-correct or at
        // least not panic; accept either a clean recovery or no frame.
        if let Some(f) = out {
            assert!(f.bitfixed || f.data == data);
        }
    }

    #[test]
    fn eas_captures_zczc_to_nnnn() {
        let mut r = EasReceiver::new();
        let msg = b"ZCZC-ORG-EAS-001000+0015-1001700-NOCALL  -NNNN";
        let mut out = None;
        for &b in msg {
            if let Some(m) = r.rec_byte(b) {
                out = Some(m);
            }
        }
        assert_eq!(out.unwrap(), b"-ORG-EAS-001000+0015-1001700-NOCALL  -".to_vec());
    }

    #[test]
    fn eas_aborts_on_garbage_byte() {
        let mut r = EasReceiver::new();
        for &b in b"ZCZC-ORG" {
            r.rec_byte(b);
        }
        assert!(r.rec_byte(0x01).is_none());
        // After abort, searching restarts cleanly.
        let mut out = None;
        for &b in b"ZCZC-X-NNNN" {
            if let Some(m) = r.rec_byte(b) {
                out = Some(m);
            }
        }
        assert_eq!(out.unwrap(), b"-X-".to_vec());
    }
}
