/*! FX.25: a correlation-tag-delimited, Reed-Solomon-protected envelope
around an AX.25 frame.

Built on [`crate::correlate`] for the tag search and [`crate::rs`] for the
RS geometry table, the same two primitives [`crate::il2p`] combines for
its own sync word and payload blocks.

Framing: `[64-bit correlation tag][RS(255,k) block]`, where the RS block's
data bytes are a complete bit-stuffed HDLC frame — opening flag, FCS
appended to the AX.25 frame then bit-stuffed along with it, closing flag,
zero-padded out to `k_data_radio` bytes — exactly what [`crate::hdlc`]
would put on the air, just riding inside the RS-protected region instead
of a live channel. [`crate::hdlc::HdlcReceiver`] is reused unmodified to
pull the frame back out of the RS-corrected block.
*/

use log::{debug, trace, warn};

use crate::correlate::Correlator;
use crate::crc;
use crate::error::{Error, Result};
use crate::hdlc::{self, HdlcReceiver};
use crate::rs::{self, CtagGeometry};

const FLAG: u8 = 0x7e;

/// A decoded FX.25 frame.
#[derive(Debug, Clone)]
pub struct DecodedFx25 {
    /// The recovered AX.25 frame bytes (addresses through info; no FCS).
    pub data: Vec<u8>,
    /// Which correlation tag geometry this frame used.
    pub geometry: CtagGeometry,
    /// Byte symbols the RS decoder had to correct.
    pub corrected_symbols: usize,
}

#[derive(Debug, Clone)]
enum State {
    Searching,
    Collecting { geometry: CtagGeometry, bits: Vec<u8> },
}

/// Per-origin FX.25 receiver: bit-level correlation-tag search, then
/// byte-aligned RS block collection and decode.
#[derive(Debug, Clone)]
pub struct Fx25Receiver {
    correlators: Vec<(CtagGeometry, Correlator)>,
    state: State,
    pub(crate) decoded: u64,
    pub(crate) fec_failures: u64,
}

impl Fx25Receiver {
    /// Build a receiver watching every geometry in [`rs::CTAG_TABLE`].
    #[must_use]
    pub fn new() -> Self {
        let correlators = rs::CTAG_TABLE
            .iter()
            .map(|&g| (g, Correlator::new(tag_bits(g.tag64), 0)))
            .collect();
        Self {
            correlators,
            state: State::Searching,
            decoded: 0,
            fec_failures: 0,
        }
    }

    /// Feed one raw channel bit (already NRZI-decoded; FX.25 does not
    /// scramble).
    pub fn rec_bit(&mut self, bit: u8) -> Result<Option<DecodedFx25>> {
        match &mut self.state {
            State::Searching => {
                let mut matched = None;
                for (geometry, corr) in &mut self.correlators {
                    if corr.push(bit).is_some() {
                        matched = Some(*geometry);
                    }
                }
                if let Some(geometry) = matched {
                    trace!("fx25: correlation tag {:#x} matched", geometry.tag64);
                    for (_, corr) in &mut self.correlators {
                        corr.reset();
                    }
                    self.state = State::Collecting { geometry, bits: Vec::new() };
                }
                Ok(None)
            }
            State::Collecting { geometry, bits } => {
                bits.push(bit & 1);
                let total_bits = (geometry.k_data_radio + geometry.nroots) * 8;
                if bits.len() < total_bits {
                    return Ok(None);
                }
                let geometry = *geometry;
                let raw_bits = std::mem::take(bits);
                self.state = State::Searching;
                let bytes = bits_to_bytes(&raw_bits);
                let (corrected, corrected_symbols) =
                    match rs::decode_block_counting(&bytes, geometry.k_data_radio, geometry.nroots) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("fx25: RS block uncorrectable: {e}");
                            self.fec_failures += 1;
                            return Ok(None);
                        }
                    };
                let Some(data) = unstuff_hdlc_frame(&corrected) else {
                    warn!("fx25: RS-corrected block yielded no valid bit-stuffed HDLC frame");
                    return Ok(None);
                };
                self.decoded += 1;
                debug!(
                    "fx25: decoded {} byte frame via CTAG id {:#x}, {corrected_symbols} symbols corrected",
                    data.len(),
                    geometry.id
                );
                Ok(Some(DecodedFx25 { data, geometry, corrected_symbols }))
            }
        }
    }
}

impl Default for Fx25Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Fx25Receiver {
    fn drop(&mut self) {
        debug!("fx25: decoded {}, FEC failures {}", self.decoded, self.fec_failures);
    }
}

/// FX.25 transmitter: pick a geometry, build the RS-protected block,
/// prepend the correlation tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fx25Transmitter;

impl Fx25Transmitter {
    /// Build a new transmitter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encode `data` (an AX.25 frame, addresses through info, no FCS) using
    /// the smallest geometry in weight class `nroots` that fits, or a
    /// caller-forced `ctag_id` override.
    pub fn encode_frame(&self, data: &[u8], nroots: usize, ctag_id: Option<u8>) -> Result<Vec<u8>> {
        let frame_bytes = stuffed_hdlc_frame_bytes(data);
        let geometry = match ctag_id {
            Some(id) => rs::geometry_by_id(id)
                .ok_or_else(|| Error::FrameSizeOut(format!("unknown CTAG id {id:#x}")))?,
            None => rs::smallest_fit(frame_bytes.len(), nroots)
                .ok_or_else(|| Error::FrameSizeOut(format!("no geometry fits {} byte frame", data.len())))?,
        };
        if frame_bytes.len() > geometry.k_data_radio {
            return Err(Error::FrameSizeOut(format!(
                "{} byte bit-stuffed frame doesn't fit CTAG {:#x} (k={})",
                frame_bytes.len(),
                geometry.id,
                geometry.k_data_radio
            )));
        }

        let block = rs::encode_block(&frame_bytes, geometry.k_data_radio, geometry.nroots)?;
        let mut bits = tag_bits(geometry.tag64);
        bits.extend_from_slice(&bytes_to_bits(&block));
        Ok(bits)
    }
}

fn byte_to_bits_lsb(byte: u8) -> [u8; 8] {
    std::array::from_fn(|i| (byte >> i) & 1)
}

/// Append the FCS, bit-stuff, and wrap with opening/closing flags — exactly
/// what goes out over the air for a plain HDLC frame — then pack back into
/// bytes (zero-padded to a byte boundary) for the RS encoder.
fn stuffed_hdlc_frame_bytes(data: &[u8]) -> Vec<u8> {
    let fcs = crc::fcs(data);
    let mut payload_bits = Vec::with_capacity((data.len() + 2) * 8);
    for &byte in data.iter().chain(fcs.to_le_bytes().iter()) {
        payload_bits.extend_from_slice(&byte_to_bits_lsb(byte));
    }
    let stuffed = hdlc::bit_stuff(&payload_bits);
    let flag_bits = byte_to_bits_lsb(FLAG);

    let mut bits = Vec::with_capacity(stuffed.len() + 16);
    bits.extend_from_slice(&flag_bits);
    bits.extend_from_slice(&stuffed);
    bits.extend_from_slice(&flag_bits);
    while !bits.len().is_multiple_of(8) {
        bits.push(0);
    }
    bits.chunks(8)
        .map(|chunk| chunk.iter().enumerate().fold(0u8, |acc, (i, &b)| acc | (b << i)))
        .collect()
}

/// Recover the AX.25 frame (FCS verified and stripped) from an RS-corrected
/// block carrying a bit-stuffed, flag-delimited HDLC frame padded with
/// trailing zero bytes. Reuses [`HdlcReceiver`] bit-by-bit so the framing,
/// destuffing, and FCS check stay in exactly one place in this crate.
fn unstuff_hdlc_frame(block: &[u8]) -> Option<Vec<u8>> {
    let mut rx = HdlcReceiver::new(false, false, 0, block.len());
    for &byte in block {
        for bit in byte_to_bits_lsb(byte) {
            if let Ok(Some(frame)) = rx.rec_bit(bit) {
                return Some(frame.data);
            }
        }
    }
    None
}

fn tag_bits(tag64: u64) -> Vec<u8> {
    (0..64).rev().map(|i| ((tag64 >> i) & 1) as u8).collect()
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        for i in (0..8).rev() {
            out.push((b >> i) & 1);
        }
    }
    out
}

fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().enumerate().fold(0u8, |acc, (i, &b)| acc | (b << (7 - i))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmit_then_receive_round_trip() {
        let data = b"\x82\xa0\xa4\xa6\x40\x40\x60\x9c\x6e\xa2\x9c\xb0\x61\x03\xf0Hello";
        let tx = Fx25Transmitter::new();
        let bits = tx.encode_frame(data, 16, None).unwrap();
        let mut rx = Fx25Receiver::new();
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().data, data);
    }

    #[test]
    fn corrects_burst_of_errors_within_budget() {
        let data = b"CQ CQ CQ DE WB2OSZ";
        let tx = Fx25Transmitter::new();
        let mut bits = tx.encode_frame(data, 32, Some(0x09)).unwrap();
        // Corrupt a handful of bits deep in the RS-protected region.
        let tag_len = 64;
        for i in 0..32 {
            bits[tag_len + 100 + i] ^= 1;
        }
        let mut rx = Fx25Receiver::new();
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().data, data);
    }

    #[test]
    fn forced_ctag_selects_requested_geometry() {
        let data = b"short";
        let tx = Fx25Transmitter::new();
        let bits = tx.encode_frame(data, 16, Some(0x04)).unwrap();
        let mut rx = Fx25Receiver::new();
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        let decoded = out.unwrap();
        assert_eq!(decoded.geometry.id, 0x04);
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn scenario_6_eight_bit_errors_in_distinct_bytes_recovered() {
        let frame = crate::frame::Frame::from_text("TEST>WB2OSZ:Foo?Bar?", 1).unwrap();
        let data = frame.pack();
        let tx = Fx25Transmitter::new();
        let mut bits = tx.encode_frame(&data, 16, None).unwrap();
        // Flip one bit in each of 8 distinct bytes of the RS-protected
        // region, well clear of the 64-bit tag.
        let payload_start = 64;
        for i in 0..8 {
            bits[payload_start + i * 8] ^= 1;
        }
        let mut rx = Fx25Receiver::new();
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        let decoded = out.unwrap();
        assert_eq!(decoded.data, data);
        assert_eq!(decoded.corrected_symbols, 8);
    }
}
