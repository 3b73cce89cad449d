/*! Reed-Solomon GF(256) adapter, wrapping the `reed-solomon` crate and
giving FX.25 and IL2P a shared place to keep their block geometry tables.
*/

use reed_solomon::{Decoder, Encoder};

use crate::error::{Error, Result};

/// One FX.25 correlation-tag geometry: how many data bytes a block this tag
/// describes carries, and how many RS parity bytes protect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtagGeometry {
    /// Internal small integer id (not the 64-bit on-air tag).
    pub id: u8,
    /// Data bytes per block (`k` in RS(255,k) terms).
    pub k_data_radio: usize,
    /// Parity symbols (`255 - k`).
    pub nroots: usize,
    /// The 64-bit on-air correlation tag value this geometry corresponds to.
    pub tag64: u64,
}

/// AX.25-relevant subset of the FX.25 correlation tags.
pub const CTAG_TABLE: &[CtagGeometry] = &[
    CtagGeometry { id: 0x01, k_data_radio: 239, nroots: 16, tag64: 0xB74D_B7DF_8A53_2F3E },
    CtagGeometry { id: 0x02, k_data_radio: 128, nroots: 16, tag64: 0x26FF_60A6_00CC_8FDE },
    CtagGeometry { id: 0x03, k_data_radio: 64, nroots: 16, tag64: 0xC7DC_0508_4871_5867 },
    CtagGeometry { id: 0x04, k_data_radio: 32, nroots: 16, tag64: 0x8F25_190F_1301_A012 },
    CtagGeometry { id: 0x06, k_data_radio: 239, nroots: 32, tag64: 0x3ADB_0C13_DEAD_4AE2 },
    CtagGeometry { id: 0x07, k_data_radio: 128, nroots: 32, tag64: 0x5988_4CDE_9FC9_7C48 },
    CtagGeometry { id: 0x08, k_data_radio: 64, nroots: 32, tag64: 0xF657_1402_D0B8_99F4 },
    CtagGeometry { id: 0x09, k_data_radio: 32, nroots: 32, tag64: 0x5B42_8AB7_2DA7_9E50 },
];

/// Look up a geometry by internal id.
#[must_use]
pub fn geometry_by_id(id: u8) -> Option<CtagGeometry> {
    CTAG_TABLE.iter().copied().find(|g| g.id == id)
}

/// Look up a geometry by 64-bit on-air tag.
#[must_use]
pub fn geometry_by_tag64(tag64: u64) -> Option<CtagGeometry> {
    CTAG_TABLE.iter().copied().find(|g| g.tag64 == tag64)
}

/// Pick the smallest geometry whose `k_data_radio` covers `data_len`, within
/// a given FEC weight class (`nroots`). Used by a transmitter choosing a
/// CTAG for a frame of known size.
#[must_use]
pub fn smallest_fit(data_len: usize, nroots: usize) -> Option<CtagGeometry> {
    CTAG_TABLE
        .iter()
        .copied()
        .filter(|g| g.nroots == nroots && g.k_data_radio >= data_len)
        .min_by_key(|g| g.k_data_radio)
}

/// RS-encode `data` (at most `255 - nroots` bytes) appending `nroots` parity
/// bytes, zero-padding short data up to the geometry's `k_data_radio` before
/// encoding (the padding is implicit and not retransmitted — the decoder
/// knows to re-pad identically from the frame length it already knows).
pub fn encode_block(data: &[u8], k_data_radio: usize, nroots: usize) -> Result<Vec<u8>> {
    if data.len() > k_data_radio {
        return Err(Error::FrameSizeOut(format!(
            "RS block data {} bytes exceeds k={k_data_radio}",
            data.len()
        )));
    }
    let mut padded = data.to_vec();
    padded.resize(k_data_radio, 0);
    let enc = Encoder::new(nroots);
    let buf = enc.encode(&padded);
    let mut out = Vec::with_capacity(k_data_radio + nroots);
    out.extend_from_slice(&padded);
    out.extend_from_slice(buf.ecc());
    Ok(out)
}

/// RS-decode a `k_data_radio + nroots` byte block, correcting up to
/// `nroots / 2` symbol errors. Returns the corrected data bytes (without
/// parity), still zero-padded to `k_data_radio` — callers trim to the
/// frame's known actual length.
pub fn decode_block(block: &[u8], k_data_radio: usize, nroots: usize) -> Result<Vec<u8>> {
    Ok(decode_block_counting(block, k_data_radio, nroots)?.0)
}

/// As [`decode_block`], but also returns the number of byte symbols that
/// differed between the received block and the corrected one — a receiver's
/// best available proxy for "how many retries did this FEC pass cost",
/// since the `reed-solomon` crate doesn't otherwise report a correction
/// count.
pub fn decode_block_counting(block: &[u8], k_data_radio: usize, nroots: usize) -> Result<(Vec<u8>, usize)> {
    if block.len() != k_data_radio + nroots {
        return Err(Error::FrameSizeOut(format!(
            "RS block {} bytes, expected {}",
            block.len(),
            k_data_radio + nroots
        )));
    }
    let dec = Decoder::new(nroots);
    let mut buf = [0u8; 255];
    buf[..block.len()].copy_from_slice(block);
    let corrected = dec
        .correct(&mut buf[..block.len()], None)
        .map_err(|_| Error::FecUncorrectable)?;
    let fixed = corrected
        .data()
        .iter()
        .chain(corrected.ecc().iter())
        .zip(block.iter())
        .filter(|(a, b)| a != b)
        .count();
    Ok((corrected.data()[..k_data_radio].to_vec(), fixed))
}

/// As [`decode_block`], but with known-bad byte positions (`erasures`,
/// indices into `block`) handed to the decoder. An RS(255,k) decoder given
/// erasure locations can correct twice as many byte errors at those
/// locations as it could blind, so a receiver that has another reason to
/// suspect specific bytes (e.g. a failed trailing CRC) can retry here
/// before giving up.
pub fn decode_block_with_erasures(block: &[u8], k_data_radio: usize, nroots: usize, erasures: &[u8]) -> Result<Vec<u8>> {
    if block.len() != k_data_radio + nroots {
        return Err(Error::FrameSizeOut(format!(
            "RS block {} bytes, expected {}",
            block.len(),
            k_data_radio + nroots
        )));
    }
    let dec = Decoder::new(nroots);
    let mut buf = [0u8; 255];
    buf[..block.len()].copy_from_slice(block);
    let corrected = dec
        .correct(&mut buf[..block.len()], Some(erasures))
        .map_err(|_| Error::FecUncorrectable)?;
    Ok(corrected.data()[..k_data_radio].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_no_errors() {
        let data = b"CQ CQ CQ DE WB2OSZ";
        let block = encode_block(data, 32, 16).unwrap();
        let decoded = decode_block(&block, 32, 16).unwrap();
        assert_eq!(&decoded[..data.len()], &data[..]);
    }

    #[test]
    fn corrects_up_to_half_parity_errors() {
        let data = b"CQ CQ CQ DE WB2OSZ";
        let mut block = encode_block(data, 32, 16).unwrap();
        for i in 0..8 {
            block[i] ^= 0xff;
        }
        let decoded = decode_block(&block, 32, 16).unwrap();
        assert_eq!(&decoded[..data.len()], &data[..]);
    }

    #[test]
    fn uncorrectable_beyond_budget() {
        let data = b"CQ CQ CQ DE WB2OSZ";
        let mut block = encode_block(data, 32, 16).unwrap();
        for i in 0..16 {
            block[i] ^= 0xff;
        }
        assert!(decode_block(&block, 32, 16).is_err());
    }

    #[test]
    fn decode_block_counting_reports_corrected_symbols() {
        let data = b"CQ CQ CQ DE WB2OSZ";
        let mut block = encode_block(data, 32, 16).unwrap();
        assert_eq!(decode_block_counting(&block, 32, 16).unwrap().1, 0);
        for i in 0..8 {
            block[i] ^= 0xff;
        }
        let (decoded, fixed) = decode_block_counting(&block, 32, 16).unwrap();
        assert_eq!(&decoded[..data.len()], &data[..]);
        assert_eq!(fixed, 8);
    }

    #[test]
    fn erasure_hint_corrects_beyond_blind_budget() {
        let data = b"CQ CQ CQ DE WB2OSZ";
        let mut block = encode_block(data, 32, 16).unwrap();
        let bad: Vec<u8> = (0..12).collect();
        for &i in &bad {
            block[i as usize] ^= 0xff;
        }
        assert!(decode_block(&block, 32, 16).is_err());
        let decoded = decode_block_with_erasures(&block, 32, 16, &bad).unwrap();
        assert_eq!(&decoded[..data.len()], &data[..]);
    }

    #[test]
    fn smallest_fit_picks_minimum_covering_geometry() {
        let g = smallest_fit(40, 16).unwrap();
        assert_eq!(g.k_data_radio, 64);
    }

    #[test]
    fn tag_lookup_round_trip() {
        let g = geometry_by_id(0x01).unwrap();
        assert_eq!(geometry_by_tag64(g.tag64).unwrap().id, 0x01);
    }
}
