/*! IL2P: a scrambled, Reed-Solomon-protected frame format that replaces
HDLC bit-stuffing and NRZI with byte-aligned, FEC-protected blocks.

Covers the sync word search, the bit-packed header codec, and the
large-block-first payload tiling, with the RS decode actually wired up
via [`crate::rs`] (rather than left a stub), plus the transmit direction.
*/

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::rs;

/// Sync pattern recognized after the clock-recovery preamble. Same bits as
/// `0xF15E48`.
pub const SYNC_WORD: [u8; 24] = [
    1, 1, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1, 1, 1, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0,
];

const HEADER_INFO_LEN: usize = 13;
const HEADER_NROOTS: usize = 2;
const HEADER_BLOCK_LEN: usize = HEADER_INFO_LEN + HEADER_NROOTS;

/// Large-block data-symbol count, normal FEC profile.
const LARGE_BLOCK_NORMAL: usize = 239;
/// Large-block data-symbol count, max-FEC profile.
const LARGE_BLOCK_MAX_FEC: usize = 223;
/// Parity symbols per payload block, normal profile.
const PARITY_NORMAL: usize = 2;
/// Parity symbols per payload block, max-FEC profile.
const PARITY_MAX_FEC: usize = 16;

/// AX.25-inherited protocol identifiers, renumbered for IL2P.
pub struct Pids;
impl Pids {
    /// AX.25 supervisory frames (RR, SREJ, ...).
    pub const AX25_SUPERVISOR: u8 = 0;
    /// AX.25 unnumbered frames (SABM, DM, UA, ...).
    pub const AX25_UNNUMBERED: u8 = 1;
    /// AX.25 layer 3.
    pub const AX25_LAYER3: u8 = 2;
    /// ISO 8208 / CCITT X.25 PLP.
    pub const ISO_8208_CCITT_X25_PLP: u8 = 3;
    /// Compressed TCP/IP.
    pub const COMPRESSED_TCPIP: u8 = 4;
    /// Uncompressed TCP/IP.
    pub const UNCOMPRESSED_TCPIP: u8 = 5;
    /// Segmentation fragment.
    pub const SEGMENTATION_FRAGMENT: u8 = 6;
    /// No layer 3 (APRS etc).
    pub const NO_L3: u8 = 15;
}

/// IL2P's header scrambler: a dedicated (non-G3RUH) LFSR, mask `0x108`,
/// seed `0x1f0`, distinct enough from [`crate::descramble::Lfsr`]'s
/// recurrence that it gets its own small struct rather than forcing a
/// shared abstraction over two different update rules.
#[derive(Debug, Clone, Copy)]
struct Scrambler {
    shift_reg: u64,
}

impl Scrambler {
    const MASK: u64 = 0x108;
    const SEED: u64 = 0x1f0;

    fn new() -> Self {
        Self { shift_reg: Self::SEED }
    }

    fn next(&mut self, i: u8) -> u8 {
        let i = i & 1;
        let ret = 1 & (i ^ self.shift_reg as u8);
        self.shift_reg = (self.shift_reg >> 1) ^ (Self::MASK * i as u64);
        ret
    }
}

fn scramble_bits(bits: &[u8]) -> Vec<u8> {
    let mut s = Scrambler::new();
    bits.iter().map(|&b| s.next(b)).collect()
}

/// Inverse of [`scramble_bits`]: the same recurrence, self-synchronizing.
fn descramble_bits(bits: &[u8]) -> Vec<u8> {
    scramble_bits(bits)
}

fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    debug_assert!(bits.len().is_multiple_of(8));
    bits.chunks(8)
        .map(|chunk| chunk.iter().enumerate().fold(0u8, |acc, (i, &b)| acc | (b << (7 - i))))
        .collect()
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

fn decode_callsign(input: &[u8]) -> String {
    input
        .iter()
        .map(|ch| ch & 63)
        .filter(|ch| *ch > 0)
        .map(|ch| (ch + 0x20) as char)
        .collect()
}

fn encode_callsign6(call: &str) -> [u8; 6] {
    let mut padded = [b' '; 6];
    for (i, ch) in call.bytes().take(6).enumerate() {
        padded[i] = ch;
    }
    padded.map(|c| c.wrapping_sub(0x20) & 0x3f)
}

/// A decoded or to-be-encoded IL2P header: the 13-byte struct `parse` pulls
/// out of the descrambled, FEC-corrected header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Destination callsign (no SSID).
    pub dst: String,
    /// Destination SSID, `0..=15`.
    pub dst_ssid: u8,
    /// Source callsign (no SSID).
    pub src: String,
    /// Source SSID, `0..=15`.
    pub src_ssid: u8,
    /// `true` for an unnumbered-information payload.
    pub ui: bool,
    /// `true` if the payload carries its own additional FEC (max-FEC
    /// profile).
    pub fec: bool,
    /// `true` for a type-1 header (the only type this crate encodes/decodes;
    /// type-0 headers, carrying a raw AX.25 frame instead of the
    /// decomposed fields below, are rejected).
    pub hdrtype1: bool,
    /// 4-bit PID, IL2P's own numbering (see [`Pids`]).
    pub pid: u8,
    /// 7-bit control field (packed N(S)/N(R)/P/F bits, IL2P's own layout).
    pub control: u8,
    /// Payload length in bytes, 10 bits (0..=1023).
    pub payload_size: u16,
}

impl Header {
    /// Human-readable classification of this header's frame subtype.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        if !self.hdrtype1 {
            return "type0 IL2P";
        }
        if self.ui {
            return "UI";
        }
        match self.pid {
            Pids::AX25_UNNUMBERED => match (self.control >> 2) & 0xf {
                0x1 => "SABM",
                0x3 => "DISC",
                0x4 => "DM",
                0x6 => "UA",
                0x8 => "FRMR",
                0xA => "UI unnumbered response",
                0xB => "UI unnumbered command",
                0xC => "XID response",
                0xD => "XID command",
                0xE => "TEST response",
                0xF => "TEST command",
                _ => "invalid unnumbered subtype",
            },
            _ => "other PID",
        }
    }

    /// Parse a 13-byte descrambled, FEC-corrected header block.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != HEADER_INFO_LEN {
            return Err(Error::FrameSizeOut(format!(
                "IL2P header block {} bytes, expected {HEADER_INFO_LEN}",
                data.len()
            )));
        }
        if data[1] & 0x80 == 0 {
            return Err(Error::Il2pType0Header);
        }
        let pid = ((data[1] & 0x40) >> 3) | ((data[2] & 0x40) >> 4) | ((data[3] & 0x40) >> 5) | ((data[4] & 0x40) >> 6);
        let control = (data[5] & 0x40)
            | ((data[6] & 0x40) >> 1)
            | ((data[7] & 0x40) >> 2)
            | ((data[8] & 0x40) >> 3)
            | ((data[9] & 0x40) >> 4)
            | ((data[10] & 0x40) >> 5)
            | ((data[11] & 0x40) >> 6);
        let payload_size = ((data[2] as u16 & 0x80) << 2)
            | ((data[3] as u16 & 0x80) << 1)
            | (data[4] as u16 & 0x80)
            | ((data[5] as u16 & 0x80) >> 1)
            | ((data[6] as u16 & 0x80) >> 2)
            | ((data[7] as u16 & 0x80) >> 3)
            | ((data[8] as u16 & 0x80) >> 4)
            | ((data[9] as u16 & 0x80) >> 5)
            | ((data[10] as u16 & 0x80) >> 6)
            | ((data[11] as u16 & 0x80) >> 7);
        Ok(Self {
            dst: decode_callsign(&data[0..6]),
            dst_ssid: data[12] >> 4,
            src: decode_callsign(&data[6..12]),
            src_ssid: data[12] & 0xf,
            ui: (data[0] & 0x40) != 0,
            fec: (data[0] & 0x80) != 0,
            hdrtype1: (data[1] & 0x80) != 0,
            pid,
            control,
            payload_size,
        })
    }

    /// Encode back to the 13-byte info block (before RS protection).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_INFO_LEN] {
        let dst6 = encode_callsign6(&self.dst);
        let src6 = encode_callsign6(&self.src);
        let ps = self.payload_size;
        let mut data = [0u8; HEADER_INFO_LEN];
        data[0] = dst6[0] | ((self.ui as u8) << 6) | ((self.fec as u8) << 7);
        data[1] = dst6[1] | (((self.pid >> 3) & 1) << 6) | ((self.hdrtype1 as u8) << 7);
        data[2] = dst6[2] | (((self.pid >> 2) & 1) << 6) | ((((ps >> 9) & 1) as u8) << 7);
        data[3] = dst6[3] | (((self.pid >> 1) & 1) << 6) | ((((ps >> 8) & 1) as u8) << 7);
        data[4] = dst6[4] | ((self.pid & 1) << 6) | ((((ps >> 7) & 1) as u8) << 7);
        data[5] = dst6[5] | (((self.control >> 6) & 1) << 6) | ((((ps >> 6) & 1) as u8) << 7);
        data[6] = src6[0] | (((self.control >> 5) & 1) << 6) | ((((ps >> 5) & 1) as u8) << 7);
        data[7] = src6[1] | (((self.control >> 4) & 1) << 6) | ((((ps >> 4) & 1) as u8) << 7);
        data[8] = src6[2] | (((self.control >> 3) & 1) << 6) | ((((ps >> 3) & 1) as u8) << 7);
        data[9] = src6[3] | (((self.control >> 2) & 1) << 6) | ((((ps >> 2) & 1) as u8) << 7);
        data[10] = src6[4] | (((self.control >> 1) & 1) << 6) | ((((ps >> 1) & 1) as u8) << 7);
        data[11] = src6[5] | ((self.control & 1) << 6) | (((ps & 1) as u8) << 7);
        data[12] = ((self.dst_ssid & 0xf) << 4) | (self.src_ssid & 0xf);
        data
    }
}

/// One payload block's geometry: `(data_len, parity_len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    /// Data bytes in this block.
    pub data_len: usize,
    /// RS parity bytes protecting this block.
    pub parity_len: usize,
}

/// Tile `length` payload bytes into RS blocks, large-block-first: as many
/// full-size blocks as fit, then one final block sized to the remainder.
#[must_use]
pub fn payload_compute(length: usize, max_fec: bool) -> Vec<BlockGeometry> {
    if length == 0 {
        return Vec::new();
    }
    let large = if max_fec { LARGE_BLOCK_MAX_FEC } else { LARGE_BLOCK_NORMAL };
    let parity = if max_fec { PARITY_MAX_FEC } else { PARITY_NORMAL };
    let mut blocks = Vec::new();
    let mut remaining = length;
    while remaining > large {
        blocks.push(BlockGeometry { data_len: large, parity_len: parity });
        remaining -= large;
    }
    blocks.push(BlockGeometry { data_len: remaining, parity_len: parity });
    blocks
}

/// Total encoded size (sum of each block's `data_len + parity_len`) for
/// `length` payload bytes.
#[must_use]
pub fn encoded_size(length: usize, max_fec: bool) -> usize {
    payload_compute(length, max_fec)
        .iter()
        .map(|b| b.data_len + b.parity_len)
        .sum()
}

#[derive(Debug, Clone)]
enum State {
    Searching,
    Header { bits: Vec<u8>, inverted: bool },
    Payload {
        header: Box<Header>,
        inverted: bool,
        blocks: Vec<BlockGeometry>,
        block_idx: usize,
        buf: Vec<u8>,
        accum: Vec<u8>,
        raw_blocks: Vec<Vec<u8>>,
    },
    Crc {
        header: Box<Header>,
        payload: Vec<u8>,
        inverted: bool,
        bits: Vec<u8>,
        blocks: Vec<BlockGeometry>,
        raw_blocks: Vec<Vec<u8>>,
    },
}

const CRC_LEN: usize = 4;

/// IL2P's trailing frame CRC: CRC-16/CCITT over the reassembled payload,
/// carried as the value followed by its one's complement so a receiver can
/// sanity-check the field itself before trusting the comparison.
fn il2p_crc(payload: &[u8]) -> [u8; CRC_LEN] {
    let crc = crate::crc::m_m_crc(payload);
    let [lo, hi] = crc.to_le_bytes();
    [lo, hi, !lo, !hi]
}

/// Retry each payload block's RS decode with one erasure hint at a time,
/// hoping the block that's actually wrong gets corrected past the blind
/// `nroots/2` budget once its error location is known. Stops at the first
/// reassembled payload whose trailing CRC checks out.
fn retry_with_erasure_hints(blocks: &[BlockGeometry], raw_blocks: &[Vec<u8>], payload_size: usize, want_crc: &[u8; CRC_LEN]) -> Option<Vec<u8>> {
    for (i, geom) in blocks.iter().enumerate() {
        let block_len = geom.data_len + geom.parity_len;
        for erasure in 0..block_len {
            let Ok(fixed) = rs::decode_block_with_erasures(&raw_blocks[i], geom.data_len, geom.parity_len, &[erasure as u8]) else {
                continue;
            };
            let mut candidate = Vec::with_capacity(payload_size);
            for (j, g) in blocks.iter().enumerate() {
                if j == i {
                    candidate.extend_from_slice(&fixed[..g.data_len]);
                } else {
                    let Ok(data) = rs::decode_block(&raw_blocks[j], g.data_len, g.parity_len) else {
                        candidate.clear();
                        break;
                    };
                    candidate.extend_from_slice(&data[..g.data_len]);
                }
            }
            candidate.truncate(payload_size);
            if candidate.len() == payload_size && il2p_crc(&candidate) == *want_crc {
                return Some(candidate);
            }
        }
    }
    None
}

/// A fully decoded IL2P frame.
#[derive(Debug, Clone)]
pub struct DecodedIl2p {
    /// The header fields.
    pub header: Header,
    /// Reassembled, RS-corrected payload (may be empty).
    pub payload: Vec<u8>,
}

/// Per-origin IL2P receiver: sync-word correlation, descramble, header RS
/// decode, payload block RS decode.
#[derive(Debug, Clone)]
pub struct Il2pReceiver {
    sync: crate::correlate::Correlator,
    sync_inverted: crate::correlate::Correlator,
    state: State,
    max_fec: bool,
    crc_enabled: bool,
    pub(crate) decoded: u64,
    pub(crate) fec_failures: u64,
    pub(crate) crc_failures: u64,
}

impl Il2pReceiver {
    /// Build a receiver. `max_fec` selects which payload tiling profile to
    /// expect (normally taken from the header's own `fec` bit once seen,
    /// but needed up front to size the trailing block correctly when
    /// `payload_size` alone doesn't disambiguate for a truncated capture).
    /// `crc_enabled` mirrors the channel's configured use of the trailing
    /// 4-byte frame CRC.
    #[must_use]
    pub fn new(max_fec: bool, crc_enabled: bool) -> Self {
        let inverted_sync: Vec<u8> = SYNC_WORD.iter().map(|b| b ^ 1).collect();
        Self {
            sync: crate::correlate::Correlator::new(SYNC_WORD.to_vec(), 1),
            sync_inverted: crate::correlate::Correlator::new(inverted_sync, 1),
            state: State::Searching,
            max_fec,
            crc_enabled,
            decoded: 0,
            fec_failures: 0,
            crc_failures: 0,
        }
    }

    fn resync(&mut self) {
        self.sync.reset();
        self.sync_inverted.reset();
        self.state = State::Searching;
    }

    /// Feed one raw (not yet descrambled) channel bit.
    pub fn rec_bit(&mut self, bit: u8) -> Result<Option<DecodedIl2p>> {
        match &mut self.state {
            State::Searching => {
                let normal = self.sync.push(bit).is_some();
                let inverted = self.sync_inverted.push(bit).is_some();
                if normal || inverted {
                    trace!("il2p: sync word found ({})", if inverted { "inverted" } else { "normal" });
                    self.sync.reset();
                    self.sync_inverted.reset();
                    self.state = State::Header { bits: Vec::with_capacity(HEADER_BLOCK_LEN * 8), inverted };
                }
                Ok(None)
            }
            State::Header { bits, inverted } => {
                let inverted = *inverted;
                bits.push(bit & 1);
                if bits.len() < HEADER_BLOCK_LEN * 8 {
                    return Ok(None);
                }
                let raw_bits = std::mem::take(bits);
                self.state = State::Searching;
                let descrambled = descramble_bits(&raw_bits);
                let mut block_bytes = bits_to_bytes(&descrambled);
                if inverted {
                    block_bytes.iter_mut().for_each(|b| *b ^= 0xff);
                }
                let info = match rs::decode_block(&block_bytes, HEADER_INFO_LEN, HEADER_NROOTS) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("il2p: header FEC uncorrectable: {e}");
                        self.fec_failures += 1;
                        return Ok(None);
                    }
                };
                let header = Header::parse(&info)?;
                debug!("il2p: header {} => {} ({})", header.src, header.dst, header.describe());
                if header.payload_size == 0 {
                    if self.crc_enabled {
                        self.state = State::Crc {
                            header: Box::new(header),
                            payload: Vec::new(),
                            inverted,
                            bits: Vec::with_capacity(CRC_LEN * 8),
                            blocks: Vec::new(),
                            raw_blocks: Vec::new(),
                        };
                        return Ok(None);
                    }
                    self.decoded += 1;
                    return Ok(Some(DecodedIl2p { header, payload: Vec::new() }));
                }
                let blocks = payload_compute(header.payload_size as usize, header.fec);
                self.state = State::Payload {
                    header: Box::new(header),
                    inverted,
                    blocks,
                    block_idx: 0,
                    buf: Vec::new(),
                    accum: Vec::new(),
                    raw_blocks: Vec::new(),
                };
                Ok(None)
            }
            State::Payload { header, inverted, blocks, block_idx, buf, accum, raw_blocks } => {
                let inverted = *inverted;
                let geom = blocks[*block_idx];
                let total_bits = (geom.data_len + geom.parity_len) * 8;
                buf.push(bit & 1);
                if buf.len() < total_bits {
                    return Ok(None);
                }
                let raw_bits = std::mem::take(buf);
                let descrambled = descramble_bits(&raw_bits);
                let mut block_bytes = bits_to_bytes(&descrambled);
                if inverted {
                    block_bytes.iter_mut().for_each(|b| *b ^= 0xff);
                }
                let data = match rs::decode_block(&block_bytes, geom.data_len, geom.parity_len) {
                    Ok(v) => v,
                    Err(e) => {
                        if !self.crc_enabled {
                            warn!("il2p: payload block {block_idx} FEC uncorrectable: {e}");
                            self.fec_failures += 1;
                            self.state = State::Searching;
                            return Ok(None);
                        }
                        // No CRC to cross-check a single-erasure retry against yet;
                        // carry a placeholder and let the Crc stage try to recover it.
                        debug!("il2p: payload block {block_idx} FEC uncorrectable, deferring to CRC retry: {e}");
                        vec![0u8; geom.data_len]
                    }
                };
                accum.extend_from_slice(&data[..geom.data_len]);
                raw_blocks.push(block_bytes);
                *block_idx += 1;
                if *block_idx < blocks.len() {
                    return Ok(None);
                }
                let header = (**header).clone();
                let mut full = std::mem::take(accum);
                full.truncate(header.payload_size as usize);
                let blocks = std::mem::take(blocks);
                let raw_blocks = std::mem::take(raw_blocks);
                if self.crc_enabled {
                    self.state = State::Crc {
                        header: Box::new(header),
                        payload: full,
                        inverted,
                        bits: Vec::with_capacity(CRC_LEN * 8),
                        blocks,
                        raw_blocks,
                    };
                    return Ok(None);
                }
                self.decoded += 1;
                self.state = State::Searching;
                Ok(Some(DecodedIl2p { header, payload: full }))
            }
            State::Crc { header, payload, inverted, bits, blocks, raw_blocks } => {
                let inverted = *inverted;
                bits.push(bit & 1);
                if bits.len() < CRC_LEN * 8 {
                    return Ok(None);
                }
                let raw_bits = std::mem::take(bits);
                let mut crc_bytes = bits_to_bytes(&raw_bits);
                if inverted {
                    crc_bytes.iter_mut().for_each(|b| *b ^= 0xff);
                }
                let header = (**header).clone();
                let payload = std::mem::take(payload);
                let blocks = std::mem::take(blocks);
                let raw_blocks = std::mem::take(raw_blocks);
                self.state = State::Searching;
                if crc_bytes == il2p_crc(&payload) {
                    self.decoded += 1;
                    return Ok(Some(DecodedIl2p { header, payload }));
                }
                if let Some(recovered) = retry_with_erasure_hints(&blocks, &raw_blocks, header.payload_size as usize, &crc_bytes) {
                    debug!("il2p: CRC mismatch recovered via single-erasure-hint retry");
                    self.decoded += 1;
                    return Ok(Some(DecodedIl2p { header, payload: recovered }));
                }
                warn!("il2p: {}", Error::Il2pCrcMismatch);
                self.crc_failures += 1;
                Ok(None)
            }
        }
    }
}

impl Drop for Il2pReceiver {
    fn drop(&mut self) {
        debug!(
            "il2p: decoded {}, FEC failures {}, CRC failures {}",
            self.decoded, self.fec_failures, self.crc_failures
        );
    }
}

/// IL2P transmitter: build header + payload RS blocks, scramble, bit-pack.
#[derive(Debug, Clone, Default)]
pub struct Il2pTransmitter;

impl Il2pTransmitter {
    /// Build a new transmitter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encode a header plus payload into channel bits, with the leading
    /// sync word. `invert` byte-inverts the header, payload, and (if
    /// present) CRC blocks, mirroring the channel's configured polarity.
    /// `crc` appends the trailing 4-byte frame CRC when `Some`-configured
    /// on the channel.
    pub fn encode_frame(&self, header: &Header, payload: &[u8], invert: bool, crc: bool) -> Result<Vec<u8>> {
        if payload.len() > 1023 {
            return Err(Error::FrameSizeOut(format!(
                "IL2P payload {} bytes exceeds 10-bit length field",
                payload.len()
            )));
        }
        let mut header = header.clone();
        header.payload_size = payload.len() as u16;

        let mut bits = Vec::new();
        if invert {
            bits.extend(SYNC_WORD.iter().map(|b| b ^ 1));
        } else {
            bits.extend_from_slice(&SYNC_WORD);
        }

        let mut header_block = rs::encode_block(&header.to_bytes(), HEADER_INFO_LEN, HEADER_NROOTS)?;
        if invert {
            header_block.iter_mut().for_each(|b| *b ^= 0xff);
        }
        bits.extend_from_slice(&scramble_bits(&bytes_to_bits(&header_block)));

        let mut offset = 0;
        for geom in payload_compute(payload.len(), header.fec) {
            let chunk = &payload[offset..offset + geom.data_len];
            let mut block = rs::encode_block(chunk, geom.data_len, geom.parity_len)?;
            if invert {
                block.iter_mut().for_each(|b| *b ^= 0xff);
            }
            bits.extend_from_slice(&scramble_bits(&bytes_to_bits(&block)));
            offset += geom.data_len;
        }

        if crc {
            let mut crc_bytes = il2p_crc(payload);
            if invert {
                crc_bytes.iter_mut().for_each(|b| *b ^= 0xff);
            }
            bits.extend_from_slice(&bytes_to_bits(&crc_bytes));
        }
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let h = Header {
            dst: "APDW17".to_string(),
            dst_ssid: 0,
            src: "WB2OSZ".to_string(),
            src_ssid: 15,
            ui: true,
            fec: false,
            hdrtype1: true,
            pid: Pids::NO_L3,
            control: 0x03,
            payload_size: 42,
        };
        let bytes = h.to_bytes();
        let parsed = Header::parse(&bytes).unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn type0_header_is_rejected() {
        let h = Header {
            dst: "APDW17".to_string(),
            dst_ssid: 0,
            src: "WB2OSZ".to_string(),
            src_ssid: 15,
            ui: true,
            fec: false,
            hdrtype1: false,
            pid: Pids::NO_L3,
            control: 0x03,
            payload_size: 42,
        };
        let bytes = h.to_bytes();
        assert_eq!(Header::parse(&bytes), Err(Error::Il2pType0Header));
    }

    #[test]
    fn callsign_codec_round_trip() {
        let encoded = encode_callsign6("WB2OSZ");
        // Re-pack as raw bytes the way a header byte would carry them
        // (low 6 bits only, high bits zero) and decode.
        assert_eq!(decode_callsign(&encoded), "WB2OSZ");
    }

    #[test]
    fn payload_compute_single_small_block() {
        let blocks = payload_compute(100, false);
        assert_eq!(blocks, vec![BlockGeometry { data_len: 100, parity_len: 2 }]);
    }

    #[test]
    fn payload_compute_large_plus_remainder() {
        let blocks = payload_compute(300, false);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].data_len, 239);
        assert_eq!(blocks[1].data_len, 61);
    }

    #[test]
    fn payload_compute_empty_is_empty() {
        assert!(payload_compute(0, false).is_empty());
    }

    #[test]
    fn scramble_is_self_inverse() {
        let bits: Vec<u8> = vec![1, 0, 0, 1, 1, 0, 1, 0, 1, 1];
        let scrambled = scramble_bits(&bits);
        let recovered = descramble_bits(&scrambled);
        assert_eq!(recovered, bits);
    }

    #[test]
    fn transmit_then_receive_round_trip() {
        let h = Header {
            dst: "APDW17".to_string(),
            dst_ssid: 0,
            src: "WB2OSZ".to_string(),
            src_ssid: 15,
            ui: true,
            fec: false,
            hdrtype1: true,
            pid: Pids::NO_L3,
            control: 0x03,
            payload_size: 0,
        };
        let tx = Il2pTransmitter::new();
        let payload = b"Hello, IL2P!";
        let bits = tx.encode_frame(&h, payload, false, false).unwrap();

        let mut rx = Il2pReceiver::new(false, false);
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        let decoded = out.expect("expected a decoded frame");
        assert_eq!(decoded.header.dst, "APDW17");
        assert_eq!(decoded.header.src, "WB2OSZ");
        assert_eq!(decoded.payload, payload);
    }

    fn sample_header(payload_size: u16) -> Header {
        Header {
            dst: "APDW17".to_string(),
            dst_ssid: 0,
            src: "WB2OSZ".to_string(),
            src_ssid: 15,
            ui: true,
            fec: false,
            hdrtype1: true,
            pid: Pids::NO_L3,
            control: 0x03,
            payload_size,
        }
    }

    #[test]
    fn crc_enabled_round_trip_succeeds() {
        let h = sample_header(0);
        let tx = Il2pTransmitter::new();
        let payload = b"with a trailing frame CRC";
        let bits = tx.encode_frame(&h, payload, false, true).unwrap();

        let mut rx = Il2pReceiver::new(false, true);
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().payload, payload);
    }

    #[test]
    fn crc_mismatch_drops_frame() {
        // Corrupts a bit in the trailing CRC field itself, which carries no
        // FEC of its own — no erasure hint against the (intact) payload
        // blocks can recover a wrong CRC field, so this must still drop.
        let h = sample_header(0);
        let tx = Il2pTransmitter::new();
        let payload = b"corrupt me";
        let mut bits = tx.encode_frame(&h, payload, false, true).unwrap();
        let last = bits.len() - 1;
        bits[last] ^= 1;

        let mut rx = Il2pReceiver::new(false, true);
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert!(out.is_none());
        assert_eq!(rx.crc_failures, 1);
    }

    #[test]
    fn erasure_hint_retry_recovers_when_blind_budget_exceeded() {
        let data = b"IL2P payload exceeding blind FEC budget";
        let geom = BlockGeometry { data_len: data.len(), parity_len: 3 };
        let mut block = rs::encode_block(data, geom.data_len, geom.parity_len).unwrap();
        block[0] ^= 0xff;
        block[1] ^= 0xff;
        assert!(rs::decode_block(&block, geom.data_len, geom.parity_len).is_err());

        let want_crc = il2p_crc(data);
        let recovered = retry_with_erasure_hints(&[geom], &[block], data.len(), &want_crc)
            .expect("expected erasure-hint retry to recover the frame");
        assert_eq!(recovered, data);
    }

    #[test]
    fn inverted_polarity_round_trip_succeeds() {
        let h = sample_header(0);
        let tx = Il2pTransmitter::new();
        let payload = b"inverted polarity link";
        let bits = tx.encode_frame(&h, payload, true, true).unwrap();

        let mut rx = Il2pReceiver::new(false, true);
        let mut out = None;
        for b in bits {
            if let Some(f) = rx.rec_bit(b).unwrap() {
                out = Some(f);
            }
        }
        assert_eq!(out.unwrap().payload, payload);
    }
}
