/*! The AX.25 `Frame` object: addresses, control/PID, info, and the
book-keeping metadata a TNC core attaches to a decode.
*/

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use log::{error, warn};

use crate::address::{self, Address, Strictness};
use crate::crc;
use crate::error::{Error, Result};
use crate::frame_type::{self, FrameType};

/// Maximum information-field length, in octets.
pub const MAX_INFO_LEN: usize = 2048;
/// Maximum number of addresses (destination + source + up to 8 digipeaters).
pub const MAX_ADDR: usize = 10;
/// Minimum on-air frame length: 2 addresses (14 octets) + 1 control octet.
pub const MIN_FRAME_LEN: usize = 15;
/// Maximum on-air frame length: 10 addresses + 2 control + 1 PID + info.
pub const MAX_FRAME_LEN: usize = 2 + MAX_ADDR * 7 + 2 + 3 + MAX_INFO_LEN;

const CANARY: u32 = 0xFEED_FACE;

// Process-wide allocation counters. Racy by design: diagnostic only, not
// load-bearing for correctness.
static NEW_COUNT: AtomicU64 = AtomicU64::new(0);
static DELETE_COUNT: AtomicU64 = AtomicU64::new(0);
static SEQ: AtomicU64 = AtomicU64::new(0);
static LEAK_WARNED_AT: AtomicI64 = AtomicI64::new(-1);

fn note_alloc() {
    let n = NEW_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    let d = DELETE_COUNT.load(Ordering::Relaxed);
    let outstanding = n as i64 - d as i64;
    if outstanding > 256 && LEAK_WARNED_AT.swap(outstanding, Ordering::Relaxed) <= 256 {
        warn!("Frame allocation imbalance: {outstanding} outstanding frames (possible leak)");
    }
}

fn note_free() {
    DELETE_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Process-wide `(allocated, freed)` frame counts, for a `Core`'s
/// diagnostics surface.
#[must_use]
pub fn allocation_stats() -> (u64, u64) {
    (NEW_COUNT.load(Ordering::Relaxed), DELETE_COUNT.load(Ordering::Relaxed))
}

/// Origin of FEC correction applied to a received frame, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FecType {
    /// Plain HDLC, no FEC envelope.
    #[default]
    None,
    /// Recovered via FX.25 Reed-Solomon.
    Fx25,
    /// Recovered via IL2P Reed-Solomon.
    Il2p,
}

/// Per-frame bookkeeping that rides along with the structured frame but
/// isn't part of the on-air encoding.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Monotonic allocation-order sequence number, for debugging correlation.
    pub seq: u64,
    /// Received signal level, 0..100, if known.
    pub audio_level: Option<u8>,
    /// Channel this frame arrived on / is destined for.
    pub channel: u16,
    /// Number of bit-level corrections applied during decode.
    pub retries: u32,
    /// Which FEC path (if any) produced this frame.
    pub fec_type: FecType,
    /// `0`, `8`, or `128`; `0` means "not yet determined".
    pub modulo: u8,
}

/// An AX.25 frame: the structured address/control/pid/info view, kept in
/// sync with the canonical on-air octet buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    canary_front: u32,
    addresses: Vec<Address>,
    /// `(first control octet, second control octet if modulo-128)`. `None`
    /// means not yet determined.
    control: Option<(u8, Option<u8>)>,
    pid: Option<u8>,
    info: Vec<u8>,
    pub meta: Metadata,
    canary_back: u32,
}

impl Drop for Frame {
    fn drop(&mut self) {
        note_free();
    }
}

impl Frame {
    /// Build an empty frame (no addresses, no control/pid/info).
    #[must_use]
    pub fn new() -> Self {
        note_alloc();
        Self {
            canary_front: CANARY,
            addresses: Vec::new(),
            control: None,
            pid: None,
            info: Vec::new(),
            meta: Metadata {
                seq: SEQ.fetch_add(1, Ordering::Relaxed),
                ..Default::default()
            },
            canary_back: CANARY,
        }
    }

    /// Deep copy, with a fresh sequence number (a new allocation).
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let mut f = Self::new();
        f.addresses = self.addresses.clone();
        f.control = self.control;
        f.pid = self.pid;
        f.info = self.info.clone();
        f.meta.audio_level = self.meta.audio_level;
        f.meta.channel = self.meta.channel;
        f.meta.retries = self.meta.retries;
        f.meta.fec_type = self.meta.fec_type;
        f.meta.modulo = self.meta.modulo;
        f
    }

    fn check_invariants(&self, func: &'static str) -> Result<()> {
        if self.canary_front != CANARY || self.canary_back != CANARY {
            error!("Internal error in {func}: frame canary corrupted");
            return Err(Error::InternalInvariant(func, "canary corrupted".into()));
        }
        Ok(())
    }

    /// Parse monitor-format text: `SRC>DST[,VIA1[,VIA2...]]:INFO`.
    ///
    /// `strictness`: `0` = lenient (IGate-sourced; q-constructs normalized,
    /// mixed case allowed), `1`/`2` = strict address rules (`2` additionally
    /// forbids a trailing `*` on any address).
    pub fn from_text(text: &str, strictness: u8) -> Result<Self> {
        let (head, info_text) = text
            .split_once(':')
            .ok_or_else(|| Error::ParseEmpty("missing ':' separator".to_string()))?;
        let (src_text, rest) = head
            .split_once('>')
            .ok_or_else(|| Error::ParseEmpty("missing '>' separator".to_string()))?;

        let addr_strictness = match strictness {
            1 => Strictness::Strict,
            2 => Strictness::StrictNoHeard,
            _ => Strictness::Lenient,
        };

        // Reject adjacent commas (empty digipeater fields) before splitting,
        // since split() would otherwise silently yield empty strings.
        if rest.contains(",,") || rest.starts_with(',') || rest.ends_with(',') {
            return Err(Error::ParseEmpty("empty digipeater field".to_string()));
        }

        let mut fields = rest.split(',');
        let dst_text = fields.next().unwrap_or("");
        let dst = address::parse("Destination", dst_text, addr_strictness)?;
        let src = address::parse("Source", src_text, addr_strictness)?;

        let mut addresses = Vec::with_capacity(2 + fields.clone().count());
        addresses.push(to_address(&dst));
        addresses.push(to_address(&src));

        for (i, via) in fields.enumerate() {
            if addresses.len() >= MAX_ADDR {
                return Err(Error::ParseTooLong("too many digipeaters".to_string()));
            }
            let name = format!("Digi{}", i + 1);
            let mut parsed = address::parse(&name, via, addr_strictness)?;
            if strictness == 0 {
                normalize_q_construct(&mut parsed.call);
            }
            let mut a = Address::new(&parsed.call, parsed.ssid);
            a.set_h(parsed.heard);
            addresses.push(a);
        }

        // Destination/source default flags for a text-parsed frame.
        addresses[0].set_h(true);
        addresses[0].set_rr(0b11);
        addresses[1].set_rr(0b11);

        let info = decode_escapes(info_text)?;
        if info.len() > MAX_INFO_LEN {
            return Err(Error::ParseTooLong(format!(
                "info field {} bytes > {MAX_INFO_LEN}",
                info.len()
            )));
        }

        let mut f = Self::new();
        f.addresses = addresses;
        f.control = Some((0x03, None));
        f.pid = Some(0xF0);
        f.info = info;
        f.meta.modulo = 8;
        Ok(f)
    }

    /// Deserialize the canonical on-air octet buffer, as handed off by a
    /// demodulator.
    pub fn from_frame(octets: &[u8], audio_level: Option<u8>) -> Result<Self> {
        if octets.len() < MIN_FRAME_LEN || octets.len() > MAX_FRAME_LEN {
            return Err(Error::FrameSizeOut(format!(
                "{} octets not in [{MIN_FRAME_LEN}..{MAX_FRAME_LEN}]",
                octets.len()
            )));
        }
        // Find the first octet-7 with the last-address bit set.
        let mut num_addr_octets = None;
        let mut i = 6;
        while i < octets.len() {
            if octets[i] & 1 != 0 {
                num_addr_octets = Some(i + 1);
                break;
            }
            i += 7;
        }
        let addr_bytes = num_addr_octets
            .ok_or_else(|| Error::FrameSizeOut("no last-address marker found".to_string()))?;
        if !addr_bytes.is_multiple_of(7) {
            return Err(Error::FrameSizeOut(
                "address area not a multiple of 7 octets".to_string(),
            ));
        }
        let num_addr = addr_bytes / 7;
        if !(2..=MAX_ADDR).contains(&num_addr) {
            return Err(Error::FrameSizeOut(format!(
                "{num_addr} addresses not in [2..{MAX_ADDR}]"
            )));
        }

        let mut addresses = Vec::with_capacity(num_addr);
        for n in 0..num_addr {
            let mut chunk = [0u8; 7];
            chunk.copy_from_slice(&octets[n * 7..n * 7 + 7]);
            let (a, _last) = Address::decode(&chunk);
            addresses.push(a);
        }

        let rest = &octets[addr_bytes..];
        if rest.is_empty() {
            return Err(Error::FrameSizeOut("missing control octet".to_string()));
        }
        let c1 = rest[0];
        let modulo = frame_type::guess_modulo(c1, rest.len() > 1, rest.get(1).copied());
        let (control, body) = if modulo == 128 && rest.len() > 1 {
            ((c1, Some(rest[1])), &rest[2..])
        } else {
            ((c1, None), &rest[1..])
        };

        let (pid, info) = if (c1 & 1) == 0 || (c1 & 0xEF) == 0x03 {
            // I or UI frame: has a PID octet.
            if body.is_empty() {
                return Err(Error::FrameSizeOut("missing PID octet".to_string()));
            }
            (Some(body[0]), body[1..].to_vec())
        } else {
            (None, body.to_vec())
        };

        if info.len() > MAX_INFO_LEN {
            return Err(Error::FrameSizeOut(format!(
                "info field {} bytes > {MAX_INFO_LEN}",
                info.len()
            )));
        }

        let mut f = Self::new();
        f.addresses = addresses;
        f.control = Some(control);
        f.pid = pid;
        f.info = info;
        f.meta.audio_level = audio_level;
        f.meta.modulo = modulo;
        Ok(f)
    }

    /// Number of addresses currently present.
    #[must_use]
    pub fn get_num_addr(&self) -> usize {
        self.addresses.len()
    }

    /// Number of digipeaters (addresses beyond destination+source).
    #[must_use]
    pub fn get_num_repeaters(&self) -> usize {
        self.addresses.len().saturating_sub(2)
    }

    /// `CALL-SSID` text for address `n`.
    #[must_use]
    pub fn get_addr_with_ssid(&self, n: usize) -> Option<String> {
        self.addresses.get(n).map(Address::with_ssid)
    }

    /// Callsign only (no SSID) for address `n`.
    #[must_use]
    pub fn get_addr_no_ssid(&self, n: usize) -> Option<&str> {
        self.addresses.get(n).map(Address::call)
    }

    /// SSID for address `n`.
    #[must_use]
    pub fn get_ssid(&self, n: usize) -> Option<u8> {
        self.addresses.get(n).map(Address::ssid)
    }

    /// Set SSID for address `n`.
    pub fn set_ssid(&mut self, n: usize, ssid: u8) {
        if let Some(a) = self.addresses.get_mut(n) {
            a.set_ssid(ssid);
        }
    }

    /// H bit for address `n`.
    #[must_use]
    pub fn get_h(&self, n: usize) -> Option<bool> {
        self.addresses.get(n).map(Address::h)
    }

    /// Set H bit for address `n`.
    pub fn set_h(&mut self, n: usize, h: bool) {
        if let Some(a) = self.addresses.get_mut(n) {
            a.set_h(h);
        }
    }

    /// Reserved bits for address `n`.
    #[must_use]
    pub fn get_rr(&self, n: usize) -> Option<u8> {
        self.addresses.get(n).map(Address::rr)
    }

    /// Insert an address (as `CALL[-SSID]`) at position `n`, shifting
    /// addresses `n..` up one slot. No-op (with a log) if already at
    /// [`MAX_ADDR`] or `n` is out of bounds for insertion.
    pub fn insert_addr(&mut self, n: usize, text: &str) -> Result<()> {
        self.check_invariants("insert_addr")?;
        if self.addresses.len() >= MAX_ADDR {
            warn!("insert_addr: already at maximum {MAX_ADDR} addresses, ignoring");
            return Ok(());
        }
        if n > self.addresses.len() {
            warn!("insert_addr: position {n} out of bounds, ignoring");
            return Ok(());
        }
        let parsed = address::parse("Digi", text, Strictness::Strict)?;
        let mut a = Address::new(&parsed.call, parsed.ssid);
        a.set_h(parsed.heard);
        self.addresses.insert(n, a);
        self.post_mutation_check("insert_addr")
    }

    /// Remove the address at position `n`. No-op (with a log) if `n` is out
    /// of bounds, or removing would leave fewer than 2 addresses.
    pub fn remove_addr(&mut self, n: usize) -> Result<()> {
        self.check_invariants("remove_addr")?;
        if n >= self.addresses.len() {
            warn!("remove_addr: position {n} out of bounds, ignoring");
            return Ok(());
        }
        if self.addresses.len() <= 2 {
            warn!("remove_addr: would leave fewer than 2 addresses, ignoring");
            return Ok(());
        }
        self.addresses.remove(n);
        self.post_mutation_check("remove_addr")
    }

    fn post_mutation_check(&self, func: &'static str) -> Result<()> {
        // Re-derive num_addr the way from_frame would, from a packed buffer,
        // and confirm it agrees with the structured view.
        let packed = self.pack();
        let mut count = 0;
        let mut i = 6;
        while i < packed.len() {
            count += 1;
            if packed[i] & 1 != 0 {
                break;
            }
            i += 7;
        }
        if count != self.addresses.len() {
            error!(
                "Internal error in {func}: derived address count {count} != structured {}",
                self.addresses.len()
            );
            return Err(Error::InternalInvariant(
                func,
                "address count mismatch after mutation".into(),
            ));
        }
        Ok(())
    }

    /// Index of the last digipeater with H set ("heard via"), or the source
    /// index (1) if no digipeater has been heard from.
    #[must_use]
    pub fn get_heard(&self) -> usize {
        for i in (2..self.addresses.len()).rev() {
            if self.addresses[i].h() {
                return i;
            }
        }
        1
    }

    /// Index of the first digipeater not yet marked as repeated, or `None`
    /// if every digipeater has been heard from (or there are none).
    #[must_use]
    pub fn get_first_not_repeated(&self) -> Option<usize> {
        (2..self.addresses.len()).find(|&i| !self.addresses[i].h())
    }

    /// Information field.
    #[must_use]
    pub fn get_info(&self) -> &[u8] {
        &self.info
    }

    /// Replace the information field. Rejects (does not truncate) fields
    /// over [`MAX_INFO_LEN`] — this entry point still has a correctable
    /// caller on the other end, unlike a value arriving off the wire.
    pub fn set_info(&mut self, info: &[u8]) -> Result<()> {
        if info.len() > MAX_INFO_LEN {
            return Err(Error::ParseTooLong(format!(
                "info field {} bytes > {MAX_INFO_LEN}",
                info.len()
            )));
        }
        self.info = info.to_vec();
        Ok(())
    }

    /// Truncate the info field at the first `\r` or `\n`, returning the
    /// number of bytes after the terminator (the terminator itself is not
    /// counted).
    pub fn cut_at_crlf(&mut self) -> usize {
        if let Some(pos) = self.info.iter().position(|&b| b == b'\r' || b == b'\n') {
            let removed = self.info.len() - pos - 1;
            self.info.truncate(pos);
            removed
        } else {
            0
        }
    }

    /// First byte of the information field ("data type indicator"), or a
    /// space if the info field is empty.
    #[must_use]
    pub fn get_dti(&self) -> u8 {
        *self.info.first().unwrap_or(&b' ')
    }

    /// First control octet.
    #[must_use]
    pub fn get_control(&self) -> Option<u8> {
        self.control.map(|(c, _)| c)
    }

    /// Second control octet, if modulo-128.
    #[must_use]
    pub fn get_c2(&self) -> Option<u8> {
        self.control.and_then(|(_, c2)| c2)
    }

    /// Protocol ID, present only on I and UI frames.
    #[must_use]
    pub fn get_pid(&self) -> Option<u8> {
        self.pid
    }

    /// Set protocol ID.
    pub fn set_pid(&mut self, pid: u8) {
        self.pid = Some(pid);
    }

    /// `true` if this looks like an APRS frame: >= 2 addresses, control ==
    /// `0x03` (UI), PID == `0xF0` (no layer 3).
    #[must_use]
    pub fn is_aprs(&self) -> bool {
        self.addresses.len() >= 2 && self.get_control() == Some(0x03) && self.pid == Some(0xF0)
    }

    /// `true` if the frame carries no addresses at all (non-AX.25 passthrough).
    #[must_use]
    pub fn is_null_frame(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Classify the control field into I/S/U. Guesses the modulo if it
    /// hasn't been determined yet.
    #[must_use]
    pub fn frame_type(&self) -> Option<FrameType> {
        let (c1, c2) = self.control?;
        let modulo = if self.meta.modulo != 0 {
            self.meta.modulo
        } else {
            frame_type::guess_modulo(c1, c2.is_some(), self.pid)
        };
        Some(frame_type::classify(c1, c2, modulo))
    }

    /// Command/response, from the destination/source H bits.
    #[must_use]
    pub fn cmd_res(&self) -> Option<frame_type::CmdRes> {
        if self.addresses.len() < 2 {
            return None;
        }
        Some(frame_type::CmdRes::from_h_bits(
            self.addresses[0].h(),
            self.addresses[1].h(),
        ))
    }

    /// Serialize to the canonical on-air octet buffer.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAX_FRAME_LEN.min(2 + self.addresses.len() * 7 + 2 + 1 + self.info.len()));
        for (i, a) in self.addresses.iter().enumerate() {
            let last = i + 1 == self.addresses.len();
            out.extend_from_slice(&a.encode(last));
        }
        if let Some((c1, c2)) = self.control {
            out.push(c1);
            if let Some(c2) = c2 {
                out.push(c2);
            }
        }
        if let Some(pid) = self.pid {
            out.push(pid);
        }
        out.extend_from_slice(&self.info);
        out
    }

    /// `SRC>DST[,digi,...*,...]:` — monitor-format address/path prefix.
    #[must_use]
    pub fn format_addrs(&self) -> String {
        if self.addresses.is_empty() {
            return String::new();
        }
        let mut s = String::new();
        s.push_str(&self.addresses[1].with_ssid());
        s.push('>');
        s.push_str(&self.addresses[0].with_ssid());
        s.push_str(&self.format_via_path());
        s.push(':');
        s
    }

    /// Just the `,digi,...*,...` via-path portion (no leading `SRC>DST`, no
    /// trailing `:`).
    #[must_use]
    pub fn format_via_path(&self) -> String {
        let mut s = String::new();
        for a in &self.addresses[2.min(self.addresses.len())..] {
            s.push(',');
            s.push_str(&a.with_ssid());
            if a.h() {
                s.push('*');
            }
        }
        s
    }

    /// Digipeater-invariant duplicate digest.
    #[must_use]
    pub fn dedupe_crc(&self) -> Option<u16> {
        if self.addresses.len() < 2 {
            return None;
        }
        Some(crc::dedupe_crc(
            &self.addresses[0].with_ssid(),
            &self.addresses[1].with_ssid(),
            &self.info,
        ))
    }

    /// Multimodem duplicate digest over the whole packed frame.
    #[must_use]
    pub fn m_m_crc(&self) -> u16 {
        crc::m_m_crc(&self.pack())
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

fn to_address(p: &address::ParsedAddress) -> Address {
    let mut a = Address::new(&p.call, p.ssid);
    a.set_h(p.heard);
    a
}

/// Normalize `qA?`-family q-constructs to uppercase `QA?`, as
/// `Frame::from_text` does for strictness 0 (IGate-sourced text).
/// Intentionally *not* applied in [`Frame::from_frame`] — there's no text
/// to normalize coming off the wire, so the asymmetry is inherent rather
/// than a bug to fix.
fn normalize_q_construct(call: &mut String) {
    if call.len() == 3 && call.as_bytes()[0] == b'q' && call.as_bytes()[1].to_ascii_uppercase() == b'A' {
        *call = call.to_ascii_uppercase();
    }
}

/// Decode `<0xHH>` hex escapes in monitor-format info text into single
/// bytes; anything else passes through as UTF-8 bytes.
fn decode_escapes(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' && bytes[i..].starts_with(b"<0x") && bytes.len() >= i + 6 && bytes[i + 5] == b'>' {
            let hex = std::str::from_utf8(&bytes[i + 3..i + 5])
                .map_err(|_| Error::ParseBadChar("invalid hex escape".to_string()))?;
            let v = u8::from_str_radix(hex, 16)
                .map_err(|_| Error::ParseBadChar(format!("invalid hex escape <0x{hex}>")))?;
            out.push(v);
            i += 6;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_basic_aprs() {
        let f = Frame::from_text("WB2OSZ-15>APDW17,WIDE1-1,WIDE2-1:Hello", 1).unwrap();
        assert_eq!(f.get_num_addr(), 4);
        assert_eq!(f.get_addr_with_ssid(1).unwrap(), "WB2OSZ-15");
        assert_eq!(f.get_addr_with_ssid(0).unwrap(), "APDW17");
        assert_eq!(f.get_info(), b"Hello");
        assert!(f.is_aprs());
    }

    #[test]
    fn scenario_2_empty_digipeater_rejected() {
        let r = Frame::from_text("AISAT-1>CQ,,::CQ-0     :From...", 0);
        assert!(r.is_err());
    }

    #[test]
    fn scenario_3_qconstruct_normalized() {
        let f = Frame::from_text("KB1POR>APU25N,TCPIP*,qAC,T2NUENGLD:data", 0).unwrap();
        assert_eq!(f.get_addr_with_ssid(2).unwrap(), "TCPIP");
        assert!(f.get_h(2).unwrap());
        assert_eq!(f.get_addr_with_ssid(3).unwrap(), "QAC");
    }

    #[test]
    fn from_text_strictness_2_rejects_trailing_star() {
        assert!(Frame::from_text("WIDE1-1*>APDW17:test", 2).is_err());
        assert!(Frame::from_text("WIDE1-1*>APDW17:test", 1).is_ok());
    }

    #[test]
    fn scenario_4_cut_at_crlf() {
        let mut f = Frame::new();
        f.set_info(b"line1\r\nline2\r").unwrap();
        let removed = f.cut_at_crlf();
        assert_eq!(removed, 7);
        assert_eq!(f.get_info(), b"line1");
    }

    #[test]
    fn round_trip_from_text_pack_from_frame() {
        let f = Frame::from_text("WB2OSZ-15>APDW17,WIDE1-1,WIDE2-1:Hello", 1).unwrap();
        let packed = f.pack();
        let f2 = Frame::from_frame(&packed, None).unwrap();
        assert_eq!(f2.pack(), packed);
    }

    #[test]
    fn last_address_bit_is_highest_index() {
        let f = Frame::from_text("WB2OSZ-15>APDW17,WIDE1-1,WIDE2-1:Hello", 1).unwrap();
        let packed = f.pack();
        let mut seen_last_at = None;
        let mut i = 6;
        while i < packed.len() {
            if packed[i] & 1 != 0 {
                seen_last_at = Some(i);
                break;
            }
            i += 7;
        }
        assert_eq!(seen_last_at, Some((f.get_num_addr() - 1) * 7 + 6));
    }

    #[test]
    fn insert_and_remove_addr_keep_count_consistent() {
        let mut f = Frame::from_text("WB2OSZ-15>APDW17:Hello", 1).unwrap();
        f.insert_addr(2, "WIDE1-1").unwrap();
        assert_eq!(f.get_num_addr(), 3);
        f.remove_addr(2).unwrap();
        assert_eq!(f.get_num_addr(), 2);
    }

    #[test]
    fn dedupe_crc_invariant_under_digi_reorder() {
        let a = Frame::from_text("WB2OSZ-15>APDW17,WIDE1-1,WIDE2-1:Hello", 1).unwrap();
        let b = Frame::from_text("WB2OSZ-15>APDW17,WIDE2-1,WIDE1-1:Hello", 1).unwrap();
        assert_eq!(a.dedupe_crc(), b.dedupe_crc());
    }

    #[test]
    fn null_frame() {
        let f = Frame::new();
        assert!(f.is_null_frame());
    }
}
