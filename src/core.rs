/*! The `Core` dispatch handle: every receive/transmit entry point for a
packet pipeline instance, keyed per `(channel, subchannel, slice)` instead
of relying on process-global state.

Each per-origin receiver keeps the `Drop`-logging-stats convention used
throughout this crate (see [`crate::hdlc::HdlcReceiver`],
[`crate::il2p::Il2pReceiver`]); `Core` generalizes that to hold many such
per-origin states behind one handle.
*/

use std::collections::HashMap;

use log::debug;

use crate::ber::BerInjector;
use crate::config::Config;
use crate::error::Result;
use crate::frame_type::CmdRes;
use crate::fx25::{Fx25Receiver, Fx25Transmitter};
use crate::hdlc::{HdlcReceiver, HdlcTransmitter};
use crate::il2p::{self, Header as Il2pHeader, Il2pReceiver, Il2pTransmitter};
use crate::xid::{self, XidParams};

/// `(channel, subchannel, slice)`, the key every per-origin state table is
/// indexed by.
pub type Origin = (u16, u8, u8);

/// Data-carrier-detect state, one bit per `(channel, subchannel, slice)`.
/// `subchannel == u8::MAX` is reserved for an externally-fed DTMF decoder
/// slot — this crate doesn't implement DTMF decoding, but reserves the slot
/// so callers can set it without colliding with HDLC subchannels.
#[derive(Debug, Clone, Default)]
pub struct DcdMatrix {
    state: HashMap<Origin, bool>,
}

impl DcdMatrix {
    /// Set carrier-detect state for one origin.
    pub fn set(&mut self, origin: Origin, carrier: bool) {
        self.state.insert(origin, carrier);
    }

    /// Current carrier-detect state for one origin (`false` if never set).
    #[must_use]
    pub fn get(&self, origin: Origin) -> bool {
        self.state.get(&origin).copied().unwrap_or(false)
    }
}

/// A frame decoded by any of the three receive paths, tagged with which
/// path produced it.
#[derive(Debug, Clone)]
pub enum DecodedFrame {
    /// From the HDLC bit receiver.
    Hdlc(crate::frame::Frame),
    /// From FX.25.
    Fx25(crate::frame::Frame),
    /// From IL2P (no AX.25 address field; header carries src/dst directly).
    Il2p(Il2pHeader, Vec<u8>),
}

struct HdlcOrigin {
    receiver: HdlcReceiver,
}

struct Fx25Origin {
    receiver: Fx25Receiver,
}

struct Il2pOrigin {
    receiver: Il2pReceiver,
}

/// The packet-pipeline dispatch handle. Construct one per logical radio
/// instance; it owns every per-origin receiver and the shared
/// configuration and diagnostics they use.
pub struct Core {
    hdlc: HashMap<Origin, HdlcOrigin>,
    fx25: HashMap<Origin, Fx25Origin>,
    il2p: HashMap<Origin, Il2pOrigin>,
    dcd: DcdMatrix,
    ber: Option<BerInjector>,
    config: Config,
}

impl Core {
    /// Build a new core from `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let ber = config
            .recv_ber
            .map(|rate| BerInjector::new(config.recv_ber_seed, rate));
        Self {
            hdlc: HashMap::new(),
            fx25: HashMap::new(),
            il2p: HashMap::new(),
            dcd: DcdMatrix::default(),
            ber,
            config,
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to configuration (e.g. to flip `fix_bits` at
    /// runtime).
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Current data-carrier-detect matrix.
    #[must_use]
    pub fn dcd(&self) -> &DcdMatrix {
        &self.dcd
    }

    /// Process-wide frame allocation diagnostics: `(allocated, freed)`.
    #[must_use]
    pub fn alloc_counters(&self) -> (u64, u64) {
        crate::frame::allocation_stats()
    }

    fn maybe_flip(&mut self, bit: u8) -> u8 {
        match &mut self.ber {
            Some(b) => b.apply(bit),
            None => bit,
        }
    }

    /// Feed one raw channel bit into the HDLC receiver for `origin`,
    /// creating it on first use. `scrambled` must be consistent across
    /// calls for the same origin (it's fixed at first-seen time).
    pub fn hdlc_rec_bit(
        &mut self,
        origin: Origin,
        raw_bit: u8,
        scrambled: bool,
        on_frame: &mut dyn FnMut(DecodedFrame),
    ) -> Result<()> {
        let bit = self.maybe_flip(raw_bit);
        let min_len = self.config.min_frame_len;
        let max_len = self.config.max_frame_len;
        let fix_bits = self.config.fix_bits;
        let entry = self.hdlc.entry(origin).or_insert_with(|| {
            let mut r = HdlcReceiver::new(true, scrambled, min_len, max_len);
            r.set_fix_bits(fix_bits);
            HdlcOrigin { receiver: r }
        });
        if let Some(decoded) = entry.receiver.rec_bit(bit)? {
            self.dcd.set(origin, true);
            match crate::frame::Frame::from_frame(&decoded.data, None) {
                Ok(frame) => on_frame(DecodedFrame::Hdlc(frame)),
                Err(e) => debug!("core: HDLC payload didn't parse as a frame: {e}"),
            }
        }
        Ok(())
    }

    /// Feed one raw channel bit into the FX.25 receiver for `origin`,
    /// creating it on first use.
    pub fn fx25_rec_bit(&mut self, origin: Origin, raw_bit: u8, on_frame: &mut dyn FnMut(DecodedFrame)) -> Result<()> {
        let bit = self.maybe_flip(raw_bit);
        let entry = self.fx25.entry(origin).or_insert_with(|| Fx25Origin { receiver: Fx25Receiver::new() });
        if let Some(decoded) = entry.receiver.rec_bit(bit)? {
            self.dcd.set(origin, true);
            match crate::frame::Frame::from_frame(&decoded.data, None) {
                Ok(mut frame) => {
                    frame.meta.fec_type = crate::frame::FecType::Fx25;
                    frame.meta.retries = decoded.corrected_symbols as u32;
                    on_frame(DecodedFrame::Fx25(frame));
                }
                Err(e) => debug!("core: FX.25 payload didn't parse as a frame: {e}"),
            }
        }
        Ok(())
    }

    /// Feed one raw channel bit into the IL2P receiver for `origin`,
    /// creating it on first use.
    pub fn il2p_rec_bit(&mut self, origin: Origin, raw_bit: u8, max_fec: bool, on_frame: &mut dyn FnMut(DecodedFrame)) -> Result<()> {
        let bit = self.maybe_flip(raw_bit);
        let crc_enabled = self.config.il2p_crc_enabled(origin.0);
        let entry = self
            .il2p
            .entry(origin)
            .or_insert_with(|| Il2pOrigin { receiver: Il2pReceiver::new(max_fec, crc_enabled) });
        if let Some(decoded) = entry.receiver.rec_bit(bit)? {
            self.dcd.set(origin, true);
            on_frame(DecodedFrame::Il2p(decoded.header, decoded.payload));
        }
        Ok(())
    }

    /// Encode `data` (an AX.25 frame, no FCS) as an FX.25 channel bitstream,
    /// honoring `Config::fx25_force_ctag` unless the caller passes an
    /// explicit override.
    pub fn fx25_send_frame(&self, data: &[u8], nroots: usize, ctag_override: Option<u8>) -> Result<Vec<u8>> {
        let tx = Fx25Transmitter::new();
        let ctag = ctag_override.or(self.config.fx25_force_ctag);
        tx.encode_frame(data, nroots, ctag)
    }

    /// Encode an IL2P header + payload as a channel bitstream, honoring the
    /// origin channel's configured CRC and polarity settings.
    pub fn il2p_send_frame(&self, origin: Origin, header: &Il2pHeader, payload: &[u8]) -> Result<Vec<u8>> {
        let tx = Il2pTransmitter::new();
        let invert = self.config.il2p_invert_enabled(origin.0);
        let crc = self.config.il2p_crc_enabled(origin.0);
        tx.encode_frame(header, payload, invert, crc)
    }

    /// Encode an HDLC frame (addresses through info, FCS computed here)
    /// as a bit-stuffed, flag-delimited, optionally-scrambled bitstream.
    #[must_use]
    pub fn hdlc_send_frame(data: &[u8], scrambled: bool) -> Vec<u8> {
        let mut tx = HdlcTransmitter::new(scrambled);
        tx.encode_frame(data)
    }

    /// Parse an XID info field.
    pub fn xid_parse(data: &[u8], cmd_or_res: CmdRes) -> Result<XidParams> {
        xid::parse(data, cmd_or_res)
    }

    /// Encode an XID info field.
    pub fn xid_encode(params: &XidParams, cmd_or_res: CmdRes) -> Result<Vec<u8>> {
        xid::encode(params, cmd_or_res)
    }

    /// Human-readable summary of a set of XID parameters.
    #[must_use]
    pub fn xid_describe(params: &XidParams) -> String {
        xid::describe(params)
    }

    /// Tile an IL2P payload length into RS block geometries.
    #[must_use]
    pub fn il2p_payload_compute(length: usize, max_fec: bool) -> Vec<il2p::BlockGeometry> {
        il2p::payload_compute(length, max_fec)
    }

    /// Look up an FX.25 correlation-tag geometry by internal id.
    #[must_use]
    pub fn fx25_geometry(id: u8) -> Option<crate::rs::CtagGeometry> {
        crate::rs::geometry_by_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdlc_round_trip_through_core() {
        let mut core = Core::new(Config::default());
        let data = crate::frame::Frame::from_text("WB2OSZ-15>APDW17,WIDE1-1:Hello", 1)
            .unwrap()
            .pack();
        let bits = Core::hdlc_send_frame(&data, false);
        let mut got = Vec::new();
        for b in bits {
            core.hdlc_rec_bit((0, 0, 0), b, false, &mut |f| got.push(f)).unwrap();
        }
        assert_eq!(got.len(), 1);
        match &got[0] {
            DecodedFrame::Hdlc(frame) => assert_eq!(frame.get_info(), b"Hello"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn dcd_set_on_decode() {
        let mut core = Core::new(Config::default());
        let data = crate::frame::Frame::from_text("WB2OSZ-15>APDW17:Hi", 1).unwrap().pack();
        let bits = Core::hdlc_send_frame(&data, false);
        assert!(!core.dcd().get((1, 0, 0)));
        for b in bits {
            core.hdlc_rec_bit((1, 0, 0), b, false, &mut |_| {}).unwrap();
        }
        assert!(core.dcd().get((1, 0, 0)));
    }

    #[test]
    fn scenario_6_fx25_recovery_tags_frame_metadata() {
        use crate::fx25::Fx25Transmitter;

        let mut core = Core::new(Config::default());
        let frame = crate::frame::Frame::from_text("TEST>WB2OSZ:Foo?Bar?", 1).unwrap();
        let data = frame.pack();
        let mut bits = Fx25Transmitter::new().encode_frame(&data, 16, None).unwrap();
        for i in 0..8 {
            bits[64 + i * 8] ^= 1;
        }
        let mut got = Vec::new();
        for b in bits {
            core.fx25_rec_bit((3, 0, 0), b, &mut |f| got.push(f)).unwrap();
        }
        assert_eq!(got.len(), 1);
        match &got[0] {
            DecodedFrame::Fx25(frame) => {
                assert_eq!(frame.meta.fec_type, crate::frame::FecType::Fx25);
                assert_eq!(frame.meta.retries, 8);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn il2p_crc_config_wires_through_core() {
        let mut cfg = Config::default();
        cfg.il2p_crc_channels.insert(4, true);
        let core = Core::new(cfg);
        let header = crate::il2p::Header {
            dst: "APDW17".to_string(),
            dst_ssid: 0,
            src: "WB2OSZ".to_string(),
            src_ssid: 15,
            ui: true,
            fec: false,
            hdrtype1: true,
            pid: crate::il2p::Pids::NO_L3,
            control: 0x03,
            payload_size: 0,
        };
        let bits = core.il2p_send_frame((4, 0, 0), &header, b"hi").unwrap();

        let mut core = core;
        let mut got = Vec::new();
        for b in bits {
            core.il2p_rec_bit((4, 0, 0), b, false, &mut |f| got.push(f)).unwrap();
        }
        assert_eq!(got.len(), 1);
        match &got[0] {
            DecodedFrame::Il2p(_, payload) => assert_eq!(payload, b"hi"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn recv_ber_is_deterministic_across_cores() {
        let mut cfg = Config::default();
        cfg.recv_ber = Some(0.02);
        cfg.recv_ber_seed = 7;
        let mut a = Core::new(cfg.clone());
        let mut b = Core::new(cfg);
        let data = crate::frame::Frame::from_text("WB2OSZ-15>APDW17:Hi", 1).unwrap().pack();
        let bits = Core::hdlc_send_frame(&data, false);
        let mut got_a = Vec::new();
        let mut got_b = Vec::new();
        for &bit in &bits {
            a.hdlc_rec_bit((2, 0, 0), bit, false, &mut |f| got_a.push(format!("{f:?}"))).unwrap();
            b.hdlc_rec_bit((2, 0, 0), bit, false, &mut |f| got_b.push(format!("{f:?}"))).unwrap();
        }
        assert_eq!(got_a, got_b);
    }
}
