/*! Runtime configuration, loadable from JSON via `serde`/`serde_json`. */

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for one `Core` instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Attempt single-bit-error correction on HDLC FCS mismatch.
    #[serde(default = "default_true")]
    pub fix_bits: bool,
    /// Deliver frames even when the FCS doesn't match (after any fix-bits
    /// attempt). Diagnostic use only.
    #[serde(default)]
    pub passall: bool,
    /// If set, injects bit errors at this rate (`0.0..=1.0`) on receive,
    /// for regression testing.
    #[serde(default)]
    pub recv_ber: Option<f64>,
    /// Seed for the BER injector, when `recv_ber` is set.
    #[serde(default = "default_ber_seed")]
    pub recv_ber_seed: u32,
    /// Minimum accepted destuffed HDLC frame length, in octets (including
    /// the 2-byte FCS).
    #[serde(default = "default_min_frame_len")]
    pub min_frame_len: usize,
    /// Maximum accepted destuffed HDLC frame length, in octets.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Force a modulo (8 or 128) instead of guessing from the control byte.
    /// `0` (the default) means "guess".
    #[serde(default)]
    pub modulo_hint: u8,
    /// Per-channel whether IL2P frames on that channel carry a trailing
    /// whole-frame CRC in addition to per-block RS protection. Channels
    /// absent from the map default to `false`.
    #[serde(default)]
    pub il2p_crc_channels: HashMap<u16, bool>,
    /// Per-channel IL2P polarity: when `true`, header/payload/CRC blocks are
    /// byte-inverted on the wire (inverted-sync link). Absent channels
    /// default to normal polarity.
    #[serde(default)]
    pub il2p_invert_channels: HashMap<u16, bool>,
    /// Force a specific FX.25 correlation-tag id on transmit instead of
    /// picking the smallest fit. `None` means "pick automatically".
    #[serde(default)]
    pub fx25_force_ctag: Option<u8>,
}

fn default_true() -> bool {
    true
}
fn default_ber_seed() -> u32 {
    1
}
fn default_min_frame_len() -> usize {
    crate::frame::MIN_FRAME_LEN
}
fn default_max_frame_len() -> usize {
    crate::frame::MAX_FRAME_LEN
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fix_bits: default_true(),
            passall: false,
            recv_ber: None,
            recv_ber_seed: default_ber_seed(),
            min_frame_len: default_min_frame_len(),
            max_frame_len: default_max_frame_len(),
            modulo_hint: 0,
            il2p_crc_channels: HashMap::new(),
            il2p_invert_channels: HashMap::new(),
            fx25_force_ctag: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Whether IL2P frames on `channel` carry a trailing whole-frame CRC.
    #[must_use]
    pub fn il2p_crc_enabled(&self, channel: u16) -> bool {
        self.il2p_crc_channels.get(&channel).copied().unwrap_or(false)
    }

    /// Whether IL2P frames on `channel` use inverted polarity.
    #[must_use]
    pub fn il2p_invert_enabled(&self, channel: u16) -> bool {
        self.il2p_invert_channels.get(&channel).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn il2p_crc_defaults_false_for_unknown_channel() {
        let cfg = Config::default();
        assert!(!cfg.il2p_crc_enabled(5));
    }
}
