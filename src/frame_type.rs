/*! AX.25 control-byte classifier.

Turns the frame's first one or two control octets (plus, for the modulo
guess, the byte that follows them) into a tagged union of {I, S, U}.
*/

/// Supervisory-frame subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SFrameKind {
    /// Receive Ready.
    Rr,
    /// Receive Not Ready.
    Rnr,
    /// Reject.
    Rej,
    /// Selective Reject.
    Srej,
}

/// Unnumbered-frame subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UFrameKind {
    /// Set Asynchronous Balanced Mode Extended (modulo-128 connect).
    Sabme,
    /// Set Asynchronous Balanced Mode (modulo-8 connect).
    Sabm,
    /// Disconnect.
    Disc,
    /// Disconnected Mode.
    Dm,
    /// Unnumbered Acknowledge.
    Ua,
    /// Frame Reject.
    Frmr,
    /// Unnumbered Information.
    Ui,
    /// Exchange Identification.
    Xid,
    /// Test.
    Test,
    /// Any other, unrecognized, control byte with bits 3/4 don't-care mask 0xEF.
    Other(u8),
}

/// Command/response as decoded from the destination-H, source-H bit pair.
///
/// Preserved as-received, never normalized — both orderings are seen in
/// the wild and are ignored for APRS purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdRes {
    /// Both H bits set: legacy / ambiguous.
    Legacy11,
    /// (dst_h=1, src_h=0): command.
    Command,
    /// (dst_h=0, src_h=1): response.
    Response,
    /// Both H bits clear: legacy / ambiguous.
    Legacy00,
}

impl CmdRes {
    /// Decode from the two H bits.
    #[must_use]
    pub fn from_h_bits(dst_h: bool, src_h: bool) -> Self {
        match (dst_h, src_h) {
            (true, true) => CmdRes::Legacy11,
            (true, false) => CmdRes::Command,
            (false, true) => CmdRes::Response,
            (false, false) => CmdRes::Legacy00,
        }
    }
}

/// The decoded frame type, carrying the fields that depend on the I/S/U
/// split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameType {
    /// Information frame.
    I {
        /// Send sequence number.
        n_s: u8,
        /// Receive sequence number.
        n_r: u8,
        /// Poll bit.
        p: bool,
    },
    /// Supervisory frame.
    S {
        /// Subtype.
        kind: SFrameKind,
        /// Receive sequence number.
        n_r: u8,
        /// Poll/Final bit.
        pf: bool,
    },
    /// Unnumbered frame.
    U {
        /// Subtype.
        kind: UFrameKind,
        /// Poll/Final bit.
        pf: bool,
    },
}

impl FrameType {
    /// Short human-readable name, for logging.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            FrameType::I { .. } => "I",
            FrameType::S { kind, .. } => match kind {
                SFrameKind::Rr => "RR",
                SFrameKind::Rnr => "RNR",
                SFrameKind::Rej => "REJ",
                SFrameKind::Srej => "SREJ",
            },
            FrameType::U { kind, .. } => match kind {
                UFrameKind::Sabme => "SABME",
                UFrameKind::Sabm => "SABM",
                UFrameKind::Disc => "DISC",
                UFrameKind::Dm => "DM",
                UFrameKind::Ua => "UA",
                UFrameKind::Frmr => "FRMR",
                UFrameKind::Ui => "UI",
                UFrameKind::Xid => "XID",
                UFrameKind::Test => "TEST",
                UFrameKind::Other(_) => "U other",
            },
        }
    }
}

/// Guess whether a frame uses modulo 8 or modulo 128, when the data-link
/// state machine hasn't told us. A heuristic, not a certainty — kept
/// behind its own named function so a caller that *does* know the modulo
/// can skip it entirely.
///
/// `c` is the first control octet; `second` is the next octet (which, if
/// modulo is 128, is the second control octet); `next_after_control` is the
/// byte following the control field(s) if modulo were 8 (used to sniff for
/// PID 0xF0 or the segmentation PID 0x08).
#[must_use]
pub fn guess_modulo(c: u8, has_second_control_byte: bool, next_after_control: Option<u8>) -> u8 {
    if (c & 3) == 1 && has_second_control_byte {
        return 128;
    }
    if (c & 1) == 0 {
        if let Some(b) = next_after_control {
            if b == 0xF0 || b == 0x08 {
                return 128;
            }
        }
    }
    8
}

/// Classify a control field.
///
/// `control` is the first control octet. `control2` is the second control
/// octet, present only when `modulo == 128`.
#[must_use]
pub fn classify(control: u8, control2: Option<u8>, modulo: u8) -> FrameType {
    if (control & 1) == 0 {
        // I frame.
        let (n_s, n_r, p) = if modulo == 128 {
            let c2 = control2.unwrap_or(0);
            let n_s = (control >> 1) & 0x7f;
            let n_r = (c2 >> 1) & 0x7f;
            let p = c2 & 1 != 0;
            (n_s, n_r, p)
        } else {
            let n_s = (control >> 1) & 0x7;
            let n_r = (control >> 5) & 0x7;
            let p = (control >> 4) & 1 != 0;
            (n_s, n_r, p)
        };
        return FrameType::I { n_s, n_r, p };
    }
    if (control & 3) == 1 {
        // S frame.
        let kind = match (control >> 2) & 3 {
            0 => SFrameKind::Rr,
            1 => SFrameKind::Rnr,
            2 => SFrameKind::Rej,
            _ => SFrameKind::Srej,
        };
        let (n_r, pf) = if modulo == 128 {
            let c2 = control2.unwrap_or(0);
            ((c2 >> 1) & 0x7f, c2 & 1 != 0)
        } else {
            ((control >> 5) & 0x7, (control >> 4) & 1 != 0)
        };
        return FrameType::S { kind, n_r, pf };
    }
    // U frame.
    let pf = (control >> 4) & 1 != 0;
    let masked = control & 0xEF;
    let kind = match masked {
        0x6F => UFrameKind::Sabme,
        0x2F => UFrameKind::Sabm,
        0x43 => UFrameKind::Disc,
        0x0F => UFrameKind::Dm,
        0x63 => UFrameKind::Ua,
        0x87 => UFrameKind::Frmr,
        0x03 => UFrameKind::Ui,
        0xAF => UFrameKind::Xid,
        0xE3 => UFrameKind::Test,
        other => UFrameKind::Other(other),
    };
    FrameType::U { kind, pf }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_ui() {
        let ft = classify(0x03, None, 8);
        assert!(matches!(
            ft,
            FrameType::U {
                kind: UFrameKind::Ui,
                ..
            }
        ));
    }

    #[test]
    fn classify_sabm() {
        let ft = classify(0x2F, None, 8);
        assert!(matches!(
            ft,
            FrameType::U {
                kind: UFrameKind::Sabm,
                ..
            }
        ));
    }

    #[test]
    fn classify_i_mod8() {
        // N(S)=2, P=1, N(R)=3: 0b011_1_010_0 = 0x74
        let ft = classify(0b0111_0100, None, 8);
        assert_eq!(
            ft,
            FrameType::I {
                n_s: 2,
                n_r: 3,
                p: true
            }
        );
    }

    #[test]
    fn classify_rr_mod8() {
        // kind=RR(0), N(R)=5, P/F=1: (5<<5)|(1<<4)|(0<<2)|1 = 0b101_1_00_01 = 0xB1
        let ft = classify(0b1011_0001, None, 8);
        assert_eq!(
            ft,
            FrameType::S {
                kind: SFrameKind::Rr,
                n_r: 5,
                pf: true
            }
        );
    }

    #[test]
    fn guess_modulo_pid_heuristic() {
        assert_eq!(guess_modulo(0x00, false, Some(0xF0)), 128);
        assert_eq!(guess_modulo(0x00, false, Some(0x03)), 8);
        assert_eq!(guess_modulo(0x01, true, None), 128);
    }

    #[test]
    fn cmd_res_preserved_as_received() {
        assert_eq!(CmdRes::from_h_bits(true, false), CmdRes::Command);
        assert_eq!(CmdRes::from_h_bits(false, true), CmdRes::Response);
        assert_eq!(CmdRes::from_h_bits(true, true), CmdRes::Legacy11);
        assert_eq!(CmdRes::from_h_bits(false, false), CmdRes::Legacy00);
    }
}
