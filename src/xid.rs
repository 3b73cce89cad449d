/*! XID (Exchange Identification) parameter negotiation.

AX.25 2.2's XID info field is a small TLV format: a format indicator, a
group identifier/length, then a run of `(PI, PL, PV)` parameter records.
[`crate::frame_type::UFrameKind::Xid`] only recognizes the control byte;
this module handles the info field's actual contents with fixed tables
and `Vec<u8>` accumulation, no intermediate allocation beyond what's
needed.
*/

use log::warn;

use crate::error::{Error, Result};
use crate::frame_type::CmdRes;

const FI: u8 = 0x82;
const GI: u8 = 0x80;

const PI_CLASSES: u8 = 2;
const PI_HDLC_OPT: u8 = 3;
const PI_I_FIELD_RX: u8 = 6;
const PI_WINDOW_RX: u8 = 8;
const PI_ACK_TIMER: u8 = 9;
const PI_RETRIES: u8 = 10;

/// Classes-of-procedures bit flags (PI 2), 16 bits.
pub mod classes {
    /// Balanced ABM.
    pub const BALANCED_ABM: u16 = 0x0100;
    /// Half duplex.
    pub const HALF_DUPLEX: u16 = 0x2000;
    /// Full duplex.
    pub const FULL_DUPLEX: u16 = 0x4000;
}

/// HDLC optional-functions bit flags (PI 3), 24 bits (stored in the low 24
/// bits of a `u32`).
pub mod hdlc_opt {
    /// Sync transmit.
    pub const SYNC_TX: u32 = 0x000002;
    /// Multiple SREJ frames outstanding at once (implies `SREJ`).
    pub const MULTI_SREJ: u32 = 0x000020;
    /// Modulo 8.
    pub const MODULO_8: u32 = 0x000400;
    /// Modulo 128 (extended sequencing).
    pub const MODULO_128: u32 = 0x000800;
    /// TEST frame supported.
    pub const TEST: u32 = 0x002000;
    /// REJ supported.
    pub const REJ: u32 = 0x020000;
    /// SREJ supported.
    pub const SREJ: u32 = 0x040000;
    /// 16-bit FCS.
    pub const FCS_16_BIT: u32 = 0x008000;
    /// Extended address field (unused by plain AX.25, carried for
    /// completeness).
    pub const EXTENDED_ADDRESS: u32 = 0x800000;
}

/// Negotiated (or to-be-negotiated) XID parameters. Every field is
/// optional: a real exchange omits parameters the sender doesn't care to
/// state, and a parser must tolerate that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XidParams {
    /// PI 2: classes of procedures bitmask.
    pub classes: Option<u16>,
    /// PI 3: HDLC optional functions bitmask (low 24 bits significant).
    pub hdlc_opt: Option<u32>,
    /// PI 5: maximum I-field length the sender can receive, in bits.
    pub i_field_len_rx: Option<u16>,
    /// PI 6: receive window size, `1..=127`.
    pub window_rx: Option<u8>,
    /// PI 7: acknowledgement timer, milliseconds.
    pub ack_timer_ms: Option<u16>,
    /// PI 8: retry count.
    pub retries: Option<u8>,
}

/// A command XID may advertise multiple REJ/SREJ options at once; a
/// response must commit to exactly one. Checked on both `encode` and
/// `parse` so the asymmetry holds for locally-built and wire-received
/// parameter sets alike.
fn check_reject_asymmetry(hdlc_opt: Option<u32>, cmd_or_res: CmdRes) -> Result<()> {
    if cmd_or_res != CmdRes::Response {
        return Ok(());
    }
    if let Some(h) = hdlc_opt {
        let picked = [hdlc_opt::REJ, hdlc_opt::SREJ, hdlc_opt::MULTI_SREJ]
            .into_iter()
            .filter(|&bit| h & bit != 0)
            .count();
        if picked > 1 {
            return Err(Error::ParseBadChar(
                "XID response must pick exactly one of REJ/SREJ/Multi-SREJ".to_string(),
            ));
        }
    }
    Ok(())
}

/// Encode a set of parameters into a complete XID info field, including the
/// format indicator and group header. `cmd_or_res` governs the REJ/SREJ
/// command/response asymmetry rule (see [`check_reject_asymmetry`]).
pub fn encode(params: &XidParams, cmd_or_res: CmdRes) -> Result<Vec<u8>> {
    check_reject_asymmetry(params.hdlc_opt, cmd_or_res)?;
    let mut body = Vec::new();
    if let Some(v) = params.classes {
        body.push(PI_CLASSES);
        body.push(2);
        body.extend_from_slice(&v.to_be_bytes());
    }
    if let Some(v) = params.hdlc_opt {
        body.push(PI_HDLC_OPT);
        body.push(3);
        body.extend_from_slice(&v.to_be_bytes()[1..]);
    }
    if let Some(v) = params.i_field_len_rx {
        body.push(PI_I_FIELD_RX);
        body.push(2);
        body.extend_from_slice(&v.to_be_bytes());
    }
    if let Some(v) = params.window_rx {
        body.push(PI_WINDOW_RX);
        body.push(1);
        body.push(v);
    }
    if let Some(v) = params.ack_timer_ms {
        body.push(PI_ACK_TIMER);
        body.push(2);
        body.extend_from_slice(&v.to_be_bytes());
    }
    if let Some(v) = params.retries {
        body.push(PI_RETRIES);
        body.push(1);
        body.push(v);
    }

    let mut out = Vec::with_capacity(4 + body.len());
    out.push(FI);
    out.push(GI);
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Human-readable summary of a decoded parameter set, for logs and
/// diagnostics. Order follows the PI order the parameters were defined in.
#[must_use]
pub fn describe(params: &XidParams) -> String {
    let mut parts = Vec::new();
    if let Some(c) = params.classes {
        if c & classes::FULL_DUPLEX != 0 {
            parts.push("Full-Duplex".to_string());
        }
        if c & classes::HALF_DUPLEX != 0 {
            parts.push("Half-Duplex".to_string());
        }
    }
    if let Some(h) = params.hdlc_opt {
        if h & hdlc_opt::MODULO_128 != 0 {
            parts.push("modulo-128".to_string());
        } else if h & hdlc_opt::MODULO_8 != 0 {
            parts.push("modulo-8".to_string());
        }
        if h & hdlc_opt::MULTI_SREJ != 0 {
            parts.push("Multi-SREJ".to_string());
        } else if h & hdlc_opt::SREJ != 0 {
            parts.push("SREJ".to_string());
        } else if h & hdlc_opt::REJ != 0 {
            parts.push("REJ".to_string());
        }
    }
    if let Some(v) = params.i_field_len_rx {
        parts.push(format!("I-Field-Length-Rx={v}"));
    }
    if let Some(v) = params.window_rx {
        parts.push(format!("Window-Size-Rx={v}"));
    }
    if let Some(v) = params.ack_timer_ms {
        parts.push(format!("Ack-Timer={v}ms"));
    }
    if let Some(v) = params.retries {
        parts.push(format!("Retries={v}"));
    }
    parts.join(", ")
}

/// Parse an XID info field back into its parameters. Unknown PIs are
/// skipped (logged at `warn`) — a receiver shouldn't reject a whole XID
/// over one parameter it doesn't recognize. `cmd_or_res` is the C/R sense
/// this XID arrived under, checked against the REJ/SREJ asymmetry rule.
pub fn parse(data: &[u8], cmd_or_res: CmdRes) -> Result<XidParams> {
    if data.len() < 4 {
        return Err(Error::FrameSizeOut("XID info field shorter than FI+GI+GL".to_string()));
    }
    if data[0] != FI {
        return Err(Error::ParseBadChar(format!("XID format indicator {:#x} != {FI:#x}", data[0])));
    }
    if data[1] != GI {
        return Err(Error::ParseBadChar(format!("XID group indicator {:#x} != {GI:#x}", data[1])));
    }
    let group_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    let body = &data[4..];
    if body.len() < group_len {
        return Err(Error::FrameSizeOut(format!(
            "XID group length {group_len} exceeds remaining {} bytes",
            body.len()
        )));
    }
    let body = &body[..group_len];

    let mut params = XidParams::default();
    let mut i = 0;
    while i + 2 <= body.len() {
        let pi = body[i];
        let pl = body[i + 1] as usize;
        let start = i + 2;
        if start + pl > body.len() {
            return Err(Error::FrameSizeOut(format!("XID parameter {pi} truncated")));
        }
        let pv = &body[start..start + pl];
        match pi {
            PI_CLASSES if pl == 2 => params.classes = Some(u16::from_be_bytes([pv[0], pv[1]])),
            PI_HDLC_OPT if pl == 3 => params.hdlc_opt = Some(u32::from_be_bytes([0, pv[0], pv[1], pv[2]])),
            PI_I_FIELD_RX if pl == 2 => params.i_field_len_rx = Some(u16::from_be_bytes([pv[0], pv[1]])),
            PI_WINDOW_RX if pl == 1 => params.window_rx = Some(pv[0]),
            PI_ACK_TIMER if pl == 2 => params.ack_timer_ms = Some(u16::from_be_bytes([pv[0], pv[1]])),
            PI_RETRIES if pl == 1 => params.retries = Some(pv[0]),
            other => warn!("xid: skipping unrecognized/malformed parameter PI={other} PL={pl}"),
        }
        i = start + pl;
    }
    check_reject_asymmetry(params.hdlc_opt, cmd_or_res)?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_all_params() {
        let p = XidParams {
            classes: Some(classes::FULL_DUPLEX),
            hdlc_opt: Some(hdlc_opt::MODULO_128 | hdlc_opt::SREJ),
            i_field_len_rx: Some(2048 * 8),
            window_rx: Some(7),
            ack_timer_ms: Some(3000),
            retries: Some(10),
        };
        let encoded = encode(&p, CmdRes::Command).unwrap();
        let decoded = parse(&encoded, CmdRes::Command).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn round_trip_partial_params() {
        let p = XidParams {
            window_rx: Some(4),
            ..Default::default()
        };
        let encoded = encode(&p, CmdRes::Command).unwrap();
        let decoded = parse(&encoded, CmdRes::Command).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn scenario_5_full_negotiation_round_trip() {
        let p = XidParams {
            classes: Some(classes::FULL_DUPLEX),
            hdlc_opt: Some(hdlc_opt::MODULO_128 | hdlc_opt::SREJ | hdlc_opt::MULTI_SREJ),
            i_field_len_rx: Some(256),
            window_rx: Some(7),
            ack_timer_ms: Some(3000),
            retries: Some(10),
        };
        let encoded = encode(&p, CmdRes::Command).unwrap();
        assert_eq!(encoded.len(), 27);
        assert_eq!(&encoded[0..6], &[0x82, 0x80, 0x00, 0x17, 0x02, 0x02]);

        let decoded = parse(&encoded, CmdRes::Command).unwrap();
        assert_eq!(decoded, p);

        let text = describe(&decoded);
        for substr in [
            "Full-Duplex",
            "REJ",
            "SREJ",
            "Multi-SREJ",
            "modulo-128",
            "I-Field-Length-Rx=256",
            "Window-Size-Rx=7",
        ] {
            assert!(text.contains(substr), "description {text:?} missing {substr:?}");
        }
    }

    #[test]
    fn unknown_parameter_is_skipped_not_fatal() {
        let mut encoded = encode(&XidParams { retries: Some(3), ..Default::default() }, CmdRes::Command).unwrap();
        // Splice in an unrecognized PI=99, PL=1 before the known one.
        let group_len_pos = 2;
        let mut body = encoded[4..].to_vec();
        body.splice(0..0, [99u8, 1, 0xff]);
        encoded.truncate(4);
        encoded[group_len_pos..4].copy_from_slice(&(body.len() as u16).to_be_bytes());
        encoded.extend_from_slice(&body);

        let decoded = parse(&encoded, CmdRes::Command).unwrap();
        assert_eq!(decoded.retries, Some(3));
    }

    #[test]
    fn bad_format_indicator_rejected() {
        let mut encoded = encode(&XidParams::default(), CmdRes::Command).unwrap();
        encoded[0] = 0;
        assert!(parse(&encoded, CmdRes::Command).is_err());
    }

    #[test]
    fn response_with_multiple_reject_modes_is_rejected() {
        let p = XidParams {
            hdlc_opt: Some(hdlc_opt::REJ | hdlc_opt::SREJ),
            ..Default::default()
        };
        assert!(encode(&p, CmdRes::Response).is_err());

        let encoded = encode(&p, CmdRes::Command).unwrap();
        assert!(parse(&encoded, CmdRes::Response).is_err());
        assert!(parse(&encoded, CmdRes::Command).is_ok());
    }
}
