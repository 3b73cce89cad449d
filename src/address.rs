/*! AX.25 address field: a six-character callsign, an SSID 0..15, and three
flag bits packed into the on-air seventh octet (`H R R S S S S L`, where
`L` is the last-address marker and `H` doubles as the command/response bit
on destination/source and as "heard" on digipeaters).
*/

use crate::error::{Error, Result};

/// Maximum characters in a callsign under strictness 0 (the lenient /
/// APRS-IS q-construct path), one less than the on-air 7-octet field to
/// leave room for flags encoded separately.
pub const MAX_ADDR_LEN: usize = 9;

/// A single AX.25 address: callsign, SSID, and the flag bits that live in
/// octet 7 of the on-air encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Callsign, space-padded to 6 characters when serialized, but stored
    /// here trimmed (no trailing spaces) for convenience.
    call: String,
    /// Substation ID, `0..=15`.
    ssid: u8,
    /// H bit: command/response on destination & source, "heard via" (i.e.
    /// repeated) on digipeaters.
    h: bool,
    /// Reserved bits, preserved as received. Two bits, `0..=3`.
    rr: u8,
}

impl Address {
    /// Build an address directly from parts, without going through the
    /// text parser. `rr` defaults to `0b11` (both reserved bits set),
    /// matching on-air convention.
    #[must_use]
    pub fn new(call: &str, ssid: u8) -> Self {
        Self {
            call: call.to_ascii_uppercase(),
            ssid: ssid & 0x0f,
            h: false,
            rr: 0b11,
        }
    }

    /// Callsign, without SSID.
    #[must_use]
    pub fn call(&self) -> &str {
        &self.call
    }

    /// SSID, `0..=15`.
    #[must_use]
    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// Set SSID. Values over 15 are masked to their low 4 bits, matching
    /// the on-air field width rather than rejecting — this setter is used
    /// on an already-constructed `Address`, not during parsing, where
    /// out-of-range is an `Error::ParseBadSsid` instead.
    pub fn set_ssid(&mut self, ssid: u8) {
        self.ssid = ssid & 0x0f;
    }

    /// H bit.
    #[must_use]
    pub fn h(&self) -> bool {
        self.h
    }

    /// Set H bit.
    pub fn set_h(&mut self, h: bool) {
        self.h = h;
    }

    /// Reserved bits, `0..=3`.
    #[must_use]
    pub fn rr(&self) -> u8 {
        self.rr
    }

    /// Set reserved bits.
    pub fn set_rr(&mut self, rr: u8) {
        self.rr = rr & 0b11;
    }

    /// `CALL-SSID` text form, omitting `-0`.
    #[must_use]
    pub fn with_ssid(&self) -> String {
        if self.ssid == 0 {
            self.call.clone()
        } else {
            format!("{}-{}", self.call, self.ssid)
        }
    }

    /// Encode into the 7-octet on-air shifted form.
    ///
    /// `last` sets the last-address marker bit.
    #[must_use]
    pub fn encode(&self, last: bool) -> [u8; 7] {
        let mut out = [0u8; 7];
        let padded = format!("{:<6}", self.call);
        for (i, ch) in padded.bytes().take(6).enumerate() {
            out[i] = ch << 1;
        }
        out[6] = (self.h as u8) << 7
            | (self.rr & 0b11) << 5
            | (self.ssid & 0x0f) << 1
            | (last as u8);
        out
    }

    /// Decode a 7-octet on-air field. Returns the address and whether the
    /// last-address bit was set.
    #[must_use]
    pub fn decode(octets: &[u8; 7]) -> (Self, bool) {
        let mut call = String::with_capacity(6);
        for &b in &octets[..6] {
            call.push((b >> 1) as char);
        }
        let call = call.trim_end().to_string();
        let last = octets[6] & 1 != 0;
        let h = octets[6] & 0x80 != 0;
        let rr = (octets[6] >> 5) & 0b11;
        let ssid = (octets[6] >> 1) & 0x0f;
        (
            Self {
                call,
                ssid,
                h,
                rr,
            },
            last,
        )
    }
}

/// Result of parsing one address field out of monitor-format text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    /// Parsed callsign (uppercased unless strictness 0 and input was
    /// lowercase and the caller cares to preserve case — preserved as-is
    /// here; normalization to uppercase is the caller's choice).
    pub call: String,
    /// SSID, `0..=15` for strictness 1/2, or up to 2 alphanumeric
    /// characters' worth of value for strictness 0 (e.g. APRS-IS
    /// `qAC`-style paths, whose "SSID" isn't really numeric for those
    /// forms — see [`parse`] strictness 0 handling).
    pub ssid: u8,
    /// Raw SSID text, preserved for strictness-0 non-numeric SSIDs (e.g.
    /// `TCPIP*` has no SSID at all; `WIDE2-1` has `"1"`).
    pub ssid_text: String,
    /// `*` (heard marker) terminated the field.
    pub heard: bool,
}

/// Strictness level for address-field parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Lenient: used for IGate-sourced text. Allows mixed case, longer
    /// callsigns, and non-numeric 2-character "SSID" text (q-constructs,
    /// `TCPIP`, etc). Trailing `*` is allowed.
    Lenient,
    /// Strict: callsign <= 6 chars, uppercase, SSID must be `0..=15` in
    /// digits only. Trailing `*` is allowed.
    Strict,
    /// Strict, and additionally forbids a trailing `*` (used when parsing
    /// fields where "heard" doesn't make sense, e.g. destination).
    StrictNoHeard,
}

/// Parse one address field (callsign, optional `-SSID`, optional trailing
/// `*`) out of `text`, starting at byte offset 0 of the slice given.
///
/// `position` is a human name for the field ("Destination", "Source",
/// "Digi1".."Digi8") used only in error messages.
pub fn parse(position: &str, text: &str, strictness: Strictness) -> Result<ParsedAddress> {
    if text.is_empty() {
        return Err(Error::ParseEmpty(position.to_string()));
    }
    let max_call_len = match strictness {
        Strictness::Lenient => MAX_ADDR_LEN - 1,
        Strictness::Strict | Strictness::StrictNoHeard => 6,
    };

    let mut chars = text.chars().peekable();
    let mut call = String::new();
    while let Some(&ch) = chars.peek() {
        if ch == '-' || ch == '*' {
            break;
        }
        if !ch.is_ascii_alphanumeric() {
            return Err(Error::ParseBadChar(format!(
                "{position}: invalid character {ch:?} in callsign"
            )));
        }
        call.push(ch);
        chars.next();
        if call.len() > max_call_len {
            return Err(Error::ParseTooLong(format!(
                "{position}: callsign longer than {max_call_len}"
            )));
        }
    }
    if call.is_empty() {
        return Err(Error::ParseEmpty(position.to_string()));
    }

    let mut ssid_text = String::new();
    let mut ssid = 0u8;
    if chars.peek() == Some(&'-') {
        chars.next();
        while let Some(&ch) = chars.peek() {
            if ch == '*' {
                break;
            }
            if !ch.is_ascii_alphanumeric() {
                return Err(Error::ParseBadChar(format!(
                    "{position}: invalid character {ch:?} in SSID"
                )));
            }
            ssid_text.push(ch);
            chars.next();
        }
        match strictness {
            Strictness::Strict | Strictness::StrictNoHeard => {
                if ssid_text.is_empty() || ssid_text.len() > 2 || !ssid_text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::ParseBadSsid(format!(
                        "{position}: SSID {ssid_text:?} is not 0..15"
                    )));
                }
                let v: u32 = ssid_text.parse().map_err(|_| {
                    Error::ParseBadSsid(format!("{position}: SSID {ssid_text:?} is not numeric"))
                })?;
                if v > 15 {
                    return Err(Error::ParseBadSsid(format!(
                        "{position}: SSID {v} out of range 0..15"
                    )));
                }
                ssid = v as u8;
            }
            Strictness::Lenient => {
                if ssid_text.is_empty() || ssid_text.len() > 2 {
                    return Err(Error::ParseTooLong(format!(
                        "{position}: SSID {ssid_text:?} too long"
                    )));
                }
                if let Ok(v) = ssid_text.parse::<u32>() {
                    ssid = (v & 0xff) as u8;
                }
            }
        }
    }

    let mut heard = false;
    if chars.peek() == Some(&'*') {
        if strictness == Strictness::StrictNoHeard {
            return Err(Error::ParseBadChar(format!(
                "{position}: trailing '*' not allowed here"
            )));
        }
        heard = true;
        chars.next();
    }

    if chars.peek().is_some() {
        return Err(Error::ParseBadChar(format!(
            "{position}: trailing garbage after address"
        )));
    }

    Ok(ParsedAddress {
        call,
        ssid,
        ssid_text,
        heard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_callsign() {
        let a = parse("Source", "WB2OSZ", Strictness::Strict).unwrap();
        assert_eq!(a.call, "WB2OSZ");
        assert_eq!(a.ssid, 0);
        assert!(!a.heard);
    }

    #[test]
    fn callsign_with_ssid() {
        let a = parse("Source", "WB2OSZ-15", Strictness::Strict).unwrap();
        assert_eq!(a.call, "WB2OSZ");
        assert_eq!(a.ssid, 15);
    }

    #[test]
    fn heard_marker() {
        let a = parse("Digi1", "WIDE1-1*", Strictness::Strict).unwrap();
        assert_eq!(a.call, "WIDE1");
        assert_eq!(a.ssid, 1);
        assert!(a.heard);
    }

    #[test]
    fn strict_no_heard_rejects_star() {
        assert!(parse("Destination", "APDW17*", Strictness::StrictNoHeard).is_err());
    }

    #[test]
    fn ssid_out_of_range_strict() {
        assert!(parse("Source", "WB2OSZ-16", Strictness::Strict).is_err());
    }

    #[test]
    fn lenient_qconstruct_alias() {
        let a = parse("Digi3", "qAC", Strictness::Lenient).unwrap();
        assert_eq!(a.call, "qAC");
        assert_eq!(a.ssid_text, "");
    }

    #[test]
    fn lenient_two_char_ssid() {
        let a = parse("Digi2", "T2NUENGLD", Strictness::Lenient).unwrap();
        assert_eq!(a.call, "T2NUENGLD");
    }

    #[test]
    fn empty_field_rejected() {
        assert!(parse("Digi1", "", Strictness::Lenient).is_err());
    }

    #[test]
    fn round_trip_encode_decode() {
        for ssid in 0..16u8 {
            let a = Address::new("WB2OSZ", ssid);
            let (b, last) = Address::decode(&a.encode(true));
            assert!(last);
            assert_eq!(a.call(), b.call());
            assert_eq!(a.ssid(), b.ssid());
        }
    }
}
