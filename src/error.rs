//! Error taxonomy for the packet pipeline.
//!
//! Every failure the core can produce is represented here. Nothing in this
//! crate panics on malformed input; recovery is local to whichever
//! operation hit the bad input.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All ways a core operation can fail.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Zero-length field in text form (e.g. an empty digipeater slot).
    #[error("empty field: {0}")]
    ParseEmpty(String),

    /// Non-alphanumeric character in a callsign, or bad `<0xHH>` hex escape.
    #[error("bad character: {0}")]
    ParseBadChar(String),

    /// Callsign longer than the allowed maximum, or info field over 2048 octets.
    #[error("too long: {0}")]
    ParseTooLong(String),

    /// SSID outside `0..=15`, or non-digit SSID in strict mode.
    #[error("bad SSID: {0}")]
    ParseBadSsid(String),

    /// Raw on-air frame shorter than 15 octets, or longer than the maximum.
    #[error("frame size out of range: {0}")]
    FrameSizeOut(String),

    /// HDLC FCS didn't match and passall is off.
    ///
    /// This is normally handled internally (fix-bits retry, then drop) and
    /// not surfaced to callers, but is available for diagnostics.
    #[error("FCS mismatch")]
    FcsMismatch,

    /// Reed-Solomon decode exceeded the correctable symbol budget.
    #[error("FEC block uncorrectable")]
    FecUncorrectable,

    /// IL2P trailing CRC failed after a successful RS decode.
    #[error("IL2P CRC mismatch")]
    Il2pCrcMismatch,

    /// IL2P header declared type 0 (raw AX.25 payload), which this crate
    /// does not decode.
    #[error("IL2P type-0 header not supported")]
    Il2pType0Header,

    /// A magic sentinel was corrupted, or address bookkeeping went
    /// inconsistent after a mutation. The operation that detected this is a
    /// no-op; this is logged with its originating function name.
    #[error("internal error in {0}: {1}")]
    InternalInvariant(&'static str, String),

    /// Config file I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Config file JSON failure.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}
