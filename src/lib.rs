#![warn(missing_docs)]
/*! This crate implements AX.25 packet framing and two of its forward-error-
correcting wrappers, FX.25 and IL2P, plus the HDLC and byte-oriented EAS
bit-level receivers that feed them.

It's heavily inspired by amateur-radio TNC stacks such as Dire Wolf,
reworked as a library: callers own the bit source (an audio demodulator, a
file of recorded bits, a test harness) and drive it through a [`core::Core`]
handle, which dispatches per `(channel, subchannel, slice)` origin instead
of relying on global process state.

# Architecture overview

```text
   [ bits from a demodulator ]
              |
     core::Core::hdlc_rec_bit / fx25_rec_bit / il2p_rec_bit
              |
   [ per-origin HdlcReceiver / Fx25Receiver / Il2pReceiver ]
              |
        frame::Frame  (AX.25) or il2p::Header + payload
              |
        on_frame callback
```

Three independent receive paths share the crate:

* [`hdlc`] — NRZI decode, bit destuffing, flag search, FCS check, and an
  optional single-bit "fix bits" retry for marginal decodes. This also
  hosts the byte-oriented EAS `ZCZC`/`NNNN` capture, which never runs over
  HDLC framing at all.
* [`fx25`] — correlates one of several Reed-Solomon-protected frame tags,
  then recovers the block with [`rs`].
* [`il2p`] — correlates a fixed sync word, descrambles with a dedicated
  LFSR, then recovers a bit-packed header and tiled payload blocks with
  [`rs`].

[`frame`] is the AX.25 frame representation shared by the plain-HDLC and
FX.25 paths (IL2P carries its own header and has no AX.25 address field).
[`xid`] implements AX.25 2.2 link parameter negotiation, used over an
established I-frame connection rather than during framing itself.
[`config`] and [`ber`] are the ambient configuration and deterministic
error-injection pieces used by [`core::Core`] and its tests.

# Example

```
use ax25core::core::{Core, DecodedFrame};
use ax25core::config::Config;
use ax25core::frame::Frame;

let frame = Frame::from_text("WB2OSZ-15>APDW17,WIDE1-1:Hello, world!", 1).unwrap();
let bits = Core::hdlc_send_frame(&frame.pack(), false);

let mut core = Core::new(Config::default());
let mut decoded = Vec::new();
for bit in bits {
    core.hdlc_rec_bit((0, 0, 0), bit, false, &mut |f| decoded.push(f)).unwrap();
}
match &decoded[0] {
    DecodedFrame::Hdlc(frame) => assert_eq!(frame.get_info(), b"Hello, world!"),
    _ => unreachable!(),
}
```
*/

pub mod address;
pub mod ber;
pub mod config;
pub mod core;
pub mod correlate;
pub mod crc;
pub mod descramble;
pub mod error;
pub mod frame;
pub mod frame_type;
pub mod fx25;
pub mod hdlc;
pub mod il2p;
pub mod rawbits;
pub mod rs;
pub mod xid;

pub use error::{Error, Result};
