/*! Standalone bit-stream decoder: reads a file of raw channel bits (one
bit per byte, `0x00`/`0x01`, the format [`ax25core::hdlc`]'s tests use
directly) and prints every frame decoded from it.

```no_run
$ ./tncd --mode hdlc -r captured.bits
$ ./tncd --mode fx25 -r captured.bits -v 2
```
*/
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use ax25core::config::Config;
use ax25core::core::{Core, DecodedFrame};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Hdlc,
    Fx25,
    Il2p,
}

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    #[arg(long = "mode", value_enum, default_value = "hdlc")]
    mode: Mode,

    #[arg(short = 'r', help = "File of raw bits, one 0x00/0x01 byte per channel bit")]
    read: PathBuf,

    #[arg(long, help = "Channel is G3RUH-scrambled (HDLC mode only)")]
    scrambled: bool,

    #[arg(long, help = "Use the larger IL2P FEC geometry (IL2P mode only)")]
    max_fec: bool,

    #[arg(short = 'v', default_value = "0")]
    verbose: usize,

    #[arg(long, help = "Config file (JSON), overrides built-in defaults")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("ax25core")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let config = match &opt.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut core = Core::new(config);

    let bits = fs::read(&opt.read)?;
    let bits: Vec<u8> = bits.into_iter().map(|b| if b != 0 { 1 } else { 0 }).collect();

    let origin = (0u16, 0u8, 0u8);
    let mut count = 0usize;
    for bit in bits {
        let mut print_frame = |f: DecodedFrame| {
            count += 1;
            match f {
                DecodedFrame::Hdlc(frame) | DecodedFrame::Fx25(frame) => {
                    println!("{}", frame.format_addrs());
                }
                DecodedFrame::Il2p(header, payload) => {
                    println!("{} ({} bytes)", header.describe(), payload.len());
                }
            }
        };
        match opt.mode {
            Mode::Hdlc => core.hdlc_rec_bit(origin, bit, opt.scrambled, &mut print_frame)?,
            Mode::Fx25 => core.fx25_rec_bit(origin, bit, &mut print_frame)?,
            Mode::Il2p => core.il2p_rec_bit(origin, bit, opt.max_fec, &mut print_frame)?,
        }
    }
    let (allocated, freed) = core.alloc_counters();
    eprintln!("Decoded {count} frames. Frame allocations: {allocated} made, {freed} freed.");
    Ok(())
}
