//! CLI argument definitions

use crate::core::types::{PointerChain, ValueType};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "memory-recorder",
    version,
    about = "Resolve pointer chains and record memory regions of live processes",
    after_help = "\
EXAMPLES:
    memory-recorder list
    memory-recorder read --pid 4242 --address 7ff6a0010 --as f32
    memory-recorder resolve --pid 4242 \"game.exe+1F30,10,-8\" --as i32
    memory-recorder record --pid 4242 --address 7ff6a0010 --size 8 --period 10 --duration 5"
)]
pub struct Args {
    /// Configuration file (defaults to ./memory-recorder.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List processes that can be attached to
    List,

    /// List the modules loaded in a process
    Modules {
        #[arg(short, long)]
        pid: u32,
    },

    /// Read bytes or a typed value
    Read {
        #[arg(short, long)]
        pid: u32,

        /// Hex address, `0x` optional
        #[arg(short, long)]
        address: String,

        /// Number of bytes when no type is given
        #[arg(short, long, default_value_t = 16)]
        size: usize,

        /// Decode as u8..u64, i8..i64, f32 or f64
        #[arg(long = "as", value_name = "TYPE")]
        value_type: Option<ValueType>,
    },

    /// Resolve a pointer chain such as `game.exe+10,8,-4`
    Resolve {
        #[arg(short, long)]
        pid: u32,

        chain: PointerChain,

        /// Also read a value of this type at the resolved address
        #[arg(long = "as", value_name = "TYPE")]
        value_type: Option<ValueType>,
    },

    /// Record a region until the duration elapses or Ctrl+C
    Record {
        #[arg(short, long)]
        pid: u32,

        #[arg(short, long)]
        address: String,

        #[arg(short, long)]
        size: usize,

        /// Capture period in milliseconds (0 = configured default)
        #[arg(long, default_value_t = 0)]
        period: u64,

        /// Stop after N seconds (0 = until Ctrl+C)
        #[arg(long, default_value_t = 0)]
        duration: u64,

        /// Print every frame as hex
        #[arg(long)]
        dump: bool,
    },
}
