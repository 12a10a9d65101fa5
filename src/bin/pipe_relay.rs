//! Running-sum peer for bridges connected over named pipes.
//!
//! Usage:
//!   pipe_relay <input-pipe> <output-pipe>
//!
//! Both pipes must already exist (e.g. created with `mkfifo`). The input is
//! opened first, matching a bridge that opens its write end first.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use mocnet::cosim::relay::relay_lines;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pipe_relay", about = "Answer newline-delimited integers with their running sum")]
struct Args {
    /// Pipe the bridge writes to
    input: PathBuf,

    /// Pipe the bridge reads from
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let input = File::open(&args.input).with_context(|| format!("cannot open input pipe {}", args.input.display()))?;
    let output = OpenOptions::new()
        .write(true)
        .open(&args.output)
        .with_context(|| format!("cannot open output pipe {}", args.output.display()))?;
    info!("relaying {} -> {}", args.input.display(), args.output.display());

    let stats = relay_lines(BufReader::new(input), output).context("relay failed")?;
    info!("relayed {} values, skipped {}, final sum {}", stats.relayed, stats.skipped, stats.sum);
    Ok(())
}
