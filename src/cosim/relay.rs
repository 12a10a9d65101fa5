//! Running-sum relay used as a stand-alone peer on a pair of named pipes.

use log::{info, warn};
use std::io::{self, BufRead, Write};

/// Outcome of one relay session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub relayed: u64,
    pub skipped: u64,
    pub sum: i64,
}

/// Read one decimal integer per line, answer each with the running sum.
///
/// Malformed lines are logged and skipped. Returns once the reader reaches
/// end of stream.
pub fn relay_lines<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> io::Result<RelayStats> {
    let mut stats = RelayStats::default();
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                stats.skipped += 1;
                warn!("skipping line that is not valid UTF-8 ({} bytes): {}", raw.len(), e);
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<i64>() {
            Ok(value) => {
                stats.sum += value;
                stats.relayed += 1;
                info!("Read: {}, Output: {}", value, stats.sum);
                writeln!(writer, "{}", stats.sum)?;
                writer.flush()?;
            }
            Err(e) => {
                stats.skipped += 1;
                warn!("skipping malformed line {:?}: {}", trimmed, e);
            }
        }
    }
    Ok(stats)
}
