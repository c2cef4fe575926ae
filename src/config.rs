//! Command line surface and run configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::buffer::{SEQUENCE_SIZE, WORD_SIZE};
use crate::error::{Result, TraceIoError};

/// Direction of every I/O call in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    Read,
}

impl Mode {
    pub fn verb(self) -> &'static str {
        match self {
            Mode::Write => "write",
            Mode::Read => "read",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Accepts a plain byte count or one with a binary suffix (`4K`, `1MiB`).
pub fn parse_size_with_suffix(s: &str) -> std::result::Result<u64, String> {
    let s_trimmed = s.trim();
    if s_trimmed.is_empty() { return Err("Input string is empty".to_string()); }
    let first_non_digit_idx = s_trimmed.find(|c: char| !c.is_ascii_digit());
    let (num_str, suffix_orig) = match first_non_digit_idx {
        Some(0) => return Err(format!("Invalid format: missing numeric value in '{}'", s_trimmed)),
        Some(idx) => s_trimmed.split_at(idx),
        None => (s_trimmed, ""),
    };
    let num = num_str.parse::<u64>().map_err(|_| format!("Invalid number: '{}' in '{}'", num_str, s_trimmed))?;
    let suffix = suffix_orig.trim_start().to_uppercase();
    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        _ => return Err(format!("Unknown or misplaced size suffix: '{}' in '{}'", suffix_orig, s_trimmed)),
    };
    num.checked_mul(multiplier).ok_or_else(|| format!("Size '{}' overflows", s_trimmed))
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// The path of the target file
    pub file: PathBuf,
    /// The size of each IO request in bytes
    #[clap(value_parser = parse_size_with_suffix, allow_negative_numbers = true)]
    pub num_bytes: u64,
    /// The number of IO requests
    #[clap(allow_negative_numbers = true)]
    pub num_io: i64,
    /// Microseconds to sleep between IO requests; 0 means no sleep
    #[clap(allow_negative_numbers = true)]
    pub delay_us: i64,
    /// Perform reads instead of writes
    #[clap(short = 'r')]
    pub read: bool,
}

/// Validated, immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub path: PathBuf,
    pub bytes: usize,
    pub count: u64,
    pub delay: Duration,
    pub mode: Mode,
}

impl RunConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.file.as_os_str().is_empty() {
            return Err(TraceIoError::Config("file path must not be empty".to_string()));
        }
        let bad_args = || {
            TraceIoError::Config(format!(
                "num_bytes must exceed {} and be a multiple of {}, num_io must be 1 or greater, \
                 and delay cannot be negative (got num_bytes={}, num_io={}, delay_us={})",
                SEQUENCE_SIZE, WORD_SIZE, cli.num_bytes, cli.num_io, cli.delay_us
            ))
        };
        let bytes = usize::try_from(cli.num_bytes).map_err(|_| bad_args())?;
        if bytes <= SEQUENCE_SIZE || bytes % WORD_SIZE != 0 || cli.num_io <= 0 || cli.delay_us < 0 {
            return Err(bad_args());
        }
        Ok(RunConfig {
            path: cli.file.clone(),
            bytes,
            count: cli.num_io as u64,
            delay: Duration::from_micros(cli.delay_us as u64),
            mode: if cli.read { Mode::Read } else { Mode::Write },
        })
    }

    /// Parse and validate an argv-style iterator. Every clap error, including
    /// a help request, comes back as `Config`.
    #[cfg(test)]
    pub(crate) fn try_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| TraceIoError::Config(e.to_string()))?;
        Self::from_cli(cli)
    }
}
