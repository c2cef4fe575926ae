use std::{fmt, io, path::PathBuf};

use crate::config::Mode;

/// Where in the bracketing sequence a toggle write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePhase {
    Startup,
    BeforeIo(Mode),
    AfterIo(Mode),
}

impl fmt::Display for TogglePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TogglePhase::Startup => write!(f, "at startup"),
            TogglePhase::BeforeIo(mode) => write!(f, "before {}", mode.verb()),
            TogglePhase::AfterIo(mode) => write!(f, "after {}", mode.verb()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceIoError {
    #[error("{0}")]
    Config(String),
    #[error("{}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("could not allocate a {bytes}-byte I/O buffer")]
    Alloc { bytes: usize },
    #[error("failure toggling {phase} to {}: {source}", .path.display())]
    Toggle {
        phase: TogglePhase,
        path: PathBuf,
        source: io::Error,
    },
    #[error("short {}: {transferred} of {requested} bytes", .op.verb())]
    ShortTransfer {
        op: Mode,
        transferred: usize,
        requested: usize,
    },
    #[error("{op} failed: {source}")]
    Io { op: &'static str, source: io::Error },
    #[error("interrupted after {completed} operations")]
    Interrupted { completed: u64 },
}

pub type Result<T> = std::result::Result<T, TraceIoError>;
