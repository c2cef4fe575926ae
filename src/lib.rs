//! Block-sized file I/O with every call bracketed by writes to the kernel
//! `tracing_on` switch, so a trace capture can be cut down to exactly one
//! write (plus its fsync) or one read.
//!
//! Each written record starts with a sequence marker so the record on disk
//! can be matched to the trace window that produced it.

pub mod buffer;
pub mod config;
pub mod driver;
pub mod error;
pub mod log;
pub mod toggle;

pub use buffer::{SequenceBuffer, FILLER, INITIAL_MARKER, SEQUENCE_SIZE, WORD_SIZE};
pub use config::{Cli, Mode, RunConfig};
pub use driver::{drive, open_target, run, IoTarget, RunSummary};
pub use error::{Result, TogglePhase, TraceIoError};
pub use toggle::{TraceToggle, DEFAULT_TOGGLE_PATH};
