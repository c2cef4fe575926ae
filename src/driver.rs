//! The bracketed I/O loop.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::buffer::{SequenceBuffer, INITIAL_MARKER};
use crate::config::{Mode, RunConfig};
use crate::error::{Result, TogglePhase, TraceIoError};
use crate::log::log_simple;
use crate::toggle::TraceToggle;

/// Something the loop can read from, write to, and force to stable storage.
pub trait IoTarget: Read + Write {
    fn barrier(&mut self) -> io::Result<()>;
}

impl IoTarget for File {
    fn barrier(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: Mode,
    /// Operations whose enable/disable pair both succeeded.
    pub completed: u64,
    pub bytes_transferred: u64,
    /// Marker carried by the first and the last write; `None` for reads.
    pub first_marker: Option<u32>,
    pub last_marker: Option<u32>,
    /// Control file writes over the whole run, the startup disable included.
    pub toggle_transitions: u64,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} operations, {} bytes in {:.2?}",
            self.completed,
            self.mode,
            self.bytes_transferred,
            self.elapsed
        )?;
        if let (Some(first), Some(last)) = (self.first_marker, self.last_marker) {
            write!(f, ", markers {:#010X}..={:#010X}", first, last)?;
        }
        write!(f, ", {} toggle writes", self.toggle_transitions)
    }
}

/// Open the target the way the mode needs it: create + write-only (0600) for
/// writes, read-only for reads. Never truncates; the offset starts at 0.
pub fn open_target(path: &Path, mode: Mode) -> Result<File> {
    let mut opts = OpenOptions::new();
    match mode {
        Mode::Write => {
            opts.write(true).create(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                opts.mode(0o600);
            }
        }
        Mode::Read => {
            opts.read(true);
        }
    }
    bypass_page_cache(&mut opts);
    let file = opts
        .open(path)
        .map_err(|source| TraceIoError::Open { path: path.to_path_buf(), source })?;
    disable_caching(&file).map_err(|source| TraceIoError::Open { path: path.to_path_buf(), source })?;
    Ok(file)
}

cfg_if::cfg_if! {
    if #[cfg(all(feature = "direct", target_os = "linux"))] {
        fn bypass_page_cache(opts: &mut OpenOptions) {
            use std::os::unix::fs::OpenOptionsExt;
            opts.custom_flags(libc::O_DIRECT);
        }

        fn disable_caching(_file: &File) -> io::Result<()> {
            Ok(())
        }
    } else if #[cfg(all(feature = "direct", target_os = "macos"))] {
        fn bypass_page_cache(_opts: &mut OpenOptions) {}

        /// No O_DIRECT on macOS: stop readahead first, then F_NOCACHE.
        fn disable_caching(file: &File) -> io::Result<()> {
            use std::os::unix::io::AsRawFd;

            let fd = file.as_raw_fd();
            if unsafe { libc::fcntl(fd, libc::F_RDAHEAD, 0) } == -1 {
                return Err(io::Error::last_os_error());
            }
            if unsafe { libc::fcntl(fd, libc::F_NOCACHE, 1) } == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    } else {
        fn bypass_page_cache(_opts: &mut OpenOptions) {}

        fn disable_caching(_file: &File) -> io::Result<()> {
            Ok(())
        }
    }
}

/// Full run against the file named in `config`.
///
/// `toggle` must already be forced off; the target is only opened after
/// that. The target, the buffer and the progress bar are all dropped before
/// this returns, on success or failure.
pub fn run<W: Write>(config: &RunConfig, toggle: &mut TraceToggle<W>, stop: &AtomicBool) -> Result<RunSummary> {
    let mut target = open_target(&config.path, config.mode)?;
    let mut buffer = SequenceBuffer::new(config.bytes, INITIAL_MARKER)?;

    #[cfg(feature = "debug-dump")]
    crate::log::log_simple(format!(
        "bytes: {} buffer:\n{}",
        buffer.len(),
        buffer.hex_dump()
    ));

    let pb = ProgressBar::new(config.count);
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("##-"));
    }
    let result = drive(config, &mut target, &mut buffer, toggle, stop, || pb.inc(1));
    match &result {
        Ok(_) => pb.finish_and_clear(),
        Err(_) => pb.abandon(),
    }
    result
}

/// The loop itself. `on_complete` runs after each disable, outside the trace
/// window.
pub fn drive<T, W, F>(
    config: &RunConfig,
    target: &mut T,
    buffer: &mut SequenceBuffer,
    toggle: &mut TraceToggle<W>,
    stop: &AtomicBool,
    mut on_complete: F,
) -> Result<RunSummary>
where
    T: IoTarget,
    W: Write,
    F: FnMut(),
{
    let mode = config.mode;
    let requested = buffer.len();
    let start = Instant::now();
    let mut summary = RunSummary {
        mode,
        completed: 0,
        bytes_transferred: 0,
        first_marker: None,
        last_marker: None,
        toggle_transitions: 0,
        elapsed: Duration::ZERO,
    };

    for i in 0..config.count {
        if stop.load(Ordering::SeqCst) {
            return Err(TraceIoError::Interrupted { completed: summary.completed });
        }

        toggle.enable(TogglePhase::BeforeIo(mode))?;
        if let Err(io_err) = transfer(mode, target, buffer) {
            // Keep the I/O error; the disable is only best effort here.
            if let Err(e) = toggle.disable(TogglePhase::AfterIo(mode)) {
                log_simple(format!("{} (while aborting on: {})", e, io_err));
            }
            if toggle.is_enabled() == Some(true) {
                log_simple(format!("Tracing is still enabled at {}", toggle.path().display()));
            }
            return Err(io_err);
        }
        toggle.disable(TogglePhase::AfterIo(mode))?;

        summary.completed += 1;
        summary.bytes_transferred += requested as u64;
        if mode == Mode::Write {
            let marker = buffer.marker();
            summary.first_marker.get_or_insert(marker);
            summary.last_marker = Some(marker);
        }
        on_complete();

        let more = i + 1 < config.count;
        if more && !config.delay.is_zero() {
            thread::sleep(config.delay);
        }
        if more && mode == Mode::Write {
            buffer.advance_marker();
        }
    }

    summary.elapsed = start.elapsed();
    summary.toggle_transitions = toggle.transitions();
    Ok(summary)
}

/// One full-buffer write plus barrier, or one full-buffer read.
fn transfer<T: IoTarget>(mode: Mode, target: &mut T, buffer: &mut SequenceBuffer) -> Result<()> {
    let requested = buffer.len();
    match mode {
        Mode::Write => {
            let written = target
                .write(buffer.as_slice())
                .map_err(|source| TraceIoError::Io { op: "write", source })?;
            if written != requested {
                return Err(TraceIoError::ShortTransfer { op: mode, transferred: written, requested });
            }
            // The write must reach the block layer while tracing is on.
            target.barrier().map_err(|source| TraceIoError::Io { op: "fsync", source })
        }
        Mode::Read => {
            let read = target
                .read(buffer.as_mut_slice())
                .map_err(|source| TraceIoError::Io { op: "read", source })?;
            if read != requested {
                return Err(TraceIoError::ShortTransfer { op: mode, transferred: read, requested });
            }
            Ok(())
        }
    }
}
