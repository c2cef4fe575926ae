//! The kernel `tracing_on` switch.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TogglePhase, TraceIoError};

pub const DEFAULT_TOGGLE_PATH: &str = "/sys/kernel/debug/tracing/tracing_on";

pub const ENABLE_BYTE: u8 = b'1';

/// The historical tool wrote "1" on both edges; that build keeps the byte.
#[cfg(not(feature = "legacy-disable"))]
pub const DISABLE_BYTE: u8 = b'0';
#[cfg(feature = "legacy-disable")]
pub const DISABLE_BYTE: u8 = b'1';

/// One open handle on a boolean trace control file.
///
/// Every state change is a single one-byte `write`; anything other than the
/// byte being accepted is a failure. The handle is closed on drop.
pub struct TraceToggle<W: Write = File> {
    control: W,
    path: PathBuf,
    enabled: Option<bool>,
    transitions: u64,
}

impl TraceToggle<File> {
    /// Open `path` write-only and force tracing off before returning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let control = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|source| TraceIoError::Open { path: path.to_path_buf(), source })?;
        let mut toggle = TraceToggle::from_writer(control, path);
        toggle.force_disabled()?;
        Ok(toggle)
    }
}

impl<W: Write> TraceToggle<W> {
    /// Wrap an already-open control resource. `path` is only used in
    /// diagnostics. The state is unknown until the first toggle.
    pub fn from_writer<P: AsRef<Path>>(control: W, path: P) -> Self {
        TraceToggle {
            control,
            path: path.as_ref().to_path_buf(),
            enabled: None,
            transitions: 0,
        }
    }

    /// Disable regardless of what the kernel state currently is.
    pub fn force_disabled(&mut self) -> Result<()> {
        self.set(DISABLE_BYTE, false, TogglePhase::Startup)
    }

    pub fn enable(&mut self, phase: TogglePhase) -> Result<()> {
        self.set(ENABLE_BYTE, true, phase)
    }

    pub fn disable(&mut self, phase: TogglePhase) -> Result<()> {
        self.set(DISABLE_BYTE, false, phase)
    }

    /// `None` until a toggle has succeeded.
    pub fn is_enabled(&self) -> Option<bool> {
        self.enabled
    }

    /// Successful writes to the control resource, including the startup one.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn get_ref(&self) -> &W {
        &self.control
    }

    fn set(&mut self, byte: u8, enabled: bool, phase: TogglePhase) -> Result<()> {
        let outcome = match self.control.write(&[byte]) {
            Ok(1) => Ok(()),
            Ok(n) => Err(io::Error::new(
                ErrorKind::WriteZero,
                format!("control file accepted {} of 1 bytes", n),
            )),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                self.enabled = Some(enabled);
                self.transitions += 1;
                Ok(())
            }
            Err(source) => Err(TraceIoError::Toggle { phase, path: self.path.clone(), source }),
        }
    }
}
