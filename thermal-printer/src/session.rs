//! Printer session: one open → write → cut → close cycle
//!
//! A [`PrinterSession`] owns the printer endpoint for exactly one job.
//! The endpoint is released by [`close`](PrinterSession::close), by
//! [`PrinterSession::scoped`] on every exit path, and by `Drop` as a last resort.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::encoding::{CharacterProfile, encode_strict};
use crate::error::{PrintError, PrintResult};
use crate::printer::{Device, Endpoint};

/// What happens to the paper after a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutMode {
    /// Feed, then cut through
    #[default]
    Full,
    /// Feed, then leave a small connection
    Partial,
    /// No cut command (printer or user tears the paper)
    None,
}

impl FromStr for CutMode {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(CutMode::Full),
            "partial" => Ok(CutMode::Partial),
            "none" | "off" => Ok(CutMode::None),
            other => Err(PrintError::InvalidConfig(format!("Unknown cut mode: {}", other))),
        }
    }
}

/// Per-job print settings
///
/// The character profile is mandatory; there is no implicit printer default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSettings {
    pub profile: CharacterProfile,
    pub cut: CutMode,
    /// Lines fed before the cut so the last line clears the blade
    pub feed_lines: u8,
    /// Paper width in characters
    pub paper_width: usize,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            profile: CharacterProfile::Cp1252,
            cut: CutMode::Full,
            feed_lines: 3,
            paper_width: 48,
        }
    }
}

impl PrintSettings {
    /// Command bytes for the configured cut, `None` when cutting is disabled
    pub fn cut_command(&self) -> Option<[u8; 4]> {
        match self.cut {
            // GS V 66 n - Full cut after feeding n lines
            CutMode::Full => Some([0x1D, 0x56, 0x42, self.feed_lines]),
            // GS V 67 n - Partial cut after feeding n lines
            CutMode::Partial => Some([0x1D, 0x56, 0x43, self.feed_lines]),
            CutMode::None => None,
        }
    }
}

/// Summary of a finished job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrintOutcome {
    pub bytes_written: usize,
    pub cut: bool,
}

/// Real-time printer status (DLE EOT 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrinterStatus {
    pub online: bool,
    pub raw: u8,
}

impl PrinterStatus {
    /// Decode a DLE EOT 1 response byte (bit 3 set = offline)
    pub fn from_byte(raw: u8) -> Self {
        Self {
            online: raw & 0x08 == 0,
            raw,
        }
    }
}

/// One exclusive interaction with the printer
pub struct PrinterSession<E: Endpoint> {
    endpoint: Option<E>,
    settings: PrintSettings,
    active_profile: Option<CharacterProfile>,
    outcome: PrintOutcome,
}

impl<E: Endpoint> PrinterSession<E> {
    /// Open the device and start a session
    ///
    /// Nothing is written on open; a failure here leaves no handle behind.
    #[instrument(skip(device))]
    pub fn open<D>(device: &D, settings: PrintSettings) -> PrintResult<Self>
    where
        D: Device<Endpoint = E>,
    {
        let endpoint = device.open()?;
        debug!("Session opened");
        Ok(Self {
            endpoint: Some(endpoint),
            settings,
            active_profile: None,
            outcome: PrintOutcome::default(),
        })
    }

    /// Open a session, run `job`, and close the session whatever `job` returns
    pub fn scoped<D, T, F>(device: &D, settings: PrintSettings, job: F) -> PrintResult<T>
    where
        D: Device<Endpoint = E>,
        F: FnOnce(&mut Self) -> PrintResult<T>,
    {
        let mut session = Self::open(device, settings)?;
        let result = job(&mut session);
        session.close();
        result
    }

    /// Settings this session was opened with
    pub fn settings(&self) -> &PrintSettings {
        &self.settings
    }

    /// Whether the endpoint is still held
    pub fn is_open(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Bytes written and cut state so far
    pub fn outcome(&self) -> PrintOutcome {
        self.outcome
    }

    fn endpoint(&mut self) -> PrintResult<&mut E> {
        self.endpoint
            .as_mut()
            .ok_or_else(|| PrintError::io("Printer session already closed"))
    }

    fn send(&mut self, data: &[u8]) -> PrintResult<()> {
        self.endpoint()?.write(data)?;
        self.outcome.bytes_written += data.len();
        Ok(())
    }

    /// Encode `text` under `profile` and print it
    ///
    /// Encoding happens before anything is sent, so a character outside the
    /// profile fails the call with zero bytes written. The code table is
    /// selected in a separate write the first time a profile is used.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn print_text(&mut self, text: &str, profile: CharacterProfile) -> PrintResult<()> {
        let bytes = encode_strict(text, profile).inspect_err(|e| {
            warn!(error = %e, "Rejected text");
        })?;

        if self.active_profile != Some(profile) {
            self.send(&profile.select_command())?;
            self.active_profile = Some(profile);
        }

        self.send(&bytes)?;
        info!(bytes = bytes.len(), "Text sent");
        Ok(())
    }

    /// Send a pre-built ESC/POS document
    ///
    /// Documents start with ESC @, which resets the code table, so the next
    /// `print_text` selects it again.
    pub fn write_raw(&mut self, data: &[u8]) -> PrintResult<()> {
        self.send(data)?;
        self.active_profile = None;
        debug!(bytes = data.len(), "Raw data sent");
        Ok(())
    }

    /// Issue the configured cut
    ///
    /// Returns whether a cut command was sent (`false` for [`CutMode::None`]).
    pub fn cut(&mut self) -> PrintResult<bool> {
        let Some(cmd) = self.settings.cut_command() else {
            debug!("Cut disabled");
            return Ok(false);
        };
        self.send(&cmd)?;
        self.outcome.cut = true;
        Ok(true)
    }

    /// Query real-time status over the IN endpoint
    pub fn status(&mut self) -> PrintResult<PrinterStatus> {
        // DLE EOT 1 - transmit printer status
        self.endpoint()?.write(&[0x10, 0x04, 0x01])?;
        let mut buf = [0u8; 1];
        let n = self.endpoint()?.read(&mut buf)?;
        if n == 0 {
            return Err(PrintError::io("Printer sent no status byte"));
        }
        Ok(PrinterStatus::from_byte(buf[0]))
    }

    /// Release the printer. Idempotent and infallible.
    pub fn close(&mut self) {
        if let Some(mut endpoint) = self.endpoint.take() {
            endpoint.close();
            debug!(
                bytes = self.outcome.bytes_written,
                cut = self.outcome.cut,
                "Session closed"
            );
        }
    }
}

impl<E: Endpoint> Drop for PrinterSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}
