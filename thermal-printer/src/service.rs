//! Shared async print service
//!
//! The physical printer can only run one job at a time. [`PrintService`]
//! serialises jobs with a mutex held across the whole
//! open → write → cut → close cycle, and moves the blocking USB work off the
//! async runtime.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::error::{PrintError, PrintResult};
use crate::escpos::EscPosBuilder;
use crate::printer::Device;
use crate::session::{PrintOutcome, PrintSettings, PrinterSession};

/// Printer availability as seen by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PrinterState {
    /// Device found and reports online
    Connected,
    /// Device found but reports offline (cover open, paper out, error)
    Offline,
    /// No matching device attached
    Disconnected,
    /// Device found but could not be queried
    Error { error: String },
}

/// Mutex-guarded access to one printer
pub struct PrintService<D: Device> {
    device: Arc<D>,
    settings: PrintSettings,
    lock: Arc<Mutex<()>>,
}

impl<D: Device> Clone for PrintService<D> {
    fn clone(&self) -> Self {
        Self {
            device: self.device.clone(),
            settings: self.settings,
            lock: self.lock.clone(),
        }
    }
}

impl<D> PrintService<D>
where
    D: Device + 'static,
{
    /// Create a service around a device
    pub fn new(device: D, settings: PrintSettings) -> Self {
        Self {
            device: Arc::new(device),
            settings,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Settings every job runs with
    pub fn settings(&self) -> &PrintSettings {
        &self.settings
    }

    /// Document builder matching this printer's paper width and code page
    pub fn builder(&self) -> EscPosBuilder {
        EscPosBuilder::new(self.settings.paper_width, self.settings.profile)
    }

    /// Run one job as a single critical section
    ///
    /// The session is closed before the lock is released, on success and on error.
    pub async fn run<T, F>(&self, job: F) -> PrintResult<T>
    where
        F: FnOnce(&mut PrinterSession<D::Endpoint>) -> PrintResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.lock.clone().lock_owned().await;
        let device = self.device.clone();
        let settings = self.settings;

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            PrinterSession::scoped(device.as_ref(), settings, job)
        })
        .await
        .map_err(|e| PrintError::io(format!("Print task failed: {}", e)))?
    }

    /// Print plain text, optionally followed by the configured cut
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn print_text(&self, text: String, cut: bool) -> PrintResult<PrintOutcome> {
        let profile = self.settings.profile;
        let result = self
            .run(move |session| {
                session.print_text(&text, profile)?;
                if cut {
                    session.cut()?;
                }
                Ok(session.outcome())
            })
            .await;
        log_result(&result);
        result
    }

    /// Print a document built with [`builder`](Self::builder)
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub async fn print_document(&self, data: Vec<u8>, cut: bool) -> PrintResult<PrintOutcome> {
        let result = self
            .run(move |session| {
                session.write_raw(&data)?;
                if cut {
                    session.cut()?;
                }
                Ok(session.outcome())
            })
            .await;
        log_result(&result);
        result
    }

    /// Check presence, then ask the printer for its status
    ///
    /// Device enumeration runs on the blocking pool like the jobs do.
    pub async fn state(&self) -> PrinterState {
        let device = self.device.clone();
        let present = tokio::task::spawn_blocking(move || device.is_present())
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Presence check failed");
                false
            });
        if !present {
            return PrinterState::Disconnected;
        }
        match self.run(|session| session.status()).await {
            Ok(status) if status.online => PrinterState::Connected,
            Ok(_) => PrinterState::Offline,
            Err(PrintError::DeviceNotFound(_)) => PrinterState::Disconnected,
            Err(e) => PrinterState::Error {
                error: e.to_string(),
            },
        }
    }
}

fn log_result(result: &PrintResult<PrintOutcome>) {
    match result {
        Ok(outcome) => info!(
            bytes = outcome.bytes_written,
            cut = outcome.cut,
            "Print job finished"
        ),
        Err(e) => error!(error = %e, "Print job failed"),
    }
}
