//! In-memory printer
//!
//! Records every write instead of sending it anywhere. Used for dry runs
//! (`PRINTER_DRY_RUN`) and to observe exactly what a session writes.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{PrintError, PrintResult};
use crate::printer::{Device, Endpoint};

#[derive(Debug, Default)]
struct State {
    writes: Vec<Vec<u8>>,
    opens: usize,
    closes: usize,
    missing: bool,
    denied: bool,
    fail_writes_after: Option<usize>,
    status: u8,
}

/// Printer that keeps written bytes in memory
///
/// Clones share the same recording, so a clone handed to a service can be
/// inspected through the handle kept by the caller.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrinter {
    state: Arc<Mutex<State>>,
}

impl MemoryPrinter {
    /// Create an attached, healthy in-memory printer
    pub fn new() -> Self {
        Self::default()
    }

    /// Printer that is not plugged in: `open` fails with `DeviceNotFound`
    pub fn missing() -> Self {
        let printer = Self::new();
        printer.state.lock().missing = true;
        printer
    }

    /// Printer that is present but cannot be claimed: `open` fails with `Permission`
    pub fn denied() -> Self {
        let printer = Self::new();
        printer.state.lock().denied = true;
        printer
    }

    /// Fail every write after the first `n` successful ones
    pub fn fail_writes_after(self, n: usize) -> Self {
        self.state.lock().fail_writes_after = Some(n);
        self
    }

    /// Byte returned to a DLE EOT status request
    pub fn with_status(self, status: u8) -> Self {
        self.state.lock().status = status;
        self
    }

    /// Each successful write, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// All written bytes concatenated
    pub fn bytes(&self) -> Vec<u8> {
        self.state.lock().writes.concat()
    }

    /// Number of times the printer was opened
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of times an open endpoint was closed
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Forget recorded writes and counters
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.writes.clear();
        state.opens = 0;
        state.closes = 0;
    }
}

impl Device for MemoryPrinter {
    type Endpoint = MemoryEndpoint;

    fn open(&self) -> PrintResult<MemoryEndpoint> {
        let mut state = self.state.lock();
        if state.missing {
            return Err(PrintError::DeviceNotFound("memory printer unplugged".into()));
        }
        if state.denied {
            return Err(PrintError::Permission("memory printer busy".into()));
        }
        state.opens += 1;
        Ok(MemoryEndpoint {
            state: Some(self.state.clone()),
        })
    }

    fn is_present(&self) -> bool {
        !self.state.lock().missing
    }
}

/// Open endpoint of a [`MemoryPrinter`]
pub struct MemoryEndpoint {
    state: Option<Arc<Mutex<State>>>,
}

impl MemoryEndpoint {
    fn state(&self) -> PrintResult<&Arc<Mutex<State>>> {
        self.state
            .as_ref()
            .ok_or_else(|| PrintError::io("memory endpoint already closed"))
    }
}

impl Endpoint for MemoryEndpoint {
    fn write(&mut self, data: &[u8]) -> PrintResult<()> {
        let mut state = self.state()?.lock();
        if let Some(limit) = state.fail_writes_after
            && state.writes.len() >= limit
        {
            return Err(PrintError::io("memory printer disconnected"));
        }
        debug!(data_len = data.len(), "memory write");
        state.writes.push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> PrintResult<usize> {
        let state = self.state()?.lock();
        match buf.first_mut() {
            Some(first) => {
                *first = state.status;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn close(&mut self) {
        if let Some(state) = self.state.take() {
            state.lock().closes += 1;
        }
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}
