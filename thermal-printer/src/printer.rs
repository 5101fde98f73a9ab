//! Printer adapters for sending ESC/POS data
//!
//! Supports:
//! - USB printers (bulk transfers through libusb)
//! - In-memory printers for dry runs and tests (see [`crate::MemoryPrinter`])

use std::time::Duration;

use rusb::{Device as RusbDevice, DeviceHandle, GlobalContext, UsbContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// An open connection to a printer
///
/// Dropping an endpoint without calling [`close`](Endpoint::close) must not
/// leak the underlying handle.
pub trait Endpoint: Send {
    /// Write all of `data` to the output endpoint
    fn write(&mut self, data: &[u8]) -> PrintResult<()>;

    /// Read a status response from the input endpoint
    fn read(&mut self, buf: &mut [u8]) -> PrintResult<usize>;

    /// Release the connection. Safe to call more than once.
    fn close(&mut self);
}

/// Trait for printer adapters
///
/// A device describes how to reach a printer; [`open`](Device::open)
/// acquires it for the duration of one job.
pub trait Device: Send + Sync {
    type Endpoint: Endpoint;

    /// Locate and open the printer
    fn open(&self) -> PrintResult<Self::Endpoint>;

    /// Check if the printer is attached, without claiming it
    fn is_present(&self) -> bool;
}

/// USB identification of the printer
///
/// Defaults match the 0x1504:0x0101 receipt printer
/// (`lsusb -vvv -d 1504:0101 | grep bEndpointAddress`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Bulk OUT endpoint
    pub out_ep: u8,
    /// Bulk IN endpoint
    pub in_ep: u8,
    /// Interface claimed for the transfer
    pub interface: u8,
    /// Bulk transfer timeout
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl UsbConfig {
    pub const DEFAULT_VENDOR_ID: u16 = 0x1504;
    pub const DEFAULT_PRODUCT_ID: u16 = 0x0101;
    pub const DEFAULT_OUT_EP: u8 = 0x02;
    pub const DEFAULT_IN_EP: u8 = 0x81;

    /// Create a config for a specific device, with default endpoints
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            ..Self::default()
        }
    }

    /// Set endpoint addresses
    pub fn with_endpoints(mut self, out_ep: u8, in_ep: u8) -> Self {
        self.out_ep = out_ep;
        self.in_ep = in_ep;
        self
    }

    /// Set transfer timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate endpoint directions
    pub fn validate(&self) -> PrintResult<()> {
        if self.out_ep & 0x80 != 0 {
            return Err(PrintError::InvalidConfig(format!(
                "OUT endpoint {:#04x} has the IN direction bit set",
                self.out_ep
            )));
        }
        if self.in_ep & 0x80 == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "IN endpoint {:#04x} is missing the IN direction bit",
                self.in_ep
            )));
        }
        if self.timeout.is_zero() {
            return Err(PrintError::InvalidConfig(
                "Transfer timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: Self::DEFAULT_VENDOR_ID,
            product_id: Self::DEFAULT_PRODUCT_ID,
            out_ep: Self::DEFAULT_OUT_EP,
            in_ep: Self::DEFAULT_IN_EP,
            interface: 0,
            timeout: Duration::from_secs(5),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// USB printer
///
/// Finds the device by vendor/product id on every [`open`](Device::open), so
/// unplugging and replugging the printer between jobs is harmless.
#[derive(Debug, Clone)]
pub struct UsbPrinter {
    config: UsbConfig,
}

impl UsbPrinter {
    /// Create a new USB printer
    pub fn new(config: UsbConfig) -> PrintResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn find(&self) -> PrintResult<RusbDevice<GlobalContext>> {
        let devices = GlobalContext::default()
            .devices()
            .map_err(|e| PrintError::io(format!("USB enumeration failed: {}", e)))?;

        for device in devices.iter() {
            let Ok(desc) = device.device_descriptor() else {
                continue;
            };
            if desc.vendor_id() == self.config.vendor_id
                && desc.product_id() == self.config.product_id
            {
                return Ok(device);
            }
        }

        Err(PrintError::DeviceNotFound(format!(
            "{:04x}:{:04x}",
            self.config.vendor_id, self.config.product_id
        )))
    }
}

impl Device for UsbPrinter {
    type Endpoint = UsbEndpoint;

    #[instrument(skip(self), fields(vid = %format!("{:04x}", self.config.vendor_id), pid = %format!("{:04x}", self.config.product_id)))]
    fn open(&self) -> PrintResult<UsbEndpoint> {
        let device = self.find()?;
        let mut handle = device
            .open()
            .map_err(|e| PrintError::from_usb_open(e, "open device"))?;

        // Linux binds usblp to most receipt printers
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(e) => warn!(error = %e, "Cannot enable kernel driver auto-detach"),
        }

        handle
            .claim_interface(self.config.interface)
            .map_err(|e| PrintError::from_usb_open(e, "claim interface"))?;

        info!(
            bus = device.bus_number(),
            address = device.address(),
            "Printer opened"
        );

        Ok(UsbEndpoint {
            handle: Some(handle),
            config: self.config,
        })
    }

    fn is_present(&self) -> bool {
        self.find().is_ok()
    }
}

/// Claimed USB interface of an open printer
pub struct UsbEndpoint {
    handle: Option<DeviceHandle<GlobalContext>>,
    config: UsbConfig,
}

impl UsbEndpoint {
    fn handle(&self) -> PrintResult<&DeviceHandle<GlobalContext>> {
        self.handle
            .as_ref()
            .ok_or_else(|| PrintError::io("USB handle already closed"))
    }
}

impl Endpoint for UsbEndpoint {
    #[instrument(skip(self, data), fields(ep = self.config.out_ep, data_len = data.len()))]
    fn write(&mut self, data: &[u8]) -> PrintResult<()> {
        let handle = self.handle()?;
        let mut offset = 0;

        while offset < data.len() {
            let written = handle
                .write_bulk(self.config.out_ep, &data[offset..], self.config.timeout)
                .map_err(|e| PrintError::from_usb_transfer(e, "bulk write"))?;
            if written == 0 {
                return Err(PrintError::io("Printer accepted zero bytes"));
            }
            offset += written;
        }

        debug!("Sent {} bytes", offset);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> PrintResult<usize> {
        let handle = self.handle()?;
        handle
            .read_bulk(self.config.in_ep, buf, self.config.timeout)
            .map_err(|e| PrintError::from_usb_transfer(e, "bulk read"))
    }

    fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.release_interface(self.config.interface) {
                warn!(error = %e, "Releasing USB interface failed");
            }
            debug!("USB handle closed");
        }
    }
}

impl Drop for UsbEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}
