//! Printer selection: the real USB printer, or memory for dry runs

use thermal_printer::{
    Device, Endpoint, MemoryEndpoint, MemoryPrinter, PrintResult, PrintService, UsbEndpoint,
    UsbPrinter,
};
use tracing::info;

use crate::config::Config;

/// The printer a running bot talks to
#[derive(Debug, Clone)]
pub enum PrinterDevice {
    Usb(UsbPrinter),
    Memory(MemoryPrinter),
}

pub enum PrinterEndpoint {
    Usb(UsbEndpoint),
    Memory(MemoryEndpoint),
}

/// Print service used by every front-end
pub type SharedPrinter = PrintService<PrinterDevice>;

impl PrinterDevice {
    /// Pick the device described by the configuration
    pub fn from_config(config: &Config) -> PrintResult<Self> {
        if config.dry_run {
            info!("Dry run: printing into memory");
            return Ok(PrinterDevice::Memory(MemoryPrinter::new()));
        }
        info!(
            vendor_id = %format!("{:#06x}", config.usb.vendor_id),
            product_id = %format!("{:#06x}", config.usb.product_id),
            "Using USB printer"
        );
        Ok(PrinterDevice::Usb(UsbPrinter::new(config.usb)?))
    }
}

impl Device for PrinterDevice {
    type Endpoint = PrinterEndpoint;

    fn open(&self) -> PrintResult<PrinterEndpoint> {
        match self {
            PrinterDevice::Usb(p) => p.open().map(PrinterEndpoint::Usb),
            PrinterDevice::Memory(p) => p.open().map(PrinterEndpoint::Memory),
        }
    }

    fn is_present(&self) -> bool {
        match self {
            PrinterDevice::Usb(p) => p.is_present(),
            PrinterDevice::Memory(p) => p.is_present(),
        }
    }
}

impl Endpoint for PrinterEndpoint {
    fn write(&mut self, data: &[u8]) -> PrintResult<()> {
        match self {
            PrinterEndpoint::Usb(e) => e.write(data),
            PrinterEndpoint::Memory(e) => e.write(data),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> PrintResult<usize> {
        match self {
            PrinterEndpoint::Usb(e) => e.read(buf),
            PrinterEndpoint::Memory(e) => e.read(buf),
        }
    }

    fn close(&mut self) {
        match self {
            PrinterEndpoint::Usb(e) => e.close(),
            PrinterEndpoint::Memory(e) => e.close(),
        }
    }
}
