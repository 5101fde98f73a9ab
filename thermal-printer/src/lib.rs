//! # thermal-printer
//!
//! ESC/POS thermal printer library for USB receipt printers.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - Strict code page encoding (CP1252 for Æ, Ø, Å)
//! - ESC/POS command building
//! - USB printing (bulk transfers via libusb)
//! - Print sessions with guaranteed release of the device
//! - A mutex-guarded async service for concurrent front-ends
//! - Image rasterising
//!
//! WHAT to print (jokes, receipts, chat messages) stays in application code.
//!
//! ## Example
//!
//! ```ignore
//! use thermal_printer::{CharacterProfile, PrintSettings, PrinterSession, UsbConfig, UsbPrinter};
//!
//! let printer = UsbPrinter::new(UsbConfig::default())?;
//!
//! PrinterSession::scoped(&printer, PrintSettings::default(), |session| {
//!     session.print_text("Blåbærsyltetøy\n", CharacterProfile::Cp1252)?;
//!     session.cut()?;
//!     Ok(())
//! })?;
//! ```

mod encoding;
mod error;
mod escpos;
mod memory;
mod printer;
mod service;
mod session;

// Re-exports
pub use encoding::{
    CharacterProfile, decode, encode_strict, is_encodable, pad, text_width, truncate, wrap_text,
};
pub use error::{PrintError, PrintResult};
pub use escpos::{EscPosBuilder, MAX_IMAGE_WIDTH, RASTER_BAND_ROWS};
pub use memory::{MemoryEndpoint, MemoryPrinter};
pub use printer::{Device, Endpoint, UsbConfig, UsbEndpoint, UsbPrinter};
pub use service::{PrintService, PrinterState};
pub use session::{CutMode, PrintOutcome, PrintSettings, PrinterSession, PrinterStatus};

#[cfg(feature = "image")]
pub use escpos::{load_image, raster_image};
