//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::encoding::{CharacterProfile, encode_strict, text_width};
use crate::error::{PrintError, PrintResult};

/// Widest raster image the print head accepts, in dots
pub const MAX_IMAGE_WIDTH: u32 = 512;

/// Rows per `GS v 0` block; taller images are sent as several bands
pub const RASTER_BAND_ROWS: u32 = 256;

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// Text is encoded under the builder's [`CharacterProfile`] as it is added;
/// the first character that does not fit is reported by [`build`](Self::build).
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
    profile: CharacterProfile,
    error: Option<PrintError>,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize, profile: CharacterProfile) -> Self {
        let mut buf = Vec::with_capacity(4096);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        // Select code table (ESC t n)
        buf.extend_from_slice(&profile.select_command());
        Self {
            buf,
            width,
            profile,
            error: None,
        }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    fn fail(&mut self, err: PrintError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    // === Text Output ===

    /// Write raw text (encoded under the builder's profile)
    pub fn text(&mut self, s: &str) -> &mut Self {
        match encode_strict(s, self.profile) {
            Ok(bytes) => self.buf.extend_from_slice(&bytes),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Text Style ===

    /// Enable bold text
    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn sep_double(&mut self) -> &mut Self {
        self.line(&"=".repeat(self.width))
    }

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.width))
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with spaces filling the gap.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw >= self.width {
            // Too long, just print with space
            self.text(left);
            self.text(" ");
            self.line(right);
        } else {
            let spaces = self.width - lw - rw;
            self.text(left);
            self.text(&" ".repeat(spaces));
            self.line(right);
        }
        self
    }

    // === QR Code ===

    /// Print a QR code
    ///
    /// Size: 1-16 (module size in dots)
    pub fn qr_code(&mut self, data: &str, size: u8) -> &mut Self {
        let size = size.clamp(1, 16);

        let data_bytes = data.as_bytes();
        let len = data_bytes.len() + 3;
        if len > 0xFFFF {
            self.fail(PrintError::InvalidData(format!(
                "QR payload too large: {} bytes",
                data_bytes.len()
            )));
            return self;
        }

        // Function 165: Select model (Model 2)
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);

        // Function 167: Set module size
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size]);

        // Function 169: Set error correction (L)
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x30]);

        // Function 180: Store data
        let p_l = (len & 0xFF) as u8;
        let p_h = ((len >> 8) & 0xFF) as u8;
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, p_l, p_h, 0x31, 0x50, 0x30]);
        self.buf.extend_from_slice(data_bytes);

        // Function 181: Print
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);

        self
    }

    // === Barcode ===

    /// Print a CODE128 barcode (code set B) with the human readable text below
    pub fn barcode_code128(&mut self, code: &str) -> &mut Self {
        if code.is_empty() || !code.bytes().all(|b| (0x20..0x7F).contains(&b)) {
            self.fail(PrintError::InvalidData(format!(
                "CODE128 needs printable ASCII, got {:?}",
                code
            )));
            return self;
        }
        // "{B" selector + data must fit the one-byte length
        if code.len() + 2 > u8::MAX as usize {
            self.fail(PrintError::InvalidData(format!(
                "CODE128 data too long: {} characters",
                code.len()
            )));
            return self;
        }

        // GS h n - height in dots
        self.buf.extend_from_slice(&[0x1D, 0x68, 80]);
        // GS w n - module width
        self.buf.extend_from_slice(&[0x1D, 0x77, 2]);
        // GS H n - HRI below the code
        self.buf.extend_from_slice(&[0x1D, 0x48, 2]);
        // GS k 73 n d1..dn
        self.buf
            .extend_from_slice(&[0x1D, 0x6B, 73, (code.len() + 2) as u8, b'{', b'B']);
        self.buf.extend_from_slice(code.as_bytes());
        self
    }

    // === Images ===

    /// Print a raster image (scaled down to [`MAX_IMAGE_WIDTH`])
    #[cfg(feature = "image")]
    pub fn image(&mut self, img: &image::DynamicImage) -> &mut Self {
        self.buf.extend_from_slice(&raster_image(img, MAX_IMAGE_WIDTH));
        self
    }

    // === Build ===

    /// Build the final byte buffer
    ///
    /// Fails with the first error recorded while adding content.
    pub fn build(self) -> PrintResult<Vec<u8>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.buf),
        }
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(48, CharacterProfile::Cp1252)
    }
}

// ============================================================================
// Image Processing
// ============================================================================

/// Decode an uploaded/downloaded image
#[cfg(feature = "image")]
pub fn load_image(bytes: &[u8]) -> PrintResult<image::DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| PrintError::InvalidData(format!("Cannot decode image: {}", e)))
}

/// Convert an image to ESC/POS raster data
///
/// The image will be:
/// - Resized to fit `max_width` dots, keeping the aspect ratio
/// - Converted to 1-bit monochrome
/// - Encoded as GS v 0 raster graphics
#[cfg(feature = "image")]
#[tracing::instrument(skip(img))]
pub fn raster_image(img: &image::DynamicImage, max_width: u32) -> Vec<u8> {
    use image::GenericImageView;
    use tracing::debug;

    let (w, h) = img.dimensions();
    debug!(width = w, height = h, "rasterising image");

    let (new_w, new_h) = if w > max_width {
        let ratio = max_width as f64 / w as f64;
        (max_width, ((h as f64 * ratio) as u32).max(1))
    } else {
        (w, h)
    };

    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Nearest);

    let x_bytes = new_w.div_ceil(8);

    let mut data = Vec::new();

    // Center align for image
    data.extend_from_slice(&[0x1B, 0x61, 0x01]);

    // Convert to RGBA for transparency handling
    let rgba = resized.to_rgba8();

    for band_start in (0..new_h).step_by(RASTER_BAND_ROWS as usize) {
        let rows = RASTER_BAND_ROWS.min(new_h - band_start);

        // GS v 0 m xL xH yL yH
        data.extend_from_slice(&[0x1D, 0x76, 0x30, 0x00]);
        data.push(x_bytes as u8);
        data.push((x_bytes >> 8) as u8);
        data.push(rows as u8);
        data.push((rows >> 8) as u8);

        for y in band_start..band_start + rows {
            push_raster_row(&mut data, &rgba, y, new_w, x_bytes);
        }
    }

    // Back to left, newline after image
    data.extend_from_slice(&[0x1B, 0x61, 0x00, 0x0A]);

    data
}

/// Pack one pixel row, MSB first; dark opaque pixels print
#[cfg(feature = "image")]
fn push_raster_row(
    data: &mut Vec<u8>,
    rgba: &image::RgbaImage,
    y: u32,
    width: u32,
    x_bytes: u32,
) {
    for x_byte in 0..x_bytes {
        let mut byte = 0u8;
        for bit in 0..8 {
            let x = x_byte * 8 + bit;
            if x >= width {
                break;
            }
            let pixel = rgba.get_pixel(x, y);

            // Transparent = white (0)
            if pixel[3] >= 128 {
                let luma = (0.299 * pixel[0] as f32
                    + 0.587 * pixel[1] as f32
                    + 0.114 * pixel[2] as f32) as u8;

                // Dark enough = print black (1)
                if luma < 128 {
                    byte |= 1 << (7 - bit);
                }
            }
        }
        data.push(byte);
    }
}
