//! Print jobs shared by the Discord bot, the HTTP API and the joke binary

use chrono::Local;
use thermal_printer::{EscPosBuilder, PrintError, PrintOutcome, PrintSettings, load_image};
use tracing::{info, instrument};

use crate::content::{self, Receipt};
use crate::error::{AppError, AppResult};
use crate::printer::SharedPrinter;

/// Image content types are checked before anything is downloaded or decoded
pub fn ensure_image(content_type: Option<&str>) -> AppResult<()> {
    match content_type {
        Some(ct) if ct.contains("image") => Ok(()),
        _ => Err(AppError::bad_request("File is not recognized as an image")),
    }
}

/// Print a message verbatim, then cut
#[instrument(skip(printer, text))]
pub async fn print_message(
    printer: &SharedPrinter,
    text: String,
    cut: bool,
) -> AppResult<PrintOutcome> {
    info!(message = %text, "Printing message");
    Ok(printer.print_text(text, cut).await?)
}

/// Send a rendered document, then cut
pub async fn print_built(
    printer: &SharedPrinter,
    builder: EscPosBuilder,
    cut: bool,
) -> AppResult<PrintOutcome> {
    let data = builder.build()?;
    Ok(printer.print_document(data, cut).await?)
}

/// Print a random joke; returns the joke
pub async fn print_joke(printer: &SharedPrinter) -> AppResult<&'static str> {
    let joke = content::pick_joke(&mut rand::thread_rng());
    let mut b = printer.builder();
    content::render_joke(&mut b, joke);
    print_built(printer, b, true).await?;
    Ok(joke)
}

/// Print a random fortune; returns the fortune and its lucky numbers
pub async fn print_fortune(printer: &SharedPrinter) -> AppResult<(&'static str, Vec<u8>)> {
    let (fortune, numbers) = {
        let mut rng = rand::thread_rng();
        (content::pick_fortune(&mut rng), content::lucky_numbers(&mut rng))
    };
    let mut b = printer.builder();
    content::render_fortune(&mut b, fortune, &numbers);
    print_built(printer, b, true).await?;
    Ok((fortune, numbers))
}

/// Print a receipt stamped with the local time
pub async fn print_receipt(
    printer: &SharedPrinter,
    receipt: &Receipt,
    cut: bool,
) -> AppResult<PrintOutcome> {
    if receipt.items.is_empty() {
        return Err(AppError::bad_request("Receipt has no items"));
    }
    let mut b = printer.builder();
    content::render_receipt(&mut b, receipt, Local::now());
    print_built(printer, b, cut).await
}

/// Print a QR code with its text
pub async fn print_qr(printer: &SharedPrinter, text: &str, cut: bool) -> AppResult<PrintOutcome> {
    let mut b = printer.builder();
    content::render_qr(&mut b, text);
    print_built(printer, b, cut).await
}

/// Print a CODE128 barcode
pub async fn print_barcode(
    printer: &SharedPrinter,
    code: &str,
    cut: bool,
) -> AppResult<PrintOutcome> {
    let mut b = printer.builder();
    content::render_barcode(&mut b, code);
    print_built(printer, b, cut).await
}

/// Decode, rasterise and print an image
///
/// Decoding runs on the blocking pool; large photos take a while.
#[instrument(skip(printer, bytes), fields(len = bytes.len()))]
pub async fn print_image(
    printer: &SharedPrinter,
    bytes: Vec<u8>,
    cut: bool,
) -> AppResult<PrintOutcome> {
    let settings = *printer.settings();
    let data = tokio::task::spawn_blocking(move || render_image(&bytes, settings))
        .await
        .map_err(|e| PrintError::io(format!("Image task failed: {}", e)))??;
    Ok(printer.print_document(data, cut).await?)
}

fn render_image(bytes: &[u8], settings: PrintSettings) -> AppResult<Vec<u8>> {
    let img = load_image(bytes)?;
    let mut b = EscPosBuilder::new(settings.paper_width, settings.profile);
    b.image(&img);
    Ok(b.build()?)
}

/// Download an image from `url` and print it
#[instrument(skip(client, printer))]
pub async fn print_image_url(
    client: &reqwest::Client,
    printer: &SharedPrinter,
    url: &str,
    cut: bool,
) -> AppResult<PrintOutcome> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::bad_request(format!("Not an http(s) URL: {:?}", url)));
    }
    let bytes = download_image(client, url).await?;
    print_image(printer, bytes, cut).await
}

/// Download an image, checking status and content type
pub async fn download_image(client: &reqwest::Client, url: &str) -> AppResult<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Download(format!("HTTP {}", status.as_u16())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    ensure_image(content_type.as_deref())?;

    Ok(response.bytes().await?.to_vec())
}
