//! Print API Handlers

use axum::Json;
use axum::extract::{Form, Multipart, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thermal_printer::PrintOutcome;

use crate::content::Receipt;
use crate::error::{AppError, AppResult};
use crate::{AppState, jobs};

fn default_cut() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
    #[serde(default = "default_cut")]
    pub cut: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    #[serde(flatten)]
    pub receipt: Receipt,
    #[serde(default = "default_cut")]
    pub cut: bool,
}

#[derive(Debug, Deserialize)]
pub struct BarcodeRequest {
    pub code: String,
    #[serde(default = "default_cut")]
    pub cut: bool,
}

#[derive(Debug, Deserialize)]
pub struct CutQuery {
    #[serde(default = "default_cut")]
    pub cut: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImageUrlRequest {
    pub url: String,
    #[serde(default = "default_cut")]
    pub cut: bool,
}

/// Successful print response
#[derive(Debug, Serialize)]
pub struct PrintResponse {
    pub status: &'static str,
    pub message: String,
    pub details: Value,
}

impl PrintResponse {
    fn new(message: impl Into<String>, details: Value) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
            details,
        })
    }
}

fn outcome_details(outcome: &PrintOutcome) -> Value {
    json!({ "bytes_written": outcome.bytes_written, "cut": outcome.cut })
}

/// POST /print/text
pub async fn text(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> AppResult<Json<PrintResponse>> {
    let outcome = jobs::print_message(&state.printer, req.text, req.cut).await?;
    Ok(PrintResponse::new(
        "Text printed successfully",
        outcome_details(&outcome),
    ))
}

/// POST /print/receipt
pub async fn receipt(
    State(state): State<AppState>,
    Json(req): Json<ReceiptRequest>,
) -> AppResult<Json<PrintResponse>> {
    let receipt = req.receipt;
    let outcome = jobs::print_receipt(&state.printer, &receipt, req.cut).await?;
    Ok(PrintResponse::new(
        "Receipt printed successfully",
        json!({
            "items": receipt.items.len(),
            "total": format!("{:.2}", receipt.total()),
            "bytes_written": outcome.bytes_written,
        }),
    ))
}

/// POST /print/joke
pub async fn joke(State(state): State<AppState>) -> AppResult<Json<PrintResponse>> {
    let joke = jobs::print_joke(&state.printer).await?;
    Ok(PrintResponse::new(
        "Joke printed successfully",
        json!({ "joke": joke }),
    ))
}

/// POST /print/fortune
pub async fn fortune(State(state): State<AppState>) -> AppResult<Json<PrintResponse>> {
    let (fortune, numbers) = jobs::print_fortune(&state.printer).await?;
    Ok(PrintResponse::new(
        "Fortune printed successfully",
        json!({ "fortune": fortune, "lucky_numbers": numbers }),
    ))
}

/// POST /print/qr
pub async fn qr(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> AppResult<Json<PrintResponse>> {
    if req.text.is_empty() {
        return Err(AppError::bad_request("QR text is empty"));
    }
    let outcome = jobs::print_qr(&state.printer, &req.text, req.cut).await?;
    Ok(PrintResponse::new(
        "QR code printed successfully",
        outcome_details(&outcome),
    ))
}

/// POST /print/barcode
pub async fn barcode(
    State(state): State<AppState>,
    Json(req): Json<BarcodeRequest>,
) -> AppResult<Json<PrintResponse>> {
    if req.code.is_empty() {
        return Err(AppError::bad_request("Barcode is empty"));
    }
    let outcome = jobs::print_barcode(&state.printer, &req.code, req.cut).await?;
    Ok(PrintResponse::new(
        "Barcode printed successfully",
        outcome_details(&outcome),
    ))
}

/// POST /print/image?cut=true
///
/// Multipart form with a `file` field holding an image.
pub async fn image(
    State(state): State<AppState>,
    Query(query): Query<CutQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<PrintResponse>> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            jobs::ensure_image(field.content_type())?;
            let filename = field.file_name().map(str::to_string);
            upload = Some((filename, field.bytes().await?.to_vec()));
            break;
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::bad_request("No 'file' field found"))?;
    if data.is_empty() {
        return Err(AppError::bad_request("Empty file provided"));
    }

    let size = data.len();
    let outcome = jobs::print_image(&state.printer, data, query.cut).await?;
    Ok(PrintResponse::new(
        "Image printed successfully",
        json!({
            "filename": filename,
            "size": size,
            "bytes_written": outcome.bytes_written,
            "cut": outcome.cut,
        }),
    ))
}

/// POST /print/image-url?url=...&cut=true
pub async fn image_url(
    State(state): State<AppState>,
    Query(req): Query<ImageUrlRequest>,
) -> AppResult<Json<PrintResponse>> {
    print_from_url(&state, req).await
}

/// POST /print/url
///
/// Form-encoded `url` field.
pub async fn url_form(
    State(state): State<AppState>,
    Form(req): Form<ImageUrlRequest>,
) -> AppResult<Json<PrintResponse>> {
    print_from_url(&state, req).await
}

async fn print_from_url(
    state: &AppState,
    req: ImageUrlRequest,
) -> AppResult<Json<PrintResponse>> {
    let outcome =
        jobs::print_image_url(&state.http, &state.printer, &req.url, req.cut).await?;
    Ok(PrintResponse::new(
        "Image from URL printed successfully",
        json!({
            "url": req.url,
            "bytes_written": outcome.bytes_written,
            "cut": outcome.cut,
        }),
    ))
}
