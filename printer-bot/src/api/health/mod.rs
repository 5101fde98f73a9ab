//! Health routes
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | / | GET | service is running |
//! | /printer/status | GET | printer connection state |
//!
//! ```json
//! { "status": "connected", "vendor_id": "0x1504", "product_id": "0x0101" }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use thermal_printer::PrinterState;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/printer/status", get(printer_status))
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    message: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PrinterStatusResponse {
    #[serde(flatten)]
    state: PrinterState,
    vendor_id: String,
    product_id: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Thermal Printer API",
        status: "running",
    })
}

/// Queries the printer; waits for any running job to finish first
pub async fn printer_status(State(state): State<AppState>) -> Json<PrinterStatusResponse> {
    let usb = &state.config.usb;
    Json(PrinterStatusResponse {
        state: state.printer.state().await,
        vendor_id: format!("{:#06x}", usb.vendor_id),
        product_id: format!("{:#06x}", usb.product_id),
    })
}
