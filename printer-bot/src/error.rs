//! Application errors
//!
//! [`AppError`] wraps library print errors and adds the failures that only
//! exist at the front-ends (configuration, bad requests, downloads).
//!
//! | Kind | HTTP | Code |
//! |------|------|------|
//! | printer missing / not accessible | 503 | `PRINTER_UNAVAILABLE` |
//! | unprintable text or data | 400 | `UNPRINTABLE` |
//! | printer timeout | 504 | `PRINTER_TIMEOUT` |
//! | other printer failure | 500 | `PRINT_FAILED` |
//! | bad request | 400 | `BAD_REQUEST` |
//! | download failed | 502 | `DOWNLOAD_FAILED` |
//! | configuration | 500 | `CONFIG` |

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thermal_printer::PrintError;
use tracing::error;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Download failed: {0}")]
    Download(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Print(e) => match e {
                PrintError::DeviceNotFound(_) | PrintError::Permission(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                PrintError::Encoding { .. } | PrintError::InvalidData(_) => StatusCode::BAD_REQUEST,
                PrintError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                PrintError::Io(_) | PrintError::InvalidConfig(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Download(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Print(e) => match e {
                PrintError::DeviceNotFound(_) | PrintError::Permission(_) => "PRINTER_UNAVAILABLE",
                PrintError::Encoding { .. } | PrintError::InvalidData(_) => "UNPRINTABLE",
                PrintError::Timeout(_) => "PRINTER_TIMEOUT",
                PrintError::Io(_) | PrintError::InvalidConfig(_) => "PRINT_FAILED",
            },
            AppError::Config(_) => "CONFIG",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Download(_) => "DOWNLOAD_FAILED",
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Download(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        }

        let body = ErrorBody {
            status: "error",
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
