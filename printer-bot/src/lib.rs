//! Printer bot - sends chat messages, jokes and images to a USB receipt printer
//!
//! # Front-ends
//!
//! - **Discord** (`bot`): `/print` and `/print-image` slash commands
//! - **HTTP API** (`api`): text, receipts, jokes, fortunes, codes and images
//! - **`print-joke`** binary: prints one joke and exits
//!
//! All of them go through one [`SharedPrinter`], which lets a single job at a
//! time hold the printer.
//!
//! # Module structure
//!
//! ```text
//! printer-bot/src/
//! ├── config.rs    # environment configuration
//! ├── error.rs     # AppError + HTTP mapping
//! ├── logger.rs    # tracing setup
//! ├── printer.rs   # USB or in-memory device
//! ├── content.rs   # jokes, fortunes, receipts
//! ├── jobs.rs      # print jobs shared by the front-ends
//! ├── api/         # axum routes
//! └── bot.rs       # Discord handler
//! ```

pub mod api;
pub mod bot;
pub mod config;
pub mod content;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod printer;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use printer::{PrinterDevice, SharedPrinter};

/// State shared by the HTTP API and the Discord handler
#[derive(Clone)]
pub struct AppState {
    pub printer: SharedPrinter,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the printer service described by the configuration
    pub fn initialize(config: Config) -> AppResult<Self> {
        let device = PrinterDevice::from_config(&config)?;
        let printer = SharedPrinter::new(device, config.print);
        Ok(Self::with_printer(config, printer))
    }

    /// Use an already constructed printer service
    pub fn with_printer(config: Config, printer: SharedPrinter) -> Self {
        Self {
            printer,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}

/// Load `.env`, read the configuration and start logging
pub fn setup_environment() -> anyhow::Result<Config> {
    // Missing .env is fine; variables may come from the service manager
    let dotenv_result = dotenv::dotenv();

    let config = Config::from_env()?;
    logger::init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    match dotenv_result {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env loaded"),
    }

    Ok(config)
}
