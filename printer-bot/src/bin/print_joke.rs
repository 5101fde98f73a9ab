//! Print one random joke and exit
//!
//! ```text
//! print-joke [--dry-run]
//! ```
//!
//! `--dry-run` prints into memory instead of the USB printer.

use std::process::ExitCode;

use printer_bot::{
    AppResult, Config, PrinterDevice, SharedPrinter, content, jobs, setup_environment,
};
use thermal_printer::{MemoryPrinter, PrintService};

#[tokio::main]
async fn main() -> ExitCode {
    let dry_run = std::env::args().skip(1).any(|arg| arg == "--dry-run");

    let config = match setup_environment() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("print-joke: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = if dry_run || config.dry_run {
        dry_run_joke(&config).await
    } else {
        print_joke(config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "Failed to print joke");
            ExitCode::FAILURE
        }
    }
}

async fn print_joke(config: Config) -> AppResult<()> {
    let device = PrinterDevice::from_config(&config)?;
    let printer = SharedPrinter::new(device, config.print);

    let joke = content::pick_joke(&mut rand::thread_rng());
    tracing::info!(joke, "Printing joke");
    jobs::print_message(&printer, joke.to_string(), true).await?;
    Ok(())
}

async fn dry_run_joke(config: &Config) -> AppResult<()> {
    let memory = MemoryPrinter::new();
    let printer = PrintService::new(memory.clone(), config.print);

    let joke = content::pick_joke(&mut rand::thread_rng());
    let outcome = printer.print_text(joke.to_string(), true).await?;
    tracing::info!(
        joke,
        bytes = outcome.bytes_written,
        writes = memory.writes().len(),
        "Dry run finished"
    );
    Ok(())
}
