//! printer-bot - Discord bot and HTTP API for a USB receipt printer

use printer_bot::{AppState, api, bot, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = setup_environment()?;
    tracing::info!(
        http = config.http_enabled,
        port = config.http_port,
        dry_run = config.dry_run,
        guilds = ?config.guild_ids,
        "Starting printer-bot"
    );

    let token = config.require_token().map(str::to_string);
    let http_enabled = config.http_enabled;
    let http_port = config.http_port;
    let state = AppState::initialize(config)?;

    let token = match (token, http_enabled) {
        (Ok(token), _) => Some(token),
        (Err(e), true) => {
            tracing::error!(error = %e, "Discord bot disabled; serving HTTP only");
            None
        }
        (Err(e), false) => return Err(e.into()),
    };

    let http = async {
        if http_enabled {
            api::serve(state.clone(), http_port).await
        } else {
            std::future::pending().await
        }
    };
    let discord = async {
        match &token {
            Some(token) => bot::run_bot(state.clone(), token).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = http => result?,
        result = discord => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
