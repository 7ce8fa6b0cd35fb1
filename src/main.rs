//! Menubot - menu-driven chat bot
//!
//! Answers numbered-menu navigation on a chat transport, hands
//! conversations to a human agent on request, and logs every message to a
//! spreadsheet.

mod config;
mod dispatcher;
mod expiry;
mod menu;
mod retry;
mod sheets;
mod sink;
mod state_machine;
mod store;
mod transport;

use config::BotConfig;
use dispatcher::Dispatcher;
use sheets::{GoogleSheetsClient, ServiceAccountAuth};
use sink::LogSink;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{BridgeTransport, CredentialStore, Supervisor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the real environment still applies
    let _ = dotenvy::dotenv();
    let config = BotConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let sink = build_sink(&config).await?;

    let transport = Arc::new(BridgeTransport::new());
    let (dispatcher, handle) =
        Dispatcher::new(transport.clone(), sink, expiry::INACTIVITY_TIMEOUT);
    let dispatcher_task = tokio::spawn(dispatcher.run());

    let supervisor = Supervisor::new(
        config.bridge_url.as_str(),
        transport,
        CredentialStore::new(config.auth_dir.clone()),
        handle,
    );

    tokio::select! {
        result = supervisor.start() => {
            result?;
            tracing::warn!("Transport logged out; delete the auth directory and pair again");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
    }

    // Dropping the last handle lets the dispatcher drain and stop
    drop(supervisor);
    dispatcher_task.await?;

    Ok(())
}

/// Set up spreadsheet logging
///
/// A missing or malformed key file is fatal even when no spreadsheet is
/// configured; only the spreadsheet id is optional.
async fn build_sink(config: &BotConfig) -> Result<LogSink, Box<dyn std::error::Error>> {
    let http = reqwest::Client::new();
    let auth = ServiceAccountAuth::from_file(&config.credentials_path, http.clone())?;

    let Some(spreadsheet_id) = &config.spreadsheet_id else {
        tracing::warn!("SPREADSHEET_ID not set; message logging is disabled");
        return Ok(LogSink::disabled());
    };

    match auth.authorize().await {
        Ok(()) => tracing::info!(
            client_email = %auth.client_email(),
            spreadsheet_id = %spreadsheet_id,
            sheet = %config.sheet_name,
            "Spreadsheet logging authorized"
        ),
        Err(e) if e.kind.is_retryable() => {
            tracing::warn!(error = %e, "Could not authorize yet; appends will retry");
        }
        Err(e) => return Err(e.into()),
    }

    let client = GoogleSheetsClient::new(http, auth, spreadsheet_id.as_str(), config.sheet_name.as_str());
    Ok(LogSink::new(Arc::new(client)))
}
