// This is the entry point of the link logger.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Twitch Helix, Google Sheets)
// - `chat/` = The Twitch IRC adapter that feeds chat events into the core
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the chat listener until the connection dies

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a handful of mod.rs files that all look the same.
#[path = "chat/chat_layer.rs"]
mod chat;
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::time::Duration;

use crate::config::Config;
use crate::core::links::{AuthPolicy, LinkService};
use crate::infra::sheets::sheets_client::{ServiceAccountAuth, SheetsClient};
use crate::infra::twitch::helix_client::HelixClient;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // This is a low-volume logging utility: any error that escapes the run
    // loop is treated as fatal and the process exits so a supervisor can
    // restart it with a clean connection.
    if let Err(err) = run().await {
        tracing::error!(error = %err, "fatal error, shutting down");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // One HTTP client for both APIs, with an explicit timeout so a hung
    // request can't stall the chat loop forever.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let helix = HelixClient::new(
        http.clone(),
        config.client_id.clone(),
        config.client_secret.clone(),
        config.broadcaster_id.clone(),
    );

    let auth = ServiceAccountAuth::from_file(&config.google_credentials_file, http.clone()).await?;
    let sheets = SheetsClient::new(http, auth, config.spreadsheet_id.clone());

    let policy = AuthPolicy::new(config.authorized_users.iter().cloned());
    let service = LinkService::new(helix, sheets, policy);

    tracing::info!(channel = %config.channel_name, "starting twitch link logger");
    chat::irc_transport::listen(&config.channel_name, &service).await?;

    // The read loop only returns cleanly when Twitch closed the connection;
    // that still means we stopped listening, so exit non-zero.
    anyhow::bail!("chat connection closed")
}
