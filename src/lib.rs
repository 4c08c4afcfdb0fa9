//! Library root for `calendar-bot`.
//!
//! Calendar-bot is a Gemini-powered assistant for a single Discord channel designed to:
//! - Read free-form messages like "dentist next tuesday at 3pm"
//! - Extract a structured calendar event from them
//! - Forward the event to an automation webhook that creates the calendar entry
//! - Report progress and failures through emoji reactions and short replies
//!
//! The architecture is built around small traits for the chat platform, the
//! LLM and the webhook, so each can be swapped out (or mocked in tests).

pub mod base;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the calendar-bot runtime:
/// - Initializes the crypto provider
/// - Refuses to start without a Discord token
/// - Creates the runtime context with LLM, webhook, and chat clients
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting calendar-bot ...");

    if config.discord_token().is_none() {
        warn!("Discord token not found. Bot cannot start.");
        return Ok(());
    }

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
