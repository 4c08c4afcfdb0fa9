//! Runtime services and shared state for the calendar-bot.

use tracing::{instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, llm::LlmClient, webhook::WebhookClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the chat, LLM and webhook clients, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The LLM client instance, if a model key is configured.
    pub llm: Option<LlmClient>,
    /// The webhook client instance, if a webhook URL is configured.
    pub webhook: Option<WebhookClient>,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the LLM client.
        let llm = match config.gemini_api_key() {
            Some(_) => Some(LlmClient::gemini(&config)?),
            None => {
                warn!("Gemini API key not found. Gemini functionality will be disabled.");
                None
            }
        };

        // Initialize the webhook client.
        let webhook = match config.webhook_url() {
            Some(_) => Some(WebhookClient::http(&config)?),
            None => {
                warn!("Webhook URL not found. Calendar events will not be sent.");
                None
            }
        };

        // Initialize the discord client.
        let chat = ChatClient::discord(&config, llm.clone(), webhook.clone()).await?;

        Ok(Self { config, llm, webhook, chat })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
