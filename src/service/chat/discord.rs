//! Discord chat integration for calendar-bot.
//!
//! This module provides functionality for interacting with Discord via serenity:
//! - Receiving gateway events (`ready`, `message`)
//! - Sending messages and adding / removing reactions
//!
//! Gateway messages are converted to [`IncomingMessage`]s and handed to the
//! calendar event pipeline; nothing Discord-specific leaks past this module.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::{
    Client,
    all::{Channel, ChannelId, Context, EventHandler, GatewayIntents, Http, Message, MessageId, ReactionType, Ready},
};

use crate::{
    base::types::IncomingMessage,
    interaction::calendar_event::{PipelineDeps, handle_calendar_event},
    prelude::*,
    service::{llm::LlmClient, webhook::WebhookClient},
};

use super::{ChatClient, GenericChatClient};

// Extra methods on `ChatClient` applied by the discord implementation.

impl ChatClient {
    /// Creates a new Discord chat client.
    pub async fn discord(config: &Config, llm: Option<LlmClient>, webhook: Option<WebhookClient>) -> Res<Self> {
        let client = DiscordChatClient::new(config, llm, webhook).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<DiscordChatClient> for ChatClient {
    fn from(client: DiscordChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Discord client implementation.
#[derive(Clone)]
struct DiscordChatClient {
    token: String,
    http: Arc<Http>,
    bot_user_id: String,
    config: Config,
    llm: Option<LlmClient>,
    webhook: Option<WebhookClient>,
}

impl DiscordChatClient {
    /// Create a new Discord chat client.
    #[instrument(name = "DiscordChatClient::new", skip_all)]
    pub async fn new(config: &Config, llm: Option<LlmClient>, webhook: Option<WebhookClient>) -> Res<Self> {
        let token = config.discord_token().ok_or_else(|| anyhow!("Discord token is not configured."))?.to_string();
        let http = Arc::new(Http::new(&token));

        // Get the bot's user ID.

        let bot_user = http.get_current_user().await?;
        let bot_user_id = bot_user.id.to_string();

        info!("Discord bot user ID: {}", bot_user_id);

        Ok(Self {
            token,
            http,
            bot_user_id,
            config: config.clone(),
            llm,
            webhook,
        })
    }
}

#[async_trait]
impl GenericChatClient for DiscordChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        let handler = DiscordHandler {
            deps: PipelineDeps {
                config: self.config.clone(),
                chat: ChatClient::from(self.clone()),
                llm: self.llm.clone(),
                webhook: self.webhook.clone(),
            },
        };

        let mut client = Client::builder(&self.token, DiscordHandler::intents()).event_handler(handler).await?;

        // Runs until the gateway connection is closed.
        client.start().await?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, text: &str) -> Void {
        let channel_id = ChannelId::new(parse_id(channel_id)?);

        channel_id.say(&self.http, text).await.map_err(|e| anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn react_to_message(&self, channel_id: &str, message_id: &str, emoji: &str) -> Void {
        let channel_id = ChannelId::new(parse_id(channel_id)?);
        let message_id = MessageId::new(parse_id(message_id)?);

        channel_id
            .create_reaction(&self.http, message_id, ReactionType::Unicode(emoji.to_string()))
            .await
            .map_err(|e| anyhow!("Failed to react to message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unreact_to_message(&self, channel_id: &str, message_id: &str, emoji: &str) -> Void {
        let channel_id = ChannelId::new(parse_id(channel_id)?);
        let message_id = MessageId::new(parse_id(message_id)?);

        // `None` targets the bot's own reaction.
        channel_id
            .delete_reaction(&self.http, message_id, None, ReactionType::Unicode(emoji.to_string()))
            .await
            .map_err(|e| anyhow!("Failed to remove reaction: {}", e))?;

        Ok(())
    }
}

// Gateway event handler.

/// Handler for Discord gateway events.
struct DiscordHandler {
    deps: PipelineDeps,
}

impl DiscordHandler {
    /// Required gateway intents for the bot.
    fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);
        info!("Listening for messages in channel: `{}`", self.deps.config.target_channel_name);

        if self.deps.llm.is_none() {
            warn!("Gemini API key not configured. Calendar event parsing will not work.");
        }

        if self.deps.webhook.is_none() {
            warn!("Webhook URL not configured. Calendar events will not be sent.");
        }
    }

    #[instrument(skip_all)]
    async fn message(&self, ctx: Context, msg: Message) {
        // Skip our own messages before spending an API call on the channel lookup.
        if msg.author.id.to_string() == self.deps.chat.bot_user_id() {
            return;
        }

        let channel_name = match msg.channel(&ctx).await {
            Ok(Channel::Guild(channel)) => channel.name,
            Ok(_) => {
                debug!("Ignoring message outside of a guild channel.");
                return;
            }
            Err(err) => {
                warn!("Failed to look up channel {}: {}", msg.channel_id, err);
                return;
            }
        };

        let message = IncomingMessage {
            message_id: msg.id.to_string(),
            author_id: msg.author.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            channel_name,
            text: msg.content,
            timestamp: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now),
        };

        handle_calendar_event(message, self.deps.clone());
    }
}

// Helpers.

/// Parse a Discord snowflake; zero is not a valid id.
fn parse_id(raw: &str) -> Res<u64> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(anyhow!("Invalid Discord id: `{raw}`")),
        Ok(id) => Ok(id),
    }
}

// Tests.
