pub mod discord;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::Void;

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Discord. Implementing this trait allows different chat services to be used
/// with the calendar-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to ignore the bot's own messages.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Connects to the chat platform and processes incoming messages until
    /// the connection ends.
    async fn start(&self) -> Void;

    /// Send a message to a channel.
    async fn send_message(&self, channel_id: &str, text: &str) -> Void;

    /// React to a message with an emoji.
    async fn react_to_message(&self, channel_id: &str, message_id: &str, emoji: &str) -> Void;

    /// Remove the bot's own emoji reaction from a message.
    async fn unreact_to_message(&self, channel_id: &str, message_id: &str, emoji: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
