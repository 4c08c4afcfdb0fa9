//! Decides which messages the pipeline looks at.

use crate::base::types::IncomingMessage;

/// Why a message was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The bot wrote it; answering would loop.
    OwnMessage,
    /// It was posted outside the target channel.
    OtherChannel,
}

/// Returns the reason to skip `message`, or `None` if it should be processed.
pub fn check_message(message: &IncomingMessage, bot_user_id: &str, target_channel_name: &str) -> Option<Rejection> {
    if message.author_id == bot_user_id {
        return Some(Rejection::OwnMessage);
    }

    if message.channel_name != target_channel_name {
        return Some(Rejection::OtherChannel);
    }

    None
}
