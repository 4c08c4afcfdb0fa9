use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// A chat message as seen by the pipeline.
///
/// Produced by the chat adapter; the pipeline only reads it.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform id of the message (used to add / remove reactions).
    pub message_id: String,
    /// Platform id of the author.
    pub author_id: String,
    /// Platform id of the channel (used to send replies).
    pub channel_id: String,
    /// Human readable channel name, matched against the target channel.
    pub channel_name: String,
    /// Message body.
    pub text: String,
    /// When the message was posted.
    pub timestamp: DateTime<Utc>,
}

/// A calendar event extracted by the model.
///
/// Any keys beyond the known ones are kept in `extra` and forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_datetime: String,
    pub end_datetime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of parsing the model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// The model returned `{}`: the text did not describe an event.
    Empty,
    Event(EventRecord),
}

/// The response of the one-shot webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub status_code: u16,
    pub body: String,
}

impl WebhookOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Status markers placed on the originating message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Thinking,
    Shrug,
    Error,
    Blocked,
    Success,
    Warning,
}

impl Reaction {
    pub fn emoji(self) -> &'static str {
        match self {
            Reaction::Thinking => "🤔",
            Reaction::Shrug => "🤷",
            Reaction::Error => "❌",
            Reaction::Blocked => "🚫",
            Reaction::Success => "✅",
            Reaction::Warning => "⚠️",
        }
    }
}

/// Terminal state of handling a single message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Filtered out (own message, or another channel).
    Ignored,
    /// The model key or the webhook URL is not configured.
    Disabled,
    /// The model found no event in the text.
    NoEvent,
    /// The model answered, but no usable JSON could be extracted.
    ExtractionFailed { raw: String, reason: String },
    /// The model refused the prompt on content-safety grounds.
    Blocked,
    /// The event was accepted by the webhook.
    Forwarded { event: EventRecord, status_code: u16 },
    /// The webhook rejected the event, or could not be reached.
    DeliveryFailed { status_code: Option<u16>, body: String },
    /// Anything else.
    Failed { error: String },
}

impl Outcome {
    /// The final reaction for this outcome, if any.
    pub fn reaction(&self) -> Option<Reaction> {
        match self {
            Outcome::Ignored | Outcome::Disabled => None,
            Outcome::NoEvent => Some(Reaction::Shrug),
            Outcome::ExtractionFailed { .. } | Outcome::Failed { .. } => Some(Reaction::Error),
            Outcome::Blocked => Some(Reaction::Blocked),
            Outcome::Forwarded { .. } => Some(Reaction::Success),
            Outcome::DeliveryFailed { .. } => Some(Reaction::Warning),
        }
    }
}

/// Truncate `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_event_record_skips_absent_optionals_and_keeps_extras() {
        let event: EventRecord = serde_json::from_value(json!({
            "title": "Standup",
            "description": null,
            "start_datetime": "2025-01-02T09:00:00",
            "end_datetime": "2025-01-02T09:15:00",
            "attendees": ["ana", "bo"],
        }))
        .unwrap();

        assert_eq!(event.description, None);
        assert_eq!(event.extra.get("attendees"), Some(&json!(["ana", "bo"])));

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("description").is_none());
        assert_eq!(value["attendees"], json!(["ana", "bo"]));
    }

    #[test]
    fn test_webhook_outcome_success_range() {
        let outcome = |status_code| WebhookOutcome { status_code, body: String::new() };

        assert!(outcome(200).is_success());
        assert!(outcome(299).is_success());
        assert!(!outcome(199).is_success());
        assert!(!outcome(300).is_success());
        assert!(!outcome(500).is_success());
    }
}
