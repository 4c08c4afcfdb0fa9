//! The message → event → webhook pipeline.
//!
//! [`handle`] takes one [`IncomingMessage`] through filter, prompt, model call,
//! extraction and delivery, reflecting progress as reactions on the message.
//! It never fails: every error ends in an [`Outcome`] that has been reported
//! back to the channel.

use chrono::Local;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        prompts::build_extraction_prompt,
        types::{IncomingMessage, Outcome, ParsedEvent, Reaction, Res, truncate_chars},
    },
    interaction::{extract::extract_event, filter::check_message},
    service::{
        chat::ChatClient,
        llm::{LlmClient, LlmError},
        webhook::WebhookClient,
    },
};

/// Cap for raw model text echoed back to the channel.
const MODEL_TEXT_REPLY_LIMIT: usize = 1500;
/// Cap for webhook response bodies echoed back to the channel.
const WEBHOOK_BODY_REPLY_LIMIT: usize = 1500;
/// Cap for error descriptions echoed back to the channel.
const ERROR_REPLY_LIMIT: usize = 1000;

/// Reply sent when the model refuses the prompt.
pub const SAFETY_BLOCK_REPLY: &str = "Sorry, your request was blocked by content safety filters.";

/// Everything the pipeline talks to.
///
/// The model and webhook clients are optional: without either, messages are
/// acknowledged in the logs but not processed.
#[derive(Clone)]
pub struct PipelineDeps {
    pub config: Config,
    pub chat: ChatClient,
    pub llm: Option<LlmClient>,
    pub webhook: Option<WebhookClient>,
}

/// Handles a chat message event in the background.
#[instrument(skip_all)]
pub fn handle_calendar_event(message: IncomingMessage, deps: PipelineDeps) {
    tokio::spawn(
        async move {
            let outcome = handle(message, &deps).await;

            debug!(?outcome, "Finished handling message.");
        }
        .in_current_span(),
    );
}

/// Run the whole pipeline for one message and return where it ended.
#[instrument(skip_all, fields(message_id = %message.message_id))]
pub async fn handle(message: IncomingMessage, deps: &PipelineDeps) -> Outcome {
    if let Some(rejection) = check_message(&message, deps.chat.bot_user_id(), &deps.config.target_channel_name) {
        debug!(?rejection, "Skipping message.");
        return Outcome::Ignored;
    }

    let (Some(llm), Some(webhook)) = (&deps.llm, &deps.webhook) else {
        if deps.llm.is_none() {
            warn!("Gemini model not initialized. Skipping message processing.");
        }
        if deps.webhook.is_none() {
            warn!("Webhook URL not configured. Skipping message processing.");
        }
        return Outcome::Disabled;
    };

    info!("Received message in `{}`: {:?}", message.channel_name, message.text);

    react(deps, &message, Reaction::Thinking).await;

    let outcome = match run_pipeline(&message, deps, llm, webhook).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("An unexpected error occurred: {err:?}");
            Outcome::Failed { error: format!("{err:#}") }
        }
    };

    reflect_outcome(deps, &message, &outcome).await;

    outcome
}

/// Prompt, model call, extraction and delivery.
///
/// Only failures with no dedicated outcome are returned as `Err`, and only
/// after the thinking reaction has been cleared.
async fn run_pipeline(message: &IncomingMessage, deps: &PipelineDeps, llm: &LlmClient, webhook: &WebhookClient) -> Res<Outcome> {
    let current_date = Local::now().date_naive();
    let prompt = build_extraction_prompt(&deps.config.extraction_directive, &message.text, current_date, &deps.config.event_timezone);

    let response = llm.generate(&prompt).await;

    clear_thinking(deps, message).await;

    let raw = match response {
        Ok(raw) => raw,
        Err(err) if LlmError::is_blocked(&err) => {
            warn!("Gemini API call failed due to blocked prompt: {err}");
            return Ok(Outcome::Blocked);
        }
        Err(err) => return Err(err.context("Gemini API call failed")),
    };

    debug!("Gemini raw response: {raw}");

    let event = match extract_event(&raw) {
        Ok(ParsedEvent::Event(event)) => event,
        Ok(ParsedEvent::Empty) => {
            info!("Gemini parsed no event details. Not sending to webhook.");
            return Ok(Outcome::NoEvent);
        }
        Err(err) => {
            warn!("Error decoding JSON from Gemini: {err}");
            return Ok(Outcome::ExtractionFailed { raw, reason: err.to_string() });
        }
    };

    info!(?event, "Parsed event details.");

    let outcome = match webhook.deliver(&event).await {
        Ok(response) if response.is_success() => Outcome::Forwarded {
            event,
            status_code: response.status_code,
        },
        Ok(response) => Outcome::DeliveryFailed {
            status_code: Some(response.status_code),
            body: response.body,
        },
        Err(err) => {
            warn!("Webhook delivery failed: {err:#}");
            Outcome::DeliveryFailed {
                status_code: None,
                body: format!("{err:#}"),
            }
        }
    };

    Ok(outcome)
}

/// The explanatory reply for an outcome, if it warrants one.
pub fn reply_for(outcome: &Outcome) -> Option<String> {
    match outcome {
        Outcome::ExtractionFailed { raw, .. } => Some(format!(
            "Sorry, I couldn't understand the event details. The model's response: ```\n{}\n```",
            truncate_chars(raw, MODEL_TEXT_REPLY_LIMIT)
        )),
        Outcome::Blocked => Some(SAFETY_BLOCK_REPLY.to_string()),
        Outcome::Failed { error } => Some(format!("An unexpected error occurred: {}", truncate_chars(error, ERROR_REPLY_LIMIT))),
        Outcome::DeliveryFailed { status_code: Some(code), body } => {
            Some(format!("Error sending to calendar: {code} - {}", truncate_chars(body, WEBHOOK_BODY_REPLY_LIMIT)))
        }
        Outcome::DeliveryFailed { status_code: None, body } => Some(format!("Error sending to calendar: {}", truncate_chars(body, ERROR_REPLY_LIMIT))),
        Outcome::Ignored | Outcome::Disabled | Outcome::NoEvent | Outcome::Forwarded { .. } => None,
    }
}

/// Put the final reaction (and reply, if any) on the message.
async fn reflect_outcome(deps: &PipelineDeps, message: &IncomingMessage, outcome: &Outcome) {
    if let Some(reaction) = outcome.reaction() {
        react(deps, message, reaction).await;
    }

    if let Some(reply) = reply_for(outcome) {
        if let Err(err) = deps.chat.send_message(&message.channel_id, &reply).await {
            warn!("Failed to send reply: {err:#}");
        }
    }
}

async fn react(deps: &PipelineDeps, message: &IncomingMessage, reaction: Reaction) {
    if let Err(err) = deps.chat.react_to_message(&message.channel_id, &message.message_id, reaction.emoji()).await {
        warn!("Failed to add {reaction:?} reaction: {err:#}");
    }
}

/// Already gone (or never added) is fine.
async fn clear_thinking(deps: &PipelineDeps, message: &IncomingMessage) {
    if let Err(err) = deps.chat.unreact_to_message(&message.channel_id, &message.message_id, Reaction::Thinking.emoji()).await {
        debug!("Thinking reaction not removed: {err:#}");
    }
}
