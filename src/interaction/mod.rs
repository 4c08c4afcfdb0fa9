//! Event handling and user interactions for calendar-bot.
//!
//! This module provides functionality for handling chat message events:
//! - Filtering messages down to the target channel
//! - Extracting event JSON from model answers
//! - Coordinating the pipeline between services (LLM, webhook, chat)

pub mod calendar_event;
pub mod extract;
pub mod filter;
