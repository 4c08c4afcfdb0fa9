//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the calendar-bot:
//! - Chat services (e.g., Discord)
//! - LLM services (e.g., Gemini)
//! - Webhook delivery (e.g., a Make.com scenario)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod llm;
pub mod webhook;
