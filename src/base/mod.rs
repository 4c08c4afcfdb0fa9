//! Core components, types, and utilities for the calendar-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The extraction prompt template.
//! - Common types and result handling.

pub mod config;
pub mod prompts;
pub mod types;
