//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default channel the bot listens to.
fn default_target_channel_name() -> String {
    "calendar-agent".to_string()
}

/// Default Gemini model to use.
fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Default Gemini API root.
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Default timezone label for extracted datetimes.
fn default_event_timezone() -> String {
    "EDT".to_string()
}

/// Default extraction directive.
fn default_extraction_directive() -> String {
    prompts::EXTRACTION_DIRECTIVE.to_string()
}

/// Default model call timeout, in seconds.
fn default_llm_timeout_secs() -> u64 {
    60
}

/// Default webhook call timeout, in seconds.
fn default_webhook_timeout_secs() -> u64 {
    30
}

/// Configuration for the calendar-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Discord bot token (`CALENDAR_BOT_DISCORD_TOKEN`, or `DISCORD_TOKEN`).
    #[serde(default)]
    pub discord_token: Option<String>,
    /// Gemini API key (`CALENDAR_BOT_GEMINI_API_KEY`, or `GEMINI_API_KEY`).
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    /// Webhook that receives the extracted events (`CALENDAR_BOT_WEBHOOK_URL`, or `MAKE_WEBHOOK_URL`).
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Name of the channel to listen to (`CALENDAR_BOT_TARGET_CHANNEL_NAME`).
    #[serde(default = "default_target_channel_name")]
    pub target_channel_name: String,
    /// Gemini model identifier (`CALENDAR_BOT_GEMINI_MODEL`).
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    /// Gemini API root (`CALENDAR_BOT_GEMINI_BASE_URL`).
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    /// Timezone label that all extracted datetimes are expressed in (`CALENDAR_BOT_EVENT_TIMEZONE`).
    #[serde(default = "default_event_timezone")]
    pub event_timezone: String,
    /// Optional custom extraction directive to override the default (`CALENDAR_BOT_EXTRACTION_DIRECTIVE`).
    ///
    /// Must contain the `{message}` placeholder; `{current_date}` and `{timezone}` are optional.
    #[serde(default = "default_extraction_directive")]
    pub extraction_directive: String,
    /// Timeout for the model call (`CALENDAR_BOT_LLM_TIMEOUT_SECS`).
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    /// Timeout for the webhook call (`CALENDAR_BOT_WEBHOOK_TIMEOUT_SECS`).
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            discord_token: None,
            gemini_api_key: None,
            webhook_url: None,
            target_channel_name: default_target_channel_name(),
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
            event_timezone: default_event_timezone(),
            extraction_directive: default_extraction_directive(),
            llm_timeout_secs: default_llm_timeout_secs(),
            webhook_timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl ConfigInner {
    /// The Discord token, if set and non-blank.
    pub fn discord_token(&self) -> Option<&str> {
        non_blank(&self.discord_token)
    }

    /// The Gemini API key, if set and non-blank.
    pub fn gemini_api_key(&self) -> Option<&str> {
        non_blank(&self.gemini_api_key)
    }

    /// The webhook URL, if set and non-blank.
    pub fn webhook_url(&self) -> Option<&str> {
        non_blank(&self.webhook_url)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

/// Unprefixed variable names still honored, below every other source.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord_token"),
    ("GEMINI_API_KEY", "gemini_api_key"),
    ("MAKE_WEBHOOK_URL", "webhook_url"),
];

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

fn with_legacy_env(mut cfg: Builder, lookup: impl Fn(&str) -> Option<String>) -> Res<Builder> {
    for (var, key) in LEGACY_ENV_KEYS {
        if let Some(value) = lookup(var) {
            cfg = cfg.set_default(*key, value)?;
        }
    }

    Ok(cfg)
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let cfg = with_legacy_env(config::Config::builder(), |var| std::env::var(var).ok())?;
        let mut cfg = cfg.add_source(config::Environment::default().prefix("CALENDAR_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check the values that cannot be expressed through serde alone.
    pub fn validate(&self) -> Res<()> {
        if self.target_channel_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Target channel name must not be empty."));
        }

        if self.llm_timeout_secs == 0 {
            return Err(anyhow::anyhow!("LLM timeout must be at least one second."));
        }

        if self.webhook_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Webhook timeout must be at least one second."));
        }

        if !self.extraction_directive.contains("{message}") {
            return Err(anyhow::anyhow!("Extraction directive must contain the `{{message}}` placeholder."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from(ConfigInner::default());

        assert_eq!(config.target_channel_name, "calendar-agent");
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.event_timezone, "EDT");
        assert!(config.discord_token().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_secrets_count_as_unset() {
        let config = Config::from(ConfigInner {
            discord_token: Some("   ".to_string()),
            gemini_api_key: Some(String::new()),
            webhook_url: Some(" https://hook.example.com/abc ".to_string()),
            ..Default::default()
        });

        assert!(config.discord_token().is_none());
        assert!(config.gemini_api_key().is_none());
        assert_eq!(config.webhook_url(), Some("https://hook.example.com/abc"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            ConfigInner {
                target_channel_name: " ".to_string(),
                ..Default::default()
            },
            ConfigInner {
                llm_timeout_secs: 0,
                ..Default::default()
            },
            ConfigInner {
                webhook_timeout_secs: 0,
                ..Default::default()
            },
            ConfigInner {
                extraction_directive: "No placeholder here.".to_string(),
                ..Default::default()
            },
        ];

        for inner in bad {
            assert!(Config::from(inner).validate().is_err());
        }
    }

    #[test]
    fn test_unprefixed_env_names_are_fallbacks() {
        let lookup = |var: &str| match var {
            "DISCORD_TOKEN" => Some("bare-token".to_string()),
            "MAKE_WEBHOOK_URL" => Some("https://hook.example.com/bare".to_string()),
            _ => None,
        };

        let inner: ConfigInner = with_legacy_env(config::Config::builder(), lookup)
            .unwrap()
            .set_override("webhook_url", "https://hook.example.com/prefixed")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(inner.discord_token(), Some("bare-token"));
        assert_eq!(inner.webhook_url(), Some("https://hook.example.com/prefixed"));
        assert!(inner.gemini_api_key().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("calendar-bot-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
discord_token = "token"
webhook_url = "https://hook.example.com/abc"
target_channel_name = "events"
webhook_timeout_secs = 5
"#
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.discord_token(), Some("token"));
        assert_eq!(config.webhook_url(), Some("https://hook.example.com/abc"));
        assert_eq!(config.target_channel_name, "events");
        assert_eq!(config.webhook_timeout_secs, 5);
        assert_eq!(config.llm_timeout_secs, 60);
    }
}
