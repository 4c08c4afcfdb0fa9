//! Plain HTTP webhook delivery via `reqwest`.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    base::types::{EventRecord, WebhookOutcome},
    prelude::*,
};

use super::{GenericWebhookClient, WebhookClient};

// Extra methods on `WebhookClient` applied by the http implementation.

impl WebhookClient {
    pub fn http(config: &Config) -> Res<Self> {
        let client = HttpWebhookClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

/// Webhook client that POSTs events as JSON.
#[derive(Clone)]
pub struct HttpWebhookClient {
    client: reqwest::Client,
    url: String,
}

impl HttpWebhookClient {
    #[instrument(name = "HttpWebhookClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let url = config.webhook_url().ok_or_else(|| anyhow!("Webhook URL is not configured."))?.to_string();

        let client = reqwest::Client::builder().timeout(Duration::from_secs(config.webhook_timeout_secs)).build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl GenericWebhookClient for HttpWebhookClient {
    #[instrument(name = "HttpWebhookClient::deliver", skip_all, fields(title = %event.title))]
    async fn deliver(&self, event: &EventRecord) -> Res<WebhookOutcome> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach webhook: {e}"))?;

        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!("Failed to read webhook response body: {err}");
                format!("<body unavailable: {err}>")
            }
        };
        let outcome = WebhookOutcome { status_code, body };

        if outcome.is_success() {
            info!("Webhook request successful: {status_code}");
        } else {
            warn!("Webhook request failed: {status_code} - {}", outcome.body);
        }

        Ok(outcome)
    }
}
