pub mod http;

use crate::base::types::{EventRecord, Res, WebhookOutcome};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

// Traits.

/// Generic webhook client trait that clients must implement.
///
/// The webhook is the automation endpoint (e.g. a Make.com scenario) that turns
/// an [`EventRecord`] into an actual calendar entry.
#[async_trait]
pub trait GenericWebhookClient: Send + Sync + 'static {
    /// Deliver one event, once.
    ///
    /// Any HTTP answer (including non-2xx) is returned as a [`WebhookOutcome`];
    /// `Err` is reserved for transport failures.
    async fn deliver(&self, event: &EventRecord) -> Res<WebhookOutcome>;
}

// Structs.

/// Webhook client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct WebhookClient {
    inner: Arc<dyn GenericWebhookClient>,
}

impl Deref for WebhookClient {
    type Target = dyn GenericWebhookClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl WebhookClient {
    pub fn new(inner: Arc<dyn GenericWebhookClient>) -> Self {
        Self { inner }
    }
}
