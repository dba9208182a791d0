use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Delivery, Notifier, WebhookPayload};
use crate::error::DeliveryError;
use crate::state_machine::Job;

/// Posts completion events as JSON to a single configured URL.
pub struct WebhookNotifier {
    target: Option<String>,
    client: Client,
}

impl WebhookNotifier {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// A notifier for `target`; `None` disables delivery.
    pub fn new(target: Option<String>) -> Result<Self, DeliveryError> {
        Self::with_timeout(target, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(target: Option<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;
        Ok(Self { target, client })
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, job: &Job) -> Result<Delivery, DeliveryError> {
        let Some(target) = self.target.as_deref() else {
            tracing::debug!(job_id = %job.id, "no webhook URL configured");
            return Ok(Delivery::Disabled);
        };

        let body = WebhookPayload::from(job);
        tracing::info!(job_id = %job.id, url = target, "triggering webhook");

        let response = self
            .client
            .post(target)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable body".to_string());
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Delivery::Sent {
            status: status.as_u16(),
        })
    }
}
