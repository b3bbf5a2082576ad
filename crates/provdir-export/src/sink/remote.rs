use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::RemoteSink;
use crate::error::{DeliveryError, ExportError};

pub const FHIR_JSON_CONTENT_TYPE: &str = "application/fhir+json";

/// Response bodies quoted in errors are cut to this many characters
const MAX_ERROR_BODY: usize = 512;

/// POSTs bundles to a FHIR server base address
#[derive(Debug, Clone)]
pub struct HttpRemoteSink {
    client: Client,
    timeout: Duration,
}

impl HttpRemoteSink {
    pub fn new(timeout: Duration) -> Result<Self, ExportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl RemoteSink for HttpRemoteSink {
    async fn send(&self, text: &str, url: &str) -> Result<(), DeliveryError> {
        debug!(url, bytes = text.len(), "Pushing bundle");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE)
            .body(text.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::timeout(format!("Remote push to {url}"), self.timeout.as_secs())
                } else {
                    DeliveryError::remote(url, e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(url, status = status.as_u16(), "Bundle accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            url: url.to_string(),
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        })
    }
}
