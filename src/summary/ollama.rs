use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SummaryKind, SummaryProvider};
use crate::{
    config::SummarySettings,
    error::{JournalError, JournalResult},
    utils::{clock::Clock, retry::RetryPolicy},
};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    settings: SummarySettings,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl OllamaClient {
    pub fn new(settings: SummarySettings, clock: Arc<dyn Clock>) -> JournalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| JournalError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            retry: settings.retry.clone(),
            settings,
            clock,
        })
    }

    fn prompt(&self, kind: SummaryKind, input: &str) -> String {
        let instruction = match kind {
            SummaryKind::Weekly => &self.settings.weekly_prompt,
            SummaryKind::Monthly => &self.settings.monthly_prompt,
        };
        format!("{instruction}\n\n{input}")
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> JournalResult<String> {
        let endpoint = &self.settings.endpoint;
        let response = self.client.post(endpoint).json(request).send().await?;
        let status = response.status();
        debug!(%status, "Summary response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JournalError::from_status(endpoint, status, &body));
        }
        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}

#[async_trait]
impl SummaryProvider for OllamaClient {
    async fn summarize(&self, kind: SummaryKind, input: &str) -> JournalResult<String> {
        let request = GenerateRequest {
            model: &self.settings.model,
            prompt: self.prompt(kind, input),
            stream: false,
        };
        let text = self
            .retry
            .run(self.clock.as_ref(), "summary", || self.generate(&request))
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(JournalError::network(
                &self.settings.endpoint,
                "model returned an empty summary",
                false,
            ));
        }
        Ok(text.to_string())
    }
}
