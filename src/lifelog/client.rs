use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Url,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    config::LifelogSettings,
    error::{JournalError, JournalResult},
    utils::{clock::Clock, retry::RetryPolicy, time::date_to_note_name},
};

const API_KEY_HEADER: &str = "x-api-key";

/// Client for the life-log transcript API.
pub struct LifelogClient {
    client: reqwest::Client,
    endpoint: String,
    page_limit: u32,
    timezone: String,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl LifelogClient {
    pub fn new(
        settings: &LifelogSettings,
        timezone: String,
        clock: Arc<dyn Clock>,
    ) -> JournalResult<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .ok_or_else(|| JournalError::Config("lifelog api_key is not set".into()))?;
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| JournalError::Config(format!("invalid lifelog api_key: {e}")))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| JournalError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            page_limit: settings.page_limit,
            timezone,
            retry: settings.retry.clone(),
            clock,
        })
    }

    fn url(&self, start: NaiveDate, end: NaiveDate) -> JournalResult<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("start", date_to_note_name(start)),
                ("end", date_to_note_name(end)),
                ("timezone", self.timezone.clone()),
                ("limit", self.page_limit.to_string()),
            ],
        )
        .map_err(|e| JournalError::Config(format!("invalid lifelog endpoint: {e}")))
    }

    async fn fetch_once(&self, url: &Url) -> JournalResult<Value> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        debug!(%status, "Lifelog response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JournalError::from_status(&self.endpoint, status, &body));
        }
        Ok(response.json().await?)
    }

    /// Fetches every record between `start` and `end`, both inclusive.
    pub async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> JournalResult<Value> {
        let url = self.url(start, end)?;
        info!("Fetching lifelogs from {start} to {end}");
        self.retry
            .run(self.clock.as_ref(), "lifelog fetch", || self.fetch_once(&url))
            .await
    }
}

/// True for payloads that carry no records: `null`, `[]`, `{}` or an empty `data.lifelogs`.
pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => match map.get("data").and_then(|data| data.get("lifelogs")) {
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Null) => true,
            Some(_) => false,
            None => map.is_empty(),
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::is_empty_payload;

    #[test]
    fn empty_payload_shapes() {
        assert!(is_empty_payload(&json!(null)));
        assert!(is_empty_payload(&json!([])));
        assert!(is_empty_payload(&json!({})));
        assert!(is_empty_payload(&json!({ "data": { "lifelogs": [] } })));
        assert!(!is_empty_payload(&json!({ "data": { "lifelogs": [{ "id": "a" }] } })));
        assert!(!is_empty_payload(&json!([{ "id": "a" }])));
    }
}
