use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{RawRecord, ScreeningClient, ScreeningError, ScreeningQuery};
use crate::config::ScreeningApiConfig;

/// Talks to the watchlist provider over HTTPS.
pub struct HttpScreeningClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpScreeningClient {
    pub fn new(config: &ScreeningApiConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to build screening client: {e}"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, query: &ScreeningQuery) -> String {
        format!("{}/{}", self.base_url, query.path())
    }
}

#[async_trait]
impl ScreeningClient for HttpScreeningClient {
    async fn query(&self, query: &ScreeningQuery) -> Result<Option<Vec<RawRecord>>, ScreeningError> {
        let mut req = self.client.post(self.url(query)).json(&query.body());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ScreeningError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ScreeningError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ScreeningError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        parse_response(&body)
    }
}

/// Decode a provider body: `null` (or nothing) means no list, otherwise an array of hits.
pub fn parse_response(body: &str) -> Result<Option<Vec<RawRecord>>, ScreeningError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ScreeningError::Decode(e.to_string()))?;

    match value {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<RawRecord>(item)
                    .map_err(|e| ScreeningError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(ScreeningError::Decode(format!(
            "expected a list of records, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
