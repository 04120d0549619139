//! Homework status API client

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::PRACTICUM_TOKEN_VAR;
use crate::error::{NotifierError, Result};

/// Source of homework status snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HomeworkApi: Send + Sync {
    /// Fetch statuses changed since `from_date` (Unix seconds).
    async fn fetch_statuses(&self, from_date: i64) -> Result<Value>;
}

#[derive(Clone)]
pub struct PracticumClient {
    http: Client,
    endpoint: String,
    auth: HeaderValue,
}

impl PracticumClient {
    pub fn new(endpoint: &str, token: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent("homework-notifier/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let mut auth = HeaderValue::from_str(&format!("OAuth {}", token))
            .map_err(|e| NotifierError::InvalidCredential(PRACTICUM_TOKEN_VAR, e.to_string()))?;
        auth.set_sensitive(true);

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            auth,
        })
    }
}

#[async_trait]
impl HomeworkApi for PracticumClient {
    async fn fetch_statuses(&self, from_date: i64) -> Result<Value> {
        debug!("Requesting homework statuses from_date={}", from_date);

        let resp = self
            .http
            .get(&self.endpoint)
            .header(AUTHORIZATION, self.auth.clone())
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|e| {
                let msg = format!("{} недоступен: {}", self.endpoint, e);
                error!("Homework API request failed: {}", msg);
                NotifierError::ApiResponse(msg)
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let msg = format!("{} вернул код {}", self.endpoint, status.as_u16());
            error!("Homework API returned {}: {}", status, self.endpoint);
            return Err(NotifierError::ApiResponse(msg));
        }

        let body = resp.bytes().await.map_err(|e| {
            error!("Failed to read homework API body: {}", e);
            NotifierError::ApiResponse(format!("{} оборвал ответ: {}", self.endpoint, e))
        })?;

        Ok(serde_json::from_slice(&body)?)
    }
}
