// src/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::models::{
    ChatRequest, ChatResponse, ConversationTurn, HealthSample, NewsItem, StockSeries, TaskAck,
};
use crate::services::tasks::BackgroundTask;
use crate::session::{BackendStatus, ChatBackend};

/// HTTP client for the assistant API, shared by the scheduler and the console.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    user_id: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: "default_user".to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow::Error::new(BackendStatus(status.as_u16()))
                .context(format!("{} request failed", what)));
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding {} response", what))
    }

    pub async fn chat(&self, message: &str, history: &[ConversationTurn]) -> Result<ChatResponse> {
        let body = ChatRequest {
            message: message.to_string(),
            user_id: self.user_id.clone(),
            history: history.to_vec(),
        };
        debug!("POST /chat with {} prior turns", history.len());
        let resp = self
            .client
            .post(self.url("/chat"))
            .json(&body)
            .send()
            .await
            .context("sending chat request")?;
        Self::decode(resp, "chat").await
    }

    pub async fn news(&self) -> Result<Vec<NewsItem>> {
        let resp = self
            .client
            .get(self.url("/news"))
            .send()
            .await
            .context("requesting news")?;
        Self::decode(resp, "news").await
    }

    pub async fn health(&self) -> Result<HealthSample> {
        let resp = self
            .client
            .get(self.url("/health"))
            .query(&[("user_id", self.user_id.as_str())])
            .send()
            .await
            .context("requesting health data")?;
        Self::decode(resp, "health").await
    }

    pub async fn stocks(&self, symbol: &str, period: &str) -> Result<StockSeries> {
        let resp = self
            .client
            .get(self.url("/stocks"))
            .query(&[("symbol", symbol), ("period", period)])
            .send()
            .await
            .with_context(|| format!("requesting stock data for {}", symbol))?;
        Self::decode(resp, "stocks").await
    }

    pub async fn trigger(&self, task: BackgroundTask) -> Result<TaskAck> {
        let path = format!("/tasks/{}", task.slug());
        let resp = self
            .client
            .post(self.url(&path))
            .send()
            .await
            .with_context(|| format!("calling {}", path))?;
        Self::decode(resp, &path).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn reply(&self, message: &str, history: &[ConversationTurn]) -> Result<String> {
        Ok(self.chat(message, history).await?.response)
    }
}
