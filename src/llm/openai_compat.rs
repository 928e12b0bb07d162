//! Client for OpenAI-style `/v1/chat/completions` endpoints.
//!
//! Both Mistral and the IONOS AI Model Hub speak this dialect, so the
//! provider adapters only differ in configuration.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::ChunkReceiver;
use super::types::ChatRequest;
use crate::core::errors::ApiError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct OpenAiCompatClient {
    label: &'static str,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    client: Client,
}

impl OpenAiCompatClient {
    pub fn new(
        label: &'static str,
        base_url: &str,
        api_key: &str,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            label,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            request_timeout,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn body(request: &ChatRequest, model: &str, stream: bool) -> Value {
        let mut body = json!({
            "model": model,
            "messages": request.messages,
            "stream": stream,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(p) = request.top_p {
                obj.insert("top_p".to_string(), json!(p));
            }
            if let Some(m) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(m));
            }
            if let Some(s) = &request.stop {
                obj.insert("stop".to_string(), json!(s));
            }
        }
        body
    }

    async fn post(&self, body: &Value, timeout: Option<Duration>) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let res = builder
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("{} request failed: {}", self.label, e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "{} chat error ({}): {}",
                self.label, status, text
            )));
        }
        Ok(res)
    }

    pub async fn chat(&self, request: &ChatRequest, model: &str) -> Result<String, ApiError> {
        let body = Self::body(request, model, false);
        let res = self.post(&body, Some(self.request_timeout)).await?;

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("{} returned invalid JSON: {}", self.label, e)))?;

        let Some(choice) = payload["choices"].get(0) else {
            return Err(ApiError::Upstream(format!(
                "{} response without choices",
                self.label
            )));
        };

        Ok(choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        model: &str,
    ) -> Result<ChunkReceiver, ApiError> {
        let body = Self::body(request, model, true);
        let res = self.post(&body, None).await?;

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();
        let label = self.label;

        tokio::spawn(async move {
            let mut lines = LineBuffer::default();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        for line in lines.push(&bytes) {
                            match parse_sse_line(&line) {
                                SseLine::Done => return,
                                SseLine::Content(content) => {
                                    if tx.send(Ok(content)).await.is_err() {
                                        return;
                                    }
                                }
                                SseLine::Skip => {}
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(ApiError::Upstream(format!(
                                "{} stream interrupted: {}",
                                label, e
                            ))))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Splits a byte stream into complete lines; partial lines wait for the next chunk.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Content(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(json) => match json["choices"][0]["delta"]["content"].as_str() {
            Some(content) if !content.is_empty() => SseLine::Content(content.to_string()),
            _ => SseLine::Skip,
        },
        Err(_) => SseLine::Skip,
    }
}
