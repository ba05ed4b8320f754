//! HTTP client for streamed chat completions.
//!
//! [`OpenRouterClient::stream_completion`] checks the credential, sends the
//! request, and checks the status before any body is read. The body is then
//! consumed by a pump task that forwards fragments to a [`StreamHandle`] and
//! drops the response as soon as the request is cancelled.

use super::error::OpenRouterError;
use super::protocol::ChatCompletionRequest;
use super::sse::{LineDecoder, SseLine, classify_line, delta_text};
use crate::config::FileApiConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use visualizer_application::{
    CompletionClient, CompletionError, CompletionRequest, StreamHandle, StreamSender,
};
use visualizer_domain::{PromptTemplate, StreamEvent};

/// Connection settings for [`OpenRouterClient`]
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub base_url: String,
    pub referer: String,
    pub timeout: Duration,
}

impl From<&FileApiConfig> for OpenRouterConfig {
    fn from(api: &FileApiConfig) -> Self {
        Self {
            base_url: api.base_url.clone(),
            referer: api.referer.clone(),
            timeout: api.timeout(),
        }
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self::from(&FileApiConfig::default())
    }
}

/// Completion client for OpenRouter (or any OpenAI-compatible endpoint)
pub struct OpenRouterClient {
    http: reqwest::Client,
    endpoint: String,
    referer: String,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, OpenRouterError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            endpoint,
            referer: config.referer,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &CompletionRequest) -> Result<reqwest::Response, OpenRouterError> {
        let body = serde_json::to_vec(&ChatCompletionRequest::streaming(
            &request.model,
            PromptTemplate::visualization_system(),
            &request.prompt,
        ))?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&request.credential)
            .header(CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.referer)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Completion endpoint returned {}", status);
            return Err(OpenRouterError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancellation: CancellationToken,
    ) -> Result<StreamHandle, CompletionError> {
        request.ensure_credential()?;
        debug!("POST {} (model {})", self.endpoint, request.model);

        let response = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(CompletionError::Cancelled),
            response = self.send(&request) => response?,
        };

        let (tx, handle) = StreamHandle::channel(cancellation.clone());
        tokio::spawn(pump(response, tx, cancellation));
        Ok(handle)
    }
}

/// Read the body line by line until `[DONE]`, end of body, an error, or cancellation.
async fn pump(response: reqwest::Response, tx: StreamSender, cancellation: CancellationToken) {
    let mut body = response.bytes_stream();
    let mut decoder = LineDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                debug!("Completion cancelled, dropping response");
                return;
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for line in decoder.feed(&bytes) {
                    if forward_line(&line, &tx, &cancellation).await.is_break() {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                let error = CompletionError::from(OpenRouterError::from(e));
                send(&tx, &cancellation, Err(error)).await;
                return;
            }
            None => {
                if let Some(line) = decoder.finish()
                    && forward_line(&line, &tx, &cancellation).await.is_break()
                {
                    return;
                }
                // End of body without [DONE] still counts as success
                send(&tx, &cancellation, Ok(StreamEvent::Completed)).await;
                return;
            }
        }
    }
}

async fn forward_line(
    line: &str,
    tx: &StreamSender,
    cancellation: &CancellationToken,
) -> ControlFlow<()> {
    match classify_line(line) {
        SseLine::Ignored => ControlFlow::Continue(()),
        SseLine::Done => {
            send(tx, cancellation, Ok(StreamEvent::Completed)).await;
            ControlFlow::Break(())
        }
        SseLine::Data(payload) => {
            let Some(text) = delta_text(payload) else {
                return ControlFlow::Continue(());
            };
            if send(tx, cancellation, Ok(StreamEvent::Delta(text))).await {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        }
    }
}

/// Returns false when the stream should stop (cancelled or receiver gone).
async fn send(
    tx: &StreamSender,
    cancellation: &CancellationToken,
    event: Result<StreamEvent, CompletionError>,
) -> bool {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}
