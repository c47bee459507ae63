use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{ChatRequest, ChatTransport, RawReply, TransportError};

/// reqwest-backed transport for the answering service
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat", self.base_url)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> RawReply {
        let url = self.chat_url();
        debug!(%url, session_id = %request.session_id, "sending chat request");

        let response = match self.client.post(&url).json(request).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "chat request failed before a response arrived");
                return RawReply::Transport(TransportError::from_reqwest(&e));
            }
        };

        let status = response.status().as_u16();

        match response.text().await {
            Ok(body) => {
                debug!(status, bytes = body.len(), "chat response received");
                RawReply::Http { status, body }
            }
            Err(e) => RawReply::Transport(TransportError::Body(e.to_string())),
        }
    }
}
