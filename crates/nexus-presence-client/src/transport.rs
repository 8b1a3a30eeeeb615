//! Transport seam between the sync loop and the presence server

use async_trait::async_trait;
use nexus_presence_sdk::{
    routes, AnnounceResponse, PresenceAction, RosterResponse, StatsResponse, UpdatePresenceRequest,
};
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ClientError, Result, TransportError};

#[async_trait]
pub trait PresenceTransport: Send + Sync + 'static {
    async fn announce(
        &self,
        action: PresenceAction,
    ) -> std::result::Result<AnnounceResponse, TransportError>;

    async fn roster(&self) -> std::result::Result<RosterResponse, TransportError>;

    async fn stats(&self) -> std::result::Result<StatsResponse, TransportError>;
}

/// Presence calls over HTTP with a bearer token
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(token);
        self
    }

    /// Replace the credentials used by subsequent calls
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<R, TransportError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(TransportError::Unauthorized),
            status if !status.is_success() => Err(TransportError::Status(status.as_u16())),
            _ => response
                .json::<R>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string())),
        }
    }
}

#[async_trait]
impl PresenceTransport for HttpTransport {
    async fn announce(
        &self,
        action: PresenceAction,
    ) -> std::result::Result<AnnounceResponse, TransportError> {
        let path = match action {
            PresenceAction::Heartbeat => routes::HEARTBEAT,
            PresenceAction::Online | PresenceAction::Offline => routes::ONLINE,
        };
        let request = self
            .client
            .post(self.url(path))
            .json(&UpdatePresenceRequest::new(action));
        self.execute(request).await
    }

    async fn roster(&self) -> std::result::Result<RosterResponse, TransportError> {
        self.execute(self.client.get(self.url(routes::ROSTER))).await
    }

    async fn stats(&self) -> std::result::Result<StatsResponse, TransportError> {
        self.execute(self.client.get(self.url(routes::STATS))).await
    }
}
