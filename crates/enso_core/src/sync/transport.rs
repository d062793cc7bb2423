//! Transport seam for the sync exchange.
//!
//! # Responsibility
//! - Define the one-call contract the engine drives, plus the blocking
//!   HTTP implementation with cooperative cancellation.
//!
//! # Invariants
//! - A cancelled exchange returns [`TransportError::Cancelled`] and the
//!   response body, if any arrived, is discarded.

use log::debug;
use reqwest::blocking::Client;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use super::protocol::{SyncRequestBody, SyncResponseBody};
use crate::config::CoreConfig;
use crate::sched::CancellationToken;

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug)]
pub enum TransportError {
    Cancelled,
    Http { status: u16, body: String },
    Network(String),
    Decode(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "exchange cancelled"),
            Self::Http { status, body } => write!(f, "http status {status}: {body}"),
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::Decode(message) => write!(f, "response decode error: {message}"),
        }
    }
}

impl Error for TransportError {}

/// One round of the sync protocol: upload changes, download changes.
pub trait SyncTransport {
    fn exchange(&self, request: &SyncRequestBody) -> TransportResult<SyncResponseBody>;
}

/// Blocking HTTP transport against `{base}/sync/thoughts`.
pub struct HttpSyncTransport {
    endpoint: String,
    client: Client,
    cancel: Option<CancellationToken>,
}

impl HttpSyncTransport {
    pub fn new(config: &CoreConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self {
            endpoint: format!("{}/sync/thoughts", config.api_base_url()),
            client,
            cancel: None,
        })
    }

    /// Attaches a token checked before the request and before decoding.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }
}

impl SyncTransport for HttpSyncTransport {
    fn exchange(&self, request: &SyncRequestBody) -> TransportResult<SyncResponseBody> {
        if self.cancelled() {
            return Err(TransportError::Cancelled);
        }

        debug!(
            "event=sync_exchange endpoint={endpoint} changes={changes}",
            endpoint = self.endpoint,
            changes = request.changes.len()
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        if self.cancelled() {
            return Err(TransportError::Cancelled);
        }
        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| TransportError::Decode(err.to_string()))
    }
}
