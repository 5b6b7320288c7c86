use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::runner::CapturedResponse;
use crate::runner::OutgoingRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Body,
    Other,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?} error calling {url}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub url: String,
    pub message: String,
}

impl TransportError {
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else if error.is_body() || error.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };

        Self {
            kind,
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Performs one blocking HTTP exchange.
///
/// Implementations make exactly one attempt per call; a timeout or connection
/// failure is returned as an error, never retried.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &OutgoingRequest) -> Result<CapturedResponse, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::from_reqwest("<client>", e))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &OutgoingRequest) -> Result<CapturedResponse, TransportError> {
        let url = request.url.as_str();

        let builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        let builder = match &request.body {
            Some(body) => builder.body(body.clone()),
            None => builder,
        };

        let response = builder
            .send()
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        let status = response.status();
        let headers = response.headers().clone();

        // Consume the body exactly once
        let body_text = response
            .text()
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        Ok(CapturedResponse::new(status, headers, body_text))
    }
}
