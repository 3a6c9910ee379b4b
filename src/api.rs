//! Client for the remote classification service
//!
//! The service exposes two endpoints:
//!
//! - `POST /predict` with `{"comment"}`, answering `{"topic", "sentiment"}`
//! - `POST /analyze` with `{"url", "api_key"}`, answering an [`AnalysisResponse`]
//!
//! Flows talk to the service through the [`ClassificationService`] trait so
//! they can be driven by a fake in tests. [`HttpService`] is the real client.
//! Requests carry no timeout and are never retried.

use crate::model::{AnalysisResponse, AnalyzeRequest, ErrorBody, PredictRequest, Prediction};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Message shown when the service fails without saying why
pub const GENERIC_FAILURE: &str = "Server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server returned HTTP {status}")]
    Server { status: u16, message: Option<String> },

    #[error("malformed response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Text a flow shows in place of its results
    pub fn display_message(&self) -> String {
        match self {
            ApiError::Network(msg) | ApiError::Parse(msg) => msg.clone(),
            ApiError::Server { message: Some(msg), .. } => msg.clone(),
            ApiError::Server { message: None, .. } => GENERIC_FAILURE.to_string(),
        }
    }
}

pub trait ClassificationService {
    fn predict(&self, request: &PredictRequest) -> Result<Prediction, ApiError>;

    fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResponse, ApiError>;
}

/// Blocking HTTP client for the classification service
pub struct HttpService {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<reqwest::blocking::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        self.client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))
    }
}

impl ClassificationService for HttpService {
    fn predict(&self, request: &PredictRequest) -> Result<Prediction, ApiError> {
        let response = self.post("/predict", request)?;

        let status = response.status();
        if !status.is_success() {
            warn!("/predict failed with HTTP {}", status.as_u16());
            return Err(ApiError::Server { status: status.as_u16(), message: None });
        }

        response.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResponse, ApiError> {
        let response = self.post("/analyze", request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.is_empty());
            warn!("/analyze failed with HTTP {}: {:?}", status.as_u16(), message);
            return Err(ApiError::Server { status: status.as_u16(), message });
        }

        response.json().map_err(|e| ApiError::Parse(e.to_string()))
    }
}
