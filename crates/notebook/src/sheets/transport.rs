//! HTTP transport for Sheets API requests
//!
//! Requests are plain values so the retry logic in
//! [`TokenManager::authenticated_fetch`](super::TokenManager::authenticated_fetch)
//! can replay them. Uses synchronous HTTP (ureq) to be executor-agnostic.

use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
}

/// A replayable API request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Sends one request with a bearer token and decodes the JSON response
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest, bearer: &str) -> Result<Value, ApiError>;
}

/// Production transport backed by ureq
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    fn send(&self, request: &ApiRequest, bearer: &str) -> Result<Value, ApiError> {
        let authorization = format!("Bearer {}", bearer);

        let result = match (request.method, &request.body) {
            (Method::Get, _) => ureq::get(&request.url)
                .header("Authorization", &authorization)
                .call(),
            (Method::Put, Some(body)) => ureq::put(&request.url)
                .header("Authorization", &authorization)
                .send_json(body),
            (Method::Put, None) => ureq::put(&request.url)
                .header("Authorization", &authorization)
                .send_empty(),
            (Method::Post, Some(body)) => ureq::post(&request.url)
                .header("Authorization", &authorization)
                .send_json(body),
            (Method::Post, None) => ureq::post(&request.url)
                .header("Authorization", &authorization)
                .send_empty(),
        };

        match result {
            Ok(mut response) => response
                .body_mut()
                .read_json::<Value>()
                .map_err(|e| ApiError::Decode(e.to_string())),
            Err(ureq::Error::StatusCode(code)) => Err(ApiError::Status(code)),
            Err(e) => Err(ApiError::Network(e.to_string())),
        }
    }
}
