use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Request},
    Router,
};
use serde_json::Value;
use shared::{
    error::TransportError,
    transport::{decode_response, Transport},
};
use storage::Storage;
use tower::ServiceExt;

use crate::{build_router, ApiContext};

/// In-process backend: requests go straight through the mock router
/// without opening a socket.
#[derive(Clone)]
pub struct MockTransport {
    router: Router,
}

impl MockTransport {
    pub fn new(ctx: ApiContext) -> Self {
        Self {
            router: build_router(ctx),
        }
    }

    pub fn from_storage(storage: Storage) -> Self {
        Self::new(ApiContext::new(storage))
    }

    async fn send(&self, request: Request<Body>) -> Result<Value, TransportError> {
        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status().as_u16();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        decode_response(status, &bytes)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let request = Request::get(path)
            .body(Body::empty())
            .map_err(|e| TransportError::Request(e.to_string()))?;
        self.send(request).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        let bytes = serde_json::to_vec(&body).map_err(|e| TransportError::Request(e.to_string()))?;
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .map_err(|e| TransportError::Request(e.to_string()))?;
        self.send(request).await
    }
}

#[cfg(test)]
#[path = "tests/mock_transport_tests.rs"]
mod tests;
