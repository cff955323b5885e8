use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, ErrorCode, TransportError};

/// The `GET`/`POST` JSON surface a backend exposes to the client.
///
/// Both the HTTP client and the in-process mock backend implement this, so
/// dispatchers never know which one they are talking to.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, TransportError>;
    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError>;
}

/// Turns a raw response into either its JSON body or a typed failure.
///
/// Non-JSON error bodies (framework rejections, proxies) are kept as the
/// error message.
pub fn decode_response(status: u16, body: &[u8]) -> Result<Value, TransportError> {
    if (200..300).contains(&status) {
        if body.is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()));
    }

    let error = serde_json::from_slice::<ApiError>(body).unwrap_or_else(|_| {
        let code = match status {
            404 => ErrorCode::NotFound,
            422 => ErrorCode::Validation,
            400..=499 => ErrorCode::BadRequest,
            _ => ErrorCode::Internal,
        };
        ApiError::new(code, String::from_utf8_lossy(body).trim().to_string())
    });
    Err(TransportError::Api { status, error })
}
