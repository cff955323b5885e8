use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use shared::{
    error::TransportError,
    transport::{decode_response, Transport},
};
use url::Url;

/// [`Transport`] over HTTP to a running backend.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(server_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Request(format!("invalid path '{path}': {e}")))
    }

    async fn read(response: Response) -> Result<Value, TransportError> {
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        decode_response(status, &bytes)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let response = self
            .http
            .get(self.url(path)?)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::read(response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        let response = self
            .http
            .post(self.url(path)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::read(response).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
