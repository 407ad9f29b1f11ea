//! reqwest-backed [`RestTransport`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

use super::{Method, RestRequest, RestResponse, RestTransport};
use crate::error::{AccessError, AccessResult};

/// HTTP transport for the document REST API.
///
/// Paths in requests are joined onto `base_url`, which points at the
/// `.../documents` root.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> AccessResult<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AccessError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(HttpTransport {
            client,
            base_url,
            timeout,
            token: RwLock::new(None),
        })
    }

    /// Sets (or clears) the bearer token sent with every request.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &RestRequest) -> AccessResult<Url> {
        let mut url = self.base_url.join(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: RestRequest) -> AccessResult<RestResponse> {
        let url = self.url_for(&request)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };
        if let Some(token) = self.token.read().await.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AccessError::Timeout(self.timeout.as_millis() as u64)
            } else {
                AccessError::from(e)
            }
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        debug!(status, "REST response");
        Ok(RestResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_join_under_documents_root() {
        let transport = HttpTransport::new(
            "http://localhost:8080/v1/projects/p/databases/(default)/documents",
            Duration::from_secs(5),
        )
        .unwrap();

        let request = RestRequest::new(Method::Patch, "items/I1")
            .query("updateMask.fieldPaths", "stock")
            .query("updateMask.fieldPaths", "unit");
        let url = transport.url_for(&request).unwrap();

        assert!(url
            .path()
            .ends_with("/databases/(default)/documents/items/I1"));
        assert_eq!(
            url.query(),
            Some("updateMask.fieldPaths=stock&updateMask.fieldPaths=unit")
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = HttpTransport::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(err.is_config_error());
    }
}
