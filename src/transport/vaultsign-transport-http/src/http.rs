//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use vaultsign_transport::{Session, Transport, TransportError};

use crate::config::HttpTransportConfig;

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Header carrying the namespace.
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Health query that always returns a body, whatever the KMS state.
const HEALTH_QUERY: &str = "standbyok=true&sealedcode=200&uninitcode=200";

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    keys: Vec<String>,
}

/// [`Transport`] speaking the KMS HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    namespace: Option<String>,
}

impl HttpTransport {
    /// Creates a transport from `config`.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.address.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
        })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, mut request: RequestBuilder, session: &Session) -> RequestBuilder {
        if let Some(token) = session.token() {
            request = request.header(TOKEN_HEADER, token.expose());
        }
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        request
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(format!("failed to connect to server: {e}")))
    }

    async fn json(response: Response) -> Result<Value, TransportError> {
        response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(format!("failed to parse response: {e}")))
    }
}

/// Maps an unsuccessful status and its error body to a transport error.
pub fn status_error(status: StatusCode, body: &str) -> TransportError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .filter(|e| !e.errors.is_empty())
        .map(|e| e.errors.join("; "))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Unauthorized(message),
        s if s.is_server_error() => TransportError::Unavailable(message),
        s => TransportError::Status {
            code: s.as_u16(),
            message,
        },
    }
}

async fn fail(response: Response) -> TransportError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    status_error(status, &body)
}

fn data_of(mut body: Value) -> Option<Value> {
    body.get_mut("data").map(Value::take).filter(|d| !d.is_null())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn read(&self, session: &Session, path: &str) -> Result<Option<Value>, TransportError> {
        debug!(path = %path, "GET");
        let request = self.authorize(self.client.get(self.url(path)), session);
        let response = self.send(request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(fail(response).await);
        }

        let body = Self::json(response).await?;
        data_of(body)
            .map(Some)
            .ok_or_else(|| TransportError::Malformed(format!("no data in response from {path}")))
    }

    async fn write(
        &self,
        session: &Session,
        path: &str,
        body: &Value,
    ) -> Result<Option<Value>, TransportError> {
        debug!(path = %path, "POST");
        let request = self.authorize(self.client.post(self.url(path)).json(body), session);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(fail(response).await);
        }
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        Ok(data_of(Self::json(response).await?))
    }

    async fn list(&self, session: &Session, path: &str) -> Result<Vec<String>, TransportError> {
        debug!(path = %path, "LIST");
        let request = self.authorize(
            self.client
                .get(self.url(path))
                .query(&[("list", "true")]),
            session,
        );
        let response = self.send(request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(fail(response).await);
        }

        let data = data_of(Self::json(response).await?)
            .ok_or_else(|| TransportError::Malformed(format!("no data in listing of {path}")))?;

        ListData::deserialize(data)
            .map(|list| list.keys)
            .map_err(|e| TransportError::Malformed(format!("invalid listing of {path}: {e}")))
    }

    async fn health(&self, session: &Session) -> Result<Value, TransportError> {
        let url = format!("{}?{HEALTH_QUERY}", self.url("sys/health"));
        let request = self.authorize(self.client.get(url), session);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            return Err(fail(response).await);
        }

        Self::json(response).await
    }
}
