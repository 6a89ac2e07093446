use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};

use crate::domain::{DispatchResponse, PreparedRequest, ProbeError, ProbeResult, RequestDispatcher};

/// Sends prepared requests to `<base_url><path>` with reqwest.
///
/// The client is shared with the rest of the run; timeouts are configured on it.
pub struct HttpDispatcher {
    client: Client,
    base_url: String,
}

impl HttpDispatcher {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a prepared request, query string included.
    pub fn url_for(&self, request: &PreparedRequest) -> ProbeResult<Url> {
        let raw = format!("{}{}", self.base_url, request.path);
        let mut url = Url::parse(&raw)
            .map_err(|e| ProbeError::RequestBuild(format!("invalid URL {}: {}", raw, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    fn build(&self, request: PreparedRequest) -> ProbeResult<reqwest::Request> {
        let method = Method::from_bytes(request.operation.method.as_bytes()).map_err(|e| {
            ProbeError::RequestBuild(format!("invalid method {}: {}", request.operation.method, e))
        })?;
        let url = self.url_for(&request)?;

        let mut builder = self.client.request(method, url);
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }
        builder
            .build()
            .map_err(|e| ProbeError::RequestBuild(e.to_string()))
    }
}

#[async_trait]
impl RequestDispatcher for HttpDispatcher {
    async fn dispatch(&self, request: PreparedRequest) -> ProbeResult<DispatchResponse> {
        let request = self.build(request)?;
        let response = self.client.execute(request).await?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::ResponseRead(e.to_string()))?;

        Ok(DispatchResponse { status, body })
    }
}
