//! Swagger document sources
//!
//! A run starts from exactly one document, fetched over HTTP or read from
//! disk. Any failure here is fatal for the run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::domain::{ProbeError, ProbeResult, SpecSource, SwaggerDocument};

/// Fetches the document with a GET request.
pub struct HttpSpecSource {
    client: Client,
    url: String,
}

impl HttpSpecSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    fn error(&self, reason: impl ToString) -> ProbeError {
        ProbeError::SpecFetch {
            location: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl SpecSource for HttpSpecSource {
    async fn load(&self) -> ProbeResult<SwaggerDocument> {
        info!("Fetching Swagger document from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.error(e))?;
        let bytes = response.bytes().await.map_err(|e| self.error(e))?;

        parse_document(&bytes, Format::from_location(&self.url)).map_err(|e| self.error(e))
    }
}

/// Reads the document from a local `.json`, `.yaml` or `.yml` file.
pub struct FileSpecSource {
    path: PathBuf,
}

impl FileSpecSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SpecSource for FileSpecSource {
    async fn load(&self) -> ProbeResult<SwaggerDocument> {
        let location = self.path.display().to_string();
        info!("Reading Swagger document from {}", location);
        let error = |reason: String| ProbeError::SpecFetch {
            location: location.clone(),
            reason,
        };

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| error(e.to_string()))?;
        parse_document(&bytes, Format::from_location(&location)).map_err(error)
    }
}

/// Pick a source for `location`: `http://` and `https://` go over the
/// network, anything else is a file path.
pub fn source_for(location: &str, client: Client) -> Box<dyn SpecSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSpecSource::new(client, location))
    } else {
        Box::new(FileSpecSource::new(location))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_location(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.ends_with(".yaml") || path.ends_with(".yml") {
            Self::Yaml
        } else {
            Self::Json
        }
    }
}

fn parse_document(bytes: &[u8], format: Format) -> Result<SwaggerDocument, String> {
    match format {
        Format::Json => serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {}", e)),
        Format::Yaml => serde_yaml::from_slice(bytes).map_err(|e| format!("invalid YAML: {}", e)),
    }
}
