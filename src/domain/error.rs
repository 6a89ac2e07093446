//! Error types for document loading, payload synthesis and dispatch

use thiserror::Error;

/// Errors that can occur while probing an API surface.
///
/// Only [`ProbeError::SpecFetch`] and [`ProbeError::Config`] abort a run. Every
/// other variant is scoped to a single operation.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The Swagger document could not be fetched or decoded
    #[error("Failed to load Swagger document from {location}: {reason}")]
    SpecFetch { location: String, reason: String },

    /// A single operation or parameter was malformed
    #[error("Malformed operation {method} {route}: {reason}")]
    OperationParse {
        route: String,
        method: String,
        reason: String,
    },

    /// A schema refers back to one of its ancestors, or nests past the depth limit
    #[error("Schema cycle detected at '{path}' (depth {depth})")]
    SchemaCycle { path: String, depth: usize },

    /// The synthesized payload could not be encoded as JSON
    #[error("Payload marshal error: {0}")]
    PayloadMarshal(String),

    /// The HTTP request could not be constructed
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// The request failed on the wire
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be read
    #[error("Response read error: {0}")]
    ResponseRead(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    /// Short, stable name of the variant, used in results and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::SpecFetch { .. } => "spec_fetch",
            ProbeError::OperationParse { .. } => "operation_parse",
            ProbeError::SchemaCycle { .. } => "schema_cycle",
            ProbeError::PayloadMarshal(_) => "payload_marshal",
            ProbeError::RequestBuild(_) => "request_build",
            ProbeError::Transport(_) => "transport",
            ProbeError::ResponseRead(_) => "response_read",
            ProbeError::Config(_) => "config",
        }
    }

    /// Whether the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProbeError::SpecFetch { .. } | ProbeError::Config(_))
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ProbeError::RequestBuild(err.to_string())
        } else if err.is_timeout() {
            ProbeError::Transport(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ProbeError::Transport(format!("Connection error: {}", err))
        } else if err.is_body() || err.is_decode() {
            ProbeError::ResponseRead(err.to_string())
        } else {
            ProbeError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::PayloadMarshal(err.to_string())
    }
}

/// Result type alias for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;
