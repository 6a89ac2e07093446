use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

pub mod error;

pub use error::{ProbeError, ProbeResult};

/// Named schema definitions of a Swagger document (`#/definitions/*`)
pub type Definitions = Map<String, Value>;

/// The parts of a Swagger v2 document that drive a probe run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SwaggerDocument {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub paths: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub definitions: Definitions,
    /// Shared parameters referenced as `#/parameters/<name>`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Map<String, Value>,
}

/// An explicit `null` section reads as an empty one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Body,
    FormData,
}

impl ParameterLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "path" => Some(Self::Path),
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            "formData" => Some(Self::FormData),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Header => "header",
            Self::Body => "body",
            Self::FormData => "formData",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub location: ParameterLocation,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub format: String,
    /// `schema.$ref` of a body parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<String>,
    /// Inline body schema, kept only when it carries no `$ref`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Parameter {
    pub fn new(location: ParameterLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
            required: false,
            type_: String::new(),
            format: String::new(),
            schema_ref: None,
            schema: None,
        }
    }

    pub fn is_body(&self) -> bool {
        self.location == ParameterLocation::Body
    }
}

/// Identity of an operation within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationKey {
    pub route: String,
    pub method: String,
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.route)
    }
}

/// One (route, HTTP method) pair extracted from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub route: String,
    /// Upper-case HTTP method
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub responses: Map<String, Value>,
    #[serde(default)]
    pub summary: String,
}

impl OperationDescriptor {
    pub fn new(route: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            method: method.into().to_uppercase(),
            parameters: Vec::new(),
            responses: Map::new(),
            summary: String::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn key(&self) -> OperationKey {
        OperationKey {
            route: self.route.clone(),
            method: self.method.clone(),
        }
    }

    /// The body parameter that drives payload synthesis. Swagger allows at most
    /// one; when a document declares several, the last one wins.
    pub fn body_parameter(&self) -> Option<&Parameter> {
        self.parameters.iter().rev().find(|p| p.is_body())
    }
}

/// Lifecycle of one operation inside the dispatch pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Pending,
    TokenAcquired,
    Enqueued,
    Dispatched,
    Completed,
    Cancelled,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::TokenAcquired => "token_acquired",
            Self::Enqueued => "enqueued",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A request ready to be sent: path parameters substituted, payload encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub operation: OperationKey,
    /// Route with `{param}` placeholders filled in
    pub path: String,
    pub query: Vec<(String, String)>,
    /// The synthesized payload, if the operation has a resolvable body schema
    pub payload: Option<Value>,
    /// JSON encoding of `payload`
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Success { body: String },
    Failed { kind: String, message: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub operation: OperationKey,
    pub status: Option<u16>,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
    pub elapsed: Duration,
    pub completed_at: DateTime<Utc>,
}

impl DispatchResult {
    pub fn from_response(
        operation: OperationKey,
        response: ProbeResult<DispatchResponse>,
        elapsed: Duration,
    ) -> Self {
        let (status, outcome) = match response {
            Ok(response) => (
                Some(response.status),
                DispatchOutcome::Success {
                    body: response.body,
                },
            ),
            Err(err) => (
                None,
                DispatchOutcome::Failed {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                },
            ),
        };
        Self {
            operation,
            status,
            outcome,
            elapsed,
            completed_at: Utc::now(),
        }
    }

    pub fn cancelled(operation: OperationKey) -> Self {
        Self {
            operation,
            status: None,
            outcome: DispatchOutcome::Cancelled,
            elapsed: Duration::ZERO,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Success { .. })
    }
}

/// Where the Swagger document comes from
#[async_trait]
pub trait SpecSource: Send + Sync {
    async fn load(&self) -> ProbeResult<SwaggerDocument>;
}

/// Sends one prepared request to the target API
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn dispatch(&self, request: PreparedRequest) -> ProbeResult<DispatchResponse>;
}

/// Receives batches of completed results from the flusher
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn flush(&self, batch: &[DispatchResult]) -> anyhow::Result<()>;
}
