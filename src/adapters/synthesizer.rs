//! Schema-driven sample synthesis
//!
//! Turns a JSON-schema-like definition into a concrete example value. Only
//! `type`, `format`, `items`, `properties` and `$ref` are honored; anything
//! else degrades to `null` or an empty container instead of failing.

use serde_json::{json, Map, Value};

use super::resolver;
use crate::domain::{Definitions, ProbeError, ProbeResult};

/// Default nesting limit before synthesis gives up with a cycle error
pub const DEFAULT_MAX_DEPTH: usize = 32;

pub const SAMPLE_DATE_TIME: &str = "2023-10-10T10:00:00Z";
pub const SAMPLE_DATE: &str = "2023-10-10";
pub const SAMPLE_UUID: &str = "123e4567-e89b-12d3-a456-426614174000";
pub const SAMPLE_STRING: &str = "sample string";
pub const SAMPLE_INTEGER: i64 = 1;
pub const SAMPLE_NUMBER: f64 = 1.23;

/// Synthesize a sample for a standalone schema with no definitions to resolve.
pub fn synthesize(schema: &Value) -> ProbeResult<Value> {
    let definitions = Definitions::new();
    SampleSynthesizer::new(&definitions).synthesize(schema)
}

/// Canonical sample for a scalar `type`/`format` pair, `None` for non-scalars.
pub fn sample_scalar(type_name: &str, format: Option<&str>) -> Option<Value> {
    match type_name {
        "string" => Some(Value::String(sample_string(format).to_string())),
        "integer" => Some(json!(SAMPLE_INTEGER)),
        "number" => Some(json!(SAMPLE_NUMBER)),
        "boolean" => Some(Value::Bool(true)),
        _ => None,
    }
}

fn sample_string(format: Option<&str>) -> &'static str {
    match format {
        Some("date-time") => SAMPLE_DATE_TIME,
        Some("date") => SAMPLE_DATE,
        Some("uuid") => SAMPLE_UUID,
        _ => SAMPLE_STRING,
    }
}

// ============================================================================
// Synthesis Context
// ============================================================================

/// Per-call bookkeeping threaded through the recursion
#[derive(Default)]
struct SynthesisContext {
    /// Definitions currently being expanded, outermost first
    ref_stack: Vec<String>,
    /// Property names and definition keys leading to the current node
    path: Vec<String>,
}

impl SynthesisContext {
    fn path(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.join(".")
        }
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

pub struct SampleSynthesizer<'a> {
    definitions: &'a Definitions,
    max_depth: usize,
}

impl<'a> SampleSynthesizer<'a> {
    pub fn new(definitions: &'a Definitions) -> Self {
        Self {
            definitions,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Build a sample value for `schema`.
    ///
    /// Fails only with [`ProbeError::SchemaCycle`], when a `$ref` re-enters a
    /// definition that is already being expanded or nesting exceeds the depth
    /// limit.
    pub fn synthesize(&self, schema: &Value) -> ProbeResult<Value> {
        let mut ctx = SynthesisContext::default();
        self.sample(schema, &mut ctx, 0)
    }

    /// Build a request body for `schema`.
    ///
    /// Unlike [`synthesize`](Self::synthesize), a top-level schema without a
    /// `type` (an `allOf` composition, a description-only definition) becomes
    /// an object, so the body is never the literal `null`.
    pub fn synthesize_body(&self, schema: &Value) -> ProbeResult<Value> {
        let mut ctx = SynthesisContext::default();
        match schema.as_object() {
            Some(map) if !map.contains_key("type") && !map.contains_key("$ref") => {
                self.sample_object(map, &mut ctx, 0)
            }
            Some(_) => match self.sample(schema, &mut ctx, 0)? {
                Value::Null => Ok(Value::Object(Map::new())),
                value => Ok(value),
            },
            None => Ok(Value::Object(Map::new())),
        }
    }

    fn sample(&self, schema: &Value, ctx: &mut SynthesisContext, depth: usize) -> ProbeResult<Value> {
        if depth > self.max_depth {
            return Err(ProbeError::SchemaCycle {
                path: ctx.path(),
                depth,
            });
        }

        let Some(schema) = schema.as_object() else {
            return Ok(Value::Null);
        };

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            return self.sample_ref(reference, ctx, depth);
        }

        let format = schema.get("format").and_then(Value::as_str);
        match schema.get("type").and_then(Value::as_str) {
            Some("object") => self.sample_object(schema, ctx, depth),
            Some("array") => self.sample_array(schema, ctx, depth),
            Some(type_name) => Ok(sample_scalar(type_name, format).unwrap_or(Value::Null)),
            // Definitions frequently omit `type: object` and only list properties
            None if schema.get("properties").is_some_and(Value::is_object) => {
                self.sample_object(schema, ctx, depth)
            }
            None => Ok(Value::Null),
        }
    }

    fn sample_object(
        &self,
        schema: &Map<String, Value>,
        ctx: &mut SynthesisContext,
        depth: usize,
    ) -> ProbeResult<Value> {
        let mut result = Map::new();
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Ok(Value::Object(result));
        };

        for (name, property) in properties {
            ctx.path.push(name.clone());
            let value = self.sample(property, ctx, depth + 1);
            ctx.path.pop();
            result.insert(name.clone(), value?);
        }

        Ok(Value::Object(result))
    }

    fn sample_array(
        &self,
        schema: &Map<String, Value>,
        ctx: &mut SynthesisContext,
        depth: usize,
    ) -> ProbeResult<Value> {
        match schema.get("items") {
            Some(items) if items.is_object() => {
                ctx.path.push("[]".to_string());
                let item = self.sample(items, ctx, depth + 1);
                ctx.path.pop();
                Ok(Value::Array(vec![item?]))
            }
            _ => Ok(Value::Array(Vec::new())),
        }
    }

    fn sample_ref(&self, reference: &str, ctx: &mut SynthesisContext, depth: usize) -> ProbeResult<Value> {
        let Some((key, definition)) = resolver::resolve_ref(reference, self.definitions) else {
            tracing::debug!("Unresolved schema reference {} at {}", reference, ctx.path());
            return Ok(Value::Null);
        };

        if ctx.ref_stack.iter().any(|active| active == key) {
            ctx.path.push(key.to_string());
            let err = ProbeError::SchemaCycle {
                path: ctx.path(),
                depth,
            };
            ctx.path.pop();
            return Err(err);
        }

        ctx.ref_stack.push(key.to_string());
        ctx.path.push(key.to_string());
        let value = self.sample(definition, ctx, depth + 1);
        ctx.path.pop();
        ctx.ref_stack.pop();
        value
    }
}
