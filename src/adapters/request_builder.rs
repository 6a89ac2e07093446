use serde_json::Value;

use super::resolver;
use super::synthesizer::{sample_scalar, SampleSynthesizer};
use crate::domain::{
    Definitions, OperationDescriptor, Parameter, ParameterLocation, PreparedRequest, ProbeResult,
};

/// Synthesize the body payload of an operation.
///
/// Returns `Ok(None)` when the operation has no body parameter or its schema
/// cannot be resolved.
pub fn prepare_payload(
    operation: &OperationDescriptor,
    definitions: &Definitions,
    max_depth: usize,
) -> ProbeResult<Option<Value>> {
    let Some(parameter) = operation.body_parameter() else {
        return Ok(None);
    };
    let Some(schema) = resolver::resolve_parameter(parameter, definitions) else {
        tracing::debug!(
            "No schema found for body parameter {} of {}",
            parameter.name,
            operation.key()
        );
        return Ok(None);
    };

    SampleSynthesizer::new(definitions)
        .with_max_depth(max_depth)
        .synthesize_body(schema)
        .map(Some)
}

/// Build everything needed to send `operation`: substituted path, sample query
/// string, synthesized payload and its JSON encoding.
pub fn prepare_request(
    operation: &OperationDescriptor,
    definitions: &Definitions,
    max_depth: usize,
) -> ProbeResult<PreparedRequest> {
    let payload = prepare_payload(operation, definitions, max_depth)?;
    let body = payload.as_ref().map(serde_json::to_vec).transpose()?;

    Ok(PreparedRequest {
        operation: operation.key(),
        path: render_path(&operation.route, &operation.parameters),
        query: render_query(&operation.parameters),
        payload,
        body,
    })
}

/// Replace `{name}` placeholders with a sample of each path parameter's type.
pub fn render_path(route: &str, parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path)
        .fold(route.to_string(), |path, p| {
            path.replace(&format!("{{{}}}", p.name), &sample_parameter_value(p))
        })
}

pub fn render_query(parameters: &[Parameter]) -> Vec<(String, String)> {
    parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Query)
        .map(|p| (p.name.clone(), sample_parameter_value(p)))
        .collect()
}

/// Text form of a parameter's sample value, as it appears in a URL.
pub fn sample_parameter_value(parameter: &Parameter) -> String {
    let format = Some(parameter.format.as_str()).filter(|f| !f.is_empty());
    match sample_scalar(&parameter.type_, format) {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => "sample".to_string(),
    }
}
