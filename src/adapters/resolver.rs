//! Schema definition lookup
//!
//! Resolves body schemas against the `definitions` of a Swagger document,
//! either through a `$ref` pointer or by matching a bare name.

use serde_json::Value;

use crate::domain::{Definitions, Parameter};

const DEFINITIONS_PREFIX: &str = "#/definitions/";

// ============================================================================
// Name Resolution
// ============================================================================

/// Look up a definition by case-insensitive equality of its key.
///
/// Returns `None` when no key matches; callers treat that as "no body schema".
pub fn resolve<'a>(name: &str, definitions: &'a Definitions) -> Option<&'a Value> {
    resolve_entry(name, definitions).map(|(_, schema)| schema)
}

/// Like [`resolve`], but also returns the key as it is spelled in the document.
pub fn resolve_entry<'a>(name: &str, definitions: &'a Definitions) -> Option<(&'a str, &'a Value)> {
    let wanted = name.to_lowercase();
    definitions
        .iter()
        .find(|(key, _)| key.to_lowercase() == wanted)
        .map(|(key, schema)| (key.as_str(), schema))
}

// ============================================================================
// Reference Resolution
// ============================================================================

/// Resolve a `$ref` pointer such as `#/definitions/Pet`.
///
/// Bare names are accepted too. Pointers into any other part of the document
/// are not supported and resolve to `None`.
pub fn resolve_ref<'a>(reference: &str, definitions: &'a Definitions) -> Option<(&'a str, &'a Value)> {
    if let Some(name) = reference.strip_prefix(DEFINITIONS_PREFIX) {
        resolve_entry(name, definitions)
    } else if reference.starts_with('#') || reference.contains('/') {
        None
    } else {
        resolve_entry(reference, definitions)
    }
}

/// Find the schema that describes a body parameter.
///
/// Order of preference: the parameter's `schema.$ref`, then its inline schema,
/// then a definition named like the parameter itself.
pub fn resolve_parameter<'a>(parameter: &'a Parameter, definitions: &'a Definitions) -> Option<&'a Value> {
    if let Some(reference) = &parameter.schema_ref {
        if let Some((_, schema)) = resolve_ref(reference, definitions) {
            return Some(schema);
        }
        tracing::debug!(
            "Unresolved schema reference {} for parameter {}, falling back to name lookup",
            reference,
            parameter.name
        );
    } else if let Some(schema) = &parameter.schema {
        return Some(schema);
    }

    resolve(&parameter.name, definitions)
}
