//! Operation extraction
//!
//! Flattens the `paths` section of a Swagger document into one
//! [`OperationDescriptor`] per (route, method). The whole list is built before
//! any dispatch starts; malformed operations are logged and skipped here.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{
    OperationDescriptor, Parameter, ParameterLocation, ProbeError, ProbeResult, SwaggerDocument,
};

const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];
const PARAMETERS_PREFIX: &str = "#/parameters/";

/// Extract every well-formed operation of `document`.
pub fn extract_operations(document: &SwaggerDocument) -> Vec<OperationDescriptor> {
    let mut operations = Vec::new();

    for (route, path_item) in &document.paths {
        let Some(path_item) = path_item.as_object() else {
            warn!("Skipping route {}: path item is not an object", route);
            continue;
        };

        for (method, operation) in path_item {
            if !HTTP_METHODS.contains(&method.to_lowercase().as_str()) {
                continue;
            }
            match parse_operation(route, method, operation, path_item, document) {
                Ok(descriptor) => operations.push(descriptor),
                Err(e) => warn!("Skipping operation: {}", e),
            }
        }
    }

    debug!("Extracted {} operations", operations.len());
    operations
}

/// Parse one operation object. Parameters declared on the path item apply to
/// every operation of the route unless the operation redeclares them.
pub fn parse_operation(
    route: &str,
    method: &str,
    raw: &Value,
    path_item: &Map<String, Value>,
    document: &SwaggerDocument,
) -> ProbeResult<OperationDescriptor> {
    let malformed = |reason: String| ProbeError::OperationParse {
        route: route.to_string(),
        method: method.to_uppercase(),
        reason,
    };

    let operation = raw
        .as_object()
        .ok_or_else(|| malformed("operation is not an object".to_string()))?;

    let shared = parse_parameter_list(path_item.get("parameters"), document).map_err(&malformed)?;
    let own = parse_parameter_list(operation.get("parameters"), document).map_err(&malformed)?;

    let mut parameters: Vec<Parameter> = shared
        .into_iter()
        .filter(|s| !own.iter().any(|o| o.name == s.name && o.location == s.location))
        .collect();
    parameters.extend(own);

    let mut descriptor = OperationDescriptor::new(route, method);
    descriptor.parameters = parameters;
    descriptor.responses = operation
        .get("responses")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    descriptor.summary = get_string(operation, "summary");
    Ok(descriptor)
}

fn parse_parameter_list(
    raw: Option<&Value>,
    document: &SwaggerDocument,
) -> Result<Vec<Parameter>, String> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                parse_parameter(item, document).map_err(|e| format!("parameter #{}: {}", i, e))
            })
            .collect(),
        Some(_) => Err("parameters is not a list".to_string()),
    }
}

/// Parse a single parameter object, following `#/parameters/<name>` references.
pub fn parse_parameter(raw: &Value, document: &SwaggerDocument) -> Result<Parameter, String> {
    let mut param = raw.as_object().ok_or("not an object")?;

    if let Some(reference) = param.get("$ref").and_then(Value::as_str) {
        let name = reference
            .strip_prefix(PARAMETERS_PREFIX)
            .ok_or_else(|| format!("unsupported reference {}", reference))?;
        param = document
            .parameters
            .get(name)
            .and_then(Value::as_object)
            .ok_or_else(|| format!("unresolved reference {}", reference))?;
    }

    let location = param
        .get("in")
        .and_then(Value::as_str)
        .ok_or("missing 'in'")?;
    let location = ParameterLocation::parse(location)
        .ok_or_else(|| format!("unknown location '{}'", location))?;

    let name = get_string(param, "name");
    if name.is_empty() {
        return Err("missing 'name'".to_string());
    }

    let mut parameter = Parameter::new(location, name);
    parameter.required = param.get("required").and_then(Value::as_bool).unwrap_or(false);
    parameter.type_ = get_string(param, "type");
    parameter.format = get_string(param, "format");

    if let Some(schema) = param.get("schema").filter(|s| s.is_object()) {
        match schema.get("$ref").and_then(Value::as_str) {
            Some(reference) => parameter.schema_ref = Some(reference.to_string()),
            None => parameter.schema = Some(schema.clone()),
        }
    }

    Ok(parameter)
}

fn get_string(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> SwaggerDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extracts_one_descriptor_per_route_and_method() {
        let doc = document(json!({
            "paths": {
                "/pets": {
                    "get": { "summary": "List pets", "responses": { "200": { "description": "ok" } } },
                    "post": {
                        "parameters": [
                            { "in": "body", "name": "Pet", "required": true, "schema": { "$ref": "#/definitions/Pet" } }
                        ]
                    }
                },
                "/pets/{petId}": {
                    "delete": {
                        "parameters": [
                            { "in": "path", "name": "petId", "required": true, "type": "integer", "format": "int64" }
                        ]
                    }
                }
            }
        }));

        let operations = extract_operations(&doc);
        assert_eq!(operations.len(), 3);

        let list = operations.iter().find(|o| o.method == "GET").unwrap();
        assert_eq!(list.route, "/pets");
        assert_eq!(list.summary, "List pets");
        assert!(list.responses.contains_key("200"));
        assert!(list.parameters.is_empty());

        let create = operations.iter().find(|o| o.method == "POST").unwrap();
        let body = create.body_parameter().unwrap();
        assert!(body.required);
        assert_eq!(body.schema_ref.as_deref(), Some("#/definitions/Pet"));

        let delete = operations.iter().find(|o| o.method == "DELETE").unwrap();
        assert_eq!(delete.parameters[0].location, ParameterLocation::Path);
        assert_eq!(delete.parameters[0].type_, "integer");
        assert_eq!(delete.parameters[0].format, "int64");
    }

    #[test]
    fn test_malformed_operations_are_skipped_individually() {
        let doc = document(json!({
            "paths": {
                "/broken": "not an object",
                "/pets": {
                    "get": "not an object",
                    "put": { "parameters": [ "not an object" ] },
                    "patch": { "parameters": [ { "in": "cookie", "name": "session" } ] },
                    "delete": { "parameters": [ { "in": "query" } ] },
                    "post": { "parameters": [ { "in": "body", "name": "Pet" } ] }
                }
            }
        }));

        let operations = extract_operations(&doc);
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].method, "POST");
    }

    #[test]
    fn test_non_method_keys_are_ignored() {
        let doc = document(json!({
            "paths": {
                "/pets": {
                    "x-internal": true,
                    "parameters": [],
                    "get": {}
                }
            }
        }));
        let operations = extract_operations(&doc);
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].method, "GET");
    }

    #[test]
    fn test_path_level_parameters_are_merged() {
        let doc = document(json!({
            "paths": {
                "/stores/{storeId}/orders": {
                    "parameters": [
                        { "in": "path", "name": "storeId", "type": "string" },
                        { "in": "query", "name": "limit", "type": "integer" }
                    ],
                    "get": {
                        "parameters": [ { "in": "query", "name": "limit", "type": "string" } ]
                    }
                }
            }
        }));

        let operations = extract_operations(&doc);
        let params = &operations[0].parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "storeId");
        assert_eq!(params[1].name, "limit");
        assert_eq!(params[1].type_, "string");
    }

    #[test]
    fn test_parameter_references_are_followed() {
        let doc = document(json!({
            "parameters": {
                "PageSize": { "in": "query", "name": "pageSize", "type": "integer" }
            },
            "paths": {
                "/pets": {
                    "get": { "parameters": [ { "$ref": "#/parameters/PageSize" } ] },
                    "head": { "parameters": [ { "$ref": "#/parameters/Missing" } ] }
                }
            }
        }));

        let operations = extract_operations(&doc);
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].parameters[0].name, "pageSize");
    }

    #[test]
    fn test_inline_body_schema_is_kept() {
        let doc = document(json!({
            "paths": {
                "/tags": {
                    "post": {
                        "parameters": [
                            { "in": "body", "name": "tags", "schema": { "type": "array", "items": { "type": "string" } } }
                        ]
                    }
                }
            }
        }));

        let operations = extract_operations(&doc);
        let body = operations[0].body_parameter().unwrap();
        assert!(body.schema_ref.is_none());
        assert_eq!(body.schema.as_ref().unwrap()["type"], "array");
    }
}
