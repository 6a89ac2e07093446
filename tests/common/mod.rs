use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// A request as seen by the mock target API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct MockState {
    document: Arc<Value>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Serves a Swagger document at `/swagger.json` and records every other request.
pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub async fn new(document: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            document: Arc::new(document),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/swagger.json", get(serve_document))
            .route("/broken.json", get(|| async { "{ not json" }))
            .fallback(record)
            .with_state(state);

        // Start server on random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            addr,
            base_url,
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request(&self, method: &str, path: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .find(|r| r.method == method && r.path == path)
    }
}

async fn serve_document(State(state): State<MockState>) -> Json<Value> {
    Json(state.document.as_ref().clone())
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: body.to_vec(),
    };
    state.requests.lock().unwrap().push(recorded);

    if uri.path().ends_with(".json") {
        (StatusCode::NOT_FOUND, "not found")
    } else if uri.path().ends_with("/error") {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
    } else if method == Method::POST {
        (StatusCode::CREATED, "created")
    } else {
        (StatusCode::OK, "ok")
    }
}

/// A small petstore-like document covering refs, inline schemas, path and
/// query parameters and one self-referencing definition.
pub fn petstore() -> Value {
    json!({
        "swagger": "2.0",
        "paths": {
            "/pets": {
                "get": {
                    "parameters": [ { "in": "query", "name": "limit", "type": "integer" } ]
                },
                "post": {
                    "parameters": [
                        { "in": "body", "name": "pet", "required": true, "schema": { "$ref": "#/definitions/Pet" } }
                    ]
                }
            },
            "/pets/{petId}": {
                "parameters": [ { "in": "path", "name": "petId", "required": true, "type": "integer" } ],
                "get": {},
                "delete": {}
            },
            "/stores/{storeId}/cards": {
                "post": {
                    "parameters": [
                        { "in": "path", "name": "storeId", "type": "string" },
                        { "in": "body", "name": "Card" }
                    ]
                }
            },
            "/nodes": {
                "put": {
                    "parameters": [
                        { "in": "body", "name": "node", "schema": { "$ref": "#/definitions/Node" } }
                    ]
                }
            },
            "/reports/error": { "get": {} }
        },
        "definitions": {
            "Pet": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "born": { "type": "string", "format": "date-time" },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "owner": { "$ref": "#/definitions/Owner" }
                }
            },
            "Owner": {
                "properties": { "id": { "type": "string", "format": "uuid" } }
            },
            "Card": {
                "properties": {
                    "number": { "type": "string" },
                    "cvv": { "type": "integer" },
                    "balance": { "type": "number" }
                }
            },
            "Node": {
                "type": "object",
                "properties": { "next": { "$ref": "#/definitions/Node" } }
            }
        }
    })
}
