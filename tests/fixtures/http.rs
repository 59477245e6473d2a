// Copyright (c) 2025 - Cowboy AI, Inc.
//! Scripted HTTP Server
//!
//! A local axum server that answers `(method, path)` routes from a script and
//! records every request it receives, so adapter tests can assert the exact
//! sequence, headers and bodies a client sends.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// `"POST /path"`, for compact sequence assertions
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A canned reply
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: String,
}

impl Reply {
    pub fn json(value: Value) -> Self {
        Self::status(StatusCode::OK, value)
    }

    pub fn status(status: StatusCode, value: Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: value.to_string(),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn into_response(self) -> Response {
        let mut builder = axum::http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Body::from(self.body)).unwrap()
    }
}

#[derive(Default)]
struct ServerState {
    /// Replies per route; the last one repeats
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Running scripted server bound to an ephemeral local port
#[derive(Clone)]
pub struct ScriptedServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl ScriptedServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new().fallback(answer).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// `host:port`, as a management endpoint
    pub fn authority(&self) -> String {
        self.addr.to_string()
    }

    /// `http://host:port`, as a base URL
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue `reply` for `method path`
    pub fn route(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.requests().iter().map(RecordedRequest::line).collect()
    }

    /// First recorded request for `method path`
    pub fn request(&self, method: Method, path: &str) -> RecordedRequest {
        self.requests()
            .into_iter()
            .find(|r| r.method == method && r.path == path)
            .unwrap_or_else(|| panic!("no {} {} request recorded", method, path))
    }
}

async fn answer(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    let mut routes = state.routes.lock().unwrap();
    let reply = match routes.get_mut(&(method, path.clone())) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
    };

    reply
        .unwrap_or_else(|| {
            Reply::status(
                StatusCode::NOT_FOUND,
                serde_json::json!({"code": "NotFound", "message": format!("no route for {}", path)}),
            )
        })
        .into_response()
}
