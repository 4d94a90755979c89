// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request seen by the mock, with its body parsed as JSON when possible
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Clone)]
enum Canned {
    Fixed(u16, String),
    /// Answers in order, the last one repeats
    Sequence(Vec<(u16, String)>),
    /// Answer with the request body itself, as the API server does for a
    /// successful replace
    Echo,
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), Canned>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.insert("GET", path, Canned::Fixed(status, body.to_string()))
    }

    /// Answer successive GET requests on the path with the given responses
    pub fn on_get_sequence(self, path: &str, responses: &[(u16, &str)]) -> Self {
        let responses = responses
            .iter()
            .map(|(status, body)| (*status, body.to_string()))
            .collect();
        self.insert("GET", path, Canned::Sequence(responses))
    }

    /// Accept PUT requests on the path and echo the submitted object
    pub fn on_put(self, path: &str) -> Self {
        self.insert("PUT", path, Canned::Echo)
    }

    /// Fail PUT requests on the path with the given status
    pub fn on_put_error(self, path: &str, status: u16, body: &str) -> Self {
        self.insert("PUT", path, Canned::Fixed(status, body.to_string()))
    }

    /// Shared view of every request made so far
    pub fn recorder(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        self.requests.clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn insert(self, method: &str, path: &str, canned: Canned) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), canned);
        self
    }

    fn find_response(&self, method: &str, path: &str) -> Option<Canned> {
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(&(method.to_string(), path.to_string()))? {
            Canned::Sequence(queue) if queue.len() > 1 => {
                let (status, body) = queue.remove(0);
                Some(Canned::Fixed(status, body))
            }
            Canned::Sequence(queue) => queue
                .first()
                .map(|(status, body)| Canned::Fixed(*status, body.clone())),
            canned => Some(canned.clone()),
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body: Bytes = req.into_body().collect().await?.to_bytes();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path,
                body: serde_json::from_slice(&body).ok(),
            });

            let (status, body) = match response {
                Some(Canned::Fixed(status, body)) => (status, body.into_bytes()),
                Some(Canned::Sequence(_)) => unreachable!("sequences resolve to fixed responses"),
                Some(Canned::Echo) => (200, body.to_vec()),
                None => (404, not_found_json("resource", "unknown").into_bytes()),
            };

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap())
        })
    }
}

/// Requests recorded for a method and path
pub fn requests_for(
    recorder: &Arc<Mutex<Vec<RecordedRequest>>>,
    method: &str,
    path: &str,
) -> Vec<RecordedRequest> {
    recorder
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.method == method && r.path == path)
        .cloned()
        .collect()
}

/// Create a mock ConfigMap JSON response holding the rule YAML
pub fn configmap_json(name: &str, namespace: &str, rules: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": namespace },
        "data": { "config": rules }
    })
    .to_string()
}

/// Create a mock PersistentVolumeClaim JSON response
pub fn claim_json(name: &str, namespace: &str, volume_name: Option<&str>) -> String {
    claim_value(name, namespace, volume_name).to_string()
}

/// PersistentVolumeClaim object, `Bound` when a volume name is given
pub fn claim_value(name: &str, namespace: &str, volume_name: Option<&str>) -> Value {
    let phase = if volume_name.is_some() { "Bound" } else { "Pending" };
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "PersistentVolumeClaim",
        "metadata": { "name": name, "namespace": namespace },
        "spec": { "volumeName": volume_name },
        "status": { "phase": phase }
    })
}

/// Create a mock PersistentVolume JSON response
pub fn volume_json(name: &str, annotations: Option<Value>) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "PersistentVolume",
        "metadata": { "name": name, "annotations": annotations },
        "spec": {}
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a 409 conflict response
pub fn conflict_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("Operation cannot be fulfilled on {} \"{}\": the object has been modified", resource, name),
        "reason": "Conflict",
        "code": 409
    })
    .to_string()
}
