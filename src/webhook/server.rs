// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport for the mutating admission webhook

use crate::constants::admission::MUTATE_ROUTE;
use crate::rules::RuleStore;
use crate::webhook::mutate::mutate;
use anyhow::Context;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use rustls::ServerConfig;
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

/// Shared state for webhook handlers
pub struct WebhookState {
    pub rules: RuleStore,
    pub grouping_label: String,
}

pub struct WebhookServer {
    addr: SocketAddr,
    state: Arc<WebhookState>,
    tls: Option<TlsAcceptor>,
}

impl WebhookServer {
    pub fn new(addr: SocketAddr, state: WebhookState) -> Self {
        Self {
            addr,
            state: Arc::new(state),
            tls: None,
        }
    }

    /// Terminate TLS on accepted connections
    pub fn with_tls(mut self, config: Arc<ServerConfig>) -> Self {
        self.tls = Some(TlsAcceptor::from(config));
        self
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind webhook listener on {}", self.addr))?;
        info!(
            "Webhook listening on {} ({})",
            self.addr,
            if self.tls.is_some() { "https" } else { "http" }
        );

        self.serve(listener).await
    }

    async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let state = self.state.clone();
            let tls = self.tls.clone();
            tokio::spawn(async move {
                match tls {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(stream) => serve_connection(stream, peer, state).await,
                        Err(e) => debug!("TLS handshake with {} failed: {}", peer, e),
                    },
                    None => serve_connection(stream, peer, state).await,
                }
            });
        }
    }
}

async fn serve_connection<S>(stream: S, peer: SocketAddr, state: Arc<WebhookState>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(handle(req, &state).await) }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        debug!("Connection from {} ended with error: {}", peer, e);
    }
}

/// Route one HTTP request
pub async fn handle<B>(req: Request<B>, state: &WebhookState) -> Response<Full<Bytes>>
where
    B: hyper::body::Body,
    B::Error: Display,
{
    if req.uri().path() != MUTATE_ROUTE {
        return plain(StatusCode::NOT_FOUND, "not found");
    }
    if req.method() != Method::POST {
        return plain(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json") {
        error!("contentType={}, expect application/json", content_type);
        return plain(StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected application/json");
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return plain(StatusCode::BAD_REQUEST, "unreadable body");
        }
    };

    review(&body, state)
}

/// Decode an AdmissionReview, run the mutation and encode the reply
fn review(body: &[u8], state: &WebhookState) -> Response<Full<Bytes>> {
    let review: AdmissionReview<DynamicObject> = match serde_json::from_slice(body) {
        Ok(review) => review,
        Err(e) => {
            error!("Failed to decode admission review: {}", e);
            return json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to parse admission request: {}", e);
            return json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let rules = state.rules.snapshot();
    match mutate(&request, &rules, &state.grouping_label) {
        Some(response) => json(response.into_review()),
        None => plain(StatusCode::BAD_REQUEST, "unexpected resource"),
    }
}

fn json(review: AdmissionReview<DynamicObject>) -> Response<Full<Bytes>> {
    match serde_json::to_vec(&review) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            error!("Failed to encode admission review: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, "encoding failed")
        }
    }
}

fn plain(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response
}
