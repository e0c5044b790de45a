//! Reverse proxy engine.
//!
//! Each request goes through lookup, then either the static fast path or a
//! forward to the backend, then optional rewriting of the returned payload.
//! Forwarding is single-attempt. Dropping the handler future (client gone)
//! drops the outbound request with it.

mod static_files;

pub use static_files::content_type_for;

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use axum::response::Response;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::BackendsConfig;
use crate::discovery::EndpointDiscovery;
use crate::error::{GatewayError, Result};
use crate::registry::BackendRegistry;
use crate::rewrite::{inject_home_button, rewrite_urls, PayloadKind};

/// Inbound headers never forwarded to a backend.
const EXCLUDED_REQUEST_HEADERS: [&str; 10] = [
    "host",
    "content-length",
    "connection",
    "upgrade",
    "transfer-encoding",
    "te",
    "trailer",
    "proxy-authorization",
    "proxy-authenticate",
    "accept-encoding",
];

/// Backend headers recomputed by the serving layer.
const EXCLUDED_RESPONSE_HEADERS: [&str; 6] = [
    "content-encoding",
    "transfer-encoding",
    "connection",
    "server",
    "date",
    "content-length",
];

/// The parts of an inbound request relayed to a backend.
#[derive(Debug, Clone, Default)]
pub struct ProxyRequest {
    pub method: Method,
    pub headers: HeaderMap,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    pub body: Bytes,
}

pub struct ProxyEngine {
    http_client: Client,
    backends: BackendsConfig,
    registry: Arc<BackendRegistry>,
    discovery: Arc<EndpointDiscovery>,
}

impl ProxyEngine {
    pub fn new(
        backends: BackendsConfig,
        registry: Arc<BackendRegistry>,
        discovery: Arc<EndpointDiscovery>,
    ) -> reqwest::Result<Self> {
        let http_client = Client::builder()
            .timeout(backends.proxy_timeout())
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            http_client,
            backends,
            registry,
            discovery,
        })
    }

    /// Proxy `request` to `sub_path` of backend `key`.
    pub async fn handle(&self, key: &str, sub_path: &str, request: ProxyRequest) -> Result<Response> {
        let record = self.registry.resolve(key).await?;
        let port = record.live_port()?;

        if let Some(response) = static_files::serve(&self.registry, key, sub_path).await {
            return Ok(response);
        }

        self.forward(key, port, sub_path, request).await
    }

    fn target_url(&self, port: u16, sub_path: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.backends.base_url(port), sub_path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    async fn forward(
        &self,
        key: &str,
        port: u16,
        sub_path: &str,
        request: ProxyRequest,
    ) -> Result<Response> {
        let url = self.target_url(port, sub_path, request.query.as_deref());
        tracing::debug!("Proxying {} /api/{}/{} to {}", request.method, key, sub_path, url);

        let upstream = self
            .http_client
            .request(request.method, &url)
            .headers(forwardable_headers(&request.headers))
            .body(request.body)
            .send()
            .await
            .map_err(|e| GatewayError::from_backend(e, key, port))?;

        let status = upstream.status();
        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let mut headers = relayable_headers(upstream.headers());
        let mut body = upstream
            .bytes()
            .await
            .map_err(|e| GatewayError::from_backend(e, key, port))?;

        let kind = PayloadKind::classify(status, &content_type, sub_path);
        let mut forced_type = kind.forced_content_type();

        if kind.is_textual() {
            let rewritten = self.rewrite_payload(kind, &body, key, port).await;
            match rewritten {
                Some(rewritten) => body = Bytes::from(rewritten),
                None => {
                    tracing::debug!("Passing through non-UTF-8 {:?} payload from {}", kind, key);
                    forced_type = None;
                }
            }
        }

        if let Some(content_type) = forced_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Rewritten HTML or JS text, or `None` when the body is not UTF-8.
    async fn rewrite_payload(
        &self,
        kind: PayloadKind,
        body: &[u8],
        key: &str,
        port: u16,
    ) -> Option<String> {
        let text = std::str::from_utf8(body).ok()?;
        let endpoints = self.discovery.discover(key, port).await;
        let rewritten = rewrite_urls(text, key, endpoints.iter().map(|e| e.path.as_str()));

        Some(if kind == PayloadKind::Html {
            inject_home_button(&rewritten)
        } else {
            rewritten
        })
    }
}

fn is_excluded(name: &HeaderName, excluded: &[&str]) -> bool {
    excluded.contains(&name.as_str())
}

/// Inbound headers minus hop-by-hop and encoding negotiation.
pub fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    filter_headers(inbound, &EXCLUDED_REQUEST_HEADERS)
}

/// Backend headers minus the ones the serving layer recomputes.
pub fn relayable_headers(upstream: &HeaderMap) -> HeaderMap {
    filter_headers(upstream, &EXCLUDED_RESPONSE_HEADERS)
}

fn filter_headers(source: &HeaderMap, excluded: &[&str]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if !is_excluded(name, excluded) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}
