//! HTTP access logging on top of tower-http's `TraceLayer`.
//!
//! Development uses a short `dev` line, production the Apache `combined`
//! format. The request half of the line is captured when the span is made
//! and kept in the span's registry extensions until the response arrives.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, Response, StatusCode, Version},
};
use chrono::{DateTime, Utc};
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::Span;
use tracing_subscriber::{registry::LookupSpan, Registry};

use crate::config::{Config, Environment};

/// Request side of an access line.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub method: Method,
    pub uri: String,
    pub version: Version,
    pub remote_addr: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AccessRequest {
    pub fn from_request<B>(request: &Request<B>, trust_proxy: bool) -> Self {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: request.method().clone(),
            uri: request.uri().to_string(),
            version: request.version(),
            remote_addr: client_addr(request.headers(), peer, trust_proxy),
            referrer: header_str(request.headers(), header::REFERER),
            user_agent: header_str(request.headers(), header::USER_AGENT),
            timestamp: Utc::now(),
        }
    }
}

/// Everything one access log line needs.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub request: AccessRequest,
    pub status: StatusCode,
    pub elapsed: Duration,
    pub content_length: Option<u64>,
}

impl AccessRecord {
    fn length_label(&self) -> String {
        self.content_length
            .map(|len| len.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// `GET /path 200 1.234 ms - 512`
    pub fn dev_line(&self) -> String {
        format!(
            "{} {} {} {:.3} ms - {}",
            self.request.method,
            self.request.uri,
            self.status.as_u16(),
            self.elapsed.as_secs_f64() * 1000.0,
            self.length_label(),
        )
    }

    /// `1.2.3.4 - - [10/Oct/2024:13:55:36 +0000] "GET / HTTP/1.1" 200 512 "-" "curl/8"`
    pub fn combined_line(&self) -> String {
        let request = &self.request;
        format!(
            "{} - - [{}] \"{} {} {}\" {} {} \"{}\" \"{}\"",
            request.remote_addr.as_deref().unwrap_or("-"),
            request.timestamp.format("%d/%b/%Y:%H:%M:%S %z"),
            request.method,
            request.uri,
            version_label(request.version),
            self.status.as_u16(),
            self.length_label(),
            request.referrer.as_deref().unwrap_or("-"),
            request.user_agent.as_deref().unwrap_or("-"),
        )
    }
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Client address, preferring the first `X-Forwarded-For` hop when the proxy
/// is trusted.
pub fn client_addr(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> Option<String> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|hop| hop.trim().to_string())
            .filter(|hop| !hop.is_empty());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

fn stash_request(span: &Span, request: AccessRequest) {
    span.with_subscriber(|(id, dispatch)| {
        if let Some(span) = dispatch
            .downcast_ref::<Registry>()
            .and_then(|registry| registry.span(id))
        {
            span.extensions_mut().insert(request);
        }
    });
}

fn take_request(span: &Span) -> Option<AccessRequest> {
    span.with_subscriber(|(id, dispatch)| {
        dispatch
            .downcast_ref::<Registry>()
            .and_then(|registry| registry.span(id))
            .and_then(|span| span.extensions_mut().remove::<AccessRequest>())
    })
    .flatten()
}

/// `make_span_with` / `on_response` pair for `TraceLayer`.
#[derive(Debug, Clone, Copy)]
pub struct AccessLog {
    environment: Environment,
    trust_proxy: bool,
}

impl AccessLog {
    pub fn new(config: &Config) -> Self {
        Self {
            environment: config.environment,
            trust_proxy: config.trust_proxy(),
        }
    }
}

impl<B> MakeSpan<B> for AccessLog {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let span = tracing::info_span!(target: "access", "request");
        stash_request(&span, AccessRequest::from_request(request, self.trust_proxy));
        span
    }
}

impl<B> OnResponse<B> for AccessLog {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let content_length = header_str(response.headers(), header::CONTENT_LENGTH)
            .and_then(|len| len.parse().ok());

        let Some(request) = take_request(span) else {
            tracing::info!(
                target: "access",
                status = response.status().as_u16(),
                latency_ms = latency.as_secs_f64() * 1000.0,
                "finished request"
            );
            return;
        };

        let record = AccessRecord {
            request,
            status: response.status(),
            elapsed: latency,
            content_length,
        };

        match self.environment {
            Environment::Development => tracing::info!(target: "access", "{}", record.dev_line()),
            Environment::Production => {
                tracing::info!(target: "access", "{}", record.combined_line())
            }
        }
    }
}
