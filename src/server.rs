//! Listener and tracing plumbing shared by the api and web processes.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header::SET_COOKIE, HeaderName, HeaderValue, Request},
    response::Response,
};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use url::Url;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Bind `host:port`, moving to the next port while the current one is taken.
///
/// # Errors
/// Returns an error if no port in range could be bound.
pub async fn bind_with_fallback(host: &str, port: u16, attempts: u16) -> Result<(TcpListener, u16)> {
    let mut candidate = port;
    for _ in 0..attempts.max(1) {
        match TcpListener::bind(format!("{host}:{candidate}")).await {
            Ok(listener) => {
                let bound = listener.local_addr().map_or(candidate, |addr| addr.port());
                return Ok((listener, bound));
            }
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                warn!("Port {} is busy, trying {}", candidate, candidate.saturating_add(1));
                candidate = candidate
                    .checked_add(1)
                    .ok_or_else(|| anyhow!("no free port above {port}"))?;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to bind {host}:{candidate}"));
            }
        }
    }
    Err(anyhow!(
        "no free port in {port}..{}",
        port.saturating_add(attempts)
    ))
}

pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Gracefully shutdown");
}

/// Sets a ULID `x-request-id` when the client did not send one.
#[must_use]
pub fn set_request_id_layer(
) -> SetRequestHeaderLayer<impl Fn(&Request<Body>) -> Option<HeaderValue> + Clone> {
    SetRequestHeaderLayer::if_not_present(
        HeaderName::from_static(REQUEST_ID_HEADER),
        |_req: &Request<Body>| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
    )
}

#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER))
}

pub fn append_cookies(response: &mut Response, cookies: Vec<HeaderValue>) {
    let headers = response.headers_mut();
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
}

/// Put middleware cookies ahead of the handler's so a handler writing the
/// same cookie name (sign-in, sign-out, callback) has the last word.
pub fn prepend_cookies(response: &mut Response, cookies: Vec<HeaderValue>) {
    if cookies.is_empty() {
        return;
    }
    let headers = response.headers_mut();
    let from_handler: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();
    headers.remove(SET_COOKIE);
    for cookie in cookies.into_iter().chain(from_handler) {
        headers.append(SET_COOKIE, cookie);
    }
}

pub fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// `scheme://host[:port]` of a URL, as a header value for CORS.
///
/// # Errors
/// Returns an error if the URL is invalid or has no host.
pub fn origin(url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("URL must include a valid host: {url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build origin header")
}
