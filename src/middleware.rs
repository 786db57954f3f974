//! Tower middleware that captures request bodies for admission control.
//!
//! Sits in front of the transaction endpoint. Classic HTTP/1.1 requests are
//! buffered, inspected, and either forwarded with the body restored or
//! answered with a denial. Multiplexed and upgraded transports pass through
//! untouched, as do all requests while enforcement is disabled.

use crate::clock::{Clock, SystemClock};
use crate::domain::config::AdmissionConfig;
use crate::domain::error::ConfigError;
use crate::domain::types::{Origin, Verdict};
use crate::engine::AdmissionEngine;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderValue, Request, StatusCode, Version},
    response::Response,
};
use bytes::Bytes;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, trace, warn};

const DENIED_BODY: &str = r#"{"message": "Request cancelled."}"#;

/// Admission control layer
#[derive(Clone)]
pub struct AdmissionLayer {
    engine: Arc<AdmissionEngine>,
    clock: Arc<dyn Clock>,
}

impl AdmissionLayer {
    pub fn new(config: AdmissionConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_engine(Arc::new(AdmissionEngine::new(config)?)))
    }

    pub fn with_engine(engine: Arc<AdmissionEngine>) -> Self {
        Self {
            engine,
            clock: Arc::new(SystemClock),
        }
    }

    /// Swap the time source, mainly for deterministic tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> Arc<AdmissionEngine> {
        Arc::clone(&self.engine)
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            engine: Arc::clone(&self.engine),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Admission control service
#[derive(Clone)]
pub struct AdmissionService<S> {
    inner: S,
    engine: Arc<AdmissionEngine>,
    clock: Arc<dyn Clock>,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let engine = Arc::clone(&self.engine);
        let clock = Arc::clone(&self.clock);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !engine.enabled() {
                return inner.call(req).await;
            }

            // Only classic HTTP/1.1 traffic is inspected
            if req.version() != Version::HTTP_11 {
                return inner.call(req).await;
            }

            let origin = Origin::from(extract_client_ip(&req));
            let max_capture = engine.config().max_capture_bytes;

            // Oversized declared bodies are not worth buffering; let the
            // endpoint apply its own limits
            let declared_len = req
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<usize>().ok());
            if declared_len.map_or(false, |len| len > max_capture) {
                warn!(
                    origin = %origin,
                    declared_len = ?declared_len,
                    "Request body exceeds capture limit - passing through uninspected"
                );
                return inner.call(req).await;
            }

            let (parts, body) = req.into_parts();
            let body_bytes = match buffer_body(body, max_capture).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    // The stream is partially consumed, so the request
                    // cannot be forwarded anymore
                    warn!(origin = %origin, error = %e, "Failed to buffer request body");
                    return Ok(unreadable_body_response());
                }
            };

            trace!(
                origin = %origin,
                bytes = body_bytes.len(),
                "Captured request body for inspection"
            );

            let body_text = String::from_utf8_lossy(&body_bytes);
            let decision = engine.inspect(&origin, &body_text, clock.now());

            match decision.verdict {
                Verdict::Allow => {
                    let req = Request::from_parts(parts, Body::from(body_bytes));
                    inner.call(req).await
                }
                Verdict::Deny => {
                    debug!(
                        origin = %origin,
                        decision_id = %decision.decision_id,
                        "Returning denial response"
                    );
                    Ok(denied_response())
                }
            }
        })
    }
}

/// Read the whole body into memory, bounded by the capture limit
async fn buffer_body(body: Body, max_size: usize) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(body, max_size).await
}

/// Extract client IP from request headers, falling back to connection info
fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    let headers = req.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|list| list.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<IpAddr>().ok());
    if let Some(ip) = real_ip {
        return ip;
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn denied_response() -> Response {
    let mut response = Response::new(Body::from(DENIED_BODY));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn unreadable_body_response() -> Response {
    let mut response = Response::new(Body::from(
        r#"{"message": "Request body could not be read."}"#,
    ));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
