//! Access logging.
//!
//! Each request runs inside an `http_request` span carrying its request id,
//! so dispatcher and graph events logged by the handler share that id.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{info, info_span, Instrument};

use super::REQUEST_ID_HEADER;

/// Wraps services in [`RequestLoggingService`].
#[derive(Clone, Default)]
pub struct RequestLoggingLayer;

impl RequestLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService { inner }
    }
}

#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
}

impl<S, B, ResBody> Service<Request<B>> for RequestLoggingService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let span = info_span!(
            target: "rolegraph::http",
            "http_request",
            request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-"),
            method = %request.method(),
            path = request.uri().path(),
        );

        let mut inner = self.inner.clone();
        let started = Instant::now();
        let handled = async move {
            info!(target: "rolegraph::http", "request started");
            let response = inner.call(request).await?;
            info!(
                target: "rolegraph::http",
                status = response.status().as_u16(),
                duration_ms = started.elapsed().as_millis() as u64,
                "request completed"
            );
            Ok(response)
        };
        Box::pin(handled.instrument(span))
    }
}
