//! Request handlers and middleware
//!
//! A [`Handler`] serves one buffered request. A [`Middleware`] receives the next
//! handler of a site and returns the handler that runs in front of it; a site is
//! assembled with [`chain`].

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Request, Response, StatusCode};
use std::future::Future;
use std::sync::Arc;

/// Request as seen by handlers (body fully buffered)
pub type HttpRequest = Request<Bytes>;

/// Response produced by handlers
pub type HttpResponse = Response<Bytes>;

/// Serves HTTP requests
#[async_trait]
pub trait Handler: Send + Sync {
    /// Serve one request
    async fn serve_http(&self, req: HttpRequest) -> Result<HttpResponse>;
}

/// Wraps the next handler in the chain
pub type Middleware = Box<dyn Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync>;

/// Compose middlewares so the first one runs first, ending at `last`
pub fn chain(middlewares: &[Middleware], last: Arc<dyn Handler>) -> Arc<dyn Handler> {
    middlewares.iter().rev().fold(last, |next, middleware| middleware(next))
}

/// Terminal handler of every chain
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

#[async_trait]
impl Handler for NotFound {
    async fn serve_http(&self, _req: HttpRequest) -> Result<HttpResponse> {
        Ok(not_found())
    }
}

/// Handler backed by an async closure
#[derive(Clone)]
pub struct HandlerFn<F>(F);

/// Build a [`Handler`] from an async closure
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    async fn serve_http(&self, req: HttpRequest) -> Result<HttpResponse> {
        (self.0)(req).await
    }
}

/// Create a plain-text response
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Create not found response
pub fn not_found() -> HttpResponse {
    text_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Create internal server error response
pub fn internal_error() -> HttpResponse {
    text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}
