//! Path multiplexer
//!
//! Patterns follow the familiar ServeMux rules: a pattern names an exact path,
//! or a whole subtree when it ends with `/`. The longest matching pattern wins,
//! and a request for a subtree root without its trailing slash is redirected.

use crate::error::{Error, Result};
use crate::server::handlers::{
    Handler, HandlerFn, HttpRequest, HttpResponse, handler_fn, not_found, text_response,
};
use async_trait::async_trait;
use http::StatusCode;
use http::header::{HeaderValue, LOCATION};
use std::future::Future;
use std::sync::Arc;

struct MuxEntry {
    pattern: String,
    handler: Arc<dyn Handler>,
}

/// Request multiplexer dispatching on the URI path
#[derive(Default)]
pub struct Mux {
    entries: Vec<MuxEntry>,
}

/// Outcome of a path lookup
enum Lookup<'a> {
    Handler(&'a Arc<dyn Handler>),
    Redirect(String),
    Missing,
}

impl Mux {
    /// Create an empty mux
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a pattern, replacing any previous registration
    pub fn handle(&mut self, pattern: impl Into<String>, handler: Arc<dyn Handler>) -> Result<&mut Self> {
        let pattern = pattern.into();
        if !pattern.starts_with('/') {
            return Err(Error::Config(format!(
                "Invalid mux pattern '{}': must start with '/'",
                pattern
            )));
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.pattern == pattern) {
            tracing::warn!("Replacing handler for mux pattern {}", pattern);
            entry.handler = handler;
        } else {
            self.entries.push(MuxEntry { pattern, handler });
        }
        Ok(self)
    }

    /// Register an async closure for a pattern
    pub fn handle_fn<F, Fut>(&mut self, pattern: impl Into<String>, f: F) -> Result<&mut Self>
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        let handler: Arc<HandlerFn<F>> = Arc::new(handler_fn(f));
        self.handle(pattern, handler)
    }

    /// Registered patterns, in registration order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.pattern.as_str())
    }

    /// Pattern that would serve `path`, if any
    pub fn matched_pattern(&self, path: &str) -> Option<&str> {
        self.longest_match(path).map(|e| e.pattern.as_str())
    }

    fn longest_match(&self, path: &str) -> Option<&MuxEntry> {
        self.entries
            .iter()
            .filter(|e| Self::path_matches(&e.pattern, path))
            .max_by_key(|e| e.pattern.len())
    }

    fn lookup(&self, path: &str) -> Lookup<'_> {
        if let Some(entry) = self.longest_match(path) {
            return Lookup::Handler(&entry.handler);
        }

        let with_slash = format!("{}/", path);
        if self.entries.iter().any(|e| e.pattern == with_slash) {
            return Lookup::Redirect(with_slash);
        }

        Lookup::Missing
    }

    fn path_matches(pattern: &str, path: &str) -> bool {
        if pattern.ends_with('/') {
            path.starts_with(pattern)
        } else {
            pattern == path
        }
    }
}

#[async_trait]
impl Handler for Mux {
    async fn serve_http(&self, req: HttpRequest) -> Result<HttpResponse> {
        match self.lookup(req.uri().path()) {
            Lookup::Handler(handler) => handler.serve_http(req).await,
            Lookup::Redirect(location) => {
                let location = match req.uri().query() {
                    Some(query) => format!("{}?{}", location, query),
                    None => location,
                };
                let mut resp = text_response(StatusCode::MOVED_PERMANENTLY, "Moved Permanently");
                let value = HeaderValue::from_str(&location)
                    .map_err(|e| crate::Error::Internal(e.to_string()))?;
                resp.headers_mut().insert(LOCATION, value);
                Ok(resp)
            }
            Lookup::Missing => Ok(not_found()),
        }
    }
}
