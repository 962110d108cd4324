//! Response recording

use crate::server::handlers::{HttpRequest, HttpResponse};
use http::{Method, StatusCode};
use std::time::{Duration, Instant};

/// Captures the outcome of one exchange so the status can be reported
/// after the wrapped handler has produced its response.
#[derive(Debug)]
pub struct ResponseRecorder {
    method: Method,
    path: String,
    started: Instant,
    status: StatusCode,
    size: usize,
}

impl ResponseRecorder {
    /// Start recording for a request
    pub fn new(req: &HttpRequest) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            started: Instant::now(),
            status: StatusCode::OK,
            size: 0,
        }
    }

    /// Record the response a handler produced
    pub fn record(&mut self, resp: &HttpResponse) {
        self.status = resp.status();
        self.size = resp.body().len();
    }

    /// Recorded status; 200 until a response is recorded
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Recorded body size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Time since recording started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
