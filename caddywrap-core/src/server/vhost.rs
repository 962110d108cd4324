//! Virtual host dispatch
//!
//! Several sites may share one listen address; requests are routed on the
//! `Host` header. Hosts are matched case-insensitively with the port removed.
//! A `*.` prefix matches any subdomain and an empty host matches anything.

use crate::error::Result;
use crate::server::handlers::{Handler, HttpRequest, HttpResponse, text_response};
use async_trait::async_trait;
use http::StatusCode;
use http::header::HOST;
use std::sync::Arc;

/// Sites sharing one listener
#[derive(Default)]
pub struct VirtualHosts {
    hosts: Vec<(String, Arc<dyn Handler>)>,
}

impl VirtualHosts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a site for `host`
    pub fn add(&mut self, host: &str, handler: Arc<dyn Handler>) {
        self.hosts.push((host.to_ascii_lowercase(), handler));
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Find the site serving `host`: exact names first, then wildcards,
    /// then the catch-all site.
    pub fn resolve(&self, host: &str) -> Option<&Arc<dyn Handler>> {
        let host = strip_port(host).to_ascii_lowercase();

        let exact = self.hosts.iter().find(|(name, _)| *name == host);
        let wildcard = || {
            self.hosts.iter().find(|(name, _)| {
                name.strip_prefix("*.")
                    .is_some_and(|suffix| host.ends_with(&format!(".{}", suffix)))
            })
        };
        let catch_all = || self.hosts.iter().find(|(name, _)| name.is_empty());

        exact
            .or_else(wildcard)
            .or_else(catch_all)
            .map(|(_, handler)| handler)
    }
}

/// Remove the port from a host header value, keeping IPv6 brackets intact
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, _)) if !name.contains(':') => name,
        _ => host,
    }
}

fn request_host(req: &HttpRequest) -> &str {
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or("")
}

#[async_trait]
impl Handler for VirtualHosts {
    async fn serve_http(&self, req: HttpRequest) -> Result<HttpResponse> {
        let host = request_host(&req).to_string();
        match self.resolve(&host) {
            Some(handler) => handler.serve_http(req).await,
            None => {
                tracing::debug!("No site configured for host {:?}", host);
                Ok(text_response(
                    StatusCode::NOT_FOUND,
                    format!("No such site at {}", host),
                ))
            }
        }
    }
}
