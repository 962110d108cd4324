//! `echo` directive
//!
//! ```text
//! echo /hello {
//!     message "Hello, world"
//!     status 201
//!     header X-Served-By caddywrap
//!     allow 10.0.0.0/8
//!     deny 10.0.0.13
//!     verbose
//! }
//! ```
//!
//! Answers every request under the path with the configured message.
//! `deny` wins over `allow`; with no `allow` lines every peer is allowed.

use caddywrap_config::{directive_fields, schema_of};
use caddywrap_core::server::{HttpRequest, HttpResponse, Mux, RemoteAddr, text_response};
use caddywrap_plugin::{Plugin, PluginInfo, SetupFn, app_to_directive};
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use ipnet::IpNet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

const DEFAULT_MESSAGE: &str = "Hello from caddywrap";

#[derive(Debug, Default, Clone, Serialize)]
pub struct EchoConfig {
    pub path: String,
    pub message: String,
    pub status: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub allow: Vec<IpNet>,
    pub deny: Vec<IpAddr>,
    pub verbose: bool,
}

directive_fields!(EchoConfig {
    path => ",arg0",
    message,
    status,
    headers => "header",
    allow,
    deny,
    verbose,
});

impl EchoConfig {
    fn permits(&self, peer: Option<IpAddr>) -> bool {
        let Some(ip) = peer else {
            return self.allow.is_empty();
        };
        if self.deny.contains(&ip) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|net| net.contains(&ip))
    }
}

/// Everything the echo handler needs per request
struct Echo {
    config: EchoConfig,
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl Echo {
    fn new(config: EchoConfig) -> Self {
        let status = match config.status.map(StatusCode::from_u16) {
            None => StatusCode::OK,
            Some(Ok(status)) => status,
            Some(Err(_)) => {
                tracing::warn!("echo: invalid status {:?}, using 200", config.status);
                StatusCode::OK
            }
        };

        let mut headers = Vec::with_capacity(config.headers.len());
        for (name, value) in &config.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => headers.push((name, value)),
                _ => tracing::warn!("echo: skipping invalid header {}: {}", name, value),
            }
        }

        Self {
            config,
            status,
            headers,
        }
    }

    fn respond(&self, req: &HttpRequest) -> HttpResponse {
        let peer = req.extensions().get::<RemoteAddr>().map(|a| a.0.ip());
        if !self.config.permits(peer) {
            tracing::debug!("echo: refusing {:?}", peer);
            return text_response(StatusCode::FORBIDDEN, "Forbidden");
        }

        let mut body = if self.config.message.is_empty() {
            DEFAULT_MESSAGE.to_string()
        } else {
            self.config.message.clone()
        };
        if self.config.verbose {
            let from = peer.map_or_else(|| "unknown".to_string(), |ip| ip.to_string());
            body.push_str(&format!("\n{} {} from {}", req.method(), req.uri().path(), from));
        }

        let mut resp = text_response(self.status, body);
        for (name, value) in &self.headers {
            resp.headers_mut().insert(name.clone(), value.clone());
        }
        resp
    }
}

/// Build the echo application from its config
pub fn echo_mux(config: EchoConfig) -> Mux {
    let pattern = match config.path.as_str() {
        "" => "/".to_string(),
        p if p.starts_with('/') => p.to_string(),
        p => format!("/{}", p),
    };

    let echo = Arc::new(Echo::new(config));
    let mut mux = Mux::new();
    let registered = mux.handle_fn(pattern.clone(), move |req: HttpRequest| {
        let echo = echo.clone();
        async move { Ok::<_, caddywrap_core::Error>(echo.respond(&req)) }
    });
    if let Err(e) = registered {
        tracing::error!("echo: cannot serve {}: {}", pattern, e);
    }
    mux
}

pub struct EchoPlugin;

impl Plugin for EchoPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("echo", env!("CARGO_PKG_VERSION"), "Answers requests with a fixed message")
            .with_fields(schema_of::<EchoConfig>().unwrap_or_default())
    }

    fn setup(&self) -> SetupFn {
        app_to_directive(EchoConfig::default, echo_mux)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use caddywrap_config::unmarshal::unmarshal;
    use caddywrap_config::Dispenser;
    use caddywrap_core::server::Handler;
    use http::Request;

    fn config(source: &str) -> EchoConfig {
        let mut d = Dispenser::with_env("Caddyfile", source, |_| None).unwrap();
        let mut config = EchoConfig::default();
        unmarshal(&mut d, &mut config).unwrap();
        config
    }

    fn request(path: &str, peer: &str) -> HttpRequest {
        let mut req = Request::get(path).body(Bytes::new()).unwrap();
        req.extensions_mut().insert(RemoteAddr(peer.parse().unwrap()));
        req
    }

    #[test]
    fn test_config() {
        let c = config(
            "echo /hi {\n  message \"hi there\"\n  status 201\n  header X-A b\n  allow 10.1.2.3/8\n  deny 10.0.0.13\n  verbose\n}",
        );
        assert_eq!(c.path, "/hi");
        assert_eq!(c.message, "hi there");
        assert_eq!(c.status, Some(201));
        assert_eq!(c.headers["X-A"], "b");
        assert_eq!(c.allow, vec!["10.0.0.0/8".parse::<IpNet>().unwrap()]);
        assert_eq!(c.deny, vec!["10.0.0.13".parse::<IpAddr>().unwrap()]);
        assert!(c.verbose);
    }

    #[test]
    fn test_permits() {
        let c = config("echo {\n  allow 10.0.0.0/8\n  deny 10.0.0.13\n}");
        assert!(c.permits(Some("10.9.9.9".parse().unwrap())));
        assert!(!c.permits(Some("10.0.0.13".parse().unwrap())));
        assert!(!c.permits(Some("192.168.0.1".parse().unwrap())));
        assert!(!c.permits(None));
        assert!(EchoConfig::default().permits(None));
    }

    #[tokio::test]
    async fn test_mux_responses() {
        let mux = echo_mux(config("echo /hi {\n  status 202\n  header X-A b\n  verbose\n  deny 127.0.0.2\n}"));

        let resp = mux.serve_http(request("/hi", "127.0.0.1:5000")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(resp.headers()["x-a"], "b");
        let body = String::from_utf8(resp.body().to_vec()).unwrap();
        assert_eq!(body, format!("{}\nGET /hi from 127.0.0.1", DEFAULT_MESSAGE));

        let resp = mux.serve_http(request("/hi", "127.0.0.2:5000")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = mux.serve_http(request("/elsewhere", "127.0.0.1:5000")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_relative_path_is_rooted() {
        let mux = echo_mux(config("echo hi"));
        assert_eq!(mux.patterns().collect::<Vec<_>>(), vec!["/hi"]);
    }

    #[test]
    fn test_info_lists_fields() {
        let info = EchoPlugin.info();
        assert_eq!(info.name, "echo");
        let keywords: Vec<_> = info.fields.iter().map(|f| f.keyword.as_str()).collect();
        assert_eq!(
            keywords,
            vec!["path", "message", "status", "header", "allow", "deny", "verbose"]
        );
    }
}
