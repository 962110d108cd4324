//! HTTP listener
//!
//! Accepts connections and feeds every request, with its body buffered, to a
//! [`Handler`]. Each connection is served on its own task.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::error::{Error, Result};
use crate::server::handlers::{Handler, internal_error, text_response};

/// Largest request body buffered for a handler (10 MiB)
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Peer address of the connection a request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Bind `addr` and serve `handler` until the task is dropped
pub async fn serve(addr: SocketAddr, handler: Arc<dyn Handler>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Listening on http://{}", addr);
    serve_listener(listener, handler).await
}

/// Serve `handler` on an already bound listener
pub async fn serve_listener(listener: TcpListener, handler: Arc<dyn Handler>) -> Result<()> {
    serve_listener_with_limit(listener, handler, MAX_BODY_SIZE).await
}

/// Serve `handler`, answering 413 to requests whose body exceeds `max_body` bytes
pub async fn serve_listener_with_limit(
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    max_body: usize,
) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let handler = handler.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| dispatch(req, peer, max_body, handler.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }
}

async fn dispatch(
    req: Request<hyper::body::Incoming>,
    peer: SocketAddr,
    max_body: usize,
    handler: Arc<dyn Handler>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (mut parts, body) = req.into_parts();
    let body = match Limited::new(body, max_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            tracing::warn!("Request body from {} exceeds {} bytes", peer, max_body);
            let resp = text_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
            return Ok(resp.map(Full::new));
        }
        Err(e) => {
            tracing::warn!("Failed to read request body from {}: {}", peer, e);
            let resp = text_response(StatusCode::BAD_REQUEST, "Bad Request");
            return Ok(resp.map(Full::new));
        }
    };

    parts.extensions.insert(RemoteAddr(peer));
    let req = Request::from_parts(parts, body);

    let resp = match handler.serve_http(req).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!("Handler error for {}: {}", peer, e);
            internal_error()
        }
    };

    Ok(resp.map(Full::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handlers::{HttpRequest, handler_fn};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn roundtrip(handler: Arc<dyn Handler>, raw: &str) -> String {
        roundtrip_with_limit(handler, raw, MAX_BODY_SIZE).await
    }

    async fn roundtrip_with_limit(handler: Arc<dyn Handler>, raw: &str, max_body: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_listener_with_limit(listener, handler, max_body));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();

        server.abort();
        out
    }

    #[tokio::test]
    async fn test_serves_request_with_remote_addr() {
        let handler = Arc::new(handler_fn(|req: HttpRequest| async move {
            let peer = req.extensions().get::<RemoteAddr>().map(|a| a.0.ip().to_string());
            let body = format!("{} {}", peer.unwrap_or_default(), String::from_utf8_lossy(req.body()));
            Ok(text_response(StatusCode::OK, body))
        }));

        let out = roundtrip(
            handler,
            "POST /echo HTTP/1.1\r\nHost: test\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;

        assert!(out.starts_with("HTTP/1.1 200 OK"), "{}", out);
        assert!(out.ends_with("127.0.0.1 hello"), "{}", out);
    }

    #[tokio::test]
    async fn test_handler_error_is_500() {
        let handler = Arc::new(handler_fn(|_req: HttpRequest| async move {
            Err(Error::Handler("boom".to_string()))
        }));

        let out = roundtrip(handler, "GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error"), "{}", out);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let handler = Arc::new(handler_fn(|_req: HttpRequest| async move {
            Ok(text_response(StatusCode::OK, "read"))
        }));

        let out = roundtrip_with_limit(
            handler,
            "POST / HTTP/1.1\r\nHost: test\r\nContent-Length: 11\r\nConnection: close\r\n\r\nhello world",
            4,
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 413 Payload Too Large"), "{}", out);
    }
}
