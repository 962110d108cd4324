//! HTTP host types

mod handlers;
mod listener;
mod mux;
mod recorder;
mod vhost;

pub use self::handlers::{
    Handler, HandlerFn, HttpRequest, HttpResponse, Middleware, NotFound, chain, handler_fn,
    internal_error, not_found, text_response,
};
pub use self::listener::{MAX_BODY_SIZE, RemoteAddr, serve, serve_listener, serve_listener_with_limit};
pub use self::mux::Mux;
pub use self::recorder::ResponseRecorder;
pub use self::vhost::VirtualHosts;
