//! App-to-directive adapter
//!
//! [`app_to_directive`] turns a whole application into a directive. It needs
//! two things: a constructor for an empty config, which gets filled from the
//! directive's block, and a factory that builds the application's [`Mux`]
//! from the filled config. The result is a [`SetupFn`] like any other.

use crate::error::SetupError;
use async_trait::async_trait;
use caddywrap_config::parser::{Dispenser, LexError};
use caddywrap_config::unmarshal::{self, Unmarshal};
use caddywrap_core::Result;
use caddywrap_core::server::{
    Handler, HttpRequest, HttpResponse, Middleware, Mux, ResponseRecorder,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// What a directive's setup function sees
#[derive(Debug)]
pub struct Controller {
    directive: String,
    addresses: Vec<String>,
    dispenser: Dispenser,
    adapted: Option<serde_json::Value>,
}

impl Controller {
    pub fn new(directive: impl Into<String>, addresses: Vec<String>, dispenser: Dispenser) -> Self {
        Self {
            directive: directive.into(),
            addresses,
            dispenser,
            adapted: None,
        }
    }

    /// Controller over `source` alone, named after its first token
    pub fn for_test(source: &str) -> std::result::Result<Self, LexError> {
        let dispenser = Dispenser::with_env("Testfile", source, |_| None)?;
        let directive = dispenser
            .tokens()
            .first()
            .map(|t| t.text.clone())
            .unwrap_or_default();
        Ok(Self::new(directive, vec!["localhost".to_string()], dispenser))
    }

    /// Name of the directive being set up
    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Addresses of the site the directive appears in
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn dispenser(&mut self) -> &mut Dispenser {
        &mut self.dispenser
    }

    /// Keep the config the directive was adapted to, for reporting
    pub fn record_config(&mut self, config: serde_json::Value) {
        self.adapted = Some(config);
    }

    pub fn adapted(&self) -> Option<&serde_json::Value> {
        self.adapted.as_ref()
    }

    pub fn take_adapted(&mut self) -> Option<serde_json::Value> {
        self.adapted.take()
    }
}

/// Sets up one directive, producing the middleware it contributes
pub type SetupFn =
    Arc<dyn Fn(&mut Controller) -> std::result::Result<Middleware, SetupError> + Send + Sync>;

/// Wrap an application as a directive.
///
/// `new_conf` creates an empty config that is filled from the directive's
/// tokens; `get_mux` turns the filled config into the application. The
/// returned middleware serves every request with the application and never
/// calls the next handler.
pub fn app_to_directive<C, N, M>(new_conf: N, get_mux: M) -> SetupFn
where
    C: Unmarshal + Serialize + fmt::Debug,
    N: Fn() -> C + Send + Sync + 'static,
    M: Fn(C) -> Mux + Send + Sync + 'static,
{
    Arc::new(
        move |c: &mut Controller| -> std::result::Result<Middleware, SetupError> {
            let mut conf = new_conf();
            unmarshal::unmarshal(c.dispenser(), &mut conf)?;
            tracing::debug!("{} config: {:?}", c.directive(), conf);
            c.record_config(serde_json::to_value(&conf)?);

            let app: Arc<dyn Handler> = Arc::new(AppHandler {
                directive: c.directive().to_string(),
                mux: get_mux(conf),
            });
            Ok(Box::new(move |_next: Arc<dyn Handler>| app.clone()))
        },
    )
}

/// Serves requests with an application mux, logging each status
struct AppHandler {
    directive: String,
    mux: Mux,
}

#[async_trait]
impl Handler for AppHandler {
    async fn serve_http(&self, req: HttpRequest) -> Result<HttpResponse> {
        let mut rec = ResponseRecorder::new(&req);
        let resp = self.mux.serve_http(req).await?;
        rec.record(&resp);
        tracing::debug!(
            "{}: {} {} -> {} ({} bytes in {:?})",
            self.directive,
            rec.method(),
            rec.path(),
            rec.status().as_u16(),
            rec.size(),
            rec.elapsed()
        );
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caddywrap_config::directive_fields;
    use caddywrap_config::unmarshal::UnmarshalError;
    use caddywrap_core::server::{NotFound, chain, text_response};
    use bytes::Bytes;
    use http::{Request, StatusCode};

    #[derive(Debug, Default, Serialize)]
    struct Greeter {
        root: String,
        greeting: String,
        times: u32,
    }

    directive_fields!(Greeter {
        root => ",arg0",
        greeting,
        times,
    });

    fn greeter_mux(conf: Greeter) -> Mux {
        let mut mux = Mux::new();
        let body = conf.greeting.repeat(conf.times as usize);
        let pattern = conf.root.clone();
        let result = mux.handle_fn(pattern, move |_req| {
            let body = body.clone();
            async move { Ok::<_, caddywrap_core::Error>(text_response(StatusCode::OK, body)) }
        });
        assert!(result.is_ok());
        mux
    }

    fn get(path: &str) -> HttpRequest {
        Request::get(path).body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_app_serves_requests() {
        let setup = app_to_directive(Greeter::default, greeter_mux);
        let mut c = Controller::for_test("greet /hi {\n  greeting hey\n  times 2\n}").unwrap();
        let middleware = setup(&mut c).unwrap();

        let adapted = c.adapted().unwrap();
        assert_eq!(adapted["root"], "/hi");
        assert_eq!(adapted["times"], 2);

        let site = chain(&[middleware], Arc::new(NotFound));
        let resp = site.serve_http(get("/hi")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body().as_ref(), b"heyhey");

        // the app owns the site: unmatched paths get the mux's 404
        let resp = site.serve_http(get("/other")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unmarshal_failure_aborts_setup() {
        let setup = app_to_directive(Greeter::default, greeter_mux);
        let mut c = Controller::for_test("greet /hi {\n  times many\n}").unwrap();
        let err = match setup(&mut c) {
            Ok(_) => panic!("setup should fail"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            SetupError::Unmarshal(UnmarshalError::Parse { field: "times", .. })
        ));
        assert_eq!(err.location().map(|l| l.start), Some(20));
        assert!(c.adapted().is_none());
    }

    #[test]
    fn test_controller_for_test() {
        let mut c = Controller::for_test("echo a b").unwrap();
        assert_eq!(c.directive(), "echo");
        assert_eq!(c.addresses(), ["localhost".to_string()]);
        assert!(c.dispenser().next());
        assert_eq!(c.dispenser().val(), "echo");
    }
}
