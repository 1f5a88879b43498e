//! Cross-origin resource sharing middleware.
//!
//! Simple requests get the allow-origin annotation and then fall through to
//! the rest of the chain; preflight (OPTIONS) requests are answered in place
//! with 204 and never reach the application handler.

use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ORIGIN, VARY,
};
use http::{Method, StatusCode};

use crate::context::InvocationContext;
use crate::error::GateError;
use crate::header;
use crate::middleware::{Middleware, Next};

/// CORS policy. Empty origin/method lists are replaced with the defaults when
/// the middleware is constructed, never per request.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins: literal origins, `*`, or domain suffixes
    /// (`.example.com` matches every subdomain).
    pub allow_origins: Vec<String>,
    /// Methods advertised to preflight requests.
    pub allow_methods: Vec<Method>,
    /// Headers advertised to preflight requests. When empty, the request's
    /// own `Access-Control-Request-Headers` is echoed back.
    pub allow_headers: Vec<String>,
    /// Allow cookies and authorization headers.
    pub allow_credentials: bool,
    /// Response headers readable by the client.
    pub expose_headers: Vec<String>,
    /// Preflight cache lifetime in seconds; 0 leaves the header unset.
    pub max_age: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec![
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
            ],
            allow_headers: Vec::new(),
            allow_credentials: false,
            expose_headers: Vec::new(),
            max_age: 0,
        }
    }
}

impl CorsConfig {
    /// Overrides from the environment: `GATECALL_CORS_ORIGINS`
    /// (comma-separated), `GATECALL_CORS_CREDENTIALS` (`true`/`false`) and
    /// `GATECALL_CORS_MAX_AGE` (seconds).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(origins) = std::env::var("GATECALL_CORS_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
            if !origins.is_empty() {
                config.allow_origins = origins;
            }
        }
        if let Ok(credentials) = std::env::var("GATECALL_CORS_CREDENTIALS") {
            config.allow_credentials = credentials.trim().eq_ignore_ascii_case("true");
        }
        if let Ok(max_age) = std::env::var("GATECALL_CORS_MAX_AGE") {
            config.max_age = max_age.trim().parse().unwrap_or(0);
        }
        config
    }
}

/// The CORS middleware. Joined header values are precomputed here so the
/// per-request work is origin matching alone.
pub struct Cors {
    allow_origins: Vec<String>,
    allow_credentials: bool,
    allow_methods: String,
    allow_headers: String,
    expose_headers: String,
    max_age: u32,
}

impl Cors {
    /// Allow-all policy.
    pub fn new() -> Self {
        Self::with_config(CorsConfig::default())
    }

    pub fn with_config(mut config: CorsConfig) -> Self {
        let defaults = CorsConfig::default();
        if config.allow_origins.is_empty() {
            config.allow_origins = defaults.allow_origins;
        }
        if config.allow_methods.is_empty() {
            config.allow_methods = defaults.allow_methods;
        }
        Self {
            allow_methods: config
                .allow_methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(","),
            allow_headers: config.allow_headers.join(","),
            expose_headers: config.expose_headers.join(","),
            allow_origins: config.allow_origins,
            allow_credentials: config.allow_credentials,
            max_age: config.max_age,
        }
    }

    /// Resolve the `Access-Control-Allow-Origin` value for a request origin.
    /// Returns the empty string when no configured entry matches.
    fn allow_origin(&self, origin: &str) -> String {
        for entry in &self.allow_origins {
            // wildcard cannot be combined with credentialed responses, so
            // echo the concrete origin instead
            if entry == "*" && self.allow_credentials {
                return origin.to_string();
            }
            if entry == "*" || entry == origin {
                return entry.clone();
            }
            if match_subdomain(origin, entry) {
                return origin.to_string();
            }
        }
        String::new()
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::new()
    }
}

fn match_subdomain(origin: &str, domain: &str) -> bool {
    if domain.starts_with('.') {
        origin.ends_with(domain)
    } else {
        origin.len() > domain.len()
            && origin.ends_with(domain)
            && origin.as_bytes()[origin.len() - domain.len() - 1] == b'.'
    }
}

#[async_trait(?Send)]
impl Middleware for Cors {
    async fn handle(&self, ctx: &mut InvocationContext, next: Next<'_>) -> Result<(), GateError> {
        let origin = header::get(&ctx.request().headers, ORIGIN)
            .unwrap_or_default()
            .to_string();
        let allow_origin = self.allow_origin(&origin);
        let method = ctx.request().http_method.clone();

        if method != Method::OPTIONS {
            let response = ctx.response_mut();
            header::add(&mut response.headers, VARY, "Origin");
            header::set(&mut response.headers, ACCESS_CONTROL_ALLOW_ORIGIN, &allow_origin);
            if self.allow_credentials {
                header::set(&mut response.headers, ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
            }
            if !self.expose_headers.is_empty() {
                header::set(
                    &mut response.headers,
                    ACCESS_CONTROL_EXPOSE_HEADERS,
                    &self.expose_headers,
                );
            }
            return next.run(ctx).await;
        }

        let request_headers = header::get(&ctx.request().headers, ACCESS_CONTROL_REQUEST_HEADERS)
            .unwrap_or_default()
            .to_string();
        let response = ctx.response_mut();
        header::add(&mut response.headers, VARY, "Origin");
        header::add(&mut response.headers, VARY, "Access-Control-Request-Method");
        header::add(&mut response.headers, VARY, "Access-Control-Request-Headers");
        header::set(&mut response.headers, ACCESS_CONTROL_ALLOW_ORIGIN, &allow_origin);
        header::set(&mut response.headers, ACCESS_CONTROL_ALLOW_METHODS, &self.allow_methods);
        if self.allow_credentials {
            header::set(&mut response.headers, ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }
        if !self.allow_headers.is_empty() {
            header::set(&mut response.headers, ACCESS_CONTROL_ALLOW_HEADERS, &self.allow_headers);
        } else if !request_headers.is_empty() {
            header::set(&mut response.headers, ACCESS_CONTROL_ALLOW_HEADERS, &request_headers);
        }
        if self.max_age > 0 {
            header::set(
                &mut response.headers,
                ACCESS_CONTROL_MAX_AGE,
                &self.max_age.to_string(),
            );
        }
        response.status_code = i64::from(StatusCode::NO_CONTENT.as_u16());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Endpoint, EndpointFuture};
    use crate::middleware::BoxMiddleware;
    use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
    use futures::executor::block_on;
    use http::HeaderValue;
    use std::sync::{Arc, Mutex};

    struct FlagEndpoint {
        called: Arc<Mutex<bool>>,
    }

    impl Endpoint for FlagEndpoint {
        fn call<'a>(&'a self, _ctx: &'a mut InvocationContext) -> EndpointFuture<'a> {
            Box::pin(async move {
                *self.called.lock().unwrap() = true;
                Ok(())
            })
        }
    }

    fn context(method: Method, origin: Option<&str>) -> InvocationContext {
        let mut request = ApiGatewayProxyRequest::default();
        request.http_method = method;
        if let Some(origin) = origin {
            request
                .headers
                .insert(ORIGIN, HeaderValue::from_str(origin).expect("origin"));
        }
        InvocationContext::new(request)
    }

    fn run_through(
        cors: Cors,
        mut ctx: InvocationContext,
    ) -> (InvocationContext, Arc<Mutex<bool>>) {
        let called = Arc::new(Mutex::new(false));
        let endpoint = FlagEndpoint {
            called: Arc::clone(&called),
        };
        let middlewares: Vec<BoxMiddleware> = vec![Arc::new(cors)];
        block_on(Next::new(&middlewares, &endpoint).run(&mut ctx)).expect("invocation");
        (ctx, called)
    }

    #[test]
    fn wildcard_with_credentials_echoes_the_request_origin() {
        let cors = Cors::with_config(CorsConfig {
            allow_credentials: true,
            ..Default::default()
        });
        let (ctx, _) = run_through(cors, context(Method::GET, Some("https://a.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("https://a.com")
        );
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_CREDENTIALS),
            Some("true")
        );
    }

    #[test]
    fn wildcard_without_credentials_stays_a_wildcard() {
        let (ctx, _) = run_through(Cors::new(), context(Method::GET, Some("https://a.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("*")
        );
    }

    #[test]
    fn exact_origin_entry_matches() {
        let cors = Cors::with_config(CorsConfig {
            allow_origins: vec!["https://app.example.com".to_string()],
            ..Default::default()
        });
        let (ctx, _) = run_through(cors, context(Method::GET, Some("https://app.example.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("https://app.example.com")
        );
    }

    #[test]
    fn dot_prefixed_entry_matches_subdomains() {
        let cors = Cors::with_config(CorsConfig {
            allow_origins: vec![".example.com".to_string()],
            ..Default::default()
        });
        let (ctx, _) = run_through(cors, context(Method::GET, Some("https://sub.example.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("https://sub.example.com")
        );
    }

    #[test]
    fn bare_domain_entry_matches_subdomains_on_a_dot_boundary() {
        assert!(match_subdomain("https://sub.example.com", "example.com"));
        assert!(!match_subdomain("https://notexample.com", "example.com"));
    }

    #[test]
    fn unmatched_origin_leaves_the_header_empty() {
        let cors = Cors::with_config(CorsConfig {
            allow_origins: vec!["https://a.com".to_string()],
            ..Default::default()
        });
        let (ctx, _) = run_through(cors, context(Method::GET, Some("https://evil.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_ORIGIN),
            Some("")
        );
    }

    #[test]
    fn empty_config_lists_are_normalised_at_construction() {
        let cors = Cors::with_config(CorsConfig {
            allow_origins: Vec::new(),
            allow_methods: Vec::new(),
            ..Default::default()
        });
        assert_eq!(cors.allow_origins, vec!["*".to_string()]);
        assert_eq!(cors.allow_methods, "GET,HEAD,PUT,PATCH,POST,DELETE");
    }

    #[test]
    fn simple_request_annotates_and_delegates() {
        let (ctx, called) = run_through(Cors::new(), context(Method::POST, Some("https://a.com")));
        assert!(*called.lock().unwrap());
        assert_eq!(header::get(&ctx.response().headers, VARY), Some("Origin"));
        assert_eq!(ctx.response().status_code, 200);
    }

    #[test]
    fn simple_request_exposes_configured_headers() {
        let cors = Cors::with_config(CorsConfig {
            expose_headers: vec!["X-Request-Id".to_string(), "X-Trace".to_string()],
            ..Default::default()
        });
        let (ctx, _) = run_through(cors, context(Method::GET, Some("https://a.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_EXPOSE_HEADERS),
            Some("X-Request-Id,X-Trace")
        );
    }

    #[test]
    fn preflight_terminates_the_chain_with_no_content() {
        let (ctx, called) =
            run_through(Cors::new(), context(Method::OPTIONS, Some("https://a.com")));
        assert!(!*called.lock().unwrap());
        assert_eq!(ctx.response().status_code, 204);
        assert_eq!(
            header::get(&ctx.response().headers, VARY),
            Some("Origin,Access-Control-Request-Method,Access-Control-Request-Headers")
        );
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_METHODS),
            Some("GET,HEAD,PUT,PATCH,POST,DELETE")
        );
    }

    #[test]
    fn preflight_echoes_requested_headers_when_unconfigured() {
        let mut request = ApiGatewayProxyRequest::default();
        request.http_method = Method::OPTIONS;
        request
            .headers
            .insert(ORIGIN, HeaderValue::from_static("https://a.com"));
        request.headers.insert(
            ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("x-custom,content-type"),
        );

        let (ctx, _) = run_through(Cors::new(), InvocationContext::new(request));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_HEADERS),
            Some("x-custom,content-type")
        );
    }

    #[test]
    fn preflight_prefers_configured_headers() {
        let cors = Cors::with_config(CorsConfig {
            allow_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            ..Default::default()
        });
        let (ctx, _) = run_through(cors, context(Method::OPTIONS, Some("https://a.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_ALLOW_HEADERS),
            Some("Content-Type,Authorization")
        );
    }

    #[test]
    fn preflight_sets_max_age_only_when_positive() {
        let cors = Cors::with_config(CorsConfig {
            max_age: 600,
            ..Default::default()
        });
        let (ctx, _) = run_through(cors, context(Method::OPTIONS, Some("https://a.com")));
        assert_eq!(
            header::get(&ctx.response().headers, ACCESS_CONTROL_MAX_AGE),
            Some("600")
        );

        let (ctx, _) = run_through(Cors::new(), context(Method::OPTIONS, Some("https://a.com")));
        assert!(header::get(&ctx.response().headers, ACCESS_CONTROL_MAX_AGE).is_none());
    }
}
