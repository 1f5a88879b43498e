use std::sync::Arc;

use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use serde_json::json;

use crate::context::InvocationContext;
use crate::handler::{BoxEndpoint, IntoEndpoint};
use crate::middleware::{BoxMiddleware, Middleware, Next};

/// One application handler plus its middleware, adapted to the runtime's
/// fixed event-in, event-out signature.
///
/// Built once at startup and shared read-only across in-flight invocations;
/// every call gets a fresh [`InvocationContext`].
pub struct App {
    endpoint: BoxEndpoint,
    middleware: Vec<BoxMiddleware>,
}

impl App {
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: IntoEndpoint<Args>,
    {
        Self {
            endpoint: handler.into_endpoint(),
            middleware: Vec::new(),
        }
    }

    /// Append a middleware. The first middleware added is the outermost: it
    /// runs first on the way in and last on the way out.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Serve one inbound event. Invocation errors are folded into the
    /// response body; the returned event is always well formed and the
    /// status code is left as the chain set it.
    pub async fn handle(&self, event: ApiGatewayProxyRequest) -> ApiGatewayProxyResponse {
        let mut ctx = InvocationContext::new(event);
        let chain = Next::new(&self.middleware, self.endpoint.as_ref());
        if let Err(err) = chain.run(&mut ctx).await {
            let body = json!({ "error": err.message() }).to_string();
            ctx.response_mut().body = Some(Body::Text(body));
        }
        ctx.into_response()
    }
}
