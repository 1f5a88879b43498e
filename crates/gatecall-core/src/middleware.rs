use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::InvocationContext;
use crate::error::GateError;
use crate::handler::Endpoint;

pub type BoxMiddleware = Arc<dyn Middleware>;

/// One link of the invocation chain.
///
/// A middleware may inspect or mutate the context, delegate with
/// `next.run(ctx)`, alter what comes back, or return without delegating to
/// short-circuit the rest of the chain. Errors propagate upward unchanged
/// unless a middleware recovers them.
#[async_trait(?Send)]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: &mut InvocationContext, next: Next<'_>) -> Result<(), GateError>;
}

/// Cursor over the remaining chain. The first middleware in the list is the
/// outermost: it runs first on the way in and last on the way out.
pub struct Next<'a> {
    middlewares: &'a [BoxMiddleware],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [BoxMiddleware], endpoint: &'a dyn Endpoint) -> Self {
        Self {
            middlewares,
            endpoint,
        }
    }

    pub async fn run(self, ctx: &mut InvocationContext) -> Result<(), GateError> {
        if let Some((head, tail)) = self.middlewares.split_first() {
            head.handle(ctx, Next::new(tail, self.endpoint)).await
        } else {
            self.endpoint.call(ctx).await
        }
    }
}

/// Logs one line per invocation: method, path, status, elapsed time.
pub struct RequestLogger;

#[async_trait(?Send)]
impl Middleware for RequestLogger {
    async fn handle(&self, ctx: &mut InvocationContext, next: Next<'_>) -> Result<(), GateError> {
        let method = ctx.request().http_method.clone();
        let path = ctx.request().path.clone().unwrap_or_default();
        let start = Instant::now();

        match next.run(ctx).await {
            Ok(()) => {
                let status = ctx.response().status_code;
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                tracing::info!(
                    "invocation method={} path={} status={} elapsed_ms={:.2}",
                    method,
                    path,
                    status,
                    elapsed
                );
                Ok(())
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                tracing::error!(
                    "invocation method={} path={} error={} elapsed_ms={:.2}",
                    method,
                    path,
                    err.message(),
                    elapsed
                );
                Err(err)
            }
        }
    }
}
