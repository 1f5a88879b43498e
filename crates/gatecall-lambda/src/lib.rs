//! AWS Lambda registration for gatecall applications.
//!
//! The core pipeline lives in `gatecall-core`; this crate hands the finished
//! [`App`] to the Lambda invocation harness.
//!
//! ```no_run
//! use gatecall_core::{App, Cors, GateError, InvocationContext, RequestLogger};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Greeting {
//!     name: String,
//! }
//!
//! async fn greet(_ctx: &mut InvocationContext, input: Greeting) -> Result<String, GateError> {
//!     Ok(format!("hello {}", input.name))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     gatecall_lambda::init_tracing();
//!     let app = App::new(greet).middleware(Cors::new()).middleware(RequestLogger);
//!     gatecall_lambda::run(app).await
//! }
//! ```

use std::sync::Arc;

use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use gatecall_core::App;
use lambda_runtime::{service_fn, Error, LambdaEvent};

/// Register the adapted handler with the Lambda runtime and serve events
/// until shutdown.
///
/// Invocation errors never reach the runtime as transport failures; the
/// service always resolves with a well-formed response event carrying any
/// error in its body.
pub async fn run(app: App) -> Result<(), Error> {
    let app = Arc::new(app);
    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<ApiGatewayProxyRequest>| {
            let app = Arc::clone(&app);
            async move { Ok::<ApiGatewayProxyResponse, Error>(app.handle(event.payload).await) }
        },
    ))
    .await
}

/// Process-global tracing setup suited to the Lambda log pipeline: CloudWatch
/// supplies timestamps, so the subscriber emits none.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();
}
