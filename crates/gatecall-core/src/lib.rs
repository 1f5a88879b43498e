//! Core pipeline for adapting one application handler to an
//! API-Gateway-style function runtime: content negotiation, result
//! normalisation, a middleware chain, and a CORS policy evaluator.

pub mod app;
pub mod context;
pub mod cors;
pub mod error;
pub mod handler;
pub mod header;
pub mod middleware;
pub mod negotiate;
pub mod outcome;

pub use app::App;
pub use context::InvocationContext;
pub use cors::{Cors, CorsConfig};
pub use error::GateError;
pub use handler::{BoxEndpoint, Endpoint, EndpointFuture, IntoEndpoint};
pub use middleware::{BoxMiddleware, Middleware, Next, RequestLogger};
pub use outcome::{Data, IntoOutcome, Payload};
