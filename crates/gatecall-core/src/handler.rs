//! Erasure of application handlers into a single object-safe endpoint.
//!
//! A handler is any async fn (or async closure) taking the invocation context
//! plus, optionally, one decodable business-data parameter, and returning
//! anything that converts via [`IntoOutcome`]. The two [`IntoEndpoint`] impls
//! fix arity and return convention at compile time; a handler of any other
//! shape simply does not satisfy the bound, so there is no wrap-time or
//! call-time shape checking left to do.

use std::future::Future;
use std::marker::PhantomData;
use std::ops::AsyncFn;
use std::pin::Pin;

use serde::de::DeserializeOwned;

use crate::context::InvocationContext;
use crate::error::GateError;
use crate::negotiate;
use crate::outcome::IntoOutcome;

/// Boxed invocation future. Not `Send`: one event is served at a time, on the
/// runtime's own task.
pub type EndpointFuture<'a> = Pin<Box<dyn Future<Output = Result<(), GateError>> + 'a>>;

/// Object-safe surface the middleware chain terminates in.
pub trait Endpoint: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut InvocationContext) -> EndpointFuture<'a>;
}

pub type BoxEndpoint = Box<dyn Endpoint>;

/// Convert a handler function into a boxed [`Endpoint`].
///
/// `Args` is an arity marker only; it never appears in the erased endpoint.
pub trait IntoEndpoint<Args>: Sized {
    fn into_endpoint(self) -> BoxEndpoint;
}

/// Endpoint for handlers with no business-data parameter. Never decodes the
/// event body, whatever the method or content type.
struct BareEndpoint<F> {
    handler: F,
}

impl<F, R> Endpoint for BareEndpoint<F>
where
    F: AsyncFn(&mut InvocationContext) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn call<'a>(&'a self, ctx: &'a mut InvocationContext) -> EndpointFuture<'a> {
        Box::pin(async move {
            let payload = (self.handler)(&mut *ctx).await.into_outcome()?;
            payload.write(ctx.response_mut());
            Ok(())
        })
    }
}

/// Endpoint for handlers declaring one decodable business-data parameter.
struct PayloadEndpoint<F, T> {
    handler: F,
    _marker: PhantomData<fn(T)>,
}

impl<F, T, R> Endpoint for PayloadEndpoint<F, T>
where
    F: AsyncFn(&mut InvocationContext, T) -> R + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
    R: IntoOutcome,
{
    fn call<'a>(&'a self, ctx: &'a mut InvocationContext) -> EndpointFuture<'a> {
        Box::pin(async move {
            let input: T = negotiate::decode_request(ctx.request())?;
            let payload = (self.handler)(&mut *ctx, input).await.into_outcome()?;
            payload.write(ctx.response_mut());
            Ok(())
        })
    }
}

impl<F, R> IntoEndpoint<()> for F
where
    F: AsyncFn(&mut InvocationContext) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn into_endpoint(self) -> BoxEndpoint {
        Box::new(BareEndpoint { handler: self })
    }
}

impl<F, T, R> IntoEndpoint<(T,)> for F
where
    F: AsyncFn(&mut InvocationContext, T) -> R + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
    R: IntoOutcome,
{
    fn into_endpoint(self) -> BoxEndpoint {
        Box::new(PayloadEndpoint {
            handler: self,
            _marker: PhantomData,
        })
    }
}
