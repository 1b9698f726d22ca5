//! Async handler adapters and type erasure.
//!
//! # Two handler shapes
//!
//! ```text
//! async fn get_user(req: Request, ctx: Context) -> Result<(), Error>             ← handle(get_user)
//! async fn audit(req: Request, ctx: Context, next: Next) -> Result<(), Error>    ← handle_next(audit)
//! ```
//!
//! With [`handle`], returning `Ok(())` hands the request on by itself. With
//! [`handle_next`], the handler decides when to call [`Next::proceed`]. In
//! both shapes an `Err` is routed to the error translator, never dropped, and
//! a request stage settles once: a failure arriving after the handler already
//! proceeded is logged and ignored.
//!
//! # How handlers are stored
//!
//! The router holds handlers of different types in one table, so each adapter
//! is erased behind `dyn ErasedHandler`:
//!
//! ```text
//! handle(get_user)                     ← Handle<F>
//!        ↓ router.on(Method::GET, "/users/{id}", …)
//! Arc::new(Handle(get_user))           ← stored as BoxedHandler
//!        ↓
//! handler.call(req, ctx, next)         ← one vtable dispatch per request
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::middleware::Next;
use crate::request::Request;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future run once per request.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the public `Handler` trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request, ctx: Context, next: Next) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// A route handler produced by [`handle`] or [`handle_next`].
///
/// The trait is sealed: those two adapters are the only implementations.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Adapters ──────────────────────────────────────────────────────────────────

/// Handler that proceeds on `Ok` and fails on `Err`.
pub struct Handle<F>(F);

/// Handler that calls [`Next::proceed`] itself and fails on `Err`.
pub struct HandleNext<F>(F);

/// Adapts `async fn(Request, Context) -> Result<(), Error>`.
pub fn handle<F, Fut>(f: F) -> Handle<F>
where
    F: Fn(Request, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    Handle(f)
}

/// Adapts `async fn(Request, Context, Next) -> Result<(), Error>`.
pub fn handle_next<F, Fut>(f: F) -> HandleNext<F>
where
    F: Fn(Request, Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    HandleNext(f)
}

impl<F> private::Sealed for Handle<F> {}
impl<F> private::Sealed for HandleNext<F> {}

impl<F, Fut> Handler for Handle<F>
where
    F: Fn(Request, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

impl<F, Fut> Handler for HandleNext<F>
where
    F: Fn(Request, Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

impl<F, Fut> ErasedHandler for Handle<F>
where
    F: Fn(Request, Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, req: Request, ctx: Context, next: Next) -> BoxFuture {
        let fut = (self.0)(req, ctx);
        Box::pin(async move {
            match fut.await {
                Ok(()) => next.proceed(),
                Err(e) => next.fail(e),
            }
        })
    }
}

impl<F, Fut> ErasedHandler for HandleNext<F>
where
    F: Fn(Request, Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, req: Request, ctx: Context, next: Next) -> BoxFuture {
        let guard = next.fork();
        let fut = (self.0)(req, ctx, next);
        Box::pin(async move {
            if let Err(e) = fut.await {
                guard.fail(e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use super::*;
    use crate::config::Config;
    use crate::context::tests::context;
    use crate::middleware::Flow;
    use crate::sink::MemorySink;

    fn request() -> Request {
        let (parts, ()) = http::Request::builder().uri("/").body(()).unwrap().into_parts();
        Request::new(parts, Bytes::new(), Default::default(), None)
    }

    async fn run(handler: impl Handler) -> Option<Flow> {
        let ctx = context("GET", "/", &[], "", Config::new(), &MemorySink::new());
        let next = Next::new();
        let outcome = next.fork();
        handler.into_boxed_handler().call(request(), ctx, next).await;
        outcome.take()
    }

    #[tokio::test]
    async fn handle_proceeds_on_success() {
        let flow = run(handle(|_req, _ctx| async { Ok::<(), Error>(()) })).await;
        assert!(matches!(flow, Some(Flow::Continue)));
    }

    #[tokio::test]
    async fn handle_routes_failures() {
        let flow = run(handle(|_req, _ctx| async { Err::<(), _>(Error::opaque("boom")) })).await;
        assert!(matches!(flow, Some(Flow::Fail(Error::Opaque(_)))));
    }

    #[tokio::test]
    async fn handle_next_leaves_proceeding_to_the_handler() {
        let flow = run(handle_next(|_req, _ctx, _next| async { Ok::<(), Error>(()) })).await;
        assert!(flow.is_none());

        let flow = run(handle_next(|_req, _ctx, next: Next| async move {
            next.proceed();
            Ok::<(), Error>(())
        }))
        .await;
        assert!(matches!(flow, Some(Flow::Continue)));
    }

    #[tokio::test]
    async fn failure_after_proceeding_is_ignored() {
        let flow = run(handle_next(|_req, _ctx, next: Next| async move {
            next.proceed();
            Err::<(), _>(Error::opaque("too late"))
        }))
        .await;
        assert!(matches!(flow, Some(Flow::Continue)));
    }

    #[tokio::test]
    async fn handler_runs_once_per_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let flow = run(handle(move |_req, _ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::http(418, "teapot", "short and stout"))
            }
        }))
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(flow, Some(Flow::Fail(Error::Http(e))) if e.status == 418));
    }
}
