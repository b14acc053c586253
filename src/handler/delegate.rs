//! Dispatch delegates.
//!
//! A [`Next`] is the callable unit of a chain: given a request and the
//! context it runs one step and everything behind it. The
//! [`DelegateFactory`] turns a handler plus the delegate for the rest of the
//! chain into the handler's own dispatch delegate:
//!
//! ```text
//! D(request, ctx) = if matches(request) { handler(request, ctx) } else { fallback(request, ctx) }
//! ```
//!
//! Chaining these gives a left-to-right scan that stops at the first
//! handler whose accepted type matches. The tail of every chain is the
//! shared [`DelegateFactory::terminal`] no-op.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::{BoxFuture, HandlerResult, RequestContext, RequestHandler};
use crate::request::{Accept, Request};

type DispatchFn = dyn for<'a> Fn(&'a dyn Request, &'a mut RequestContext) -> BoxFuture<'a, HandlerResult>
    + Send
    + Sync;

/// The one terminal delegate shared by every chain.
static TERMINAL: Lazy<Next> = Lazy::new(|| Next::new(|_request, _ctx| Box::pin(async { Ok(()) })));

/// Dispatch delegate: "run this step of the chain".
///
/// Cheap to clone; clones share the same underlying closure.
#[derive(Clone)]
pub struct Next {
    inner: Arc<DispatchFn>,
}

impl Next {
    /// Wrap a dispatch closure.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Request, &'a mut RequestContext) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Run this step with `request` and `ctx`.
    #[inline]
    pub fn call<'a>(
        &self,
        request: &'a dyn Request,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.inner)(request, ctx)
    }

    /// Whether both delegates are the same closure.
    pub fn ptr_eq(&self, other: &Next) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether this is the terminal no-op.
    pub fn is_terminal(&self) -> bool {
        self.ptr_eq(&TERMINAL)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("terminal", &self.is_terminal())
            .finish_non_exhaustive()
    }
}

/// Log fields for a traced dispatch step.
#[derive(Debug, Clone)]
pub(crate) struct StepTrace {
    pub chain: Arc<str>,
    pub handler: &'static str,
    pub index: usize,
}

/// Builds dispatch delegates for handlers accepting `A`.
///
/// One instance exists per accepted type in a [`DelegateFactory`] and is
/// shared by every handler registered for that type.
pub struct DelegateConstructor<A> {
    accepts: &'static str,
    _accept: PhantomData<fn() -> A>,
}

impl<A: Accept> DelegateConstructor<A> {
    fn new() -> Self {
        Self {
            accepts: A::name(),
            _accept: PhantomData,
        }
    }

    /// Name of the accepted type.
    #[inline]
    pub fn accepts(&self) -> &'static str {
        self.accepts
    }

    /// Matching predicate for `A`.
    #[inline]
    pub fn matches(&self, request: &dyn Request) -> bool {
        A::matches(request)
    }

    /// Bind `handler` into a dispatch delegate falling back to `fallback`.
    pub fn bind(&self, handler: Arc<dyn RequestHandler<Accepts = A>>, fallback: Next) -> Next {
        DelegateFactory::create(handler, fallback)
    }

    pub(crate) fn bind_traced(
        &self,
        handler: Arc<dyn RequestHandler<Accepts = A>>,
        fallback: Next,
        trace: Option<StepTrace>,
    ) -> Next {
        DelegateFactory::link(handler, fallback, trace)
    }
}

/// Creates dispatch delegates and caches one constructor per accepted type.
#[derive(Default)]
pub struct DelegateFactory {
    constructors: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl DelegateFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The no-op delegate at the end of every chain.
    ///
    /// Completes with `Ok(())` without looking at the request.
    pub fn terminal() -> Next {
        TERMINAL.clone()
    }

    /// Dispatch to `handler` if the request matches its accepted type,
    /// otherwise to `fallback`.
    pub fn create<H>(handler: Arc<H>, fallback: Next) -> Next
    where
        H: RequestHandler + ?Sized,
    {
        Self::link(handler, fallback, None)
    }

    fn link<H>(handler: Arc<H>, fallback: Next, trace: Option<StepTrace>) -> Next
    where
        H: RequestHandler + ?Sized,
    {
        Next::new(move |request, ctx| {
            let Some(view) = <H::Accepts as Accept>::view(request) else {
                return fallback.call(request, ctx);
            };
            if let Some(trace) = &trace {
                tracing::trace!(
                    chain = %trace.chain,
                    handler = trace.handler,
                    index = trace.index,
                    request_id = ctx.request_id(),
                    "Handler matched request"
                );
            }
            let handler = Arc::clone(&handler);
            Box::pin(async move { handler.handle(view, ctx).await })
        })
    }

    /// Get the cached constructor for `A`, creating it on first use.
    pub fn constructor<A: Accept>(&mut self) -> Arc<DelegateConstructor<A>> {
        let key = TypeId::of::<A>();
        if let Some(cached) = self
            .constructors
            .get(&key)
            .and_then(|c| Arc::clone(c).downcast::<DelegateConstructor<A>>().ok())
        {
            return cached;
        }

        let constructor = Arc::new(DelegateConstructor::<A>::new());
        self.constructors.insert(key, constructor.clone());
        constructor
    }

    /// Number of distinct accepted types with a cached constructor.
    pub fn cached_types(&self) -> usize {
        self.constructors.len()
    }
}

impl fmt::Debug for DelegateFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateFactory")
            .field("cached_types", &self.constructors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::impl_request;
    use crate::request::{Capability, Exact, Is};

    struct Media;
    impl Capability for Media {}

    #[derive(Debug)]
    struct Photo;
    impl_request!(Photo: Media);

    #[derive(Debug)]
    struct Ping;
    impl_request!(Ping);

    #[derive(Default)]
    struct Hits(Vec<&'static str>);

    struct Record(&'static str);

    impl RequestHandler for Record {
        type Accepts = Is<Media>;

        fn handle<'a>(
            &'a self,
            _request: &'a dyn Request,
            ctx: &'a mut RequestContext,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                ctx.get_or_insert_with(Hits::default).0.push(self.0);
                Ok(())
            })
        }
    }

    struct Fails;

    impl RequestHandler for Fails {
        type Accepts = Exact<Ping>;

        fn handle<'a>(
            &'a self,
            _request: &'a Ping,
            _ctx: &'a mut RequestContext,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async { Err(PipelineError::handler::<Self>("ping refused")) })
        }
    }

    fn fallback_marker() -> Next {
        Next::new(|_request, ctx| {
            Box::pin(async move {
                ctx.get_or_insert_with(Hits::default).0.push("fallback");
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_terminal_is_noop() {
        let mut ctx = RequestContext::with_id(1);
        DelegateFactory::terminal().call(&Ping, &mut ctx).await.unwrap();
        assert!(ctx.is_empty());
        assert!(DelegateFactory::terminal().ptr_eq(&DelegateFactory::terminal()));
        assert!(DelegateFactory::terminal().is_terminal());
    }

    #[tokio::test]
    async fn test_create_routes_by_type() {
        let delegate = DelegateFactory::create(Arc::new(Record("media")), fallback_marker());

        let mut ctx = RequestContext::with_id(1);
        delegate.call(&Photo, &mut ctx).await.unwrap();
        delegate.call(&Ping, &mut ctx).await.unwrap();

        assert_eq!(ctx.get::<Hits>().unwrap().0, vec!["media", "fallback"]);
        assert!(!delegate.is_terminal());
    }

    #[tokio::test]
    async fn test_handler_error_passes_through() {
        let delegate = DelegateFactory::create(Arc::new(Fails), DelegateFactory::terminal());

        let mut ctx = RequestContext::with_id(1);
        let err = delegate.call(&Ping, &mut ctx).await.unwrap_err();
        assert!(matches!(err, PipelineError::Handler { .. }));
        assert!(delegate.call(&Photo, &mut ctx).await.is_ok());
    }

    #[test]
    fn test_constructor_cache_one_per_type() {
        let mut factory = DelegateFactory::new();
        let a = factory.constructor::<Is<Media>>();
        let b = factory.constructor::<Is<Media>>();
        let c = factory.constructor::<Exact<Ping>>();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.cached_types(), 2);
        assert!(a.matches(&Photo));
        assert!(!a.matches(&Ping));
        assert!(c.matches(&Ping));
        assert!(c.accepts().ends_with("Ping"));
    }

    #[tokio::test]
    async fn test_traced_bind_dispatches_like_plain_bind() {
        let mut factory = DelegateFactory::new();
        let constructor = factory.constructor::<Is<Media>>();
        let trace = StepTrace {
            chain: Arc::from("test"),
            handler: "Record",
            index: 0,
        };
        let delegate =
            constructor.bind_traced(Arc::new(Record("traced")), fallback_marker(), Some(trace));

        let mut ctx = RequestContext::with_id(1);
        delegate.call(&Photo, &mut ctx).await.unwrap();
        delegate.call(&Ping, &mut ctx).await.unwrap();
        assert_eq!(ctx.get::<Hits>().unwrap().0, vec!["traced", "fallback"]);
    }
}
