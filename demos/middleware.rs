//! Middleware chain - surround-style handlers selected by request type.
//!
//! This example demonstrates:
//! - Registering handlers for a capability, the catch-all capability and an
//!   exact request type
//! - Injecting a shared service into a handler next to its successor
//! - Dispatching several requests through one processor with one context
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=request_chain=trace cargo run --example middleware
//! ```

use std::sync::Arc;

use request_chain::handler::{BoxFuture, HandlerResult};
use request_chain::{
    impl_request, AnyRequest, Capability, ChainBuilder, ChainConfig, Exact, Is, Next, Request,
    RequestContext, RequestHandler,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Requests carrying media content.
struct Media;
impl Capability for Media {}

#[derive(Debug)]
struct TestRequestA;
impl_request!(TestRequestA);

#[derive(Debug)]
struct TestRequestB;
impl_request!(TestRequestB: Media);

#[derive(Debug)]
struct TestRequestD;
impl_request!(TestRequestD);

/// Collaborator handed to the media handler.
#[derive(Debug)]
struct TestService {
    kind: String,
}

/// Loads the control unit for every request.
struct ControlUnitLoader {
    next: Next,
}

impl RequestHandler for ControlUnitLoader {
    type Accepts = Is<AnyRequest>;

    fn handle<'a>(
        &'a self,
        request: &'a dyn Request,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            info!(request_id = ctx.request_id(), "A started");
            self.next.call(request, ctx).await?;
            info!(request_id = ctx.request_id(), "A completed");
            Ok(())
        })
    }
}

struct HandlerB {
    service: Arc<TestService>,
    next: Next,
}

impl RequestHandler for HandlerB {
    type Accepts = Is<Media>;

    fn handle<'a>(
        &'a self,
        request: &'a dyn Request,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            info!(service = %self.service.kind, "B started");
            self.next.call(request, ctx).await?;
            info!("B completed");
            Ok(())
        })
    }
}

struct HandlerC {
    next: Next,
}

impl RequestHandler for HandlerC {
    type Accepts = Is<AnyRequest>;

    fn handle<'a>(
        &'a self,
        request: &'a dyn Request,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            info!("C started");
            self.next.call(request, ctx).await?;
            info!("C completed");
            Ok(())
        })
    }
}

struct HandlerD {
    next: Next,
}

impl RequestHandler for HandlerD {
    type Accepts = Exact<TestRequestD>;

    fn handle<'a>(
        &'a self,
        request: &'a TestRequestD,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            info!("D started");
            self.next.call(request, ctx).await?;
            info!("D completed");
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let service = Arc::new(TestService {
        kind: "media".to_string(),
    });

    let mut chain = ChainBuilder::with_config(ChainConfig {
        trace_dispatch: true,
        ..ChainConfig::named("demo")
    });
    chain
        .register(|next| ControlUnitLoader { next })?
        .register(move |next| HandlerB {
            service: Arc::clone(&service),
            next,
        })?
        .register(|next| HandlerC { next })?
        .register(|next| HandlerD { next })?;

    let processor = chain.processor()?;
    let mut ctx = RequestContext::new();

    info!("Dispatching TestRequestA");
    processor.handle(&TestRequestA, &mut ctx).await?;
    info!("Dispatching TestRequestB");
    processor.handle(&TestRequestB, &mut ctx).await?;
    info!("Dispatching TestRequestD");
    processor.handle(&TestRequestD, &mut ctx).await?;

    Ok(())
}
