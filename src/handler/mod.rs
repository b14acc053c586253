//! Handler module - handler contract, dispatch delegates and chain assembly.
//!
//! Provides:
//! - [`RequestHandler`] - the contract every handler implements
//! - [`Next`] - the dispatch delegate a handler forwards to
//! - [`DelegateFactory`] - builds type-checking dispatch delegates
//! - [`ChainBuilder`] - registers handlers in order and links the chain
//! - [`RequestContext`] - per-dispatch carrier shared by every handler
//!
//! # Example
//!
//! ```
//! use request_chain::handler::{BoxFuture, ChainBuilder, HandlerResult, Next, RequestContext, RequestHandler};
//! use request_chain::request::{AnyRequest, Is, Request};
//!
//! struct Audit {
//!     next: Next,
//! }
//!
//! impl RequestHandler for Audit {
//!     type Accepts = Is<AnyRequest>;
//!
//!     fn handle<'a>(
//!         &'a self,
//!         request: &'a dyn Request,
//!         ctx: &'a mut RequestContext,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             println!("before {:?}", request);
//!             self.next.call(request, ctx).await?;
//!             println!("after {:?}", request);
//!             Ok(())
//!         })
//!     }
//! }
//!
//! let mut chain = ChainBuilder::new();
//! chain.register(|next| Audit { next }).unwrap();
//! let processor = chain.processor().unwrap();
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::request::Accept;

mod context;
mod delegate;
mod registry;

pub use context::RequestContext;
pub use delegate::{DelegateConstructor, DelegateFactory, Next};
pub use registry::{ChainBuilder, RegistrationInfo};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A link in a request chain.
///
/// The handler declares the request type it accepts through `Accepts` and
/// only sees requests that match it. A handler usually keeps the [`Next`]
/// it was built with and decides whether, and when, to forward to it.
pub trait RequestHandler: Send + Sync + 'static {
    /// The request type or capability this handler matches.
    type Accepts: Accept;

    /// Handle a matching request.
    fn handle<'a>(
        &'a self,
        request: &'a <Self::Accepts as Accept>::View,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, HandlerResult>;
}
