//! Request processor - the entry point callers dispatch through.
//!
//! A [`RequestProcessor`] holds only the head delegate of a built chain. It has
//! no matching logic of its own; every effect of `handle` comes from the
//! handlers that match the request.
//!
//! # Example
//!
//! ```ignore
//! let processor = chain.processor()?;
//!
//! let mut ctx = RequestContext::new();
//! processor.handle(&Upload { .. }, &mut ctx).await?;
//! ```

use crate::handler::{HandlerResult, Next, RequestContext};
use crate::request::Request;

/// Façade over a built handler chain.
///
/// Cheap to clone and safe to share across tasks; dispatches do not
/// serialize against each other.
#[derive(Clone, Debug)]
pub struct RequestProcessor {
    head: Next,
}

impl RequestProcessor {
    /// Create a processor dispatching to `head`.
    pub fn new(head: Next) -> Self {
        Self { head }
    }

    /// Dispatch `request` through the chain.
    ///
    /// Errors returned by handlers are passed through unchanged. A request no
    /// handler accepts completes with `Ok(())`.
    pub async fn handle(&self, request: &dyn Request, ctx: &mut RequestContext) -> HandlerResult {
        self.head.call(request, ctx).await
    }

    /// The chain head delegate.
    pub fn head(&self) -> &Next {
        &self.head
    }
}
