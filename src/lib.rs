//! # request-chain
//!
//! Type-dispatched request handler chains.
//!
//! Handlers are registered in order, each declaring the request type it
//! accepts: a concrete type ([`Exact<T>`](request::Exact)) or a capability
//! ([`Is<C>`](request::Is)). A request entering the chain is handled by the
//! first handler whose accepted type matches; that handler may do work before
//! and after forwarding to the rest of the chain, or stop it by not forwarding.
//!
//! ## Architecture
//!
//! - **Registration** ([`ChainBuilder`]): ordered, append-only, frozen once built
//! - **Linking**: handlers built back to front, once, each with its successor
//! - **Dispatch** ([`RequestProcessor`]): calls the head delegate
//!
//! ## Example
//!
//! ```ignore
//! use request_chain::{ChainBuilder, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut chain = ChainBuilder::new();
//!     chain
//!         .register(|next| Loader { next })?
//!         .register(|next| Thumbnailer { next })?;
//!
//!     let processor = chain.processor()?;
//!     processor.handle(&Upload::new("cat.png"), &mut RequestContext::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod request;

mod processor;

pub use config::ChainConfig;
pub use error::PipelineError;
pub use handler::{ChainBuilder, Next, RequestContext, RequestHandler};
pub use processor::RequestProcessor;
pub use request::{AnyRequest, Capability, Exact, Is, Request};
