//! Chain builder: ordered handler registration and chain linking.
//!
//! Handlers are registered in the order they should see requests. Each
//! registration records the handler's accepted type and a factory that builds
//! the handler from its successor delegate. Nothing is constructed until the
//! chain head is first requested.
//!
//! Linking walks the registrations back to front: the last handler is built
//! with the terminal delegate as its successor, its dispatch delegate becomes
//! the successor of the handler before it, and so on until the first
//! handler's dispatch delegate, which is the head of the chain.
//!
//! The build runs at most once, even under concurrent first use. After it the
//! chain is frozen and `register` fails.
//!
//! # Example
//!
//! ```ignore
//! let mut chain = ChainBuilder::new();
//! chain
//!     .register(|next| Loader::new(next))?
//!     .register(|next| MediaHandler::new(service.clone(), next))?;
//!
//! let processor = chain.processor()?;
//! processor.handle(&Upload, &mut RequestContext::new()).await?;
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::delegate::{DelegateFactory, Next, StepTrace};
use super::RequestHandler;
use crate::config::ChainConfig;
use crate::error::{PipelineError, Result};
use crate::processor::RequestProcessor;
use crate::request::Accept;

/// A handler built from its successor, bound to its own dispatch delegate.
struct Linked {
    dispatch: Next,
    instance: Arc<dyn Any + Send + Sync>,
}

type LinkFn = dyn Fn(Next) -> Linked + Send + Sync;

/// Entry for a registered handler.
struct Registration {
    /// Position in the chain.
    index: usize,
    /// Handler type name.
    handler: &'static str,
    /// Handler identity.
    handler_id: TypeId,
    /// Accepted request type name.
    accepts: &'static str,
    /// Builds the handler and its dispatch delegate from a successor.
    link: Box<LinkFn>,
}

/// A registration after the chain was built.
struct Link {
    dispatch: Next,
    successor: Next,
    instance: Arc<dyn Any + Send + Sync>,
}

/// The frozen chain.
struct Chain {
    head: Next,
    links: Vec<Link>,
}

/// Public view of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationInfo {
    /// Position in the chain.
    pub index: usize,
    /// Handler type name.
    pub handler: &'static str,
    /// Accepted request type name.
    pub accepts: &'static str,
}

/// Registers handlers in order and links them into a chain.
pub struct ChainBuilder {
    config: ChainConfig,
    /// Chain name shared with traced delegates.
    name: Arc<str>,
    registrations: Vec<Registration>,
    factory: DelegateFactory,
    chain: OnceCell<Chain>,
}

impl ChainBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    /// Create a builder with the given configuration.
    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            name: Arc::from(config.name.as_str()),
            config,
            registrations: Vec::new(),
            factory: DelegateFactory::new(),
            chain: OnceCell::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Register handler `H` at the end of the chain.
    ///
    /// `factory` receives the delegate for everything after `H` and is
    /// called exactly once, when the chain is built.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::ChainFrozen`] if the chain was already built
    /// - [`PipelineError::DuplicateHandler`] if `H` is already registered
    /// - [`PipelineError::TooManyHandlers`] if `max_handlers` is reached
    pub fn register<H, F>(&mut self, factory: F) -> Result<&mut Self>
    where
        H: RequestHandler,
        F: Fn(Next) -> H + Send + Sync + 'static,
    {
        let handler = type_name::<H>();
        if self.is_built() {
            return Err(PipelineError::ChainFrozen { handler });
        }

        let handler_id = TypeId::of::<H>();
        if let Some(existing) = self.registrations.iter().find(|r| r.handler_id == handler_id) {
            return Err(PipelineError::DuplicateHandler {
                handler,
                index: existing.index,
            });
        }

        if self.registrations.len() >= self.config.max_handlers {
            return Err(PipelineError::TooManyHandlers {
                limit: self.config.max_handlers,
                handler,
            });
        }

        let index = self.registrations.len();
        let constructor = self.factory.constructor::<H::Accepts>();
        let trace = self.config.trace_dispatch.then(|| StepTrace {
            chain: Arc::clone(&self.name),
            handler,
            index,
        });

        let link = move |successor: Next| {
            let instance = Arc::new(factory(successor.clone()));
            let dispatch = constructor.bind_traced(instance.clone(), successor, trace.clone());
            Linked { dispatch, instance }
        };

        tracing::debug!(
            chain = %self.name,
            index,
            handler,
            accepts = <H::Accepts as Accept>::name(),
            "Registered handler"
        );

        self.registrations.push(Registration {
            index,
            handler,
            handler_id,
            accepts: <H::Accepts as Accept>::name(),
            link: Box::new(link),
        });

        Ok(self)
    }

    /// Get the chain head, building the chain on first call.
    ///
    /// Later calls return the same delegate without constructing anything.
    ///
    /// # Errors
    ///
    /// [`PipelineError::EmptyChain`] if no handler is registered.
    pub fn head(&self) -> Result<Next> {
        self.chain
            .get_or_try_init(|| self.link())
            .map(|chain| chain.head.clone())
    }

    /// Build the chain and wrap its head in a [`RequestProcessor`].
    pub fn processor(&self) -> Result<RequestProcessor> {
        self.head().map(RequestProcessor::new)
    }

    /// Whether the chain has been built.
    pub fn is_built(&self) -> bool {
        self.chain.get().is_some()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registrations in chain order.
    pub fn registrations(&self) -> impl Iterator<Item = RegistrationInfo> + '_ {
        self.registrations.iter().map(|r| RegistrationInfo {
            index: r.index,
            handler: r.handler,
            accepts: r.accepts,
        })
    }

    /// Number of distinct accepted types among registered handlers.
    pub fn accepted_types(&self) -> usize {
        self.factory.cached_types()
    }

    /// Get the built instance of handler `H`.
    ///
    /// `None` if `H` is not registered or the chain is not built yet.
    pub fn handler<H: RequestHandler>(&self) -> Option<Arc<H>> {
        let chain = self.chain.get()?;
        let handler_id = TypeId::of::<H>();
        let registration = self.registrations.iter().find(|r| r.handler_id == handler_id)?;
        Arc::clone(&chain.links[registration.index].instance)
            .downcast::<H>()
            .ok()
    }

    /// Get the dispatch delegate of the handler at `index`.
    pub fn dispatch(&self, index: usize) -> Option<Next> {
        self.chain
            .get()
            .and_then(|chain| chain.links.get(index))
            .map(|link| link.dispatch.clone())
    }

    /// Get the successor delegate of the handler at `index`.
    pub fn successor(&self, index: usize) -> Option<Next> {
        self.chain
            .get()
            .and_then(|chain| chain.links.get(index))
            .map(|link| link.successor.clone())
    }

    fn link(&self) -> Result<Chain> {
        if self.registrations.is_empty() {
            return Err(PipelineError::EmptyChain);
        }

        let mut successor = DelegateFactory::terminal();
        let mut links = Vec::with_capacity(self.registrations.len());

        for registration in self.registrations.iter().rev() {
            let Linked { dispatch, instance } = (registration.link)(successor.clone());
            tracing::trace!(
                chain = %self.name,
                index = registration.index,
                handler = registration.handler,
                "Linked handler"
            );
            links.push(Link {
                dispatch: dispatch.clone(),
                successor,
                instance,
            });
            successor = dispatch;
        }
        links.reverse();

        tracing::debug!(chain = %self.name, handlers = links.len(), "Chain built");

        Ok(Chain {
            head: successor,
            links,
        })
    }
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("name", &self.name)
            .field("handlers", &self.registrations.len())
            .field("built", &self.is_built())
            .finish()
    }
}
