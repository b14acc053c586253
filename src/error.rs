//! Error types for request-chain.

use thiserror::Error;

/// Boxed error a handler reports as the cause of its failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all chain operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The chain head was requested before any handler was registered.
    #[error("cannot build a chain without handlers")]
    EmptyChain,

    /// The same handler type was registered twice.
    #[error("handler {handler} is already registered at index {index}")]
    DuplicateHandler {
        handler: &'static str,
        index: usize,
    },

    /// Registration was attempted after the chain was built.
    #[error("chain is already built, cannot register {handler}")]
    ChainFrozen { handler: &'static str },

    /// The configured handler limit was reached.
    #[error("handler limit of {limit} reached, cannot register {handler}")]
    TooManyHandlers { limit: usize, handler: &'static str },

    /// Chain configuration could not be parsed.
    #[error("invalid chain configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A handler failed while processing a request.
    ///
    /// Only handlers construct this variant; the chain passes it through
    /// to the caller untouched.
    #[error("handler {handler} failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Wrap a failure raised by handler `H`.
    pub fn handler<H: ?Sized>(source: impl Into<BoxError>) -> Self {
        PipelineError::Handler {
            handler: std::any::type_name::<H>(),
            source: source.into(),
        }
    }

    /// Whether this error was raised while assembling the chain.
    pub fn is_config(&self) -> bool {
        !matches!(self, PipelineError::Handler { .. })
    }
}

/// Result type alias using PipelineError.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    struct Loader;

    #[test]
    fn test_handler_error_keeps_source() {
        let err = PipelineError::handler::<Loader>(DiskError);

        assert!(!err.is_config());
        assert!(err.to_string().contains("Loader"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<DiskError>().is_some());
    }

    #[test]
    fn test_config_errors() {
        assert!(PipelineError::EmptyChain.is_config());
        assert!(PipelineError::ChainFrozen { handler: "x" }.is_config());
        assert_eq!(
            PipelineError::TooManyHandlers {
                limit: 2,
                handler: "x"
            }
            .to_string(),
            "handler limit of 2 reached, cannot register x"
        );
    }
}
