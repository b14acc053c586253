//! Chain configuration.
//!
//! Configuration can be built in code or parsed from JSON. Missing fields
//! fall back to their defaults.
//!
//! ```
//! use request_chain::ChainConfig;
//!
//! let config = ChainConfig::from_json(r#"{ "name": "ingest", "trace_dispatch": true }"#).unwrap();
//! assert_eq!(config.name, "ingest");
//! assert_eq!(config.max_handlers, request_chain::config::DEFAULT_MAX_HANDLERS);
//! ```

use serde::Deserialize;

use crate::error::Result;

/// Default chain name used in log fields.
pub const DEFAULT_CHAIN_NAME: &str = "default";

/// Default maximum number of handlers in one chain.
pub const DEFAULT_MAX_HANDLERS: usize = 256;

/// Configuration for a [`ChainBuilder`](crate::handler::ChainBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Label attached to log events emitted by this chain.
    pub name: String,
    /// Maximum handlers accepted by `register`.
    pub max_handlers: usize,
    /// Emit a `trace` event every time a handler matches a request.
    pub trace_dispatch: bool,
}

impl ChainConfig {
    /// Create a default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CHAIN_NAME.to_string(),
            max_handlers: DEFAULT_MAX_HANDLERS,
            trace_dispatch: false,
        }
    }
}
