//! Request context for handlers.
//!
//! One context is created by the caller for each top-level dispatch and is
//! passed by `&mut` through every handler in the chain. The chain itself
//! never looks inside it; handlers use it to share data:
//! - `insert` / `get` / `get_mut` / `remove` - typed extensions, one per type
//! - `request_id` - identifier for correlating log lines
//!
//! # Example
//!
//! ```
//! use request_chain::handler::RequestContext;
//!
//! #[derive(Debug, PartialEq)]
//! struct User(&'static str);
//!
//! let mut ctx = RequestContext::with_id(7);
//! ctx.insert(User("ada"));
//! assert_eq!(ctx.get::<User>(), Some(&User("ada")));
//! assert_eq!(ctx.request_id(), 7);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of ids for contexts created with [`RequestContext::new`].
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Context passed to request handlers.
pub struct RequestContext {
    /// Request ID for this dispatch.
    request_id: u64,
    /// Typed values attached by handlers.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Create a new context with a process-unique request id.
    pub fn new() -> Self {
        Self::with_id(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a new context with a caller-chosen request id.
    pub fn with_id(request_id: u64) -> Self {
        Self {
            request_id,
            extensions: HashMap::new(),
        }
    }

    /// Get the request ID.
    #[inline]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Attach a value, returning the previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast().ok())
            .map(|prev| *prev)
    }

    /// Borrow the attached value of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref())
    }

    /// Mutably borrow the attached value of type `T`.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut())
    }

    /// Mutably borrow the value of type `T`, inserting one built by `f` if absent.
    pub fn get_or_insert_with<T, F>(&mut self, f: F) -> &mut T
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if !self.contains::<T>() {
            self.insert(f());
        }
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut())
            .unwrap_or_else(|| unreachable!("extension keyed by its own TypeId"))
    }

    /// Detach and return the value of type `T`.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast().ok())
            .map(|value| *value)
    }

    /// Whether a value of type `T` is attached.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    /// Number of attached values.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether no values are attached.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tenant(String);

    #[test]
    fn test_context_ids_are_unique() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.request_id(), b.request_id());
        assert_eq!(RequestContext::with_id(42).request_id(), 42);
    }

    #[test]
    fn test_insert_replaces_same_type() {
        let mut ctx = RequestContext::with_id(1);
        assert!(ctx.insert(Tenant("a".into())).is_none());
        assert_eq!(ctx.insert(Tenant("b".into())), Some(Tenant("a".into())));
        assert_eq!(ctx.get::<Tenant>(), Some(&Tenant("b".into())));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_get_mut_and_remove() {
        let mut ctx = RequestContext::with_id(1);
        ctx.insert(5u32);
        *ctx.get_mut::<u32>().unwrap() += 1;
        assert_eq!(ctx.remove::<u32>(), Some(6));
        assert!(!ctx.contains::<u32>());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut ctx = RequestContext::with_id(1);
        ctx.get_or_insert_with(Vec::<&str>::new).push("a");
        ctx.get_or_insert_with(Vec::<&str>::new).push("b");
        assert_eq!(ctx.get::<Vec<&str>>().unwrap(), &vec!["a", "b"]);
    }

    #[test]
    fn test_missing_extension() {
        let ctx = RequestContext::with_id(1);
        assert!(ctx.get::<Tenant>().is_none());
        assert!(format!("{:?}", ctx).contains("request_id: 1"));
    }
}
