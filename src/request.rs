//! Request type model.
//!
//! A request is any value implementing [`Request`]. Beyond its concrete type a
//! request may satisfy any number of capabilities: zero-sized marker types
//! implementing [`Capability`]. Every request satisfies [`AnyRequest`].
//!
//! Handlers pick what they accept with an [`Accept`] marker:
//!
//! - [`Exact<T>`] matches requests of concrete type `T` and hands out `&T`.
//! - [`Is<C>`] matches requests satisfying capability `C` and hands out
//!   `&dyn Request`.
//!
//! # Example
//!
//! ```
//! use request_chain::request::{Accept, AnyRequest, Capability, Exact, Is, Request};
//! use request_chain::impl_request;
//!
//! struct Media;
//! impl Capability for Media {}
//!
//! #[derive(Debug)]
//! struct Upload;
//! impl_request!(Upload: Media);
//!
//! #[derive(Debug)]
//! struct Ping;
//! impl_request!(Ping);
//!
//! assert!(Is::<Media>::matches(&Upload));
//! assert!(!Is::<Media>::matches(&Ping));
//! assert!(Is::<AnyRequest>::matches(&Ping));
//! assert!(Exact::<Ping>::matches(&Ping));
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// A value that can travel through a handler chain.
///
/// Implement it by hand or with [`impl_request!`](crate::impl_request).
pub trait Request: Any + Send + Sync + fmt::Debug + 'static {
    /// Whether this request satisfies `capability`.
    ///
    /// [`AnyRequest`] is handled by the chain and need not be listed.
    fn satisfies(&self, capability: CapabilityId) -> bool {
        let _ = capability;
        false
    }
}

impl dyn Request {
    /// Whether this request satisfies capability `C`.
    pub fn is<C: Capability>(&self) -> bool {
        let id = CapabilityId::of::<C>();
        id == CapabilityId::of::<AnyRequest>() || self.satisfies(id)
    }

    /// Downcast to the concrete request type.
    pub fn downcast_ref<T: Request>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// Marker for an abstract request classification.
pub trait Capability: 'static {}

/// The capability every request satisfies.
#[derive(Debug, Clone, Copy)]
pub struct AnyRequest;

impl Capability for AnyRequest {}

/// Runtime identity of a capability marker.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId {
    id: TypeId,
    name: &'static str,
}

impl CapabilityId {
    /// Identity of capability `C`.
    pub fn of<C: Capability>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    /// Type name of the capability.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapabilityId").field(&self.name).finish()
    }
}

/// The request type a handler accepts.
///
/// `view` is the whole matching test: a request matches when it yields a view.
pub trait Accept: 'static {
    /// What the handler receives for a matching request.
    type View: ?Sized + Sync;

    /// Borrow `request` as this type's view, or `None` if it does not match.
    fn view(request: &dyn Request) -> Option<&Self::View>;

    /// Human-readable name of the accepted type.
    fn name() -> &'static str;

    /// Matching predicate.
    fn matches(request: &dyn Request) -> bool {
        Self::view(request).is_some()
    }
}

/// Accept requests of exactly type `T`.
pub struct Exact<T>(PhantomData<fn() -> T>);

impl<T: Request> Accept for Exact<T> {
    type View = T;

    fn view(request: &dyn Request) -> Option<&T> {
        request.downcast_ref::<T>()
    }

    fn name() -> &'static str {
        type_name::<T>()
    }
}

/// Accept any request satisfying capability `C`.
pub struct Is<C>(PhantomData<fn() -> C>);

impl<C: Capability> Accept for Is<C> {
    type View = dyn Request;

    fn view(request: &dyn Request) -> Option<&dyn Request> {
        request.is::<C>().then_some(request)
    }

    fn name() -> &'static str {
        type_name::<C>()
    }
}

/// Implement [`Request`] for a type, optionally listing its capabilities.
///
/// ```
/// use request_chain::impl_request;
/// use request_chain::request::Capability;
///
/// struct Media;
/// impl Capability for Media {}
/// struct Cached;
/// impl Capability for Cached {}
///
/// #[derive(Debug)]
/// struct Thumbnail;
/// impl_request!(Thumbnail: Media, Cached);
/// ```
#[macro_export]
macro_rules! impl_request {
    ($ty:ty) => {
        impl $crate::request::Request for $ty {}
    };
    ($ty:ty: $($cap:ty),+ $(,)?) => {
        impl $crate::request::Request for $ty {
            fn satisfies(&self, capability: $crate::request::CapabilityId) -> bool {
                $(capability == $crate::request::CapabilityId::of::<$cap>())||+
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Media;
    impl Capability for Media {}

    struct Audio;
    impl Capability for Audio {}

    #[derive(Debug)]
    struct Plain;
    crate::impl_request!(Plain);

    #[derive(Debug)]
    struct Song {
        title: &'static str,
    }
    crate::impl_request!(Song: Media, Audio);

    #[test]
    fn test_any_request_matches_everything() {
        assert!(Is::<AnyRequest>::matches(&Plain));
        assert!(Is::<AnyRequest>::matches(&Song { title: "a" }));
    }

    #[test]
    fn test_capabilities_are_independent() {
        let song = Song { title: "a" };
        assert!(Is::<Media>::matches(&song));
        assert!(Is::<Audio>::matches(&song));
        assert!(!Is::<Media>::matches(&Plain));
        assert!(!Is::<Audio>::matches(&Plain));
    }

    #[test]
    fn test_exact_matches_only_concrete_type() {
        let song = Song { title: "intro" };
        assert!(!Exact::<Plain>::matches(&song));

        let view = Exact::<Song>::view(&song).unwrap();
        assert_eq!(view.title, "intro");
    }

    #[test]
    fn test_capability_view_is_same_request() {
        let song = Song { title: "b" };
        let view = Is::<Media>::view(&song).unwrap();
        assert_eq!(view.downcast_ref::<Song>().unwrap().title, "b");
    }

    #[test]
    fn test_capability_id() {
        assert_eq!(CapabilityId::of::<Media>(), CapabilityId::of::<Media>());
        assert_ne!(CapabilityId::of::<Media>(), CapabilityId::of::<Audio>());
        assert!(CapabilityId::of::<Media>().name().ends_with("Media"));
        assert_eq!(Is::<Audio>::name(), CapabilityId::of::<Audio>().name());
    }
}
