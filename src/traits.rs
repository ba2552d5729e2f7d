//! # Shared Traits
//!
//! ```text
//!   ┌──────────────────────────────────────┐
//!   │            Identity                  │
//!   │                                      │
//!   │  identity(&) → &str                  │
//!   └──────────────────┬───────────────────┘
//!                      │
//!        ┌─────────────┼──────────────────┐
//!        ▼             ▼                  ▼
//!     String, &str   PolicyModule     &T where T: Identity
//! ```
//!
//! Nodes of a [`DependencyGraph`](crate::graph::DependencyGraph) are keyed by
//! their identity string. Edges refer to identities, not to node values, so an
//! edge may name a node that has not been added yet.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

/// A value that can be placed in a dependency graph.
///
/// Two values with the same identity are the same node; adding the second
/// replaces the first.
///
/// # Example
///
/// ```
/// use decisionkit::traits::Identity;
///
/// struct Rule {
///     name: String,
/// }
///
/// impl Identity for Rule {
///     fn identity(&self) -> &str {
///         &self.name
///     }
/// }
///
/// let rule = Rule { name: "deny_all".into() };
/// assert_eq!(rule.identity(), "deny_all");
/// ```
pub trait Identity {
    /// Stable, unique name of this node.
    fn identity(&self) -> &str;
}

impl Identity for String {
    #[inline]
    fn identity(&self) -> &str {
        self
    }
}

impl Identity for str {
    #[inline]
    fn identity(&self) -> &str {
        self
    }
}

impl Identity for Cow<'_, str> {
    #[inline]
    fn identity(&self) -> &str {
        self
    }
}

impl<T: Identity + ?Sized> Identity for &T {
    #[inline]
    fn identity(&self) -> &str {
        (**self).identity()
    }
}

impl<T: Identity + ?Sized> Identity for Box<T> {
    #[inline]
    fn identity(&self) -> &str {
        (**self).identity()
    }
}

impl<T: Identity + ?Sized> Identity for Rc<T> {
    #[inline]
    fn identity(&self) -> &str {
        (**self).identity()
    }
}

impl<T: Identity + ?Sized> Identity for Arc<T> {
    #[inline]
    fn identity(&self) -> &str {
        (**self).identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_their_own_identity() {
        assert_eq!("a".identity(), "a");
        assert_eq!(String::from("b").identity(), "b");
        assert_eq!(Cow::Borrowed("c").identity(), "c");
    }

    #[test]
    fn smart_pointers_forward_identity() {
        let shared: Arc<String> = Arc::new("module".into());
        assert_eq!(shared.identity(), "module");
        assert_eq!(Box::new(String::from("boxed")).identity(), "boxed");
        assert_eq!((&&String::from("nested")).identity(), "nested");
    }
}
