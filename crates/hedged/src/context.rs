// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Context`] carries cancellation and ambient values into every attempt.

use std::sync::Arc;

use http::Extensions;
use tokio_util::sync::CancellationToken;

/// A read-only view of a cancellation scope plus a set of typed ambient values.
///
/// Every attempt launched by a [`Hedger`](crate::Hedger) receives a `Context`
/// derived from the caller's context. Values attached to the caller's context
/// are visible in the derived one, and cancelling the caller's context cancels
/// every attempt.
///
/// A `Context` cannot cancel itself. Cancellation is requested through the
/// [`CancellationToken`] the context was created from, which stays with whoever
/// created it.
///
/// # Examples
///
/// ```
/// use hedged::Context;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct RequestId(u64);
///
/// let token = CancellationToken::new();
/// let context = Context::from_token(token.clone()).with_value(RequestId(7));
///
/// assert_eq!(context.value::<RequestId>(), Some(&RequestId(7)));
/// assert!(!context.is_cancelled());
///
/// token.cancel();
/// assert!(context.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    values: Arc<Extensions>,
}

impl Context {
    /// Creates a context that is never cancelled and carries no values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context observing the given token.
    ///
    /// The caller keeps the token (or a clone of it) and cancels it to cancel
    /// the context.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            values: Arc::default(),
        }
    }

    /// Returns a copy of this context that also carries `value`.
    ///
    /// A value of the same type attached earlier is replaced in the returned
    /// context; the original context is left untouched.
    #[must_use]
    pub fn with_value<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.values).insert(value);
        self
    }

    /// Returns the ambient value of type `T`, if one was attached.
    #[must_use]
    pub fn value<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.values.get::<T>()
    }

    /// Derives a child context together with the token that revokes it.
    ///
    /// The child observes the same values as `self` and is cancelled when
    /// `self` is cancelled. Cancelling the returned token cancels the child
    /// only.
    #[must_use]
    pub fn with_cancellation(&self) -> (Self, CancellationToken) {
        let token = self.token.child_token();
        let child = Self {
            token: token.clone(),
            values: Arc::clone(&self.values),
        };

        (child, token)
    }

    /// Returns a fresh token that is cancelled together with this context.
    ///
    /// Useful for handing cancellation to APIs that take a
    /// [`CancellationToken`]. Cancelling the returned token does not affect
    /// this context.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Returns `true` once the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the context has been cancelled.
    ///
    /// Completes immediately if the context is already cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Tenant(&'static str);

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Attempts(u32);

    #[test]
    fn new_is_not_cancelled_and_empty() {
        let context = Context::new();

        assert!(!context.is_cancelled());
        assert!(context.value::<Tenant>().is_none());
    }

    #[test]
    fn with_value_keeps_original_untouched() {
        let original = Context::new().with_value(Tenant("a"));
        let updated = original.clone().with_value(Tenant("b")).with_value(Attempts(3));

        assert_eq!(original.value::<Tenant>(), Some(&Tenant("a")));
        assert!(original.value::<Attempts>().is_none());
        assert_eq!(updated.value::<Tenant>(), Some(&Tenant("b")));
        assert_eq!(updated.value::<Attempts>(), Some(&Attempts(3)));
    }

    #[test]
    fn child_sees_parent_values() {
        let parent = Context::new().with_value(Tenant("contoso"));
        let (child, _revoke) = parent.with_cancellation();

        assert_eq!(child.value::<Tenant>(), Some(&Tenant("contoso")));
    }

    #[test]
    fn parent_cancellation_reaches_child() {
        let token = CancellationToken::new();
        let parent = Context::from_token(token.clone());
        let (child, _revoke) = parent.with_cancellation();

        token.cancel();

        assert!(parent.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn child_revocation_leaves_parent_alone() {
        let parent = Context::new();
        let (child, revoke) = parent.with_cancellation();

        revoke.cancel();
        revoke.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn child_token_follows_context() {
        let token = CancellationToken::new();
        let context = Context::from_token(token.clone());
        let child = context.child_token();

        child.cancel();
        assert!(!context.is_cancelled());

        let child = context.child_token();
        token.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_completes_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        Context::from_token(token).cancelled().await;
    }
}
