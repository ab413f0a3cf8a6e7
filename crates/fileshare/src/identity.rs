//! The authenticated-principal seam.
//!
//! Authentication happens outside this crate. A transport hands its request
//! to an [`IdentityProvider`] and gets back the [`Principal`] to act as.

use fileshare_core::Principal;

/// Resolves the principal behind a transport request of type `R`.
///
/// Requests with no valid credentials resolve to [`Principal::Anonymous`].
pub trait IdentityProvider<R: ?Sized>: Send + Sync {
    fn current_principal(&self, request: &R) -> Principal;
}

impl<R: ?Sized, F> IdentityProvider<R> for F
where
    F: Fn(&R) -> Principal + Send + Sync,
{
    fn current_principal(&self, request: &R) -> Principal {
        self(request)
    }
}
