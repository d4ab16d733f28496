//! Access gate: decide whether a caller sees the full result or a preview.
//!
//! Pure decision, no side effects. Read access is "authenticated OR
//! has-the-link". Ownership is deliberately irrelevant here; owner-only
//! checks apply to delete and share-token creation in the gateway service.

use serde::Serialize;

use crate::domain::Requester;

/// Visibility level for a stored result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Full,
    Preview,
}

/// `Full` iff the caller is authenticated, or the presented share token is
/// non-empty and matches a non-empty stored token. Everything else is `Preview`.
pub fn decide_access(
    caller: &Requester,
    stored_token: Option<&str>,
    presented_token: Option<&str>,
) -> Access {
    if caller.is_authenticated() {
        return Access::Full;
    }
    match (stored_token, presented_token) {
        (Some(stored), Some(presented))
            if !stored.is_empty() && !presented.is_empty() && stored == presented =>
        {
            Access::Full
        }
        _ => Access::Preview,
    }
}
