//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these; the HTTP layer maps
//! them onto status codes and the `{error, details}` envelope.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Bad or missing input. Rejected before any CMS call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// No session where one is required.
    #[error("authentication required")]
    Unauthenticated,

    /// Caller is authenticated but not allowed (e.g. not the owner).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Request, result, or channel slug absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// CMS unreachable, non-2xx, or malformed response.
    #[error("CMS error: {0}")]
    Cms(String),

    /// Auth provider verification failed.
    #[error("session verification error: {0}")]
    Session(String),

    /// Network/parse failure talking to the gateway (client side).
    #[error("transport error: {0}")]
    Transport(String),
}
