//! Authority client construction errors.

use thiserror::Error;

/// Result type for authority client setup.
pub type AuthorityResult<T> = Result<T, AuthorityError>;

/// Errors raised while building an authority client.
///
/// Requests themselves never fail with this type; they return a
/// [`Reply`](crate::Reply) or [`Revalidation`](crate::Revalidation).
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
