//! Error taxonomy for the authorization manager.

use std::time::Duration;

use thiserror::Error;

use crate::types::Backend;

/// Errors raised while configuring a flow, capturing a redirect, exchanging
/// tokens or persisting them.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid or missing input. Raised synchronously and never retried.
    #[error("{0}")]
    Configuration(String),

    /// The provider rejected the request or the `state` check failed.
    #[error("Authorization failed. {0}")]
    Authorization(String),

    /// The token endpoint answered with a non-2xx status.
    #[error("Token endpoint returned HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    /// The held scopes lack one required by an endpoint.
    #[error("{endpoint}() requires the '{scope}' scope.")]
    Permission { endpoint: String, scope: String },

    /// The selected redirect backend cannot run in this environment.
    #[error("The {backend} backend is unavailable: {reason}")]
    BackendUnavailable { backend: Backend, reason: String },

    /// Nobody completed the authorization redirect in time.
    #[error("No authorization redirect was received within {} seconds.", .0.as_secs())]
    RedirectTimeout(Duration),

    /// The token endpoint answered 2xx with a body we cannot use.
    #[error("Malformed token response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_yaml::Error),
}

impl AuthError {
    /// Whether repeating the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::RedirectTimeout(_) => true,
            AuthError::Http(e) => e.is_timeout() || e.is_connect(),
            AuthError::Transport { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, AuthError>;
