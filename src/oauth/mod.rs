//! OAuth 2.0 token lifecycle.
//!
//! [`OAuth2Manager`] owns the client credentials and the access token for a
//! single [`Provider`](crate::provider::Provider). It resolves credentials
//! from explicit options, the token store and the environment, runs the
//! selected authorization flow, and refreshes the token when it expires.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sonoauth::{
//!     management::YamlTokenStore,
//!     oauth::{ManagerOptions, OAuth2Manager},
//!     provider::Provider,
//!     types::Flow,
//! };
//!
//! # async fn run() -> sonoauth::Result<()> {
//! let store = Arc::new(YamlTokenStore::open_default().await?);
//! let options = ManagerOptions {
//!     flow: Some(Flow::ClientCredentials),
//!     ..Default::default()
//! };
//! let mut manager = OAuth2Manager::new(Provider::spotify_web_api(), options, store).await?;
//! let header = manager.valid_authorization_header().await?;
//! # Ok(())
//! # }
//! ```

mod exchange;
mod manager;

pub use exchange::{TokenResponse, describe_error, request_token};
pub use manager::{FlowConfig, ManagerOptions, OAuth2Manager, remove_account};
