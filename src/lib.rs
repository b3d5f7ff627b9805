//! OAuth 2.0 token management for music-service API clients.
//!
//! The crate obtains, refreshes, stores and reloads access tokens for the
//! Spotify Web API and the TIDAL API. It supports the authorization code
//! flow (with and without PKCE), the client credentials flow and the
//! implicit grant flow. Authorization redirects are captured by a one-shot
//! local HTTP server, a WebDriver-controlled browser, or by asking the user
//! to paste the redirect URL.
//!
//! # Modules
//!
//! - `cli` - Command implementations behind the `sonoauth` binary
//! - `config` - Environment and data directory configuration
//! - `error` - Error taxonomy shared by every operation
//! - `management` - Persistent token stores
//! - `oauth` - The token lifecycle manager and token endpoint client
//! - `provider` - Endpoint and flow descriptors per vendor
//! - `redirect` - Authorization redirect capture backends
//! - `types` - Flows, scopes, tokens and stored records
//! - `utils` - PKCE, URL and timestamp helpers

pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod oauth;
pub mod provider;
pub mod redirect;
pub mod types;
pub mod utils;

pub use error::{AuthError, Result};

/// Prints an informational line prefixed with a blue bullet.
///
/// ```ignore
/// info!("Opening {} in your browser...", url);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line prefixed with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line prefixed with a red exclamation mark and exits with code 1.
///
/// Only the binary uses this; library code returns [`AuthError`] instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a line prefixed with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
