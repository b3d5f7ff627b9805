//! # Redirect capture
//!
//! Observes the authorization response a provider delivers to the client's
//! redirect URI and hands its parameters back to the manager.
//!
//! ## Backends
//!
//! - [`LocalServerCapture`] - a one-shot HTTP listener on the redirect port.
//!   Fragment responses (implicit grant) are recovered through a small relay
//!   page whose script re-sends the fragment as a query string.
//! - [`BrowserCapture`] - drives a browser over W3C WebDriver and polls its
//!   location until it reaches the redirect URI.
//! - [`ManualCapture`] - prints the authorization URL and reads the final
//!   redirect URL from the terminal.
//!
//! Every backend returns the decoded key/value pairs of the requested
//! [`UrlPart`].

mod browser;
mod manual;
mod server;

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

pub use browser::{BrowserCapture, PageDriver, WebDriverSession};
pub use manual::ManualCapture;
pub use server::{LocalServerCapture, self_signed_tls_config, serve_once, serve_once_tls};

use crate::{error::Result, info, types::UrlPart, warning};

/// Source of the authorization response for one authorization request.
#[async_trait]
pub trait RedirectCapture: Send + Sync {
    /// Sends the user to `auth_url` and returns the parameters found in
    /// `part` of the URL the provider redirects to.
    async fn capture(&self, auth_url: &str, part: UrlPart) -> Result<HashMap<String, String>>;
}

/// Opens `auth_url` in the default browser, or prints it for manual opening.
pub fn present_auth_url(provider: &str, auth_url: &str, open_browser: bool) {
    if open_browser {
        if webbrowser::open(auth_url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                auth_url
            )
        }
    } else {
        info!(
            "To grant access to {} data and features, open the following link in your web browser:\n\n{}\n",
            provider, auth_url
        );
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}
