//! Configuration management for sonoauth.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the platform-specific local data directory:
//! - Linux: `~/.local/share/sonoauth/.env`
//! - macOS: `~/Library/Application Support/sonoauth/.env`
//! - Windows: `%LOCALAPPDATA%/sonoauth/.env`
//!
//! Variables already present in the environment take precedence over the file.

use std::{env, path::PathBuf, time::Duration};

use crate::provider::Provider;

/// Default wait for an authorization redirect.
pub const DEFAULT_REDIRECT_TIMEOUT: Duration = Duration::from_secs(300);

/// Loads environment variables from the `.env` file in the data directory.
///
/// Creates the directory when missing. A missing `.env` file is not an
/// error; a malformed one is.
///
/// # Returns
///
/// Returns a `Result` containing:
/// - `Ok(())` - The file was loaded or does not exist
/// - `Err(String)` - The directory cannot be created or the file cannot be parsed
///
/// # Example
///
/// ```
/// if let Err(e) = config::load_env().await {
///     error!("Cannot load environment. Err: {}", e);
/// }
/// ```
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Directory holding `.env`, `.env.example` and the default token store.
///
/// Falls back to the working directory when the platform reports no local
/// data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sonoauth");
    path
}

/// Location of the YAML token store.
///
/// `SONOAUTH_TOKEN_STORE` overrides the default `<data dir>/tokens.yaml`.
pub fn token_store_path() -> PathBuf {
    match env::var("SONOAUTH_TOKEN_STORE") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => data_dir().join("tokens.yaml"),
    }
}

/// Time to wait for the authorization redirect.
///
/// Reads `SONOAUTH_REDIRECT_TIMEOUT` as whole seconds. Missing, zero and
/// unparsable values yield [`DEFAULT_REDIRECT_TIMEOUT`].
///
/// # Example
///
/// ```
/// // SONOAUTH_REDIRECT_TIMEOUT=60
/// assert_eq!(config::redirect_timeout(), Duration::from_secs(60));
/// ```
pub fn redirect_timeout() -> Duration {
    env::var("SONOAUTH_REDIRECT_TIMEOUT")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REDIRECT_TIMEOUT)
}

/// W3C WebDriver endpoint used by the browser-automation backend.
pub fn webdriver_url() -> Option<String> {
    non_empty_var("SONOAUTH_WEBDRIVER_URL")
}

/// Client id from the provider's environment variable.
///
/// # Arguments
///
/// * `provider` - Provider whose `{PREFIX}_CLIENT_ID` is read, for example
///   `SPOTIFY_CLIENT_ID`
///
/// # Returns
///
/// `None` when the variable is unset or empty.
pub fn client_id(provider: &Provider) -> Option<String> {
    non_empty_var(&provider.client_id_var())
}

/// `{PREFIX}_CLIENT_SECRET` for a provider.
pub fn client_secret(provider: &Provider) -> Option<String> {
    non_empty_var(&provider.client_secret_var())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
