use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::{error::AuthError, utils};

/// OAuth 2.0 authorization flow a manager runs to obtain its token.
///
/// Parsed from and displayed as the snake_case identifiers `auth_code`,
/// `pkce`, `client_credentials` and `implicit`, which are also the values
/// written to the token store.
///
/// # Example
///
/// ```
/// let flow: Flow = "pkce".parse()?;
/// assert!(flow.requires_redirect_uri());
/// assert!(!flow.requires_client_secret());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    AuthCode,
    Pkce,
    ClientCredentials,
    Implicit,
}

impl Flow {
    pub const ALL: [Flow; 4] = [
        Flow::AuthCode,
        Flow::Pkce,
        Flow::ClientCredentials,
        Flow::Implicit,
    ];

    /// Identifier used in configuration, the CLI and the token store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::AuthCode => "auth_code",
            Flow::Pkce => "pkce",
            Flow::ClientCredentials => "client_credentials",
            Flow::Implicit => "implicit",
        }
    }

    /// Human-readable flow name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Flow::AuthCode => "Authorization Code Flow",
            Flow::Pkce => "Authorization Code Flow with Proof Key for Code Exchange (PKCE)",
            Flow::ClientCredentials => "Client Credentials Flow",
            Flow::Implicit => "Implicit Grant Flow",
        }
    }

    /// Confidential flows that authenticate the client with its secret.
    pub fn requires_client_secret(&self) -> bool {
        matches!(self, Flow::AuthCode | Flow::ClientCredentials)
    }

    /// Flows that send the user through an authorization redirect.
    pub fn requires_redirect_uri(&self) -> bool {
        matches!(self, Flow::AuthCode | Flow::Pkce | Flow::Implicit)
    }

    /// Whether the provider may issue a refresh token for this flow.
    ///
    /// Client credentials and implicit grants never receive one. A refresh
    /// token returned for them anyway is discarded.
    pub fn allows_refresh_token(&self) -> bool {
        !matches!(self, Flow::ClientCredentials | Flow::Implicit)
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flow {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Flow::ALL
            .into_iter()
            .find(|flow| flow.as_str() == s)
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "Invalid authorization flow '{s}'. Valid values: {}.",
                    utils::quote_list(Flow::ALL.iter().map(Flow::as_str))
                ))
            })
    }
}

/// Token-endpoint grant executed by the manager.
///
/// Every flow maps onto one grant; `RefreshToken` is only reachable through
/// a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    RefreshToken,
    ClientCredentials,
    Implicit,
    AuthorizationCode,
    Pkce,
}

impl From<Flow> for Grant {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::AuthCode => Grant::AuthorizationCode,
            Flow::Pkce => Grant::Pkce,
            Flow::ClientCredentials => Grant::ClientCredentials,
            Flow::Implicit => Grant::Implicit,
        }
    }
}

/// Mechanism that observes the authorization redirect.
///
/// No backend at all means the user pastes the redirect URL by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    LocalServer,
    BrowserAutomation,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::LocalServer, Backend::BrowserAutomation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::LocalServer => "local-server",
            Backend::BrowserAutomation => "browser-automation",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|backend| backend.as_str() == s)
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "Invalid backend '{s}'. Valid values: {}.",
                    utils::quote_list(Backend::ALL.iter().map(Backend::as_str))
                ))
            })
    }
}

/// Component of the redirect URL that carries the authorization response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPart {
    Query,
    Fragment,
}

/// Set of granted or requested scopes.
///
/// Scopes are kept sorted and deduplicated, and empty entries are dropped.
/// The [`Display`](fmt::Display) form joins them with single spaces, which
/// is the `scope` parameter format of the token and authorization endpoints.
///
/// # Example
///
/// ```
/// let scopes = Scopes::from("user-read-email  playlist-read-private user-read-email");
/// assert_eq!(scopes.len(), 2);
/// assert_eq!(scopes.to_string(), "playlist-read-private user-read-email");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes(BTreeSet<String>);

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact, case-sensitive membership test.
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(" ");
        f.write_str(&joined)
    }
}

impl From<&str> for Scopes {
    fn from(value: &str) -> Self {
        value.split_whitespace().collect()
    }
}

impl From<String> for Scopes {
    fn from(value: String) -> Self {
        Scopes::from(value.as_str())
    }
}

impl From<Vec<String>> for Scopes {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Vec<&str>> for Scopes {
    fn from(value: Vec<&str>) -> Self {
        value.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Scopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Scopes(
            iter.into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        )
    }
}

/// Identity of the OAuth 2.0 client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Scopes,
}

/// Expiry accepted by `set_access_token`, either already parsed or in the
/// `YYYY-MM-DDTHH:MM:SSZ` text form.
#[derive(Debug, Clone, PartialEq)]
pub enum Expiry {
    Text(String),
    At(DateTime<Utc>),
}

impl Expiry {
    /// Converts to an absolute timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] when the text form does not
    /// match `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn resolve(self) -> Result<DateTime<Utc>, AuthError> {
        match self {
            Expiry::Text(text) => utils::parse_timestamp(&text),
            Expiry::At(at) => Ok(at),
        }
    }
}

impl From<&str> for Expiry {
    fn from(value: &str) -> Self {
        Expiry::Text(value.to_string())
    }
}

impl From<String> for Expiry {
    fn from(value: String) -> Self {
        Expiry::Text(value)
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(value: DateTime<Utc>) -> Self {
        Expiry::At(value)
    }
}

/// Access token held by a manager.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenState {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Value for the `Authorization` header of outbound requests.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Lifecycle position of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Credentials are set but no token is held.
    Configured,
    Authenticated,
    /// The token is held but expires within the refresh margin.
    Expired,
}

/// Persisted credentials and token for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub flow: Flow,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scopes: String,
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        with = "utils::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "utils::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub added: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scopes: Scopes::from(self.scopes.as_str()),
        }
    }

    pub fn token(&self) -> TokenState {
        TokenState {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
            refresh_token: self.refresh_token.clone(),
            expiry: self.expiry,
        }
    }
}

#[derive(Tabled)]
pub struct StoredTokenRow {
    pub account: String,
    pub flow: String,
    pub client_id: String,
    pub scopes: String,
    pub expiry: String,
}
