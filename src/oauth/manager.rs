use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use reqwest::Client;

use super::exchange::{self, TokenResponse};
use crate::{
    config,
    error::{AuthError, Result},
    management::TokenStore,
    provider::Provider,
    redirect::{BrowserCapture, LocalServerCapture, ManualCapture, RedirectCapture},
    types::{
        AuthState, Backend, ClientCredentials, Expiry, Flow, Grant, Scopes, TokenRecord,
        TokenState, UrlPart,
    },
    utils, warning,
};

/// Tokens this close to their expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 240;

/// Construction inputs for [`OAuth2Manager`].
///
/// Unset credentials fall back to the token store and then to the
/// provider's environment variables. Without a flow from either source the
/// client credentials flow is used.
///
/// # Example
///
/// ```ignore
/// let options = ManagerOptions {
///     flow: Some(Flow::Pkce),
///     client_id: Some("my-client".to_string()),
///     redirect_uri: Some("http://localhost:8888/callback".to_string()),
///     user_identifier: Some("alice".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Requested flow. `None` adopts the stored flow, else client credentials.
    pub flow: Option<Flow>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Scopes,
    /// Known access token; skips the flow entirely.
    pub access_token: Option<String>,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<Expiry>,
    pub backend: Option<Backend>,
    /// Open the authorization URL in the default browser instead of printing it.
    pub browser: bool,
    /// Reload from and write to the token store.
    pub persist: bool,
    pub redirect_timeout: Duration,
    /// Distinguishes several accounts of one provider in the token store.
    /// A leading `~` skips the stored token and forces reauthorization.
    pub user_identifier: Option<String>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            flow: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scopes: Scopes::new(),
            access_token: None,
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
            backend: None,
            browser: false,
            persist: true,
            redirect_timeout: config::DEFAULT_REDIRECT_TIMEOUT,
            user_identifier: None,
        }
    }
}

/// Flow selection accepted by [`OAuth2Manager::set_flow`].
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub flow: Flow,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Scopes,
    pub backend: Option<Backend>,
    pub browser: bool,
    pub persist: bool,
}

/// Owns one client's credentials and access token for one provider.
pub struct OAuth2Manager {
    provider: Provider,
    flow: Flow,
    credentials: ClientCredentials,
    backend: Option<Backend>,
    browser: bool,
    persist: bool,
    redirect_port: Option<u16>,
    redirect_timeout: Duration,
    user_identifier: Option<String>,
    account_key: String,
    token: Option<TokenState>,
    http: Client,
    store: Arc<dyn TokenStore>,
    capture: Option<Arc<dyn RedirectCapture>>,
}

impl OAuth2Manager {
    /// Configures the manager and makes sure it holds a token.
    ///
    /// Runs [`configure`](Self::configure) and then the selected flow when
    /// neither the options nor the store supplied a token.
    ///
    /// # Arguments
    ///
    /// * `provider` - Endpoints and supported flows of the target API
    /// * `options` - Explicit credentials, token and backend settings
    /// * `store` - Token store consulted and updated when `persist` is set
    ///
    /// # Errors
    ///
    /// Any configuration error from [`configure`](Self::configure), and any
    /// authorization, transport or store error raised while running the flow.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Arc::new(MemoryTokenStore::new());
    /// let manager = OAuth2Manager::new(Provider::tidal_api(), ManagerOptions::default(), store).await?;
    /// assert_eq!(manager.state(), AuthState::Authenticated);
    /// ```
    pub async fn new(
        provider: Provider,
        options: ManagerOptions,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let mut manager = Self::configure(provider, options, store).await?;
        if manager.token.is_none() {
            manager.obtain_access_token(None).await?;
        }
        Ok(manager)
    }

    /// Resolves credentials and adopts a known token without touching the
    /// network.
    ///
    /// Credentials come from `options` first, then from the token store
    /// record of the account, then from the provider's environment
    /// variables. A stored record is adopted only when it matches any
    /// client id and flow given explicitly. The manager is left
    /// [`AuthState::Configured`] when no token was found.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Configuration`] when no client id can be found or the
    ///   resolved flow settings are invalid
    /// - [`AuthError::Io`] or [`AuthError::Serialization`] when the token
    ///   store cannot be read
    pub async fn configure(
        provider: Provider,
        options: ManagerOptions,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let ManagerOptions {
            mut flow,
            mut client_id,
            mut client_secret,
            mut redirect_uri,
            mut scopes,
            access_token,
            mut token_type,
            mut refresh_token,
            mut expiry,
            backend,
            browser,
            persist,
            redirect_timeout,
            user_identifier,
        } = options;

        let reauthorize = user_identifier.as_deref().is_some_and(|u| u.starts_with('~'));
        let user_identifier = user_identifier
            .map(|u| u.trim_start_matches('~').to_string())
            .filter(|u| !u.is_empty());
        let account_key = utils::account_key(&provider.identity, user_identifier.as_deref());

        let mut access_token = access_token.filter(|t| !t.is_empty());

        if access_token.is_none() && persist && !reauthorize {
            if let Some(record) = store.load(&account_key).await? {
                let same_client = client_id.as_deref().is_none_or(|id| id == record.client_id);
                let same_flow = flow.is_none_or(|f| f == record.flow);
                if !record.access_token.is_empty() && same_client && same_flow {
                    flow = Some(record.flow);
                    client_id = Some(record.client_id);
                    client_secret = record.client_secret;
                    redirect_uri = record.redirect_uri;
                    scopes = Scopes::from(record.scopes);
                    access_token = Some(record.access_token);
                    token_type = record.token_type;
                    refresh_token = record.refresh_token;
                    expiry = record.expiry.map(Expiry::At);
                }
            }
        }

        if client_id.is_none() {
            client_id = config::client_id(&provider);
            if client_secret.is_none() {
                client_secret = config::client_secret(&provider);
            }
        }

        let flow = flow.unwrap_or(Flow::ClientCredentials);
        let Some(client_id) = client_id.filter(|id| !id.is_empty()) else {
            return Err(AuthError::Configuration(format!(
                "A client ID must be provided. Pass it explicitly or set {}.",
                provider.client_id_var()
            )));
        };

        let mut manager = Self {
            flow,
            credentials: ClientCredentials::default(),
            backend: None,
            browser,
            persist,
            redirect_port: None,
            redirect_timeout,
            user_identifier,
            account_key,
            token: None,
            http: Client::new(),
            store,
            capture: None,
            provider,
        };

        manager.set_flow(FlowConfig {
            flow,
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            backend,
            browser,
            persist,
        })?;

        if let Some(access_token) = access_token {
            manager.set_access_token(access_token, token_type, refresh_token, expiry)?;
        }

        Ok(manager)
    }

    /// Replaces the HTTP client used for token requests.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Replaces the backend-derived redirect capture.
    pub fn with_redirect_capture(mut self, capture: Arc<dyn RedirectCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Validates and applies a flow with its credentials.
    ///
    /// The redirect port is derived from the redirect URI. A backend is
    /// disabled with a warning when the redirect host is not a loopback
    /// address, so the redirect is pasted by hand instead.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] when the provider does not
    /// support the flow or a credential the flow needs is missing. Nothing
    /// changes when validation fails. A different flow or client drops the
    /// held token.
    pub fn set_flow(&mut self, config: FlowConfig) -> Result<()> {
        let FlowConfig {
            flow,
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            mut backend,
            browser,
            persist,
        } = config;

        if !self.provider.supports(flow) {
            return Err(AuthError::Configuration(format!(
                "The {} API does not support the {} ('{}'). Valid values: {}.",
                self.provider.name,
                flow.name(),
                flow,
                utils::quote_list(self.provider.flows.iter().map(Flow::as_str))
            )));
        }
        if client_id.is_empty() {
            return Err(AuthError::Configuration(
                "A client ID must be provided via the `client_id` argument.".to_string(),
            ));
        }

        let client_secret = client_secret.filter(|s| !s.is_empty());
        if flow.requires_client_secret() && client_secret.is_none() {
            return Err(AuthError::Configuration(format!(
                "The {} requires a client secret to be provided via the `client_secret` argument.",
                flow.name()
            )));
        }

        let redirect_uri = redirect_uri.filter(|u| !u.is_empty());
        if flow.requires_redirect_uri() && redirect_uri.is_none() {
            return Err(AuthError::Configuration(format!(
                "The {} requires a redirect URI to be provided via the `redirect_uri` argument.",
                flow.name()
            )));
        }

        let redirect_port = match &redirect_uri {
            Some(uri) => utils::redirect_port(uri)?,
            None => None,
        };

        if let (Some(selected), Some(uri)) = (backend, &redirect_uri) {
            if !utils::is_loopback_host(uri) {
                warning!(
                    "Redirect handling via the {} backend is not available for '{}'. Falling back to manual entry.",
                    selected,
                    uri
                );
                backend = None;
            } else if selected == Backend::LocalServer && redirect_port.is_none() {
                return Err(AuthError::Configuration(format!(
                    "The {} backend cannot derive a port from the redirect URI '{}'.",
                    selected, uri
                )));
            }
        }

        if flow != self.flow || client_id != self.credentials.client_id {
            self.token = None;
        }

        self.flow = flow;
        self.credentials = ClientCredentials {
            client_id,
            client_secret,
            redirect_uri,
            scopes,
        };
        self.redirect_port = redirect_port;
        self.backend = backend;
        self.browser = browser;
        self.persist = persist;
        Ok(())
    }

    /// Adopts an access token without any network call.
    ///
    /// # Arguments
    ///
    /// * `access_token` - The token itself; must not be empty
    /// * `token_type` - Header prefix; empty means `Bearer`
    /// * `refresh_token` - Only allowed for flows that issue refresh tokens
    /// * `expiry` - Absolute time or seconds from now
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] for an empty token, a refresh
    /// token the flow cannot use, or an unparsable expiry.
    pub fn set_access_token(
        &mut self,
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<Expiry>,
    ) -> Result<()> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(AuthError::Configuration(
                "An access token must not be empty.".to_string(),
            ));
        }

        let refresh_token = refresh_token.filter(|t| !t.is_empty());
        if refresh_token.is_some() && !self.flow.allows_refresh_token() {
            return Err(AuthError::Configuration(format!(
                "The {} does not support refresh tokens, but one was provided via the `refresh_token` argument.",
                self.flow.name()
            )));
        }

        let expiry = expiry.map(Expiry::resolve).transpose()?;
        let token_type = token_type.into();

        self.token = Some(TokenState {
            access_token,
            token_type: if token_type.is_empty() {
                "Bearer".to_string()
            } else {
                token_type
            },
            refresh_token,
            expiry,
        });
        Ok(())
    }

    /// Runs `grant` (the active flow when `None`) and adopts the token.
    ///
    /// The new token is written to the token store under the account key
    /// when persistence is on.
    ///
    /// # Errors
    ///
    /// Propagates the error of the grant: configuration, authorization,
    /// redirect timeout, transport or an invalid token response. A failed
    /// grant leaves the held token untouched.
    pub async fn obtain_access_token(&mut self, grant: Option<Grant>) -> Result<()> {
        let grant = grant.unwrap_or_else(|| self.flow.into());
        let response = match grant {
            Grant::RefreshToken => self.refresh_grant().await?,
            Grant::ClientCredentials => self.client_credentials_grant().await?,
            Grant::Implicit => self.implicit_grant().await?,
            Grant::AuthorizationCode => self.authorization_code_grant(false).await?,
            Grant::Pkce => self.authorization_code_grant(true).await?,
        };

        self.apply_response(response)?;
        self.persist_token().await
    }

    /// Refreshes via the refresh token when one is held, otherwise reruns
    /// the active flow.
    pub async fn refresh_access_token(&mut self) -> Result<()> {
        let grant = if self.refresh_token().is_some() {
            Grant::RefreshToken
        } else {
            self.flow.into()
        };
        self.obtain_access_token(Some(grant)).await
    }

    /// Requests an authorization code and returns it once the redirect
    /// passes the `error` and `state` checks.
    pub async fn get_authorization_code(&self, code_challenge: Option<&str>) -> Result<String> {
        let redirect_uri = self.require_redirect_uri()?;
        let state = utils::generate_state();
        let scope = self.credentials.scopes.to_string();

        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("state", state.as_str()),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }
        if let Some(challenge) = code_challenge {
            params.push(("code_challenge", challenge));
            params.push(("code_challenge_method", "S256"));
        }

        let auth_url = utils::build_url(&self.provider.auth_url, &params)?;
        let response = self.handle_redirect(&auth_url, UrlPart::Query).await?;
        check_redirect(&response, &state)?;

        response.get("code").cloned().ok_or_else(|| {
            AuthError::Authorization("The redirect carried no authorization code.".to_string())
        })
    }

    /// Captures the authorization response through the configured backend.
    pub async fn handle_redirect(&self, auth_url: &str, part: UrlPart) -> Result<HashMap<String, String>> {
        let capture = self.redirect_capture()?;
        capture.capture(auth_url, part).await
    }

    /// Fails with [`AuthError::Permission`] unless `scope` is granted.
    pub fn require_scope(&self, endpoint: &str, scope: &str) -> Result<()> {
        if self.credentials.scopes.contains(scope) {
            return Ok(());
        }
        Err(AuthError::Permission {
            endpoint: endpoint.to_string(),
            scope: scope.to_string(),
        })
    }

    pub fn require_scopes<'a>(
        &self,
        endpoint: &str,
        scopes: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        scopes
            .into_iter()
            .try_for_each(|scope| self.require_scope(endpoint, scope))
    }

    /// `"{token_type} {access_token}"` for outbound requests.
    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(TokenState::authorization_header)
    }

    /// Authorization header, refreshing or authenticating first if needed.
    ///
    /// # Returns
    ///
    /// `"{token_type} {access_token}"` of a token that is not about to expire.
    ///
    /// # Errors
    ///
    /// Whatever [`obtain_access_token`](Self::obtain_access_token) or
    /// [`refresh_access_token`](Self::refresh_access_token) returns.
    pub async fn valid_authorization_header(&mut self) -> Result<String> {
        match self.state() {
            AuthState::Configured => self.obtain_access_token(None).await?,
            AuthState::Expired => self.refresh_access_token().await?,
            AuthState::Authenticated => {}
        }

        self.authorization_header().ok_or_else(|| {
            AuthError::InvalidResponse("no access token is held after authorization".to_string())
        })
    }

    /// Lifecycle state derived from the held token.
    ///
    /// # Returns
    ///
    /// - [`AuthState::Configured`] when no token is held
    /// - [`AuthState::Expired`] when [`is_expired`](Self::is_expired) holds
    /// - [`AuthState::Authenticated`] otherwise
    pub fn state(&self) -> AuthState {
        match &self.token {
            None => AuthState::Configured,
            Some(_) if self.is_expired() => AuthState::Expired,
            Some(_) => AuthState::Authenticated,
        }
    }

    /// Whether the held token expires within the next four minutes.
    ///
    /// Tokens without a known expiry never count as expired, and neither
    /// does the absence of a token.
    pub fn is_expired(&self) -> bool {
        self.token
            .as_ref()
            .and_then(|t| t.expiry)
            .is_some_and(|expiry| Utc::now() + TimeDelta::seconds(EXPIRY_MARGIN_SECS) >= expiry)
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub fn scopes(&self) -> &Scopes {
        &self.credentials.scopes
    }

    pub fn token(&self) -> Option<&TokenState> {
        self.token.as_ref()
    }

    pub fn backend(&self) -> Option<Backend> {
        self.backend
    }

    pub fn redirect_port(&self) -> Option<u16> {
        self.redirect_port
    }

    /// Account name without the reauthorization marker.
    pub fn user_identifier(&self) -> Option<&str> {
        self.user_identifier.as_deref()
    }

    /// Token-store key of this manager's account.
    pub fn account_key(&self) -> &str {
        &self.account_key
    }

    /// Store record for the current credentials and token.
    pub fn to_record(&self) -> Option<TokenRecord> {
        let token = self.token.as_ref()?;
        Some(TokenRecord {
            flow: self.flow,
            client_id: self.credentials.client_id.clone(),
            client_secret: self.credentials.client_secret.clone(),
            redirect_uri: self.credentials.redirect_uri.clone(),
            scopes: self.credentials.scopes.to_string(),
            access_token: token.access_token.clone(),
            token_type: token.token_type.clone(),
            refresh_token: token.refresh_token.clone(),
            expiry: token.expiry,
            added: Some(Utc::now()),
        })
    }

    /// Deletes this manager's account record from the token store.
    pub async fn forget(&self) -> Result<bool> {
        self.store.remove(&self.account_key).await
    }

    async fn persist_token(&self) -> Result<()> {
        if !self.persist {
            return Ok(());
        }
        match self.to_record() {
            Some(record) => self.store.save(&self.account_key, record).await,
            None => Ok(()),
        }
    }

    fn apply_response(&mut self, response: TokenResponse) -> Result<()> {
        let expiry = response.expiry_from(Utc::now())?;
        let token_type = utils::capitalize(response.token_type.as_deref().unwrap_or("Bearer"));

        let refresh_token = if self.flow.allows_refresh_token() {
            response.refresh_token.or_else(|| self.refresh_token())
        } else {
            if response.refresh_token.is_some() {
                warning!(
                    "Discarding the refresh token returned for the {}.",
                    self.flow.name()
                );
            }
            None
        };

        self.set_access_token(
            response.access_token,
            token_type,
            refresh_token,
            expiry.map(Expiry::At),
        )?;
        if let Some(scopes) = response.scopes {
            self.credentials.scopes = scopes;
        }
        Ok(())
    }

    fn refresh_token(&self) -> Option<String> {
        self.token.as_ref().and_then(|t| t.refresh_token.clone())
    }

    fn require_redirect_uri(&self) -> Result<&str> {
        self.credentials.redirect_uri.as_deref().ok_or_else(|| {
            AuthError::Configuration(format!(
                "The {} requires a redirect URI to be provided via the `redirect_uri` argument.",
                self.flow.name()
            ))
        })
    }

    fn require_client_secret(&self, grant: &str) -> Result<&str> {
        self.credentials.client_secret.as_deref().ok_or_else(|| {
            AuthError::Configuration(format!(
                "The {grant} grant requires a client secret to be provided via the `client_secret` argument."
            ))
        })
    }

    fn redirect_capture(&self) -> Result<Arc<dyn RedirectCapture>> {
        if let Some(capture) = &self.capture {
            return Ok(Arc::clone(capture));
        }

        let redirect_uri = self.require_redirect_uri()?;
        let provider = self.provider.name.as_str();
        let capture: Arc<dyn RedirectCapture> = match self.backend {
            Some(Backend::LocalServer) => {
                let port = self.redirect_port.ok_or_else(|| {
                    AuthError::Configuration(format!(
                        "The {} backend cannot derive a port from the redirect URI '{}'.",
                        Backend::LocalServer,
                        redirect_uri
                    ))
                })?;
                Arc::new(LocalServerCapture::new(
                    provider,
                    port,
                    utils::is_https(redirect_uri),
                    self.browser,
                    self.redirect_timeout,
                ))
            }
            Some(Backend::BrowserAutomation) => Arc::new(BrowserCapture::webdriver(
                redirect_uri,
                config::webdriver_url(),
                self.redirect_timeout,
            )),
            None => Arc::new(ManualCapture::stdin(provider, redirect_uri, self.browser)),
        };
        Ok(capture)
    }

    async fn refresh_grant(&self) -> Result<TokenResponse> {
        let refresh_token = self.refresh_token().ok_or_else(|| {
            AuthError::Configuration(format!(
                "No refresh token is held. Reauthorize via the {}.",
                self.flow.name()
            ))
        })?;

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token),
        ];
        let basic = match &self.credentials.client_secret {
            Some(secret) => Some(utils::basic_credentials(&self.credentials.client_id, secret)),
            None => {
                form.push(("client_id", self.credentials.client_id.clone()));
                None
            }
        };

        exchange::request_token(&self.http, &self.provider.token_url, &form, basic.as_deref()).await
    }

    async fn client_credentials_grant(&self) -> Result<TokenResponse> {
        let client_secret = self.require_client_secret("client_credentials")?;

        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.credentials.client_id.clone()),
            ("client_secret", client_secret.to_string()),
        ];
        if !self.credentials.scopes.is_empty() {
            form.push(("scope", self.credentials.scopes.to_string()));
        }

        exchange::request_token(&self.http, &self.provider.token_url, &form, None).await
    }

    async fn implicit_grant(&self) -> Result<TokenResponse> {
        let redirect_uri = self.require_redirect_uri()?;
        let state = utils::generate_state();
        let scope = self.credentials.scopes.to_string();

        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "token"),
            ("state", state.as_str()),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }

        let auth_url = utils::build_url(&self.provider.auth_url, &params)?;
        let response = self.handle_redirect(&auth_url, UrlPart::Fragment).await?;
        check_redirect(&response, &state)?;

        TokenResponse::from_params(&response)
    }

    async fn authorization_code_grant(&self, pkce: bool) -> Result<TokenResponse> {
        // confidential clients must fail before the user is sent anywhere
        let basic = match (&self.credentials.client_secret, pkce) {
            (Some(secret), _) => Some(utils::basic_credentials(&self.credentials.client_id, secret)),
            (None, true) => None,
            (None, false) => {
                self.require_client_secret("authorization_code")?;
                None
            }
        };
        let redirect_uri = self.require_redirect_uri()?.to_string();

        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("redirect_uri", redirect_uri),
        ];
        let code = if pkce {
            let verifier = utils::generate_code_verifier();
            let challenge = utils::generate_code_challenge(&verifier);
            let code = self.get_authorization_code(Some(&challenge)).await?;
            form.push(("client_id", self.credentials.client_id.clone()));
            form.push(("code_verifier", verifier));
            code
        } else {
            self.get_authorization_code(None).await?
        };
        form.push(("code", code));

        exchange::request_token(&self.http, &self.provider.token_url, &form, basic.as_deref()).await
    }
}

/// Removes the stored token of one account of `provider`.
///
/// # Arguments
///
/// * `store` - Token store holding the account
/// * `provider` - Provider the account belongs to
/// * `user_identifier` - Account name; `None` removes the default account.
///   A leading `~` is ignored.
///
/// # Returns
///
/// `true` if a record was removed.
///
/// # Errors
///
/// Returns [`AuthError::Io`] or [`AuthError::Serialization`] when the
/// store cannot be updated.
pub async fn remove_account(
    store: &dyn TokenStore,
    provider: &Provider,
    user_identifier: Option<&str>,
) -> Result<bool> {
    let user = user_identifier.map(|u| u.trim_start_matches('~'));
    store.remove(&utils::account_key(&provider.identity, user)).await
}

/// Rejects redirects carrying an `error` or a `state` other than `expected`.
fn check_redirect(response: &HashMap<String, String>, expected: &str) -> Result<()> {
    if let Some(error) = response.get("error") {
        let detail = response
            .get("error_description")
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        return Err(AuthError::Authorization(format!("Error: {error}{detail}")));
    }

    if response.get("state").map(String::as_str) != Some(expected) {
        return Err(AuthError::Authorization(
            "State mismatch between the authorization request and the redirect.".to_string(),
        ));
    }
    Ok(())
}
