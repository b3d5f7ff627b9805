use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::RedirectCapture;
use crate::{
    error::{AuthError, Result},
    types::{Backend, UrlPart},
    utils,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Minimal browser control needed to follow an authorization redirect.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

/// Browser-automation backend.
///
/// Uses an injected [`PageDriver`] when one is given, otherwise opens a
/// [`WebDriverSession`] against the configured WebDriver endpoint. Without
/// either, the backend exists but every capture fails with
/// [`AuthError::BackendUnavailable`].
pub struct BrowserCapture {
    redirect_uri: String,
    webdriver_url: Option<String>,
    driver: Option<Arc<dyn PageDriver>>,
    poll_interval: Duration,
    timeout: Duration,
}

impl BrowserCapture {
    pub fn webdriver(
        redirect_uri: impl Into<String>,
        webdriver_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            webdriver_url,
            driver: None,
            poll_interval: POLL_INTERVAL,
            timeout,
        }
    }

    pub fn with_driver(
        redirect_uri: impl Into<String>,
        driver: Arc<dyn PageDriver>,
        timeout: Duration,
    ) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            webdriver_url: None,
            driver: Some(driver),
            poll_interval: POLL_INTERVAL,
            timeout,
        }
    }

    async fn driver(&self) -> Result<Arc<dyn PageDriver>> {
        if let Some(driver) = &self.driver {
            return Ok(Arc::clone(driver));
        }

        match &self.webdriver_url {
            Some(endpoint) => Ok(Arc::new(WebDriverSession::start(endpoint).await?)),
            None => Err(AuthError::BackendUnavailable {
                backend: Backend::BrowserAutomation,
                reason: "no WebDriver endpoint is configured; set SONOAUTH_WEBDRIVER_URL \
                         to a running WebDriver server such as geckodriver"
                    .to_string(),
            }),
        }
    }

    async fn follow(
        &self,
        driver: &dyn PageDriver,
        auth_url: &str,
        part: UrlPart,
    ) -> Result<HashMap<String, String>> {
        driver.goto(auth_url).await?;
        loop {
            let location = driver.current_url().await?;
            if location.starts_with(&self.redirect_uri) {
                return utils::parse_url_part(&location, part);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl RedirectCapture for BrowserCapture {
    async fn capture(&self, auth_url: &str, part: UrlPart) -> Result<HashMap<String, String>> {
        let driver = self.driver().await?;

        let outcome = tokio::time::timeout(self.timeout, self.follow(driver.as_ref(), auth_url, part)).await;
        let closed = driver.close().await;

        let params = match outcome {
            Ok(params) => params?,
            Err(_) => return Err(AuthError::RedirectTimeout(self.timeout)),
        };
        closed?;
        Ok(params)
    }
}

/// Browser session on a W3C WebDriver server.
pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    session_id: String,
}

impl WebDriverSession {
    /// Opens a new visible browser session.
    pub async fn start(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let client = Client::new();

        let unavailable = |reason: String| AuthError::BackendUnavailable {
            backend: Backend::BrowserAutomation,
            reason,
        };

        let res = client
            .post(format!("{endpoint}/session"))
            .json(&json!({ "capabilities": { "alwaysMatch": {} } }))
            .send()
            .await
            .map_err(|e| unavailable(format!("cannot reach WebDriver at {endpoint}: {e}")))?;

        if !res.status().is_success() {
            return Err(unavailable(format!(
                "WebDriver at {endpoint} refused to create a session (HTTP {})",
                res.status().as_u16()
            )));
        }

        let body: Value = res.json().await?;
        let session_id = body["value"]["sessionId"]
            .as_str()
            .or_else(|| body["sessionId"].as_str())
            .ok_or_else(|| unavailable("WebDriver response carried no session id".to_string()))?
            .to_string();

        Ok(Self {
            client,
            endpoint,
            session_id,
        })
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.endpoint, self.session_id, path)
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .post(self.session_url("/url"))
            .json(&json!({ "url": url }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let body: Value = self
            .client
            .get(self.session_url("/url"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body["value"].as_str().unwrap_or_default().to_string())
    }

    async fn close(&self) -> Result<()> {
        self.client
            .delete(self.session_url(""))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
