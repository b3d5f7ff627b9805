use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{Extension, Router, extract::RawQuery, response::Html};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use rcgen::CertifiedKey;
use tokio::{
    net::TcpListener,
    sync::{Mutex, oneshot},
    task::JoinHandle,
};

use super::{RedirectCapture, present_auth_url, spinner};
use crate::{
    error::{AuthError, Result},
    types::{Backend, UrlPart},
    utils,
};

/// Time granted to in-flight responses once the parameters are captured.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Served when the redirect arrives without a query string. The provider put
/// the response in the fragment, which browsers never send to a server, so
/// the script forwards it to `/callback` as a query string.
const FRAGMENT_RELAY_PAGE: &str = r#"<html>
<body>
    <script>
    const params = new URLSearchParams(window.location.hash.substring(1));
    fetch('/callback?' + params.toString())
        .then(response => response.text())
        .then(text => document.body.innerHTML = text);
    </script>
</body>
</html>
"#;

/// Local HTTP listener on the redirect URI's port.
///
/// `https` redirect URIs are served over TLS with a freshly generated
/// self-signed certificate for `localhost` and `127.0.0.1`. Browsers warn
/// about it once before following the redirect.
pub struct LocalServerCapture {
    provider: String,
    port: u16,
    secure: bool,
    open_browser: bool,
    timeout: Duration,
}

impl LocalServerCapture {
    /// # Arguments
    ///
    /// * `provider` - Display name used in the prompt
    /// * `port` - Port to bind on all interfaces
    /// * `secure` - Serve HTTPS instead of plain HTTP
    /// * `open_browser` - Open the authorization URL instead of printing it
    /// * `timeout` - How long to wait for the redirect
    pub fn new(
        provider: impl Into<String>,
        port: u16,
        secure: bool,
        open_browser: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            provider: provider.into(),
            port,
            secure,
            open_browser,
            timeout,
        }
    }
}

#[async_trait]
impl RedirectCapture for LocalServerCapture {
    async fn capture(&self, auth_url: &str, _part: UrlPart) -> Result<HashMap<String, String>> {
        // both parts end up in the query: fragments come back through the relay page
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;

        if self.secure {
            let tls = self_signed_tls_config().await?;
            present_auth_url(&self.provider, auth_url, self.open_browser);
            serve_once_tls(listener, tls, self.timeout).await
        } else {
            present_auth_url(&self.provider, auth_url, self.open_browser);
            serve_once(listener, self.timeout).await
        }
    }
}

/// Builds a TLS configuration around a new self-signed certificate.
///
/// # Errors
///
/// Returns [`AuthError::BackendUnavailable`] when the certificate cannot be
/// generated and [`AuthError::Io`] when rustls rejects it.
pub async fn self_signed_tls_config() -> Result<RustlsConfig> {
    // a second install fails harmlessly
    let _ = rustls::crypto::ring::default_provider().install_default();

    let subject_alt_names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    let CertifiedKey { cert, key_pair } = rcgen::generate_simple_self_signed(subject_alt_names)
        .map_err(|e| AuthError::BackendUnavailable {
            backend: Backend::LocalServer,
            reason: format!("cannot generate a self-signed certificate: {e}"),
        })?;

    let config =
        RustlsConfig::from_pem(cert.pem().into_bytes(), key_pair.serialize_pem().into_bytes())
            .await?;
    Ok(config)
}

struct CaptureState {
    sender: Mutex<Option<oneshot::Sender<HashMap<String, String>>>>,
}

/// Serves on `listener` until one request carrying query parameters arrives,
/// then shuts the server down and returns those parameters.
///
/// # Errors
///
/// Fails with [`AuthError::RedirectTimeout`] when nothing arrives within
/// `timeout`.
pub async fn serve_once(listener: TcpListener, timeout: Duration) -> Result<HashMap<String, String>> {
    let (app, params_rx) = callback_app();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    await_redirect(params_rx, timeout, server, move || {
        let _ = shutdown_tx.send(());
    })
    .await
}

/// Same as [`serve_once`], over TLS.
pub async fn serve_once_tls(
    listener: TcpListener,
    tls: RustlsConfig,
    timeout: Duration,
) -> Result<HashMap<String, String>> {
    let (app, params_rx) = callback_app();
    let listener = listener.into_std()?;
    let handle = Handle::new();

    let server = tokio::spawn({
        let handle = handle.clone();
        async move {
            axum_server::from_tcp_rustls(listener, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    });

    await_redirect(params_rx, timeout, server, move || {
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    })
    .await
}

fn callback_app() -> (Router, oneshot::Receiver<HashMap<String, String>>) {
    let (params_tx, params_rx) = oneshot::channel();
    let state = Arc::new(CaptureState {
        sender: Mutex::new(Some(params_tx)),
    });
    let app = Router::new().fallback(callback).layer(Extension(state));
    (app, params_rx)
}

async fn await_redirect<T: Send + 'static>(
    params_rx: oneshot::Receiver<HashMap<String, String>>,
    timeout: Duration,
    mut server: JoinHandle<T>,
    shutdown: impl FnOnce(),
) -> Result<HashMap<String, String>> {
    let pb = spinner("Waiting for the authorization redirect...");
    let outcome = tokio::time::timeout(timeout, params_rx).await;
    pb.finish_and_clear();

    shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
        server.abort();
    }

    match outcome {
        Ok(Ok(params)) => Ok(params),
        Ok(Err(_)) => Err(AuthError::Io(std::io::Error::other(
            "redirect listener stopped before a response arrived",
        ))),
        Err(_) => Err(AuthError::RedirectTimeout(timeout)),
    }
}

async fn callback(
    RawQuery(query): RawQuery,
    Extension(state): Extension<Arc<CaptureState>>,
) -> Html<String> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Html(FRAGMENT_RELAY_PAGE.to_string());
    };

    let params = utils::parse_pairs(&query);
    let status = if params.contains_key("error") {
        "denied"
    } else {
        "granted"
    };

    if let Some(sender) = state.sender.lock().await.take() {
        let _ = sender.send(params);
    }

    Html(format!("Access {status}. You may close this page."))
}
