use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use sonoauth::{
    AuthError, Result,
    redirect::{
        BrowserCapture, ManualCapture, PageDriver, RedirectCapture, WebDriverSession,
        self_signed_tls_config, serve_once, serve_once_tls,
    },
    types::{Backend, UrlPart},
};
use tokio::{net::TcpListener, sync::Mutex};

const REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

async fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

#[tokio::test]
async fn test_serve_once_captures_query() {
    let (listener, base) = local_listener().await;
    let server = tokio::spawn(serve_once(listener, Duration::from_secs(5)));

    let body = reqwest::get(format!("{base}/callback?code=abc&state=s1"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Access granted. You may close this page.");

    let params = server.await.unwrap().unwrap();
    assert_eq!(params["code"], "abc");
    assert_eq!(params["state"], "s1");
}

#[tokio::test]
async fn test_serve_once_reports_denied_access() {
    let (listener, base) = local_listener().await;
    let server = tokio::spawn(serve_once(listener, Duration::from_secs(5)));

    let body = reqwest::get(format!("{base}/callback?error=access_denied&state=s1"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.starts_with("Access denied."));

    let params = server.await.unwrap().unwrap();
    assert_eq!(params["error"], "access_denied");
}

#[tokio::test]
async fn test_serve_once_relays_fragment() {
    let (listener, base) = local_listener().await;
    let server = tokio::spawn(serve_once(listener, Duration::from_secs(5)));

    // without a query string the browser gets the relay page
    let page = reqwest::get(format!("{base}/callback"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("window.location.hash"));

    // which re-sends the fragment as a query string
    reqwest::get(format!("{base}/callback?access_token=t1&token_type=bearer&state=s1"))
        .await
        .unwrap();

    let params = server.await.unwrap().unwrap();
    assert_eq!(params["access_token"], "t1");
}

#[tokio::test]
async fn test_serve_once_tls_captures_query() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let tls = self_signed_tls_config().await.unwrap();
    let server = tokio::spawn(serve_once_tls(listener, tls, Duration::from_secs(5)));

    // the certificate is self-signed, so the client has to accept it blindly
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();
    let body = client
        .get(format!("https://127.0.0.1:{port}/callback?code=abc&state=s1"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Access granted. You may close this page.");

    let params = server.await.unwrap().unwrap();
    assert_eq!(params["code"], "abc");
    assert_eq!(params["state"], "s1");
}

#[tokio::test]
async fn test_serve_once_tls_rejects_plain_http() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let tls = self_signed_tls_config().await.unwrap();
    let server = tokio::spawn(serve_once_tls(listener, tls, Duration::from_millis(500)));

    assert!(reqwest::get(format!("http://127.0.0.1:{port}/callback?code=abc")).await.is_err());

    let err = server.await.unwrap().unwrap_err();
    assert!(matches!(err, AuthError::RedirectTimeout(_)));
}

#[tokio::test]
async fn test_serve_once_times_out() {
    let (listener, _) = local_listener().await;

    let err = serve_once(listener, Duration::from_millis(200)).await.unwrap_err();
    assert!(matches!(err, AuthError::RedirectTimeout(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_manual_capture_reads_query() {
    let input: &'static [u8] = b"http://127.0.0.1:8888/callback?code=abc&state=xyz\n";
    let capture = ManualCapture::from_reader("Test", REDIRECT_URI, false, input);

    let params = capture
        .capture("https://auth.example.com/authorize", UrlPart::Query)
        .await
        .unwrap();
    assert_eq!(params["code"], "abc");
    assert_eq!(params["state"], "xyz");
}

#[tokio::test]
async fn test_manual_capture_reads_fragment() {
    let input: &'static [u8] = b"  http://127.0.0.1:8888/callback#access_token=t1&state=xyz  \n";
    let capture = ManualCapture::from_reader("Test", REDIRECT_URI, false, input);

    let params = capture
        .capture("https://auth.example.com/authorize", UrlPart::Fragment)
        .await
        .unwrap();
    assert_eq!(params["access_token"], "t1");
}

#[tokio::test]
async fn test_manual_capture_rejects_empty_input() {
    let input: &'static [u8] = b"\n";
    let capture = ManualCapture::from_reader("Test", REDIRECT_URI, false, input);

    let err = capture
        .capture("https://auth.example.com/authorize", UrlPart::Query)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Authorization(_)));
}

/// Page driver that walks through a fixed list of locations.
struct FakeDriver {
    locations: Mutex<Vec<String>>,
    visited: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl FakeDriver {
    fn new(locations: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            locations: Mutex::new(locations.iter().map(|l| l.to_string()).collect()),
            visited: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        *self.visited.lock().await = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let mut locations = self.locations.lock().await;
        if locations.len() > 1 {
            Ok(locations.remove(0))
        } else {
            Ok(locations[0].clone())
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_browser_capture_follows_redirect() {
    let driver = FakeDriver::new(&[
        "https://auth.example.com/authorize",
        "https://auth.example.com/login",
        "http://127.0.0.1:8888/callback?code=abc&state=s1",
    ]);
    let capture = BrowserCapture::with_driver(REDIRECT_URI, driver.clone(), Duration::from_secs(5));

    let params = capture
        .capture("https://auth.example.com/authorize", UrlPart::Query)
        .await
        .unwrap();

    assert_eq!(params["code"], "abc");
    assert_eq!(
        driver.visited.lock().await.as_deref(),
        Some("https://auth.example.com/authorize")
    );
    assert!(driver.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_browser_capture_times_out() {
    let driver = FakeDriver::new(&["https://auth.example.com/login"]);
    let capture =
        BrowserCapture::with_driver(REDIRECT_URI, driver.clone(), Duration::from_millis(300));

    let err = capture
        .capture("https://auth.example.com/authorize", UrlPart::Query)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::RedirectTimeout(_)));
    // the browser is closed even when nobody finished the login
    assert!(driver.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_browser_capture_without_webdriver() {
    let capture = BrowserCapture::webdriver(REDIRECT_URI, None, Duration::from_secs(1));

    let err = capture
        .capture("https://auth.example.com/authorize", UrlPart::Query)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::BackendUnavailable {
            backend: Backend::BrowserAutomation,
            ..
        }
    ));
}

#[tokio::test]
async fn test_webdriver_session_unreachable() {
    let (listener, base) = local_listener().await;
    drop(listener);

    let err = WebDriverSession::start(&base).await.err().unwrap();
    assert!(matches!(err, AuthError::BackendUnavailable { .. }));
}
