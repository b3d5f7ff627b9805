#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::post,
};
use serde_json::Value;
use sonoauth::{
    Result,
    provider::Provider,
    redirect::RedirectCapture,
    types::{Flow, UrlPart},
    utils,
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub form: HashMap<String, String>,
}

struct EndpointState {
    responses: Mutex<Vec<(StatusCode, Value)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Token endpoint on 127.0.0.1 answering with queued responses in order.
/// The last response repeats once the queue is drained.
pub struct FakeTokenEndpoint {
    pub url: String,
    state: Arc<EndpointState>,
}

impl FakeTokenEndpoint {
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> RecordedRequest {
        self.requests().await.pop().expect("no request reached the token endpoint")
    }
}

pub async fn spawn_token_endpoint(responses: Vec<(StatusCode, Value)>) -> FakeTokenEndpoint {
    let state = Arc::new(EndpointState {
        responses: Mutex::new(responses),
        requests: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/token", post(token))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeTokenEndpoint {
        url: format!("http://{addr}/token"),
        state,
    }
}

async fn token(
    State(state): State<Arc<EndpointState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().await.push(RecordedRequest {
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        form,
    });

    let mut responses = state.responses.lock().await;
    let (status, body) = if responses.len() > 1 {
        responses.remove(0)
    } else {
        responses[0].clone()
    };
    (status, Json(body))
}

/// Provider descriptor pointing at a fake token endpoint.
pub fn test_provider(token_url: &str) -> Provider {
    Provider {
        name: "Test".to_string(),
        identity: "sonoauth::tests::TestApi".to_string(),
        env_prefix: "SONOAUTH_TEST_API".to_string(),
        auth_url: "https://auth.example.com/authorize".to_string(),
        token_url: token_url.to_string(),
        flows: Flow::ALL.to_vec(),
    }
}

/// Redirect capture answering with fixed parameters.
///
/// With `echo_state`, the `state` of the authorization URL is copied into
/// the answer the way a well-behaved provider would.
pub struct ScriptedCapture {
    params: HashMap<String, String>,
    echo_state: bool,
    pub seen: Mutex<Vec<(String, UrlPart)>>,
}

impl ScriptedCapture {
    pub fn new(params: &[(&str, &str)], echo_state: bool) -> Arc<Self> {
        Arc::new(Self {
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            echo_state,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub async fn auth_query(&self) -> HashMap<String, String> {
        let seen = self.seen.lock().await;
        let (url, _) = seen.last().expect("no authorization URL was captured");
        utils::parse_url_part(url, UrlPart::Query).unwrap()
    }

    pub async fn part(&self) -> UrlPart {
        self.seen.lock().await.last().unwrap().1
    }
}

#[async_trait]
impl RedirectCapture for ScriptedCapture {
    async fn capture(&self, auth_url: &str, part: UrlPart) -> Result<HashMap<String, String>> {
        self.seen.lock().await.push((auth_url.to_string(), part));

        let mut params = self.params.clone();
        if self.echo_state {
            let query = utils::parse_url_part(auth_url, UrlPart::Query)?;
            if let Some(state) = query.get("state") {
                params.insert("state".to_string(), state.clone());
            }
        }
        Ok(params)
    }
}
