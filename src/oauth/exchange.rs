use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use reqwest::{Client, header::AUTHORIZATION};
use serde_json::Value;

use crate::{
    error::{AuthError, Result},
    types::Scopes,
};

/// Normalized answer of a token endpoint or of an implicit-grant redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scopes: Option<Scopes>,
}

impl TokenResponse {
    pub fn from_json(json: &Value) -> Result<Self> {
        let text = |key: &str| {
            json[key]
                .as_str()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let access_token = text("access_token").ok_or_else(|| {
            AuthError::InvalidResponse("the response carried no access_token".to_string())
        })?;

        let expires_in = match &json["expires_in"] {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };

        Ok(Self {
            access_token,
            token_type: text("token_type"),
            refresh_token: text("refresh_token"),
            expires_in,
            scopes: text("scope").or_else(|| text("scopes")).map(Scopes::from),
        })
    }

    /// Builds a response from implicit-grant fragment parameters.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let json: serde_json::Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Self::from_json(&Value::Object(json))
    }

    /// Absolute expiry relative to `now`, truncated to whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResponse`] when `expires_in` puts the
    /// expiry outside the representable date range.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let Some(secs) = self.expires_in else {
            return Ok(None);
        };
        TimeDelta::try_seconds(secs)
            .and_then(|delta| now.trunc_subsecs(0).checked_add_signed(delta))
            .map(Some)
            .ok_or_else(|| {
                AuthError::InvalidResponse(format!("expires_in {secs} is out of range"))
            })
    }
}

/// POSTs a form to the token endpoint and normalizes the answer.
///
/// `basic` is a complete `Authorization` header value when the client
/// authenticates with HTTP Basic.
pub async fn request_token(
    client: &Client,
    token_url: &str,
    form: &[(&str, String)],
    basic: Option<&str>,
) -> Result<TokenResponse> {
    let mut request = client.post(token_url).form(form);
    if let Some(credentials) = basic {
        request = request.header(AUTHORIZATION, credentials);
    }

    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    let json: Option<Value> = serde_json::from_str(&body).ok();

    if !status.is_success() {
        return Err(AuthError::Transport {
            status: status.as_u16(),
            message: json
                .as_ref()
                .and_then(describe_error)
                .unwrap_or_else(|| fallback_message(&body, status.canonical_reason())),
        });
    }

    let json = json.ok_or_else(|| {
        AuthError::InvalidResponse("the token endpoint did not return JSON".to_string())
    })?;

    if json["access_token"].is_null() {
        if let Some(message) = describe_error(&json) {
            return Err(AuthError::Authorization(message));
        }
    }

    TokenResponse::from_json(&json)
}

/// `"<error>: <error_description>"` from an OAuth 2.0 error body.
pub fn describe_error(json: &Value) -> Option<String> {
    let error = json["error"].as_str();
    let description = json["error_description"]
        .as_str()
        .or_else(|| json["message"].as_str());

    match (error, description) {
        (Some(e), Some(d)) => Some(format!("{e}: {d}")),
        (Some(e), None) => Some(e.to_string()),
        (None, Some(d)) => Some(d.to_string()),
        (None, None) => None,
    }
}

fn fallback_message(body: &str, reason: Option<&str>) -> String {
    let body = body.trim();
    if body.is_empty() {
        reason.unwrap_or("unknown error").to_string()
    } else {
        body.to_string()
    }
}
