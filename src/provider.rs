//! Descriptors for the services whose tokens this crate manages.
//!
//! A descriptor carries everything the manager needs to know about a vendor:
//! its authorization and token endpoints, the environment-variable prefix for
//! client credentials, the flows it accepts, and the identity string its
//! stored record is keyed by.

use crate::{
    error::{AuthError, Result},
    types::Flow,
    utils,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    /// Display name, e.g. "Spotify".
    pub name: String,
    /// Fully-qualified identity used as the token-store key.
    pub identity: String,
    /// Prefix of the `{PREFIX}_CLIENT_ID` / `{PREFIX}_CLIENT_SECRET` variables.
    pub env_prefix: String,
    pub auth_url: String,
    pub token_url: String,
    pub flows: Vec<Flow>,
}

impl Provider {
    /// Spotify Web API.
    pub fn spotify_web_api() -> Self {
        Self {
            name: "Spotify".to_string(),
            identity: "sonoauth::provider::spotify::WebApi".to_string(),
            env_prefix: "SPOTIFY_WEB_API".to_string(),
            auth_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            flows: Flow::ALL.to_vec(),
        }
    }

    /// TIDAL API (openapi.tidal.com).
    pub fn tidal_api() -> Self {
        Self {
            name: "TIDAL".to_string(),
            identity: "sonoauth::provider::tidal::TidalApi".to_string(),
            env_prefix: "TIDAL_API".to_string(),
            auth_url: "https://login.tidal.com/authorize".to_string(),
            token_url: "https://auth.tidal.com/v1/oauth2/token".to_string(),
            flows: vec![Flow::Pkce, Flow::ClientCredentials],
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::spotify_web_api(), Self::tidal_api()]
    }

    /// Looks up a built-in provider by its short name (`spotify`, `tidal`).
    pub fn by_name(name: &str) -> Result<Self> {
        Self::builtin()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let names: Vec<String> = Self::builtin()
                    .iter()
                    .map(|p| p.name.to_lowercase())
                    .collect();
                AuthError::Configuration(format!(
                    "Unknown provider '{name}'. Valid values: {}.",
                    utils::quote_list(names.iter().map(String::as_str))
                ))
            })
    }

    pub fn client_id_var(&self) -> String {
        format!("{}_CLIENT_ID", self.env_prefix)
    }

    pub fn client_secret_var(&self) -> String {
        format!("{}_CLIENT_SECRET", self.env_prefix)
    }

    pub fn supports(&self, flow: Flow) -> bool {
        self.flows.contains(&flow)
    }
}
