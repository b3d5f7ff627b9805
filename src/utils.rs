use std::collections::HashMap;

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::{Rng, RngCore, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use url::Url;

use crate::{
    error::{AuthError, Result},
    types::UrlPart,
};

/// Timestamp layout used for expiries in options and the token store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Generates a PKCE code verifier.
///
/// Creates a cryptographically random string of 128 alphanumeric characters,
/// the maximum length RFC 7636 allows for a `code_verifier`.
///
/// # Returns
///
/// A fresh verifier. Each call returns a different value.
///
/// # Example
///
/// ```
/// let verifier = generate_code_verifier();
/// assert_eq!(verifier.len(), 128);
/// ```
pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

/// Derives the S256 code challenge for a PKCE verifier.
///
/// The challenge is the SHA-256 digest of the verifier, encoded as base64url
/// without padding.
///
/// # Arguments
///
/// * `verifier` - The code verifier sent later to the token endpoint
///
/// # Example
///
/// ```
/// let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
/// assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
/// ```
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Fresh anti-CSRF `state` value for an authorization request.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `Basic` credentials for the token endpoint.
pub fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}

/// Upper-cases the first character and lower-cases the rest ("bearer" -> "Bearer").
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Renders `'a', 'b', 'c'` for valid-value listings in error messages.
pub fn quote_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Token-store key of an account.
///
/// Without a user identifier the key is the provider identity itself, so a
/// provider holds a single default account. A user identifier appends
/// `#<user>` and lets several accounts of one provider live side by side.
///
/// # Example
///
/// ```
/// assert_eq!(account_key("sonoauth::provider::tidal::TidalApi", None), "sonoauth::provider::tidal::TidalApi");
/// assert_eq!(account_key("sonoauth::provider::tidal::TidalApi", Some("alice")), "sonoauth::provider::tidal::TidalApi#alice");
/// ```
pub fn account_key(identity: &str, user_identifier: Option<&str>) -> String {
    match user_identifier.filter(|u| !u.is_empty()) {
        Some(user) => format!("{identity}#{user}"),
        None => identity.to_string(),
    }
}

/// Parses a timestamp in [`TIMESTAMP_FORMAT`] as UTC.
///
/// # Arguments
///
/// * `value` - Text such as `2030-01-02T03:04:05Z`
///
/// # Errors
///
/// Returns [`AuthError::Configuration`] naming the expected layout when the
/// text does not match it.
///
/// # Example
///
/// ```
/// let at = parse_timestamp("2030-01-02T03:04:05Z")?;
/// assert_eq!(format_timestamp(&at), "2030-01-02T03:04:05Z");
/// ```
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            AuthError::Configuration(format!(
                "Invalid expiry '{value}'. Expected the format YYYY-MM-DDTHH:MM:SSZ."
            ))
        })
}

/// Formats a timestamp in [`TIMESTAMP_FORMAT`]. Sub-second precision is
/// dropped.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for optional timestamps in [`TIMESTAMP_FORMAT`].
///
/// Empty strings deserialize to `None`.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&super::format_timestamp(at)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) if !text.is_empty() => super::parse_timestamp(&text)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Determines the port the local redirect listener binds to.
///
/// # Arguments
///
/// * `redirect_uri` - The redirect URI registered with the provider
///
/// # Returns
///
/// The explicit port of the URI, else 80 for `http` and 443 for `https`.
/// `None` for schemes without a known default port.
///
/// # Errors
///
/// Returns [`AuthError::Configuration`] when the URI cannot be parsed.
pub fn redirect_port(redirect_uri: &str) -> Result<Option<u16>> {
    let url = parse_redirect_uri(redirect_uri)?;
    Ok(url.port_or_known_default())
}

/// Whether the redirect URI uses the `https` scheme.
pub fn is_https(redirect_uri: &str) -> bool {
    Url::parse(redirect_uri).is_ok_and(|url| url.scheme() == "https")
}

pub fn is_loopback_host(redirect_uri: &str) -> bool {
    Url::parse(redirect_uri)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .is_some_and(|host| matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]" | "::1"))
}

pub fn parse_redirect_uri(redirect_uri: &str) -> Result<Url> {
    Url::parse(redirect_uri).map_err(|e| {
        AuthError::Configuration(format!("Invalid redirect URI '{redirect_uri}': {e}."))
    })
}

/// Appends `params` to `base` as an encoded query string.
pub fn build_url(base: &str, params: &[(&str, &str)]) -> Result<String> {
    let url = Url::parse_with_params(base, params).map_err(|e| {
        AuthError::Configuration(format!("Invalid authorization URL '{base}': {e}."))
    })?;
    Ok(url.into())
}

/// Extracts the key/value pairs from the query or fragment of a URL.
///
/// # Arguments
///
/// * `url` - The full redirect URL; surrounding whitespace is ignored
/// * `part` - Which component carries the parameters
///
/// # Returns
///
/// The decoded pairs. Parameters with blank values are left out, and a URL
/// without the requested component yields an empty map.
///
/// # Errors
///
/// Returns [`AuthError::Authorization`] when `url` is not a valid URL.
pub fn parse_url_part(url: &str, part: UrlPart) -> Result<HashMap<String, String>> {
    let url = Url::parse(url.trim()).map_err(|e| {
        AuthError::Authorization(format!("Could not parse redirect URL '{url}': {e}."))
    })?;
    let raw = match part {
        UrlPart::Query => url.query(),
        UrlPart::Fragment => url.fragment(),
    };
    Ok(parse_pairs(raw.unwrap_or_default()))
}

/// Decodes an `application/x-www-form-urlencoded` string, dropping blank values.
pub fn parse_pairs(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
