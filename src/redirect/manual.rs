use std::{collections::HashMap, io::Write};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::Mutex,
};

use super::{RedirectCapture, present_auth_url};
use crate::{
    error::{AuthError, Result},
    types::UrlPart,
    utils,
};

/// Asks the user to paste the URL the provider redirected to.
pub struct ManualCapture {
    provider: String,
    redirect_uri: String,
    open_browser: bool,
    input: Mutex<Box<dyn AsyncBufRead + Send + Unpin>>,
}

impl ManualCapture {
    /// Reads the pasted URL from standard input.
    pub fn stdin(provider: impl Into<String>, redirect_uri: impl Into<String>, open_browser: bool) -> Self {
        Self::from_reader(
            provider,
            redirect_uri,
            open_browser,
            BufReader::new(tokio::io::stdin()),
        )
    }

    pub fn from_reader(
        provider: impl Into<String>,
        redirect_uri: impl Into<String>,
        open_browser: bool,
        reader: impl AsyncBufRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            provider: provider.into(),
            redirect_uri: redirect_uri.into(),
            open_browser,
            input: Mutex::new(Box::new(reader)),
        }
    }
}

#[async_trait]
impl RedirectCapture for ManualCapture {
    async fn capture(&self, auth_url: &str, part: UrlPart) -> Result<HashMap<String, String>> {
        present_auth_url(&self.provider, auth_url, self.open_browser);

        print!(
            "After authorizing access to {} on your behalf, copy and paste the URI beginning with '{}' below.\n\nURI: ",
            self.provider, self.redirect_uri
        );
        std::io::stdout().flush()?;

        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 || line.trim().is_empty() {
            return Err(AuthError::Authorization(
                "No redirect URI was provided.".to_string(),
            ));
        }

        utils::parse_url_part(&line, part)
    }
}
