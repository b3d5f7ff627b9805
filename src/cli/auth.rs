use std::time::Duration;

use super::open_store;
use crate::{
    error, info,
    oauth::{ManagerOptions, OAuth2Manager},
    provider::Provider,
    success,
    types::{AuthState, Backend, Flow, Scopes},
    utils,
};

/// Options of the `auth` command.
#[derive(Debug, Clone)]
pub struct AuthArgs {
    pub provider: String,
    pub flow: Option<Flow>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Vec<String>,
    pub backend: Option<Backend>,
    pub browser: bool,
    pub persist: bool,
    pub force: bool,
    pub print: bool,
    pub timeout: Duration,
    pub user: Option<String>,
}

pub async fn auth(args: AuthArgs) {
    let provider = match Provider::by_name(&args.provider) {
        Ok(p) => p,
        Err(e) => error!("{}", e),
    };
    let name = provider.name.clone();

    let options = ManagerOptions {
        flow: args.flow,
        client_id: args.client_id,
        client_secret: args.client_secret,
        redirect_uri: args.redirect_uri,
        scopes: Scopes::from(args.scopes.join(" ")),
        backend: args.backend,
        browser: args.browser,
        persist: args.persist,
        redirect_timeout: args.timeout,
        user_identifier: args.user,
        ..Default::default()
    };

    let mut manager = match OAuth2Manager::configure(provider, options, open_store().await).await {
        Ok(m) => m,
        Err(e) => error!("Cannot configure {} authorization. Err: {}", name, e),
    };

    let outcome = if args.force {
        manager.obtain_access_token(None).await
    } else {
        match manager.state() {
            AuthState::Authenticated => {
                info!("Reusing the stored access token for {}.", name);
                Ok(())
            }
            AuthState::Expired => manager.refresh_access_token().await,
            AuthState::Configured => manager.obtain_access_token(None).await,
        }
    };

    if let Err(e) = outcome {
        error!("Authorization with {} failed. Err: {}", name, e);
    }

    report(&manager, args.print);
}

pub async fn refresh(provider: String, user: Option<String>, print: bool) {
    let provider = match Provider::by_name(&provider) {
        Ok(p) => p,
        Err(e) => error!("{}", e),
    };
    let name = provider.name.clone();

    let options = ManagerOptions {
        user_identifier: user,
        ..Default::default()
    };
    let mut manager = match OAuth2Manager::configure(provider, options, open_store().await).await {
        Ok(m) => m,
        Err(e) => error!(
            "No stored token for {}. Please run sonoauth auth first.\n Error: {}",
            name, e
        ),
    };

    if manager.state() == AuthState::Configured {
        error!("No stored token for {}. Please run sonoauth auth first.", name);
    }

    if let Err(e) = manager.refresh_access_token().await {
        error!("Cannot refresh the {} access token. Err: {}", name, e);
    }

    report(&manager, print);
}

fn report(manager: &OAuth2Manager, print: bool) {
    let Some(token) = manager.token() else {
        error!("No access token is held for {}.", manager.provider().name);
    };

    success!(
        "{} access token ready via the {}.",
        manager.provider().name,
        manager.flow().name()
    );
    if let Some(expiry) = token.expiry {
        info!("Expires at {}.", utils::format_timestamp(&expiry));
    }
    if !manager.scopes().is_empty() {
        info!("Scopes: {}", manager.scopes());
    }
    if print {
        println!("{}", token.authorization_header());
    }
}
