use chrono::Utc;
use tabled::Table;

use super::open_store;
use crate::{
    error,
    management::TokenStore,
    oauth,
    provider::Provider,
    success,
    types::StoredTokenRow,
    utils, warning,
};

/// Lists every record in the token store.
pub async fn tokens() {
    let store = open_store().await;
    let keys = match store.keys().await {
        Ok(k) => k,
        Err(e) => error!("Cannot read token store. Err: {}", e),
    };

    if keys.is_empty() {
        warning!("No tokens stored in {}.", store.path().display());
        return;
    }

    let now = Utc::now();
    let mut rows: Vec<StoredTokenRow> = Vec::new();
    for key in keys {
        let record = match store.load(&key).await {
            Ok(Some(r)) => r,
            Ok(None) => continue,
            Err(e) => error!("Cannot read token {}. Err: {}", key, e),
        };

        let expiry = match record.expiry {
            Some(at) if at <= now => format!("{} (expired)", utils::format_timestamp(&at)),
            Some(at) => utils::format_timestamp(&at),
            None => "-".to_string(),
        };

        rows.push(StoredTokenRow {
            account: key,
            flow: record.flow.to_string(),
            client_id: record.client_id,
            scopes: record.scopes,
            expiry,
        });
    }

    println!("{}", Table::new(rows));
}

/// Removes the record of one account, or all records.
pub async fn clear(provider: Option<String>, user: Option<String>) {
    let store = open_store().await;

    if let Some(name) = provider {
        let provider = match Provider::by_name(&name) {
            Ok(p) => p,
            Err(e) => error!("{}", e),
        };
        match oauth::remove_account(store.as_ref(), &provider, user.as_deref()).await {
            Ok(true) => success!("Removed the stored {} token.", provider.name),
            Ok(false) => warning!("No token stored for {}.", provider.name),
            Err(e) => error!("Cannot remove the {} token. Err: {}", provider.name, e),
        }
        return;
    }

    let keys = match store.keys().await {
        Ok(k) => k,
        Err(e) => error!("Cannot read token store. Err: {}", e),
    };

    let mut removed = 0;
    for key in keys {
        match store.remove(&key).await {
            Ok(true) => removed += 1,
            Ok(false) => warning!("No token stored for {}.", key),
            Err(e) => error!("Cannot remove token {}. Err: {}", key, e),
        }
    }

    success!("Removed {} stored token(s).", removed);
}
