//! Command implementations behind the `sonoauth` binary.
//!
//! Every command reports through the `success!`/`warning!`/`error!` macros
//! and exits non-zero on failure. Library errors are turned into messages
//! here and nowhere else.

mod auth;
mod tokens;

use std::sync::Arc;

use crate::{config, error, management::YamlTokenStore};

pub use auth::AuthArgs;
pub use auth::auth;
pub use auth::refresh;
pub use tokens::clear;
pub use tokens::tokens;

async fn open_store() -> Arc<YamlTokenStore> {
    let path = config::token_store_path();
    match YamlTokenStore::open(&path).await {
        Ok(store) => Arc::new(store),
        Err(e) => error!("Cannot open token store {}. Err: {}", path.display(), e),
    }
}
