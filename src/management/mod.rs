mod store;

pub use store::MemoryTokenStore;
pub use store::TokenStore;
pub use store::YamlTokenStore;
