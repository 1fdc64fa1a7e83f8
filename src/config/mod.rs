// Configuration management module
// TOML settings plus the API credential taken from the environment

pub mod credentials;
pub mod settings;


pub use credentials::ApiKey;
pub use settings::{Config, ConfigError, EmbeddingConfig, StoreConfig};
