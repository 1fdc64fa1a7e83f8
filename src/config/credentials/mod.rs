
use std::fmt;

use tracing::debug;

use crate::{RagError, Result};

/// Static bearer token for the embedding API
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Read the key from the process environment, loading `.env` first if present
    #[inline]
    pub fn from_env(var: &str) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(var, |name| std::env::var(name).ok())
    }

    /// Resolve the key through an arbitrary lookup. Blank values count as missing.
    #[inline]
    pub fn from_lookup<F>(var: &str, lookup: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        lookup(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(Self)
            .ok_or_else(|| RagError::MissingCredential(var.to_string()))
    }

    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
