pub mod tmdb;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{MediaKind, TitleId};
use crate::models::metadata::{SearchHit, TitleMetadata};

pub use tmdb::TmdbClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// External source of canonical titles and season lists.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Candidates for `query`, best match first.
    async fn search(&self, query: &str, kind: MediaKind) -> Result<Vec<SearchHit>, ProviderError>;

    async fn fetch(&self, id: TitleId, kind: MediaKind) -> Result<TitleMetadata, ProviderError>;
}
