// Port for reading the upstream POS catalog one page at a time.

use crate::modules::catalog::core::entity::EntityType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub entity: EntityType,
    /// Lower bound of the "changes since" window; `None` asks for everything.
    pub since: Option<DateTime<Utc>>,
    pub page_token: Option<String>,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub records: Vec<Value>,
    /// `None` once the upstream has no further pages.
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("transient upstream failure: {0}")]
    Transient(String),

    #[error("rate limited by upstream")]
    RateLimited { retry_after: Option<Duration> },

    #[error("upstream rejected credentials: {0}")]
    Unauthorized(String),

    #[error("upstream rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("undecodable upstream response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::Transient(_) | SourceError::RateLimited { .. }
        )
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<RawPage, SourceError>;
}
