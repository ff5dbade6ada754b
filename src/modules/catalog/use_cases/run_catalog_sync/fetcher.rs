// Fetcher turns the page-at-a-time source port into a resilient page stream.
//
// Responsibilities
// - Retry transient failures with capped exponential backoff.
// - Cool down on rate limits, honouring the upstream Retry-After hint.
// - Bound every page call with a timeout.
// - Report the page token it was stuck on once the attempt budget is spent.

use crate::modules::catalog::adapters::outbound::catalog_source::{
    CatalogSource, PageRequest, RawPage, SourceError,
};
use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::use_cases::run_catalog_sync::errors::SyncError;
use crate::shared::infrastructure::retry_policy::RetryPolicy;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct Fetcher<TSource>
where
    TSource: CatalogSource + ?Sized,
{
    source: Arc<TSource>,
    policy: RetryPolicy,
    page_size: u32,
}

impl<TSource> Fetcher<TSource>
where
    TSource: CatalogSource + ?Sized,
{
    pub fn new(source: Arc<TSource>, policy: RetryPolicy, page_size: u32) -> Self {
        Self {
            source,
            policy,
            page_size,
        }
    }

    /// Opens a stream over `entity`, starting at `page_token` (`None` for the first page).
    pub fn open(
        &self,
        entity: EntityType,
        since: Option<DateTime<Utc>>,
        page_token: Option<String>,
    ) -> PageStream<'_, TSource> {
        PageStream {
            fetcher: self,
            entity,
            since,
            next_token: page_token,
            pages_read: 0,
            exhausted: false,
        }
    }

    pub async fn fetch_with_retry(&self, request: &PageRequest) -> Result<RawPage, SyncError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome =
                match tokio::time::timeout(self.policy.page_timeout, self.source.fetch_page(request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(SourceError::Transient(format!(
                        "page call timed out after {:?}",
                        self.policy.page_timeout
                    ))),
                };

            let error = match outcome {
                Ok(page) => return Ok(page),
                Err(error) => error,
            };
            if !error.is_retryable() || attempt >= max_attempts {
                tracing::error!(
                    entity = %request.entity,
                    page_token = request.page_token.as_deref().unwrap_or(""),
                    attempt,
                    %error,
                    "giving up on page"
                );
                return Err(SyncError::FetchFailed {
                    entity: request.entity,
                    page_token: request.page_token.clone(),
                    attempts: attempt,
                    reason: error,
                });
            }

            let delay = match &error {
                SourceError::RateLimited { retry_after } => self.policy.cooldown(*retry_after),
                _ => self.policy.backoff(attempt),
            };
            tracing::warn!(
                entity = %request.entity,
                page_token = request.page_token.as_deref().unwrap_or(""),
                attempt,
                delay_ms = delay.as_millis() as u64,
                %error,
                "page fetch failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Lazy, finite sequence of raw pages for one entity type.
pub struct PageStream<'a, TSource>
where
    TSource: CatalogSource + ?Sized,
{
    fetcher: &'a Fetcher<TSource>,
    entity: EntityType,
    since: Option<DateTime<Utc>>,
    next_token: Option<String>,
    pages_read: u64,
    exhausted: bool,
}

impl<TSource> PageStream<'_, TSource>
where
    TSource: CatalogSource + ?Sized,
{
    /// Token of the page the next call will fetch; `None` before the first page.
    pub fn position(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }

    /// Next page, or `None` once the upstream reported no further pages.
    pub async fn next_page(&mut self) -> Result<Option<RawPage>, SyncError> {
        if self.exhausted {
            return Ok(None);
        }
        let request = PageRequest {
            entity: self.entity,
            since: self.since,
            page_token: self.next_token.clone(),
            page_size: self.fetcher.page_size,
        };
        let page = self.fetcher.fetch_with_retry(&request).await?;

        let next = page.next_page_token.clone().filter(|t| !t.is_empty());
        if next.is_some() && next == request.page_token {
            return Err(SyncError::FetchFailed {
                entity: self.entity,
                page_token: request.page_token,
                attempts: 1,
                reason: SourceError::Decode("upstream returned the same cursor twice".into()),
            });
        }
        self.pages_read += 1;
        match next {
            Some(token) => self.next_token = Some(token),
            None => self.exhausted = true,
        }
        tracing::debug!(
            entity = %self.entity,
            page = self.pages_read,
            records = page.records.len(),
            "page fetched"
        );
        Ok(Some(page))
    }
}
