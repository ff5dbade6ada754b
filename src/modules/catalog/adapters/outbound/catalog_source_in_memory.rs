// In memory implementation of the CatalogSource port.
//
// Purpose
// - Stand in for the POS API in handler and end to end tests.
//
// Responsibilities
// - Serve seeded records in pages addressed by offset tokens.
// - Honour the "changes since" window on the record timestamp.
// - Replay scripted failures for a given page and record every request.

use crate::modules::catalog::adapters::outbound::catalog_source::{
    CatalogSource, PageRequest, RawPage, SourceError,
};
use crate::modules::catalog::core::entity::EntityType;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

struct ScriptedFailure {
    entity: EntityType,
    page_token: Option<String>,
    error: SourceError,
    remaining: usize,
}

#[derive(Default)]
pub struct InMemoryCatalogSource {
    records: Mutex<HashMap<EntityType, Vec<Value>>>,
    failures: Mutex<Vec<ScriptedFailure>>,
    requests: Mutex<Vec<PageRequest>>,
    delay_ms: AtomicU64,
    is_offline: bool,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub fn set_delay_ms(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    pub async fn set_records(&self, entity: EntityType, records: Vec<Value>) {
        self.records.lock().await.insert(entity, records);
    }

    /// Makes the next `times` fetches of the page at `page_token` fail with `error`.
    pub async fn fail_page(
        &self,
        entity: EntityType,
        page_token: Option<&str>,
        error: SourceError,
        times: usize,
    ) {
        self.failures.lock().await.push(ScriptedFailure {
            entity,
            page_token: page_token.map(str::to_string),
            error,
            remaining: times,
        });
    }

    pub async fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn requests_for(&self, entity: EntityType) -> Vec<PageRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.entity == entity)
            .cloned()
            .collect()
    }

    async fn scripted_failure(&self, request: &PageRequest) -> Option<SourceError> {
        let mut failures = self.failures.lock().await;
        let failure = failures.iter_mut().find(|f| {
            f.remaining > 0 && f.entity == request.entity && f.page_token == request.page_token
        })?;
        failure.remaining -= 1;
        Some(failure.error.clone())
    }
}

fn changed_at(record: &Value) -> Option<DateTime<Utc>> {
    record
        .get("updated_at")
        .or_else(|| record.get("calculated_at"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait::async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<RawPage, SourceError> {
        self.requests.lock().await.push(request.clone());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.is_offline {
            return Err(SourceError::Transient("Catalog source offline".into()));
        }
        if let Some(error) = self.scripted_failure(request).await {
            return Err(error);
        }

        let offset = match &request.page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| SourceError::Rejected {
                    status: 400,
                    message: format!("invalid cursor {token}"),
                })?,
        };

        let records = self.records.lock().await;
        let matching: Vec<&Value> = records
            .get(&request.entity)
            .into_iter()
            .flatten()
            .filter(|record| match (request.since, changed_at(record)) {
                (Some(since), Some(at)) => at >= since,
                _ => true,
            })
            .collect();

        let page_size = request.page_size.max(1) as usize;
        let end = (offset + page_size).min(matching.len());
        let page: Vec<Value> = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|record| (*record).clone())
            .collect();
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        Ok(RawPage {
            records: page,
            next_page_token,
        })
    }
}

#[cfg(test)]
mod catalog_source_in_memory_tests {
    use super::*;
    use crate::tests::fixtures::records::{item_record, touched};
    use rstest::{fixture, rstest};

    fn request(page_token: Option<&str>, since: Option<DateTime<Utc>>) -> PageRequest {
        PageRequest {
            entity: EntityType::Items,
            since,
            page_token: page_token.map(str::to_string),
            page_size: 2,
        }
    }

    #[fixture]
    async fn before_each() -> InMemoryCatalogSource {
        let source = InMemoryCatalogSource::new();
        source
            .set_records(
                EntityType::Items,
                vec![
                    item_record("A1", "One", None),
                    item_record("A2", "Two", None),
                    touched(item_record("A3", "Three", None), Utc::now()),
                ],
            )
            .await;
        source
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_page_through_records(#[future] before_each: InMemoryCatalogSource) {
        let source = before_each.await;
        let first = source.fetch_page(&request(None, None)).await.unwrap();
        assert_eq!(first.records.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let second = source.fetch_page(&request(Some("2"), None)).await.unwrap();
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.next_page_token, None);
        assert_eq!(source.requests().await.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_only_serve_records_changed_since(
        #[future] before_each: InMemoryCatalogSource,
    ) {
        let source = before_each.await;
        let since = Utc::now() - chrono::Duration::minutes(5);
        let page = source.fetch_page(&request(None, Some(since))).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0]["id"], "A3");
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_replay_scripted_failures_then_recover(
        #[future] before_each: InMemoryCatalogSource,
    ) {
        let source = before_each.await;
        source
            .fail_page(
                EntityType::Items,
                Some("2"),
                SourceError::Transient("boom".into()),
                1,
            )
            .await;
        assert!(source.fetch_page(&request(None, None)).await.is_ok());
        assert_eq!(
            source.fetch_page(&request(Some("2"), None)).await.unwrap_err(),
            SourceError::Transient("boom".into())
        );
        assert!(source.fetch_page(&request(Some("2"), None)).await.is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_if_offline(#[future] before_each: InMemoryCatalogSource) {
        let mut source = before_each.await;
        source.toggle_offline();
        let result = source.fetch_page(&request(None, None)).await;
        assert!(matches!(result, Err(SourceError::Transient(_))));
    }
}
