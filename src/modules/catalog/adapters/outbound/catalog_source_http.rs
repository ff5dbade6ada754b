// HTTP implementation of the CatalogSource port against the POS REST API.
//
// Responsibilities
// - Translate a PageRequest into the endpoint and body for its entity type.
// - Sort failures into retryable and terminal SourceErrors; retrying is the Fetcher's job.

use crate::modules::catalog::adapters::outbound::catalog_source::{
    CatalogSource, PageRequest, RawPage, SourceError,
};
use crate::modules::catalog::core::entity::EntityType;
use crate::shell::config::PosApiConfig;
use chrono::SecondsFormat;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde_json::{Value, json};
use std::time::Duration;

const API_VERSION_HEADER: &str = "square-version";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_MESSAGE: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Locations,
    CatalogSearch(&'static str),
    InventoryCounts,
}

impl Endpoint {
    fn for_entity(entity: EntityType) -> Self {
        match entity {
            EntityType::Locations => Endpoint::Locations,
            EntityType::Categories => Endpoint::CatalogSearch("CATEGORY"),
            EntityType::Items => Endpoint::CatalogSearch("ITEM"),
            EntityType::Variations => Endpoint::CatalogSearch("ITEM_VARIATION"),
            EntityType::VendorInfo => Endpoint::CatalogSearch("ITEM_VARIATION_VENDOR_INFO"),
            EntityType::Inventory => Endpoint::InventoryCounts,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Endpoint::Locations => "/v2/locations",
            Endpoint::CatalogSearch(_) => "/v2/catalog/search",
            Endpoint::InventoryCounts => "/v2/inventory/counts/batch-retrieve",
        }
    }

    fn records_key(self) -> &'static str {
        match self {
            Endpoint::Locations => "locations",
            Endpoint::CatalogSearch(_) => "objects",
            Endpoint::InventoryCounts => "counts",
        }
    }

    fn body(self, request: &PageRequest) -> Option<Value> {
        let since = request
            .since
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true));
        let mut body = match self {
            Endpoint::Locations => return None,
            Endpoint::CatalogSearch(object_type) => json!({
                "object_types": [object_type],
                "include_deleted_objects": since.is_some(),
                "limit": request.page_size,
            }),
            Endpoint::InventoryCounts => json!({
                "states": ["IN_STOCK"],
                "limit": request.page_size,
            }),
        };
        let since_field = match self {
            Endpoint::InventoryCounts => "updated_after",
            _ => "begin_time",
        };
        if let Some(since) = since {
            body[since_field] = Value::String(since);
        }
        if let Some(token) = &request.page_token {
            body["cursor"] = Value::String(token.clone());
        }
        Some(body)
    }
}

pub struct HttpCatalogSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogSource {
    pub fn new(config: &PosApiConfig) -> anyhow::Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            HeaderValue::from_str(&config.api_version)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl CatalogSource for HttpCatalogSource {
    #[tracing::instrument(skip(self), fields(entity = %request.entity))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<RawPage, SourceError> {
        let endpoint = Endpoint::for_entity(request.entity);
        let url = format!("{}{}", self.base_url, endpoint.path());
        let builder = match endpoint.body(request) {
            None => self.client.get(&url),
            Some(body) => self.client.post(&url).json(&body),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::Transient(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after.as_deref(), &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Transient(e.to_string()))?;
        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode(e.to_string()))?;
        let page = extract_page(endpoint, body)?;
        tracing::debug!(records = page.records.len(), "page received");
        Ok(page)
    }
}

fn classify_status(status: StatusCode, retry_after: Option<&str>, body: &str) -> SourceError {
    let message = error_message(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited {
            retry_after: retry_after.and_then(parse_retry_after),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized(message),
        StatusCode::REQUEST_TIMEOUT => SourceError::Transient(format!("{status}: {message}")),
        s if s.is_server_error() => SourceError::Transient(format!("{status}: {message}")),
        s => SourceError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

/// Delay-seconds form only; an HTTP-date falls back to the configured cooldown.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn error_message(body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("errors")?
            .get(0)?
            .get("detail")?
            .as_str()
            .map(str::to_string)
    });
    match detail {
        Some(detail) => detail,
        None => body.chars().take(MAX_ERROR_MESSAGE).collect(),
    }
}

fn extract_page(endpoint: Endpoint, body: Value) -> Result<RawPage, SourceError> {
    let Value::Object(mut body) = body else {
        return Err(SourceError::Decode("response body is not an object".into()));
    };
    let key = endpoint.records_key();
    // Empty result sets omit the array entirely.
    let records = match body.remove(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(records)) => records,
        Some(_) => return Err(SourceError::Decode(format!("`{key}` is not an array"))),
    };
    let next_page_token = match endpoint {
        Endpoint::Locations => None,
        _ => body
            .get("cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    };
    Ok(RawPage {
        records,
        next_page_token,
    })
}
