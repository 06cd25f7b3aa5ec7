// 📡 Filing Fetcher - paginated ECFS search flattened into RawFiling records
// Flattening and de-duplication are pure; the HTTP client sits behind the `remote` feature

use crate::records::{RawFiling, FIELD_SEPARATOR};
use serde_json::Value;
use std::collections::HashSet;

pub const FILING_DETAIL_URL: &str = "https://www.fcc.gov/ecfs/filing/";
pub const RESULT_SORT: &str = "date_received,DESC";

const DATE_LEN: usize = 10;
const PROCEEDING_DESCRIPTION_LEN: usize = 200;

// ============================================================================
// FLATTENING
// ============================================================================

/// Render a scalar field the way the raw files store it: null or missing → ""
fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn nested_text(value: &Value, outer: &str, inner: &str) -> String {
    text(value.get(outer).and_then(|v| v.get(inner)))
}

/// Non-empty `name`s from an array of objects (plain strings accepted when `allow_strings`)
fn names(value: &Value, key: &str, allow_strings: bool) -> Vec<String> {
    let Some(items) = value.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => Some(text(item.get("name"))),
            Value::String(s) if allow_strings => Some(s.clone()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Flatten one ECFS API filing object into the raw record shape
pub fn normalize_api_filing(filing: &Value) -> RawFiling {
    let submission_id = text(filing.get("id_submission"));

    let proceedings: Vec<&Value> = filing
        .get("proceedings")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter(|p| p.is_object()).collect())
        .unwrap_or_default();

    let dockets: Vec<String> = proceedings
        .iter()
        .map(|p| text(p.get("name")))
        .filter(|s| !s.is_empty())
        .collect();
    let descriptions: Vec<String> = proceedings
        .iter()
        .map(|p| text(p.get("description")))
        .filter(|s| !s.is_empty())
        .collect();
    let bureau = proceedings
        .iter()
        .map(|p| text(p.get("bureau_name")))
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    let document_urls: Vec<String> = filing
        .get("documents")
        .and_then(Value::as_array)
        .map(|docs| {
            docs.iter()
                .filter(|d| d.is_object())
                .map(|d| text(d.get("src")))
                .filter(|src| !src.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let detail_url = if submission_id.is_empty() {
        String::new()
    } else {
        format!("{}{}", FILING_DETAIL_URL, submission_id)
    };

    RawFiling {
        company_name: names(filing, "filers", false).join(FIELD_SEPARATOR),
        date_received: truncate_chars(&text(filing.get("date_received")), DATE_LEN),
        submission_type: nested_text(filing, "submissiontype", "description"),
        docket_number: dockets.join(FIELD_SEPARATOR),
        proceeding_description: truncate_chars(
            &descriptions.join(FIELD_SEPARATOR),
            PROCEEDING_DESCRIPTION_LEN,
        ),
        bureau,
        filing_status: nested_text(filing, "filingstatus", "description"),
        contact_attorney: names(filing, "authors", false).join(FIELD_SEPARATOR),
        law_firm: names(filing, "lawfirms", true).join(FIELD_SEPARATOR),
        document_urls,
        detail_url,
        submission_id,
    }
}

/// Tracks submission ids across queries; the first query to return a filing keeps it
#[derive(Debug, Default)]
pub struct SubmissionDeduper {
    seen: HashSet<String>,
}

impl SubmissionDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep unseen filings with a non-empty `id_submission`, in order
    pub fn retain_new(&mut self, filings: Vec<Value>) -> Vec<Value> {
        filings
            .into_iter()
            .filter(|f| {
                let id = text(f.get("id_submission"));
                !id.is_empty() && self.seen.insert(id)
            })
            .collect()
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }
}

/// Whether pagination should request another page
pub fn should_continue(
    page_len: usize,
    page_size: usize,
    fetched: usize,
    total: Option<usize>,
    max_records: usize,
) -> bool {
    if page_len == 0 || page_len < page_size {
        return false;
    }
    if matches!(total, Some(t) if fetched >= t) {
        return false;
    }
    !(max_records > 0 && fetched >= max_records)
}

/// Total result count from the `total` header value or `aggregations.total`
pub fn response_total(header: Option<&str>, body: &Value) -> Option<usize> {
    header
        .and_then(|h| h.trim().parse::<usize>().ok())
        .or_else(|| {
            body.get("aggregations")
                .and_then(|agg| agg.get("total"))
                .and_then(Value::as_u64)
                .map(|t| t as usize)
        })
        .filter(|t| *t > 0)
}

// ============================================================================
// HTTP CLIENT
// ============================================================================

#[cfg(feature = "remote")]
pub use remote::{EcfsClient, FetchError};

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use crate::config::FetchConfig;
    use std::time::Duration;
    use thiserror::Error;
    use tracing::{info, warn};

    #[derive(Debug, Error)]
    pub enum FetchError {
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("API error [{status}]: {message}")]
        ApiError { status: u16, message: String },
        #[error("Unexpected response: {0}")]
        Decode(String),
    }

    pub struct EcfsClient {
        api_key: String,
        config: FetchConfig,
        client: reqwest::Client,
    }

    impl EcfsClient {
        pub fn new(api_key: impl Into<String>, config: FetchConfig) -> Result<Self, FetchError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;
            Ok(EcfsClient {
                api_key: api_key.into(),
                config,
                client,
            })
        }

        /// One page of API records plus the reported total, if any
        pub async fn fetch_page(
            &self,
            query: &str,
            offset: usize,
        ) -> Result<(Vec<Value>, Option<usize>), FetchError> {
            let url = format!("{}/filings", self.config.base_url.trim_end_matches('/'));
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("q", query),
                    ("limit", &self.config.page_size.to_string()),
                    ("offset", &offset.to_string()),
                    ("sort", RESULT_SORT),
                ])
                .send()
                .await?;

            let status = resp.status().as_u16();
            let header = resp
                .headers()
                .get("total")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string);

            if status >= 400 {
                let body = resp.text().await.unwrap_or_default();
                return Err(FetchError::ApiError {
                    status,
                    message: body.chars().take(500).collect(),
                });
            }

            let body: Value = resp.json().await?;
            let records = match body.get("filing") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.clone(),
                Some(_) => return Err(FetchError::Decode("`filing` is not an array".to_string())),
            };

            Ok((records, response_total(header.as_deref(), &body)))
        }

        /// Every page of one query. A failed request ends this query with what was gathered.
        pub async fn fetch_query(&self, query: &str) -> Vec<Value> {
            let mut all = Vec::new();
            let mut offset = 0;
            let mut total = None;

            loop {
                info!(query, offset, limit = self.config.page_size, "requesting page");
                let (records, page_total) = match self.fetch_page(query, offset).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(query, offset, error = %e, "request failed, ending query");
                        break;
                    }
                };

                if total.is_none() && page_total.is_some() {
                    total = page_total;
                    info!(query, total = ?total, "total available");
                }

                let page_len = records.len();
                all.extend(records);

                if !should_continue(
                    page_len,
                    self.config.page_size,
                    all.len(),
                    total,
                    self.config.max_records,
                ) {
                    break;
                }

                offset += self.config.page_size;
                if self.config.page_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
                }
            }

            all
        }

        /// Run each configured query, de-duplicate by submission id and flatten
        pub async fn fetch_all(&self) -> Vec<RawFiling> {
            let mut deduper = SubmissionDeduper::new();
            let mut unique = Vec::new();

            for query in &self.config.queries {
                let fetched = self.fetch_query(query).await;
                let fresh = deduper.retain_new(fetched);
                info!(query = %query, new = fresh.len(), "new unique filings from query");
                unique.extend(fresh);
            }

            unique.iter().map(normalize_api_filing).collect()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
