// 🔎 Company Enrichment - market research per company, cached by normalized name
//
// The cache and reply parsing are plain data; the researcher trait, the OpenAI
// implementation and the async driver need the `remote` feature.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Fields every research reply must carry
pub const REQUIRED_FIELDS: [&str; 5] = [
    "is_active",
    "activity_signal",
    "industry_segment",
    "product_summary",
    "market_position",
];

/// Companies whose name contains this are agencies, not filers
pub const SKIPPED_ENTITY_TERM: &str = "wireline competition bureau";

/// Dockets (and contacts) quoted per list in the research prompt
pub const MAX_PROMPT_ITEMS: usize = 3;

pub const ANALYST_SYSTEM_PROMPT: &str =
    "You are a telecom industry analyst. Respond only with valid JSON, no markdown or other formatting.";

pub type EnrichmentRecord = Map<String, Value>;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Reply is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Reply is not a JSON object")]
    NotAnObject,
    #[error("Reply missing fields: {0:?}")]
    MissingFields(Vec<String>),
}

// ============================================================================
// CACHE
// ============================================================================

/// Enrichment results keyed by normalized company name, backed by one JSON file
#[derive(Debug, Clone)]
pub struct EnrichmentCache {
    path: PathBuf,
    entries: BTreeMap<String, EnrichmentRecord>,
}

impl EnrichmentCache {
    /// Load the cache file; missing or malformed files start an empty cache
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = ?path, error = %e, "enrichment cache is malformed, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        EnrichmentCache {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Copy entries in, overwriting existing keys; returns how many were merged
    pub fn merge(&mut self, other: impl IntoIterator<Item = (String, EnrichmentRecord)>) -> usize {
        let mut merged = 0;
        for (key, record) in other {
            self.entries.insert(key, record);
            merged += 1;
        }
        merged
    }

    pub fn get(&self, normalized_name: &str) -> Option<&EnrichmentRecord> {
        self.entries.get(normalized_name)
    }

    pub fn insert(&mut self, normalized_name: &str, record: EnrichmentRecord) {
        self.entries.insert(normalized_name.to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .context("Failed to encode enrichment cache")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write enrichment cache: {:?}", self.path))
    }
}

// ============================================================================
// PROMPT AND REPLY
// ============================================================================

fn prompt_list(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        return fallback.to_string();
    }
    items
        .iter()
        .take(MAX_PROMPT_ITEMS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// User prompt for one company; structured records carry no contacts, so
/// callers usually pass an empty `contacts` slice
pub fn build_research_prompt(entity_name: &str, dockets: &[String], contacts: &[String]) -> String {
    let docket_info = prompt_list(dockets, "Unknown");
    let contact_info = prompt_list(contacts, "Not specified");

    format!(
        r#"Research the following company that filed for VoIP/IPES numbering authorization with the FCC:

Company Name: {entity_name}
FCC Docket(s): {docket_info}
Contact/Attorney: {contact_info}

Based on your knowledge, provide the following information in JSON format:

1. is_active (boolean): Is this company still operating? True if the company appears to still be in business, False if defunct/acquired/closed.
2. activity_signal (string): Brief evidence for your is_active determination.
3. industry_segment (string): One of "UCaaS", "CCaaS", "CPaaS", "Carrier", "Reseller", "Enterprise IT", "Healthcare", "Financial Services", "Government", "Consulting/Legal", "Unknown".
4. product_summary (string): 1-2 sentence description of what they offer. If unknown, describe based on the filing type.
5. market_position (string): One of "Enterprise", "Mid-Market", "SMB", "Startup", "Unknown".

Respond ONLY with valid JSON in this exact format, no other text:
{{"is_active": true, "activity_signal": "...", "industry_segment": "...", "product_summary": "...", "market_position": "..."}}"#
    )
}

/// Parse a model reply, tolerating markdown code fences around the JSON
pub fn parse_research_reply(content: &str) -> Result<EnrichmentRecord, EnrichmentError> {
    let cleaned = content.replace("```json", "").replace("```", "");
    let value: Value = serde_json::from_str(cleaned.trim())?;

    let Value::Object(record) = value else {
        return Err(EnrichmentError::NotAnObject);
    };

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !record.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EnrichmentError::MissingFields(missing));
    }

    Ok(record)
}

/// Error for a non-success response; the body may be JSON or plain text
pub fn api_error(status: u16, body: &str) -> EnrichmentError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let text: String = body.trim().chars().take(500).collect();
            if text.is_empty() {
                "unknown API error".to_string()
            } else {
                text
            }
        });
    EnrichmentError::ApiError { status, message }
}

pub fn is_skipped_entity(entity_name: &str) -> bool {
    entity_name.to_lowercase().contains(SKIPPED_ENTITY_TERM)
}

/// Counters for one enrichment pass
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnrichSummary {
    pub skipped: usize,
    pub cached: usize,
    pub researched: usize,
    pub failed: usize,
}

impl EnrichSummary {
    /// Companies that ended up with enrichment data
    pub fn enriched(&self) -> usize {
        self.cached + self.researched
    }
}

// ============================================================================
// RESEARCHERS AND DRIVER
// ============================================================================

#[cfg(feature = "remote")]
pub use remote::{enrich_companies, CompanyResearcher, EnrichOptions, OpenAiResearcher};

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use crate::config::EnrichConfig;
    use crate::records::Company;
    use async_trait::async_trait;
    use std::time::Duration;
    use tracing::info;

    #[async_trait]
    pub trait CompanyResearcher: Send + Sync {
        async fn research(
            &self,
            entity_name: &str,
            dockets: &[String],
        ) -> Result<EnrichmentRecord, EnrichmentError>;
    }

    /// Chat-completions researcher (OpenAI or any compatible endpoint)
    pub struct OpenAiResearcher {
        api_key: String,
        config: EnrichConfig,
        client: reqwest::Client,
    }

    impl OpenAiResearcher {
        pub fn new(api_key: impl Into<String>, config: EnrichConfig) -> Result<Self, EnrichmentError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;
            Ok(OpenAiResearcher {
                api_key: api_key.into(),
                config,
                client,
            })
        }
    }

    #[async_trait]
    impl CompanyResearcher for OpenAiResearcher {
        async fn research(
            &self,
            entity_name: &str,
            dockets: &[String],
        ) -> Result<EnrichmentRecord, EnrichmentError> {
            let body = serde_json::json!({
                "model": self.config.model,
                "messages": [
                    {"role": "system", "content": ANALYST_SYSTEM_PROMPT},
                    {"role": "user", "content": build_research_prompt(entity_name, dockets, &[])},
                ],
                "max_tokens": self.config.max_tokens,
                "temperature": self.config.temperature,
            });

            let resp = self
                .client
                .post(&self.config.api_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = resp.status().as_u16();
            let text = resp.text().await?;
            if status >= 400 {
                return Err(api_error(status, &text));
            }

            let json: Value = serde_json::from_str(&text)?;
            let content = json["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or("");
            parse_research_reply(content)
        }
    }

    #[derive(Debug, Clone)]
    pub struct EnrichOptions {
        /// Pause between two researcher calls
        pub delay: Duration,
        /// Persist the cache after every N companies; 0 only at the end
        pub flush_every: usize,
    }

    impl From<&EnrichConfig> for EnrichOptions {
        fn from(config: &EnrichConfig) -> Self {
            EnrichOptions {
                delay: Duration::from_secs(config.delay_secs),
                flush_every: config.flush_every,
            }
        }
    }

    /// Attach enrichment to each company.
    ///
    /// Agency entries are dropped, cache hits are served without a call, and a
    /// failed lookup leaves an empty enrichment. The cache is persisted every
    /// `flush_every` companies and once at the end.
    pub async fn enrich_companies(
        companies: Vec<Company>,
        researcher: &dyn CompanyResearcher,
        cache: &mut EnrichmentCache,
        options: &EnrichOptions,
    ) -> Result<(Vec<Company>, EnrichSummary)> {
        let mut summary = EnrichSummary::default();
        let mut enriched = Vec::with_capacity(companies.len());

        let (kept, skipped): (Vec<Company>, Vec<Company>) = companies
            .into_iter()
            .partition(|c| !is_skipped_entity(&c.entity_name));
        summary.skipped = skipped.len();
        info!(companies = kept.len(), cached = cache.len(), "enriching companies");

        let total = kept.len();
        let mut called = false;

        for (index, mut company) in kept.into_iter().enumerate() {
            if let Some(record) = cache.get(&company.normalized_name) {
                company.enrichment = record.clone();
                summary.cached += 1;
                enriched.push(company);
                continue;
            }

            if called && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
            called = true;

            info!(position = index + 1, total, name = %company.entity_name, "researching");
            match researcher.research(&company.entity_name, &company.dockets()).await {
                Ok(record) => {
                    cache.insert(&company.normalized_name, record.clone());
                    company.enrichment = record;
                    summary.researched += 1;
                }
                Err(e) => {
                    warn!(name = %company.entity_name, error = %e, "enrichment failed");
                    company.enrichment = EnrichmentRecord::new();
                    summary.failed += 1;
                }
            }
            enriched.push(company);

            if options.flush_every > 0 && (index + 1) % options.flush_every == 0 {
                cache.persist()?;
            }
        }

        cache.persist()?;
        Ok((enriched, summary))
    }
}

// ============================================================================
// TESTS
// ============================================================================
