// 📄 Filing Records - raw fetch output and the structured company/filing shape
// Raw records are read permissively; structured records are what downstream tools consume

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;

/// Separator used by the fetch step to join multi-valued fields
pub const FIELD_SEPARATOR: &str = "; ";

// ============================================================================
// RAW FILING
// ============================================================================

/// RawFiling - one flattened submission as produced by the fetch collaborator.
/// Missing or null fields read as empty strings; nothing here ever fails to parse
/// because of a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFiling {
    #[serde(default, deserialize_with = "nullable_string")]
    pub submission_id: String,

    /// Filer name(s), joined by "; " when the API lists several filers
    #[serde(default, deserialize_with = "nullable_string")]
    pub company_name: String,

    /// ISO date (YYYY-MM-DD), possibly truncated or empty
    #[serde(default, deserialize_with = "nullable_string")]
    pub date_received: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub submission_type: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub docket_number: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub proceeding_description: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub bureau: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub filing_status: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub contact_attorney: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub law_firm: String,

    /// Ordered document links. Accepts the joined string form or a JSON array.
    #[serde(
        default,
        deserialize_with = "joined_or_list",
        serialize_with = "join_urls"
    )]
    pub document_urls: Vec<String>,

    #[serde(default, deserialize_with = "nullable_string")]
    pub detail_url: String,
}

impl RawFiling {
    /// Builder used by tests and the fetch normalizer
    pub fn new(submission_id: &str, company_name: &str) -> Self {
        RawFiling {
            submission_id: submission_id.to_string(),
            company_name: company_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date_received = date.to_string();
        self
    }

    pub fn with_submission_type(mut self, submission_type: &str) -> Self {
        self.submission_type = submission_type.to_string();
        self
    }

    pub fn with_docket(mut self, docket: &str) -> Self {
        self.docket_number = docket.to_string();
        self
    }

    pub fn with_proceeding(mut self, description: &str) -> Self {
        self.proceeding_description = description.to_string();
        self
    }

    pub fn with_document_urls(mut self, joined: &str) -> Self {
        self.document_urls = split_joined(joined);
        self
    }
}

/// Split a "; "-joined field into its parts, dropping empty pieces
pub fn split_joined(joined: &str) -> Vec<String> {
    joined
        .split(FIELD_SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn joined_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UrlField {
        Joined(String),
        List(Vec<Option<String>>),
    }

    Ok(match Option::<UrlField>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(UrlField::Joined(s)) => split_joined(&s),
        Some(UrlField::List(items)) => items
            .into_iter()
            .flatten()
            .filter(|url| !url.trim().is_empty())
            .collect(),
    })
}

fn join_urls<S>(urls: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&urls.join(FIELD_SEPARATOR))
}

/// Load the raw filings array written by the fetch step
pub fn load_raw_filings(path: &Path) -> Result<Vec<RawFiling>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read raw filings: {:?}", path))?;

    let filings: Vec<RawFiling> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse raw filings JSON: {:?}", path))?;

    Ok(filings)
}

// ============================================================================
// STRUCTURED RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    Individual,
    Company,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Individual => "Individual",
            EntityType::Company => "Company",
        }
    }
}

/// Filing - child record, owned by exactly one Company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    pub filing_id: String,
    pub date_received: String,
    pub docket_number: String,
    pub submission_type: String,
    pub filing_status: String,
    #[serde(default)]
    pub document_urls: Vec<String>,
    pub detail_url: String,
}

impl Filing {
    pub fn primary_document_url(&self) -> &str {
        self.document_urls.first().map(String::as_str).unwrap_or("")
    }
}

impl From<&RawFiling> for Filing {
    fn from(raw: &RawFiling) -> Self {
        Filing {
            filing_id: raw.submission_id.clone(),
            date_received: raw.date_received.clone(),
            docket_number: raw.docket_number.clone(),
            submission_type: raw.submission_type.clone(),
            filing_status: raw.filing_status.clone(),
            document_urls: raw
                .document_urls
                .iter()
                .filter(|url| !url.is_empty())
                .cloned()
                .collect(),
            detail_url: raw.detail_url.clone(),
        }
    }
}

/// Company - a deduplicated filer with its filings, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Name-based UUID derived from `normalized_name`
    pub id: String,

    /// Longest raw name observed for this entity
    pub entity_name: String,

    pub normalized_name: String,

    pub entity_type: EntityType,

    pub is_applicant: bool,

    pub filing_count: usize,

    pub filings: Vec<Filing>,

    /// Filled by the enrichment collaborator; opaque to the core
    #[serde(default)]
    pub enrichment: serde_json::Map<String, serde_json::Value>,
}

impl Company {
    /// Date of the newest filing, empty when there is none
    pub fn latest_filing_date(&self) -> &str {
        self.filings
            .first()
            .map(|f| f.date_received.as_str())
            .unwrap_or("")
    }

    /// Distinct non-empty dockets in sorted order
    pub fn dockets(&self) -> Vec<String> {
        let mut dockets: Vec<String> = self
            .filings
            .iter()
            .map(|f| f.docket_number.clone())
            .filter(|d| !d.is_empty())
            .collect();
        dockets.sort();
        dockets.dedup();
        dockets
    }
}

/// Load structured (or enriched) companies from the nested JSON output
pub fn load_companies(path: &Path) -> Result<Vec<Company>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read companies: {:?}", path))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse companies JSON: {:?}", path))
}

// ============================================================================
// TESTS
// ============================================================================
