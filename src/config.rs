// ⚙️ Pipeline Configuration
// Reads filing-registry.toml (or FILING_REGISTRY_CONFIG / --config); every key is optional.
// API keys come from the environment, with .env support.

use crate::assembler::{ProceedingFilter, StructureOptions};
use crate::data_quality::VALIDATION_STATS_FILE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "filing-registry.toml";
pub const CONFIG_ENV_VAR: &str = "FILING_REGISTRY_CONFIG";
pub const FCC_API_KEY_ENV: &str = "FCC_ECFS_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const RAW_FILINGS_STEM: &str = "ipes_filings";
pub const COMPANIES_JSON: &str = "companies_with_filings.json";
pub const COMPANIES_CSV: &str = "companies.csv";
pub const FILINGS_CSV: &str = "filings.csv";
pub const ENRICHED_JSON: &str = "companies_enriched.json";
pub const ENRICHED_CSV: &str = "companies_enriched.csv";
pub const RUN_STATS_FILE: &str = "run_stats.json";
pub const SCHEDULER_JOBS_FILE: &str = "scheduler_jobs.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub structure: StructureConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub structured_dir: PathBuf,
    pub enriched_dir: PathBuf,
    pub monitoring_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub enrichment_cache: PathBuf,
    /// Optional JSON rule tables overriding the built-in classifier lists
    pub rules_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            raw_dir: PathBuf::from("data/raw"),
            structured_dir: PathBuf::from("data/structured"),
            enriched_dir: PathBuf::from("data/enriched"),
            monitoring_dir: PathBuf::from("data/monitoring"),
            documents_dir: PathBuf::from("documents"),
            enrichment_cache: PathBuf::from("enrichment_cache.json"),
            rules_file: None,
        }
    }
}

impl PathsConfig {
    pub fn raw_json(&self) -> PathBuf {
        self.raw_dir.join(format!("{}.json", RAW_FILINGS_STEM))
    }

    pub fn raw_csv(&self) -> PathBuf {
        self.raw_dir.join(format!("{}.csv", RAW_FILINGS_STEM))
    }

    pub fn companies_json(&self) -> PathBuf {
        self.structured_dir.join(COMPANIES_JSON)
    }

    pub fn companies_csv(&self) -> PathBuf {
        self.structured_dir.join(COMPANIES_CSV)
    }

    pub fn filings_csv(&self) -> PathBuf {
        self.structured_dir.join(FILINGS_CSV)
    }

    pub fn enriched_json(&self) -> PathBuf {
        self.enriched_dir.join(ENRICHED_JSON)
    }

    pub fn enriched_csv(&self) -> PathBuf {
        self.enriched_dir.join(ENRICHED_CSV)
    }

    pub fn validation_stats(&self) -> PathBuf {
        self.monitoring_dir.join(VALIDATION_STATS_FILE)
    }

    pub fn run_stats(&self) -> PathBuf {
        self.monitoring_dir.join(RUN_STATS_FILE)
    }

    pub fn scheduler_jobs(&self) -> PathBuf {
        self.monitoring_dir.join(SCHEDULER_JOBS_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub queries: Vec<String>,
    pub page_size: usize,
    /// Per-query cap; 0 fetches everything
    pub max_records: usize,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: "https://publicapi.fcc.gov/ecfs".to_string(),
            queries: vec![
                r#"proceedings.name:"INBOX-52.15""#.to_string(),
                r#"proceedings.description:"Interconnected VoIP Numbering Authorization""#
                    .to_string(),
                r#"proceedings.description:"52.15""#.to_string(),
            ],
            page_size: 100,
            max_records: 0,
            page_delay_ms: 500,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Restrict structuring to the proceedings below
    pub scope_to_proceedings: bool,
    pub proceeding_filter: ProceedingFilter,
}

impl Default for StructureConfig {
    fn default() -> Self {
        StructureConfig {
            scope_to_proceedings: true,
            proceeding_filter: ProceedingFilter::voip_numbering(),
        }
    }
}

impl StructureConfig {
    pub fn options(&self) -> StructureOptions {
        StructureOptions {
            proceeding_filter: self
                .scope_to_proceedings
                .then(|| self.proceeding_filter.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Pause between uncached lookups
    pub delay_secs: u64,
    /// Persist the cache after this many companies
    pub flush_every: usize,
    pub timeout_secs: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        EnrichConfig {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 300,
            temperature: 0.3,
            delay_secs: 21,
            flush_every: 10,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// 0 downloads every queued document
    pub limit: usize,
    pub delay_ms: u64,
    /// Existing files at least this large count as downloaded
    pub min_existing_bytes: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        DownloadConfig {
            limit: 0,
            delay_ms: 1500,
            min_existing_bytes: 1000,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (compatible; filing-registry/0.1)".to_string(),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl PipelineConfig {
    /// Parse a TOML document; absent sections and keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse pipeline config TOML")
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; otherwise FILING_REGISTRY_CONFIG or
    /// ./filing-registry.toml is used when present, and defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = std::env::var(CONFIG_ENV_VAR)
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
                if !candidate.exists() {
                    return Ok(PipelineConfig::default());
                }
                candidate
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }
}

/// Load .env into the process environment if one exists
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

pub fn fcc_api_key() -> Option<String> {
    non_empty_env(FCC_API_KEY_ENV)
}

pub fn openai_api_key() -> Option<String> {
    non_empty_env(OPENAI_API_KEY_ENV)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [paths]
            raw_dir = "/tmp/raw"

            [enrich]
            delay_secs = 0

            [structure]
            scope_to_proceedings = false
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.raw_dir, PathBuf::from("/tmp/raw"));
        assert_eq!(config.paths.structured_dir, PathBuf::from("data/structured"));
        assert_eq!(config.enrich.delay_secs, 0);
        assert_eq!(config.enrich.model, "gpt-4o-mini");
        assert!(config.structure.options().proceeding_filter.is_none());
        assert_eq!(config.fetch.queries.len(), 3);
    }

    #[test]
    fn test_default_structure_options_scope_proceedings() {
        let options = PipelineConfig::default().structure.options();
        assert_eq!(options.proceeding_filter, Some(ProceedingFilter::voip_numbering()));
    }

    #[test]
    fn test_derived_paths() {
        let paths = PathsConfig::default();
        assert_eq!(paths.raw_json(), PathBuf::from("data/raw/ipes_filings.json"));
        assert_eq!(
            paths.validation_stats(),
            PathBuf::from("data/monitoring/validation_stats.json")
        );
        assert_eq!(
            paths.companies_json(),
            PathBuf::from("data/structured/companies_with_filings.json")
        );
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PipelineConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "[download]\nlimit = 5\n").unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.download.limit, 5);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(PipelineConfig::from_toml_str("[paths\nraw_dir = 1").is_err());
    }
}
