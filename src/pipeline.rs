// 🚀 Pipeline - fetch → structure → enrich → download, with run history
//
// Structuring is synchronous and always available. The remote steps and the
// full run need the `remote` feature.

use crate::assembler::{structure_filings, StructureOutcome};
use crate::config::PipelineConfig;
use crate::data_quality::{append_validation_stats, ValidationStats};
use crate::export;
use crate::history::load_history;
use crate::records::load_raw_filings;
use crate::rules::EntityRules;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutputs {
    pub raw_filings: String,
    pub structured_companies: String,
    pub enriched_data: String,
    pub documents_folder: String,
}

impl RunOutputs {
    pub fn from_config(config: &PipelineConfig) -> Self {
        RunOutputs {
            raw_filings: config.paths.raw_json().display().to_string(),
            structured_companies: config.paths.companies_csv().display().to_string(),
            enriched_data: config.paths.enriched_json().display().to_string(),
            documents_folder: config.paths.documents_dir.display().to_string(),
        }
    }
}

/// One pipeline run, appended to run_stats.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub status: RunStatus,
    pub timestamp: DateTime<Utc>,
    pub total_duration_seconds: f64,
    #[serde(default)]
    pub validation_report: Option<ValidationStats>,
    /// Seconds per executed step
    #[serde(default)]
    pub steps: BTreeMap<String, f64>,
    #[serde(default)]
    pub outputs: Option<RunOutputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn load_run_history(path: &Path) -> Vec<RunStats> {
    load_history(path)
}

#[cfg(any(feature = "remote", test))]
fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// Rule tables from the configured file, or the built-in lists
pub fn load_rules(config: &PipelineConfig) -> Result<EntityRules> {
    match &config.paths.rules_file {
        Some(path) => EntityRules::from_file(path),
        None => Ok(EntityRules::default()),
    }
}

// ============================================================================
// STRUCTURE STEP
// ============================================================================

/// Read the raw filings, structure them, write the outputs and record validation stats
pub fn structure_step(config: &PipelineConfig) -> Result<StructureOutcome> {
    let rules = load_rules(config)?;
    let raw_path = config.paths.raw_json();
    let filings = load_raw_filings(&raw_path)?;
    info!(filings = filings.len(), path = ?raw_path, "loaded raw filings");

    let outcome = structure_filings(&filings, &rules, &config.structure.options());

    export::write_companies_json(&config.paths.companies_json(), &outcome.companies)?;
    export::write_companies_csv(&config.paths.companies_csv(), &outcome.companies)?;
    export::write_filings_csv(&config.paths.filings_csv(), &outcome.companies)?;
    append_validation_stats(&config.paths.validation_stats(), &outcome.stats)
        .context("Failed to record validation stats")?;

    Ok(outcome)
}

// ============================================================================
// REMOTE STEPS AND FULL RUN
// ============================================================================

#[cfg(feature = "remote")]
pub use remote::{download_step, enrich_step, fetch_step, run_pipeline, RunOptions};

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use crate::config::{fcc_api_key, openai_api_key};
    use crate::download::{build_download_queue, DocumentDownloader, DownloadSummary};
    use crate::enrichment::{
        enrich_companies, EnrichOptions, EnrichSummary, EnrichmentCache, OpenAiResearcher,
    };
    use crate::fetch::EcfsClient;
    use crate::history::{append_history, latest_entry};
    use crate::records::load_companies;
    use anyhow::bail;
    use std::future::Future;
    use std::time::Instant;
    use tracing::warn;

    #[derive(Debug, Clone, Default)]
    pub struct RunOptions {
        pub skip_fetch: bool,
        pub skip_enrich: bool,
        pub skip_download: bool,
        /// 0 downloads everything
        pub doc_limit: usize,
    }

    /// Fetch every configured query and write the raw JSON and CSV
    pub async fn fetch_step(config: &PipelineConfig) -> Result<usize> {
        let Some(api_key) = fcc_api_key() else {
            bail!("FCC_ECFS_API_KEY is not set");
        };

        let client = EcfsClient::new(api_key, config.fetch.clone())?;
        let filings = client.fetch_all().await;
        if filings.is_empty() {
            bail!("No filings found");
        }

        export::write_raw_json(&config.paths.raw_json(), &filings)?;
        export::write_raw_csv(&config.paths.raw_csv(), &filings)?;
        info!(filings = filings.len(), "wrote raw filings");

        Ok(filings.len())
    }

    /// Enrich structured companies and write the enriched JSON and CSV
    pub async fn enrich_step(config: &PipelineConfig) -> Result<EnrichSummary> {
        let Some(api_key) = openai_api_key() else {
            bail!("OPENAI_API_KEY is not set");
        };

        let companies = load_companies(&config.paths.companies_json())?;
        let researcher = OpenAiResearcher::new(api_key, config.enrich.clone())?;
        let mut cache = EnrichmentCache::load(&config.paths.enrichment_cache);

        let (enriched, summary) = enrich_companies(
            companies,
            &researcher,
            &mut cache,
            &EnrichOptions::from(&config.enrich),
        )
        .await?;

        export::write_json(&config.paths.enriched_json(), &enriched)?;
        export::write_enriched_csv(&config.paths.enriched_csv(), &enriched)?;
        Ok(summary)
    }

    /// Download the filing documents of the structured companies
    pub async fn download_step(config: &PipelineConfig, limit: usize) -> Result<DownloadSummary> {
        let companies = load_companies(&config.paths.companies_json())?;
        let queue = build_download_queue(&companies, &config.paths.documents_dir, limit);
        if queue.is_empty() {
            info!("no documents to download");
            return Ok(DownloadSummary::default());
        }

        let downloader = DocumentDownloader::new(config.download.clone())?;
        Ok(downloader.download_all(&queue).await)
    }

    async fn timed<T, F>(steps: &mut BTreeMap<String, f64>, name: &str, step: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        info!(step = name, "starting step");
        let started = Instant::now();
        let result = step.await;
        let seconds = started.elapsed().as_secs_f64();
        steps.insert(name.to_string(), round2(seconds));
        if result.is_ok() {
            info!(step = name, seconds = round2(seconds), "step completed");
        }
        result.with_context(|| format!("Step '{}' failed", name))
    }

    async fn run_steps(
        config: &PipelineConfig,
        options: &RunOptions,
        steps: &mut BTreeMap<String, f64>,
    ) -> Result<()> {
        for dir in [
            &config.paths.raw_dir,
            &config.paths.structured_dir,
            &config.paths.enriched_dir,
            &config.paths.monitoring_dir,
            &config.paths.documents_dir,
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }

        if options.skip_fetch {
            info!("fetch step skipped");
        } else {
            timed(steps, "fetch", fetch_step(config)).await?;
        }

        timed(steps, "structure", async { structure_step(config) }).await?;

        if options.skip_enrich {
            info!("enrich step skipped");
        } else {
            timed(steps, "enrich", enrich_step(config)).await?;
        }

        if options.skip_download {
            info!("download step skipped");
        } else {
            timed(steps, "download", download_step(config, options.doc_limit)).await?;
        }

        Ok(())
    }

    /// Run the pipeline and append its stats to the run history, failed runs included
    pub async fn run_pipeline(config: &PipelineConfig, options: &RunOptions) -> Result<RunStats> {
        let started = Instant::now();
        let mut steps = BTreeMap::new();
        let result = run_steps(config, options, &mut steps).await;

        let stats = RunStats {
            status: if result.is_ok() { RunStatus::Success } else { RunStatus::Failed },
            timestamp: Utc::now(),
            total_duration_seconds: round2(started.elapsed().as_secs_f64()),
            validation_report: latest_entry(&config.paths.validation_stats()),
            steps,
            outputs: Some(RunOutputs::from_config(config)),
            error: result.as_ref().err().map(|e| format!("{:#}", e)),
        };

        if let Err(e) = append_history(&config.paths.run_stats(), &stats) {
            warn!(error = %e, "could not record run stats");
        }

        result.map(|()| stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_quality::load_validation_history;
    use crate::history::append_history;
    use crate::records::{load_companies, RawFiling};

    fn config_in(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.paths.raw_dir = dir.join("raw");
        config.paths.structured_dir = dir.join("structured");
        config.paths.enriched_dir = dir.join("enriched");
        config.paths.monitoring_dir = dir.join("monitoring");
        config.paths.documents_dir = dir.join("documents");
        config.paths.enrichment_cache = dir.join("enrichment_cache.json");
        config
    }

    #[test]
    fn test_structure_step_writes_outputs_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let filings = vec![
            RawFiling::new("1", "Acme Voice LLC")
                .with_date("2024-02-01")
                .with_submission_type("APPLICATION")
                .with_docket("INBOX-52.15"),
            RawFiling::new("2", "Unrelated Corp")
                .with_date("2024-02-02")
                .with_submission_type("APPLICATION")
                .with_docket("23-999")
                .with_proceeding("Broadband data collection"),
        ];
        export::write_raw_json(&config.paths.raw_json(), &filings).unwrap();

        let outcome = structure_step(&config).unwrap();
        assert_eq!(outcome.scoped_filings, 1);
        assert_eq!(outcome.companies.len(), 1);

        let companies = load_companies(&config.paths.companies_json()).unwrap();
        assert_eq!(companies[0].normalized_name, "acme voice");
        assert!(config.paths.companies_csv().exists());
        assert!(config.paths.filings_csv().exists());

        let history = load_validation_history(&config.paths.validation_stats());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].valid_records, 1);
    }

    #[test]
    fn test_structure_step_missing_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(structure_step(&config_in(dir.path())).is_err());
    }

    #[test]
    fn test_round2_keeps_hundredths() {
        assert_eq!(round2(0.004), 0.0);
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(42.0), 42.0);
    }

    #[test]
    fn test_run_stats_history_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_stats.json");
        std::fs::write(&path, r#"{"status": "failed", "timestamp": "2024-01-01T00:00:00Z", "total_duration_seconds": 1.5}"#)
            .unwrap();

        let stats = RunStats {
            status: RunStatus::Success,
            timestamp: Utc::now(),
            total_duration_seconds: round2(12.3456),
            validation_report: None,
            steps: BTreeMap::from([("structure".to_string(), 0.25)]),
            outputs: None,
            error: None,
        };
        append_history(&path, &stats).unwrap();

        let history = load_run_history(&path);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, RunStatus::Failed);
        assert_eq!(history[1].total_duration_seconds, 12.35);
    }
}
