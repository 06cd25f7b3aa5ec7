// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Use library instead of local modules
use filing_registry::config::{self, PipelineConfig};
use filing_registry::pipeline::structure_step;
use filing_registry::scheduler::{self, JobInterval};

#[derive(Debug, Parser)]
#[command(name = "filing-registry", version, about = "VoIP numbering authorization filing registry")]
struct Cli {
    /// Path to a TOML config file (default: ./filing-registry.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch filings from ECFS into the raw directory
    Fetch,
    /// Build validated company records from the raw filings
    Structure,
    /// Research structured companies and write the enriched outputs
    Enrich,
    /// Download filing documents
    Download {
        /// Maximum documents to download (0 = all)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run fetch → structure → enrich → download
    Run {
        #[arg(long)]
        skip_fetch: bool,
        #[arg(long)]
        skip_enrich: bool,
        #[arg(long)]
        skip_download: bool,
        /// Number of documents to download (0 = all)
        #[arg(long, default_value_t = 0)]
        doc_limit: usize,
    },
    /// Manage scheduler jobs; without an action, run the job loop
    Schedule {
        #[command(subcommand)]
        action: Option<ScheduleAction>,
    },
    /// Browse structured companies in the terminal
    Browse,
}

#[derive(Debug, Subcommand)]
enum ScheduleAction {
    /// Run pipeline jobs from the scheduler jobs file (default)
    Run,
    /// Add a recurring job
    Add {
        /// hourly, daily or weekly (Mondays)
        #[arg(long)]
        interval: JobInterval,
        /// Local run time as HH:MM
        #[arg(long)]
        time: Option<String>,
    },
    /// List jobs and their next run
    List,
    /// Remove a job by id
    Remove { id: String },
}

fn main() -> Result<()> {
    config::load_dotenv();
    let cli = Cli::parse();

    // The TUI owns the terminal, so logging stays quiet there unless RUST_LOG asks
    let default_level = if matches!(cli.command, Command::Browse) { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Structure => run_structure(&config),
        Command::Browse => run_ui_mode(&config),
        Command::Fetch => remote::fetch(&config),
        Command::Enrich => remote::enrich(&config),
        Command::Download { limit } => {
            remote::download(&config, limit.unwrap_or(config.download.limit))
        }
        Command::Run {
            skip_fetch,
            skip_enrich,
            skip_download,
            doc_limit,
        } => remote::run(&config, skip_fetch, skip_enrich, skip_download, doc_limit),
        Command::Schedule { action } => match action.unwrap_or(ScheduleAction::Run) {
            ScheduleAction::Run => remote::schedule(&config),
            ScheduleAction::Add { interval, time } => add_job(&config, interval, time.as_deref()),
            ScheduleAction::List => list_jobs(&config),
            ScheduleAction::Remove { id } => remove_job(&config, &id),
        },
    }
}

fn run_structure(config: &PipelineConfig) -> Result<()> {
    println!("🏗️  Structuring filings");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let outcome = structure_step(config)?;

    println!("\n📂 Scoped filings:     {}", outcome.scoped_filings);
    println!("🚫 Excluded filings:   {}", outcome.excluded_filings);
    println!("🔗 Groups:             {} → {} after merging", outcome.initial_groups, outcome.merged_groups);
    println!("🚪 Not emitted:        {}", outcome.gated_clusters);
    println!("\n✓ {}", outcome.stats.summary());
    for sample in &outcome.stats.error_samples {
        println!("  ✗ {}: {}", sample.name, sample.error);
    }
    println!("\n✅ Wrote {} companies to {:?}", outcome.companies.len(), config.paths.companies_json());

    Ok(())
}

fn add_job(config: &PipelineConfig, interval: JobInterval, time: Option<&str>) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    let job = scheduler::add_job(&config.paths.scheduler_jobs(), interval, time, now)?;
    println!("✅ Added {} job {} at {}", job.interval, job.label(), job.time.as_deref().unwrap_or("-"));
    Ok(())
}

fn list_jobs(config: &PipelineConfig) -> Result<()> {
    let jobs = scheduler::load_jobs(&config.paths.scheduler_jobs());
    if jobs.is_empty() {
        println!("No scheduled jobs. Add one with: filing-registry schedule add --interval daily --time 09:00");
        return Ok(());
    }

    let now = chrono::Local::now().naive_local();
    println!("⏳ Scheduled jobs ({})", jobs.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<16} {:<8} {:<6} {:<17} Next run", "Id", "Interval", "Time", "Created");
    for job in &jobs {
        let next = scheduler::next_run(job, now)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never (no valid time)".to_string());
        println!(
            "{:<16} {:<8} {:<6} {:<17} {}",
            job.label(),
            job.interval,
            job.time.as_deref().unwrap_or("-"),
            job.created_at.as_deref().unwrap_or("-"),
            next
        );
    }
    Ok(())
}

fn remove_job(config: &PipelineConfig, id: &str) -> Result<()> {
    if scheduler::remove_job(&config.paths.scheduler_jobs(), id)? {
        println!("🗑️  Removed job {}", id);
    } else {
        println!("⚠️  No job with id {}", id);
    }
    Ok(())
}

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use anyhow::Context;
    use filing_registry::pipeline::{download_step, enrich_step, fetch_step, run_pipeline, RunOptions};
    use filing_registry::scheduler::{load_jobs, Scheduler, POLL_INTERVAL_SECS, SCHEDULED_DOC_LIMIT};
    use std::time::Duration;

    fn runtime() -> Result<tokio::runtime::Runtime> {
        tokio::runtime::Runtime::new().context("Failed to start async runtime")
    }

    pub fn fetch(config: &PipelineConfig) -> Result<()> {
        println!("📡 Fetching filings from ECFS...");
        let count = runtime()?.block_on(fetch_step(config))?;
        println!("✅ Wrote {} filings to {:?}", count, config.paths.raw_json());
        Ok(())
    }

    pub fn enrich(config: &PipelineConfig) -> Result<()> {
        println!("🔎 Enriching companies...");
        let summary = runtime()?.block_on(enrich_step(config))?;
        println!(
            "✅ Enriched {} ({} cached, {} researched), {} failed, {} skipped",
            summary.enriched(),
            summary.cached,
            summary.researched,
            summary.failed,
            summary.skipped
        );
        Ok(())
    }

    pub fn download(config: &PipelineConfig, limit: usize) -> Result<()> {
        println!("📥 Downloading documents...");
        let summary = runtime()?.block_on(download_step(config, limit))?;
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("  Successful: {}", summary.downloaded);
        println!("  Failed:     {}", summary.failed);
        println!("  Skipped:    {}", summary.skipped);
        println!("  Output:     {:?}", config.paths.documents_dir);
        Ok(())
    }

    pub fn run(
        config: &PipelineConfig,
        skip_fetch: bool,
        skip_enrich: bool,
        skip_download: bool,
        doc_limit: usize,
    ) -> Result<()> {
        let options = RunOptions {
            skip_fetch,
            skip_enrich,
            skip_download,
            doc_limit,
        };
        let stats = runtime()?.block_on(run_pipeline(config, &options))?;

        println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("🚀 PIPELINE COMPLETE in {:.1}s", stats.total_duration_seconds);
        for (step, seconds) in &stats.steps {
            println!("  ✓ {:<10} {:.1}s", step, seconds);
        }
        if let Some(report) = &stats.validation_report {
            println!("  {}", report.summary());
        }
        println!("Monitoring: run stats saved to {:?}", config.paths.run_stats());
        Ok(())
    }

    pub fn schedule(config: &PipelineConfig) -> Result<()> {
        let jobs_path = config.paths.scheduler_jobs();
        println!("⏰ Scheduler watching {:?} (Ctrl+C to stop)", jobs_path);

        runtime()?.block_on(async {
            let mut scheduler = Scheduler::new();
            let options = RunOptions {
                doc_limit: SCHEDULED_DOC_LIMIT,
                ..Default::default()
            };

            loop {
                let now = chrono::Local::now().naive_local();
                scheduler.reload(load_jobs(&jobs_path), now);

                for job in scheduler.take_due(now) {
                    tracing::info!(job = %job.label(), "triggering pipeline");
                    match run_pipeline(config, &options).await {
                        Ok(_) => tracing::info!(job = %job.label(), "job succeeded"),
                        Err(e) => tracing::error!(job = %job.label(), error = %format!("{:#}", e), "job failed"),
                    }
                }

                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        println!("\n⏹️  Scheduler stopped");
                        return Ok::<(), anyhow::Error>(());
                    }
                    _ = tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)) => {}
                }
            }
        })
    }
}

#[cfg(not(feature = "remote"))]
mod remote {
    use super::*;

    fn unavailable() -> Result<()> {
        eprintln!("❌ Remote steps not available!");
        eprintln!("   Rebuild with: cargo build --features remote");
        std::process::exit(1);
    }

    pub fn fetch(_config: &PipelineConfig) -> Result<()> {
        unavailable()
    }

    pub fn enrich(_config: &PipelineConfig) -> Result<()> {
        unavailable()
    }

    pub fn download(_config: &PipelineConfig, _limit: usize) -> Result<()> {
        unavailable()
    }

    pub fn run(
        _config: &PipelineConfig,
        _skip_fetch: bool,
        _skip_enrich: bool,
        _skip_download: bool,
        _doc_limit: usize,
    ) -> Result<()> {
        unavailable()
    }

    pub fn schedule(_config: &PipelineConfig) -> Result<()> {
        unavailable()
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &PipelineConfig) -> Result<()> {
    use filing_registry::data_quality::load_validation_history;
    use filing_registry::records::load_companies;

    println!("🖥️  Loading Filing Registry UI...\n");

    // Prefer enriched output when it exists
    let enriched = config.paths.enriched_json();
    let path = if enriched.exists() { enriched } else { config.paths.companies_json() };

    if !path.exists() {
        eprintln!("❌ No structured companies found!");
        eprintln!("   Run: filing-registry structure");
        eprintln!("   to build company records first.");
        std::process::exit(1);
    }

    println!("📊 Loading companies...");
    let companies = load_companies(&path)?;
    let history = load_validation_history(&config.paths.validation_stats());
    println!("✓ Loaded {} companies\n", companies.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(companies, history);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &PipelineConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin registry-server --features server");
    std::process::exit(1);
}
