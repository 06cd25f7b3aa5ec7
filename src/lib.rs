// Filing Registry - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod records;        // Raw filings and structured company/filing records
pub mod normalize;      // Name Normalizer
pub mod similarity;     // Sequence ratio and plural-token cost
pub mod rules;          // Entity Classifier and exclusion rules
pub mod deduplication;  // Similarity Merger
pub mod schema;         // Shape Layer - Schema Validation
pub mod history;        // Append-only JSON history files
pub mod data_quality;   // Validation Reporter
pub mod assembler;      // Record Assembler
pub mod config;         // Pipeline configuration
pub mod export;         // JSON and CSV writers
pub mod fetch;          // ECFS fetch collaborator
pub mod enrichment;     // Company research collaborator
pub mod download;       // Document download collaborator
pub mod scheduler;      // Recurring runs
pub mod pipeline;       // Step orchestration and run stats

// Re-export commonly used types
pub use records::{
    Company, EntityType, Filing, RawFiling,
    load_companies, load_raw_filings, split_joined,
};
pub use normalize::normalize_company_name;
pub use similarity::{sequence_ratio, token_plural_cost};
pub use rules::{EntityRules, RuleTables};
pub use deduplication::{
    ClusterArena, DeduplicationEngine, EntityCluster, MergeDecision, MergeStrategy,
};
pub use schema::{SchemaValidator, ValidationError, ValidationResult};
pub use data_quality::{
    ErrorSample, ValidationStats, ValidationTracker,
    append_validation_stats, load_validation_history,
};
pub use assembler::{
    ProceedingFilter, StructureOptions, StructureOutcome,
    company_id, structure_filings,
};
pub use config::PipelineConfig;
pub use pipeline::{RunStats, RunStatus, load_run_history, structure_step};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
