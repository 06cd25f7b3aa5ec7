// 🏷️ Entity Rules - Rules as Data
// Predicate tables for exclusion, individual-vs-company and applicant detection

use anyhow::{Context as AnyhowContext, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::records::{EntityType, RawFiling};

/// Names with more whitespace tokens than this are never individuals
pub const MAX_INDIVIDUAL_TOKENS: usize = 3;

// ============================================================================
// RULE TABLES
// ============================================================================

/// Serializable form of the rule tables (the rules file format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTables {
    /// Regexes (on the lowercased name) for institutional filers to drop entirely
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Substrings that mark a name as a business
    #[serde(default = "default_business_indicators")]
    pub business_indicators: Vec<String>,

    /// Substrings of the uppercased submission type that mark an application
    #[serde(default = "default_application_markers")]
    pub application_markers: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    [
        r"wireline competition bureau",
        r"^fcc\b",
        r"federal communications commission",
        r"national telecommunications and information",
        r"department of justice",
        r"national association of regulatory",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_business_indicators() -> Vec<String> {
    [
        "llc",
        "inc",
        "corp",
        "company",
        "co.",
        "communications",
        "telecom",
        "voip",
        "network",
        "services",
        "solutions",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_application_markers() -> Vec<String> {
    ["APPLICATION", "REQUEST", "PETITION"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for RuleTables {
    fn default() -> Self {
        RuleTables {
            exclude_patterns: default_exclude_patterns(),
            business_indicators: default_business_indicators(),
            application_markers: default_application_markers(),
        }
    }
}

// ============================================================================
// ENTITY RULES
// ============================================================================

/// Compiled rule tables
#[derive(Debug, Clone)]
pub struct EntityRules {
    exclude: Vec<Regex>,
    business_indicators: Vec<String>,
    application_markers: Vec<String>,
}

impl EntityRules {
    /// Compile rule tables. Invalid exclusion regexes are skipped with a warning.
    pub fn from_tables(tables: RuleTables) -> Self {
        let exclude = tables
            .exclude_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "skipping invalid exclusion pattern");
                    None
                }
            })
            .collect();

        EntityRules {
            exclude,
            business_indicators: tables
                .business_indicators
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            application_markers: tables
                .application_markers
                .iter()
                .map(|s| s.to_uppercase())
                .collect(),
        }
    }

    /// Load rule tables from a JSON file; absent keys fall back to the built-in lists
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let tables: RuleTables =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(EntityRules::from_tables(tables))
    }

    /// Institutional filer that never enters a cluster
    pub fn should_exclude(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.exclude.iter().any(|re| re.is_match(&lower))
    }

    /// Short names without any business indicator look like people
    pub fn is_likely_individual(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let has_business_word = self
            .business_indicators
            .iter()
            .any(|indicator| lower.contains(indicator.as_str()));

        name.split_whitespace().count() <= MAX_INDIVIDUAL_TOKENS && !has_business_word
    }

    pub fn classify(&self, name: &str) -> EntityType {
        if self.is_likely_individual(name) {
            EntityType::Individual
        } else {
            EntityType::Company
        }
    }

    /// Application, request or petition type submission
    pub fn is_application(&self, filing: &RawFiling) -> bool {
        let submission_type = filing.submission_type.to_uppercase();
        self.application_markers
            .iter()
            .any(|marker| submission_type.contains(marker.as_str()))
    }

    pub fn has_application<'a, I>(&self, filings: I) -> bool
    where
        I: IntoIterator<Item = &'a RawFiling>,
    {
        filings.into_iter().any(|f| self.is_application(f))
    }
}

impl Default for EntityRules {
    fn default() -> Self {
        EntityRules::from_tables(RuleTables::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
