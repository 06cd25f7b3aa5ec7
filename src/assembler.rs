// 🏗️ Record Assembler - raw filings → validated company/filing records
//
// Pass order: scope filter → exclusion → normalize and group → merge →
// classify and assemble → emission gate → schema validation → sort.

use crate::data_quality::{ValidationStats, ValidationTracker};
use crate::deduplication::{ClusterArena, DeduplicationEngine, EntityCluster, MergeDecision};
use crate::normalize::normalize_company_name;
use crate::records::{Company, EntityType, Filing, RawFiling};
use crate::rules::EntityRules;
use crate::schema::{describe_errors, SchemaValidator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Namespace for company identifiers. Changing it changes every id.
pub const COMPANY_ID_NAMESPACE: Uuid = Uuid::NAMESPACE_DNS;

/// Deterministic company id: name-based UUID (v5) of the normalized name
pub fn company_id(normalized_name: &str) -> String {
    Uuid::new_v5(&COMPANY_ID_NAMESPACE, normalized_name.as_bytes()).to_string()
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Keeps only filings that belong to the proceedings of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceedingFilter {
    /// Substrings of the lowercased proceeding description
    pub description_terms: Vec<String>,

    /// Substrings of the lowercased docket number
    pub docket_terms: Vec<String>,
}

impl ProceedingFilter {
    /// VoIP numbering authorization (47 CFR 52.15) proceedings
    pub fn voip_numbering() -> Self {
        ProceedingFilter {
            description_terms: vec!["voip".to_string(), "52.15".to_string()],
            docket_terms: vec!["inbox-52.15".to_string()],
        }
    }

    pub fn matches(&self, filing: &RawFiling) -> bool {
        let description = filing.proceeding_description.to_lowercase();
        let docket = filing.docket_number.to_lowercase();

        self.description_terms
            .iter()
            .any(|term| description.contains(&term.to_lowercase()))
            || self
                .docket_terms
                .iter()
                .any(|term| docket.contains(&term.to_lowercase()))
    }
}

impl Default for ProceedingFilter {
    fn default() -> Self {
        Self::voip_numbering()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructureOptions {
    /// `None` keeps every filing
    pub proceeding_filter: Option<ProceedingFilter>,
}

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Debug, Clone)]
pub struct StructureOutcome {
    /// Emitted companies, most recent filing first
    pub companies: Vec<Company>,

    pub stats: ValidationStats,

    pub merges: Vec<MergeDecision>,

    /// Filings that passed the proceeding filter
    pub scoped_filings: usize,

    /// Filings dropped for an empty, excluded or unnormalizable name
    pub excluded_filings: usize,

    /// Distinct normalized keys before merging
    pub initial_groups: usize,

    /// Clusters left after merging
    pub merged_groups: usize,

    /// Clusters held back by the emission gate (individuals, non-applicants)
    pub gated_clusters: usize,
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Longest raw name in the cluster; the first one seen wins ties
pub fn primary_name(cluster: &EntityCluster) -> String {
    let mut best: Option<&str> = None;
    for filing in &cluster.filings {
        let name = filing.company_name.as_str();
        match best {
            Some(current) if current.chars().count() >= name.chars().count() => {}
            _ => best = Some(name),
        }
    }
    best.map(str::to_string).unwrap_or_else(|| cluster.key.clone())
}

/// Newest first; empty dates sort after every populated date
pub fn sort_filings_newest_first(filings: &mut [Filing]) {
    filings.sort_by(|a, b| b.date_received.cmp(&a.date_received));
}

/// Build the company record for a merged cluster (not yet validated)
pub fn assemble_company(cluster: &EntityCluster, rules: &EntityRules) -> Company {
    let entity_name = primary_name(cluster);
    let entity_type = rules.classify(&entity_name);
    let is_applicant = rules.has_application(&cluster.filings);

    let mut filings: Vec<Filing> = cluster.filings.iter().map(Filing::from).collect();
    sort_filings_newest_first(&mut filings);

    Company {
        id: company_id(&cluster.key),
        entity_name,
        normalized_name: cluster.key.clone(),
        entity_type,
        is_applicant,
        filing_count: filings.len(),
        filings,
        enrichment: Default::default(),
    }
}

/// Only applicant companies are emitted
pub fn passes_emission_gate(company: &Company) -> bool {
    company.is_applicant && company.entity_type != EntityType::Individual
}

/// Group filings by normalized name after scope and exclusion filtering
fn group_filings(
    filings: &[RawFiling],
    rules: &EntityRules,
    options: &StructureOptions,
) -> (BTreeMap<String, Vec<RawFiling>>, usize, usize) {
    let mut groups: BTreeMap<String, Vec<RawFiling>> = BTreeMap::new();
    let mut scoped = 0;
    let mut excluded = 0;

    for filing in filings {
        if let Some(filter) = &options.proceeding_filter {
            if !filter.matches(filing) {
                continue;
            }
        }
        scoped += 1;

        let name = filing.company_name.trim();
        if name.is_empty() || rules.should_exclude(name) {
            excluded += 1;
            continue;
        }

        let key = normalize_company_name(name);
        if key.is_empty() {
            excluded += 1;
            continue;
        }

        groups.entry(key).or_default().push(filing.clone());
    }

    (groups, scoped, excluded)
}

/// Turn a complete batch of raw filings into validated company records.
///
/// Never fails: invalid companies are counted and sampled in the stats, and an
/// empty batch yields no companies with zeroed stats.
pub fn structure_filings(
    filings: &[RawFiling],
    rules: &EntityRules,
    options: &StructureOptions,
) -> StructureOutcome {
    let (groups, scoped_filings, excluded_filings) = group_filings(filings, rules, options);
    let initial_groups = groups.len();
    info!(scoped = scoped_filings, excluded = excluded_filings, "filtered filings");
    info!(groups = initial_groups, "initially grouped into unique entities");

    let mut arena = ClusterArena::from_groups(groups);
    let merges = DeduplicationEngine::new().merge(&mut arena);
    let clusters = arena.into_live();
    let merged_groups = clusters.len();
    info!(groups = merged_groups, merges = merges.len(), "post-deduplication entities");

    let validator = SchemaValidator::new();
    let mut tracker = ValidationTracker::new();
    let mut companies = Vec::new();
    let mut gated_clusters = 0;

    for cluster in &clusters {
        let company = assemble_company(cluster, rules);
        if !passes_emission_gate(&company) {
            gated_clusters += 1;
            continue;
        }

        match validator.validate_company(&company) {
            Ok(()) => {
                tracker.record_valid();
                companies.push(company);
            }
            Err(errors) => {
                let reason = describe_errors(&errors);
                warn!(name = %company.normalized_name, reason = %reason, "validation failed");
                tracker.record_invalid(&company.normalized_name, &reason);
            }
        }
    }

    // Stable: equal dates keep cluster key order
    companies.sort_by(|a, b| b.latest_filing_date().cmp(a.latest_filing_date()));

    let stats = tracker.finish();
    info!(companies = companies.len(), invalid = stats.invalid_records, "structured company records");

    StructureOutcome {
        companies,
        stats,
        merges,
        scoped_filings,
        excluded_filings,
        initial_groups,
        merged_groups,
        gated_clusters,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn application(id: &str, name: &str, date: &str) -> RawFiling {
        RawFiling::new(id, name)
            .with_date(date)
            .with_submission_type("APPLICATION")
    }

    fn run(filings: &[RawFiling]) -> StructureOutcome {
        structure_filings(filings, &EntityRules::default(), &StructureOptions::default())
    }

    #[test]
    fn test_company_id_is_deterministic_name_uuid() {
        assert_eq!(company_id("acme"), company_id("acme"));
        assert_ne!(company_id("acme"), company_id("acme communications"));
        // RFC 4122 v5 reference value for the DNS namespace
        assert_eq!(company_id("python.org"), "886313e1-3b8a-5372-9b90-0c9aee199e5d");
    }

    #[test]
    fn test_end_to_end_two_variants_one_company() {
        let filings: Vec<RawFiling> = serde_json::from_str(
            r#"[
                {"submission_id": "1", "company_name": "Acme Communications LLC",
                 "submission_type": "APPLICATION FOR AUTHORIZATION",
                 "date_received": "2023-05-01", "document_urls": "http://x/doc1"},
                {"submission_id": "2", "company_name": "Acme Communications",
                 "submission_type": "APPLICATION",
                 "date_received": "2023-06-01", "document_urls": ""}
            ]"#,
        )
        .unwrap();

        let outcome = run(&filings);

        assert_eq!(outcome.companies.len(), 1);
        let company = &outcome.companies[0];
        assert_eq!(company.entity_name, "Acme Communications LLC");
        assert_eq!(company.normalized_name, "acme communications");
        assert_eq!(company.id, company_id("acme communications"));
        assert_eq!(company.filing_count, 2);
        assert_eq!(company.entity_type, EntityType::Company);
        assert!(company.is_applicant);

        let dates: Vec<&str> = company.filings.iter().map(|f| f.date_received.as_str()).collect();
        assert_eq!(dates, vec!["2023-06-01", "2023-05-01"]);
        assert!(company.filings[0].document_urls.is_empty());
        assert_eq!(company.filings[1].document_urls, vec!["http://x/doc1"]);

        assert_eq!(outcome.stats.valid_records, 1);
        assert_eq!(outcome.stats.invalid_records, 0);
    }

    #[test]
    fn test_empty_date_sorts_last() {
        let filings = vec![
            application("1", "Bravo Telecom", ""),
            application("2", "Bravo Telecom", "2024-01-01"),
            application("3", "Bravo Telecom", "2023-12-31"),
        ];

        let outcome = run(&filings);
        let ids: Vec<&str> = outcome.companies[0]
            .filings
            .iter()
            .map(|f| f.filing_id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_excluded_institution_never_emitted() {
        let filings = vec![
            application("1", "Federal Communications Commission", "2024-01-01"),
            application("2", "Federal Communications Commissions Telecom", "2024-01-02"),
            application("3", "Acme Communications", "2024-01-03"),
        ];

        let outcome = run(&filings);

        assert_eq!(outcome.excluded_filings, 2);
        assert_eq!(outcome.companies.len(), 1);
        for company in &outcome.companies {
            assert!(!company.entity_name.to_lowercase().contains("federal communications"));
            assert!(company.filings.iter().all(|f| f.filing_id == "3"));
        }
    }

    #[test]
    fn test_comment_only_cluster_is_gated() {
        let filings = vec![
            RawFiling::new("1", "Delta Voice Networks").with_submission_type("COMMENT"),
            RawFiling::new("2", "Delta Voice Networks").with_submission_type("REPLY COMMENT"),
        ];

        let outcome = run(&filings);

        assert!(outcome.companies.is_empty());
        assert_eq!(outcome.gated_clusters, 1);
        assert_eq!(outcome.stats.total_processed, 0);
    }

    #[test]
    fn test_individual_is_gated() {
        let outcome = run(&[application("1", "John Smith", "2024-01-01")]);

        assert!(outcome.companies.is_empty());
        assert_eq!(outcome.gated_clusters, 1);
    }

    #[test]
    fn test_invalid_record_does_not_abort_batch() {
        let names = [
            "Alpha Telecom", "Bravo Telecom", "Charlie Telecom", "Delta Telecom",
            "Echo Telecom", "Foxtrot Telecom", "Golf Telecom", "Hotel Telecom",
            "India Telecom", "Juliet Telecom",
        ];
        let mut filings: Vec<RawFiling> = names
            .iter()
            .enumerate()
            .map(|(i, name)| application(&format!("{}", 100 + i), name, "2024-01-01"))
            .collect();
        // No submission id: the assembled filing fails schema validation
        filings[4].submission_id = String::new();

        let outcome = run(&filings);

        assert_eq!(outcome.companies.len(), 9);
        assert_eq!(outcome.stats.valid_records, 9);
        assert_eq!(outcome.stats.invalid_records, 1);
        assert_eq!(outcome.stats.total_processed, 10);
        assert_eq!(outcome.stats.error_samples.len(), 1);
        assert_eq!(outcome.stats.error_samples[0].name, "echo telecom");
        assert!(outcome.stats.error_samples[0].error.contains("filing_id"));
    }

    #[test]
    fn test_filing_count_matches_filings() {
        let filings = vec![
            application("1", "Stratus Network", "2023-01-01"),
            application("2", "Stratus Networks", "2023-02-01"),
            application("3", "Stratus Networks, Inc.", "2023-03-01"),
            application("4", "Kappa Solutions", "2023-04-01"),
        ];

        let outcome = run(&filings);

        assert_eq!(outcome.initial_groups, 2 + 1);
        assert_eq!(outcome.merged_groups, 2);
        for company in &outcome.companies {
            assert_eq!(company.filing_count, company.filings.len());
        }
    }

    #[test]
    fn test_companies_sorted_by_latest_filing() {
        let filings = vec![
            application("1", "Old Networks", "2020-01-01"),
            application("2", "New Networks", "2024-06-01"),
            application("3", "Mid Networks", "2022-03-01"),
            application("4", "Undated Networks", ""),
        ];

        let outcome = run(&filings);
        let names: Vec<&str> = outcome
            .companies
            .iter()
            .map(|c| c.entity_name.as_str())
            .collect();
        assert_eq!(names, vec!["New Networks", "Mid Networks", "Old Networks", "Undated Networks"]);
    }

    #[test]
    fn test_primary_name_tie_keeps_first_seen() {
        let filings = vec![
            application("1", "Zeta Voip", "2024-01-01"),
            application("2", "ZETA VOIP", "2024-01-02"),
        ];

        let outcome = run(&filings);
        assert_eq!(outcome.companies[0].entity_name, "Zeta Voip");
    }

    #[test]
    fn test_proceeding_filter() {
        let filings = vec![
            application("1", "Acme Communications", "2024-01-01")
                .with_proceeding("Interconnected VoIP Numbering Authorization"),
            application("2", "Beta Communications", "2024-01-01").with_docket("INBOX-52.15"),
            application("3", "Gamma Communications", "2024-01-01").with_docket("WC 17-97"),
        ];
        let options = StructureOptions {
            proceeding_filter: Some(ProceedingFilter::voip_numbering()),
        };

        let outcome = structure_filings(&filings, &EntityRules::default(), &options);

        assert_eq!(outcome.scoped_filings, 2);
        assert_eq!(outcome.companies.len(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let outcome = run(&[]);

        assert!(outcome.companies.is_empty());
        assert_eq!(outcome.stats.valid_records, 0);
        assert_eq!(outcome.stats.invalid_records, 0);
        assert_eq!(outcome.stats.total_processed, 0);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let filings = vec![
            application("1", "Omega Telecom LLC", "2024-01-01"),
            application("2", "Omega Telecoms", "2024-02-01"),
            application("3", "Sigma Voice Services", "2023-01-01"),
        ];

        let first = run(&filings).companies;
        let second = run(&filings).companies;
        assert_eq!(first, second);
    }
}
