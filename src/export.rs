// 📤 Export - nested JSON plus flat CSV views of the registry
// JSON is the source of truth; CSVs are for spreadsheets

use crate::records::{Company, RawFiling, FIELD_SEPARATOR};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Enrichment fields copied into the enriched CSV, in column order
pub const ENRICHED_FIELDS: [&str; 5] = [
    "is_active",
    "industry_segment",
    "market_position",
    "product_summary",
    "activity_signal",
];

#[derive(Debug, Serialize)]
struct CompanyRow<'a> {
    id: &'a str,
    entity_name: &'a str,
    normalized_name: &'a str,
    entity_type: &'a str,
    filing_count: usize,
    latest_filing_date: &'a str,
}

#[derive(Debug, Serialize)]
struct FilingRow<'a> {
    company_id: &'a str,
    filing_id: &'a str,
    date_received: &'a str,
    docket_number: &'a str,
    submission_type: &'a str,
    status: &'a str,
    primary_doc_url: &'a str,
}

#[derive(Debug, Serialize)]
struct EnrichedRow<'a> {
    id: &'a str,
    entity_name: &'a str,
    filing_count: usize,
    is_active: String,
    industry_segment: String,
    market_position: String,
    product_summary: String,
    activity_signal: String,
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    Ok(())
}

/// Pretty JSON of any serializable value, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value).context("Failed to encode JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<usize> {
    ensure_parent(path)?;
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;

    let mut written = 0;
    for row in rows {
        writer.serialize(row).context("Failed to write CSV row")?;
        written += 1;
    }
    writer.flush().with_context(|| format!("Failed to flush {:?}", path))?;

    Ok(written)
}

// ============================================================================
// STRUCTURED OUTPUT
// ============================================================================

pub fn write_companies_json(path: &Path, companies: &[Company]) -> Result<()> {
    write_json(path, companies)
}

/// One row per company; returns the row count
pub fn write_companies_csv(path: &Path, companies: &[Company]) -> Result<usize> {
    write_rows(
        path,
        companies.iter().map(|c| CompanyRow {
            id: &c.id,
            entity_name: &c.entity_name,
            normalized_name: &c.normalized_name,
            entity_type: c.entity_type.as_str(),
            filing_count: c.filing_count,
            latest_filing_date: c.latest_filing_date(),
        }),
    )
}

/// One row per filing, linked back by company id
pub fn write_filings_csv(path: &Path, companies: &[Company]) -> Result<usize> {
    write_rows(
        path,
        companies.iter().flat_map(|c| {
            c.filings.iter().map(move |f| FilingRow {
                company_id: &c.id,
                filing_id: &f.filing_id,
                date_received: &f.date_received,
                docket_number: &f.docket_number,
                submission_type: &f.submission_type,
                status: &f.filing_status,
                primary_doc_url: f.primary_document_url(),
            })
        }),
    )
}

// ============================================================================
// RAW AND ENRICHED OUTPUT
// ============================================================================

/// Raw fetch output as a JSON array (document URLs joined)
pub fn write_raw_json(path: &Path, filings: &[RawFiling]) -> Result<()> {
    write_json(path, filings)
}

/// Raw fetch output, one row per submission with the twelve raw columns
pub fn write_raw_csv(path: &Path, filings: &[RawFiling]) -> Result<usize> {
    // RawFiling serializes document_urls joined, so the struct maps onto flat columns
    write_rows(path, filings.iter())
}

fn enrichment_text(company: &Company, field: &str) -> String {
    match company.enrichment.get(field) {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR),
        Some(other) => other.to_string(),
    }
}

pub fn write_enriched_csv(path: &Path, companies: &[Company]) -> Result<usize> {
    write_rows(
        path,
        companies.iter().map(|c| EnrichedRow {
            id: &c.id,
            entity_name: &c.entity_name,
            filing_count: c.filing_count,
            is_active: enrichment_text(c, ENRICHED_FIELDS[0]),
            industry_segment: enrichment_text(c, ENRICHED_FIELDS[1]),
            market_position: enrichment_text(c, ENRICHED_FIELDS[2]),
            product_summary: enrichment_text(c, ENRICHED_FIELDS[3]),
            activity_signal: enrichment_text(c, ENRICHED_FIELDS[4]),
        }),
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{load_companies, EntityType, Filing};

    fn filing(id: &str, date: &str, urls: &[&str]) -> Filing {
        Filing {
            filing_id: id.to_string(),
            date_received: date.to_string(),
            docket_number: "INBOX-52.15".to_string(),
            submission_type: "APPLICATION".to_string(),
            filing_status: "POSTED".to_string(),
            document_urls: urls.iter().map(|u| u.to_string()).collect(),
            detail_url: String::new(),
        }
    }

    fn company() -> Company {
        Company {
            id: "c-1".to_string(),
            entity_name: "Acme, Communications LLC".to_string(),
            normalized_name: "acme communications".to_string(),
            entity_type: EntityType::Company,
            is_applicant: true,
            filing_count: 2,
            filings: vec![
                filing("2", "2023-06-01", &[]),
                filing("1", "2023-05-01", &["http://x/doc1", "http://x/doc2"]),
            ],
            enrichment: Default::default(),
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_companies_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structured").join("companies.csv");

        assert_eq!(write_companies_csv(&path, &[company()]).unwrap(), 1);

        let lines = read_lines(&path);
        assert_eq!(
            lines[0],
            "id,entity_name,normalized_name,entity_type,filing_count,latest_filing_date"
        );
        assert_eq!(
            lines[1],
            "c-1,\"Acme, Communications LLC\",acme communications,Company,2,2023-06-01"
        );
    }

    #[test]
    fn test_filings_csv_primary_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filings.csv");

        assert_eq!(write_filings_csv(&path, &[company()]).unwrap(), 2);

        let lines = read_lines(&path);
        assert_eq!(
            lines[0],
            "company_id,filing_id,date_received,docket_number,submission_type,status,primary_doc_url"
        );
        assert_eq!(lines[1], "c-1,2,2023-06-01,INBOX-52.15,APPLICATION,POSTED,");
        assert_eq!(
            lines[2],
            "c-1,1,2023-05-01,INBOX-52.15,APPLICATION,POSTED,http://x/doc1"
        );
    }

    #[test]
    fn test_companies_json_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("companies_with_filings.json");

        write_companies_json(&path, &[company()]).unwrap();
        let loaded = load_companies(&path).unwrap();
        assert_eq!(loaded, vec![company()]);
    }

    #[test]
    fn test_raw_csv_has_twelve_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let raw = RawFiling::new("9", "Acme").with_document_urls("http://x/a; http://x/b");

        write_raw_csv(&path, &[raw]).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0].split(',').count(), 12);
        assert!(lines[1].contains("http://x/a; http://x/b"));
    }

    #[test]
    fn test_enriched_csv_flattens_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.csv");
        let mut enriched = company();
        enriched.enrichment.insert("is_active".to_string(), serde_json::json!(true));
        enriched
            .enrichment
            .insert("industry_segment".to_string(), serde_json::json!("VoIP"));

        write_enriched_csv(&path, &[enriched]).unwrap();

        let lines = read_lines(&path);
        assert_eq!(
            lines[0],
            "id,entity_name,filing_count,is_active,industry_segment,market_position,product_summary,activity_signal"
        );
        assert_eq!(lines[1], "c-1,\"Acme, Communications LLC\",2,true,VoIP,,,");
    }
}
