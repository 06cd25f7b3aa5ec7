// 📥 Document Downloader - filing documents saved under the documents directory
// Queue building and file naming are pure; fetching needs the `remote` feature

use crate::records::Company;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

const MAX_NAME_LEN: usize = 80;
const URL_DIGEST_LEN: usize = 12;
const DOCUMENT_SEGMENT: &str = "/document/";
const DOCUMENTS_SEGMENT: &str = "/documents/";

static ILLEGAL_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).ok());
static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());
static UNDERSCORES: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"_+").ok());

fn replace_all(re: &LazyLock<Option<Regex>>, text: &str, with: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// Filesystem-safe rendering of an entity name ("unknown" when nothing survives)
pub fn sanitize_filename(name: &str) -> String {
    let name = replace_all(&ILLEGAL_CHARS, name, "_");
    let name = replace_all(&WHITESPACE, &name, "_");
    let name = replace_all(&UNDERSCORES, &name, "_");
    let truncated: String = name.chars().take(MAX_NAME_LEN).collect();
    let trimmed = truncated.trim_matches('_');

    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Document identifier for a URL: the decoded path after `/document/`, or a URL digest
pub fn document_id(url: &str) -> String {
    if let Some(pos) = url.rfind(DOCUMENT_SEGMENT) {
        let tail = &url[pos + DOCUMENT_SEGMENT.len()..];
        let path = tail.split(['?', '#']).next().unwrap_or("");
        let decoded = urlencoding::decode(path)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| path.to_string());
        let id = replace_all(&ILLEGAL_CHARS, decoded.trim_matches('/'), "_");
        if !id.is_empty() {
            return id;
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..URL_DIGEST_LEN].to_string()
}

/// URLs to try for one document. ECFS serves the binary under `/documents/`,
/// while `/document/` is the viewer page, so the plural form goes first.
pub fn download_candidates(url: &str) -> Vec<String> {
    if url.contains(DOCUMENT_SEGMENT) && !url.contains(DOCUMENTS_SEGMENT) {
        vec![url.replacen(DOCUMENT_SEGMENT, DOCUMENTS_SEGMENT, 1), url.to_string()]
    } else {
        vec![url.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadItem {
    pub url: String,
    pub entity_name: String,
    pub path: PathBuf,
}

/// Every non-empty document URL of every filing, in company order.
/// `limit` of 0 keeps the whole queue.
pub fn build_download_queue(companies: &[Company], dir: &Path, limit: usize) -> Vec<DownloadItem> {
    let mut queue: Vec<DownloadItem> = companies
        .iter()
        .flat_map(|company| {
            let safe_name = sanitize_filename(&company.entity_name);
            company
                .filings
                .iter()
                .flat_map(|f| f.document_urls.iter())
                .filter(|url| !url.trim().is_empty())
                .map(move |url| DownloadItem {
                    url: url.clone(),
                    entity_name: company.entity_name.clone(),
                    path: dir.join(format!("{}_{}.pdf", safe_name, document_id(url))),
                })
        })
        .collect();

    if limit > 0 {
        queue.truncate(limit);
    }
    queue
}

/// A file at least `min_bytes` long counts as downloaded
pub fn is_already_downloaded(path: &Path, min_bytes: u64) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() >= min_bytes)
        .unwrap_or(false)
}

/// File extension implied by the leading bytes, when recognizable
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        Some("pdf")
    } else if bytes.starts_with(b"PK") {
        Some("docx")
    } else if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        Some("doc")
    } else {
        None
    }
}

/// Target path with the extension corrected from the content
pub fn resolve_target(path: &Path, bytes: &[u8]) -> PathBuf {
    match sniff_extension(bytes) {
        Some(ext) if path.extension().and_then(|e| e.to_str()) != Some(ext) => {
            path.with_extension(ext)
        }
        _ => path.to_path_buf(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DownloadSummary {
    pub queued: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub failed: usize,
}

// ============================================================================
// HTTP DOWNLOADER
// ============================================================================

#[cfg(feature = "remote")]
pub use remote::{DocumentDownloader, DownloadError};

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use crate::config::DownloadConfig;
    use std::time::Duration;
    use thiserror::Error;
    use tracing::{info, warn};

    #[derive(Debug, Error)]
    pub enum DownloadError {
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("HTTP status {0}")]
        Status(u16),
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
    }

    pub struct DocumentDownloader {
        config: DownloadConfig,
        client: reqwest::Client,
    }

    impl DocumentDownloader {
        pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(config.user_agent.clone())
                .build()?;
            Ok(DocumentDownloader { config, client })
        }

        async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
            let resp = self.client.get(url).send().await?;
            let status = resp.status().as_u16();
            if status != 200 {
                return Err(DownloadError::Status(status));
            }
            Ok(resp.bytes().await?.to_vec())
        }

        /// Download one item, trying each candidate URL; returns the written path
        pub async fn download_one(&self, item: &DownloadItem) -> Result<PathBuf, DownloadError> {
            let mut last_error = DownloadError::Status(0);

            for url in download_candidates(&item.url) {
                match self.fetch_bytes(&url).await {
                    Ok(bytes) => {
                        let target = resolve_target(&item.path, &bytes);
                        if let Some(parent) = target.parent() {
                            tokio::fs::create_dir_all(parent).await?;
                        }
                        tokio::fs::write(&target, &bytes).await?;
                        return Ok(target);
                    }
                    Err(e) => last_error = e,
                }
            }

            Err(last_error)
        }

        /// Download the queue, skipping files that already exist
        pub async fn download_all(&self, queue: &[DownloadItem]) -> DownloadSummary {
            let mut summary = DownloadSummary {
                queued: queue.len(),
                ..Default::default()
            };

            let remaining: Vec<&DownloadItem> = queue
                .iter()
                .filter(|item| !is_already_downloaded(&item.path, self.config.min_existing_bytes))
                .collect();
            summary.skipped = queue.len() - remaining.len();
            info!(queued = queue.len(), skipped = summary.skipped, "download queue ready");

            for (index, item) in remaining.iter().enumerate() {
                if index > 0 && self.config.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
                }

                match self.download_one(item).await {
                    Ok(path) => {
                        info!(position = index + 1, total = remaining.len(), path = ?path, "downloaded");
                        summary.downloaded += 1;
                    }
                    Err(e) => {
                        warn!(url = %item.url, error = %e, "download failed");
                        summary.failed += 1;
                    }
                }
            }

            summary
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EntityType, Filing};

    fn company(name: &str, urls: &[&str]) -> Company {
        Company {
            id: "id".to_string(),
            entity_name: name.to_string(),
            normalized_name: name.to_lowercase(),
            entity_type: EntityType::Company,
            is_applicant: true,
            filing_count: 1,
            filings: vec![Filing {
                filing_id: "1".to_string(),
                date_received: "2024-01-01".to_string(),
                docket_number: String::new(),
                submission_type: String::new(),
                filing_status: String::new(),
                document_urls: urls.iter().map(|u| u.to_string()).collect(),
                detail_url: String::new(),
            }],
            enrichment: Default::default(),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Acme Voice, LLC"), "Acme_Voice,_LLC");
        assert_eq!(sanitize_filename("A/B: \"C\"  D"), "A_B_C_D");
        assert_eq!(sanitize_filename("  ***  "), "unknown");
        assert_eq!(sanitize_filename(""), "unknown");
        assert_eq!(sanitize_filename(&"x".repeat(120)).len(), 80);
    }

    #[test]
    fn test_document_id_from_path() {
        assert_eq!(
            document_id("https://www.fcc.gov/ecfs/document/1020123456789/1"),
            "1020123456789_1"
        );
        assert_eq!(
            document_id("https://www.fcc.gov/ecfs/document/10201%2012/2?download=1"),
            "10201 12_2"
        );
    }

    #[test]
    fn test_document_id_digest_fallback() {
        let id = document_id("https://docs.fcc.gov/public/attachments/DA-24-1A1.pdf");
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, document_id("https://docs.fcc.gov/public/attachments/DA-24-1A1.pdf"));
        assert_ne!(id, document_id("https://docs.fcc.gov/public/attachments/DA-24-1A2.pdf"));
    }

    #[test]
    fn test_candidates_prefer_plural_path() {
        assert_eq!(
            download_candidates("https://www.fcc.gov/ecfs/document/1/1"),
            vec![
                "https://www.fcc.gov/ecfs/documents/1/1".to_string(),
                "https://www.fcc.gov/ecfs/document/1/1".to_string()
            ]
        );
        assert_eq!(download_candidates("https://docs.fcc.gov/a.pdf").len(), 1);
    }

    #[test]
    fn test_queue_and_limit() {
        let dir = Path::new("documents");
        let companies = vec![
            company("Acme Voice", &["https://www.fcc.gov/ecfs/document/1/1", ""]),
            company("Bravo", &["https://www.fcc.gov/ecfs/document/2/1"]),
        ];

        let queue = build_download_queue(&companies, dir, 0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].path, dir.join("Acme_Voice_1_1.pdf"));
        assert_eq!(queue[1].entity_name, "Bravo");

        assert_eq!(build_download_queue(&companies, dir, 1).len(), 1);
    }

    #[test]
    fn test_already_downloaded_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small.pdf");
        let large = dir.path().join("large.pdf");
        std::fs::write(&small, vec![0u8; 10]).unwrap();
        std::fs::write(&large, vec![0u8; 1000]).unwrap();

        assert!(!is_already_downloaded(&small, 1000));
        assert!(is_already_downloaded(&large, 1000));
        assert!(!is_already_downloaded(&dir.path().join("absent.pdf"), 1000));
    }

    #[test]
    fn test_sniff_and_resolve_extension() {
        assert_eq!(sniff_extension(b"%PDF-1.7"), Some("pdf"));
        assert_eq!(sniff_extension(b"PK\x03\x04"), Some("docx"));
        assert_eq!(sniff_extension(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1]), Some("doc"));
        assert_eq!(sniff_extension(b"<html>"), None);

        let path = Path::new("documents/Acme_1.pdf");
        assert_eq!(resolve_target(path, b"PK\x03\x04"), PathBuf::from("documents/Acme_1.docx"));
        assert_eq!(resolve_target(path, b"%PDF"), path.to_path_buf());
        assert_eq!(resolve_target(path, b"<html>"), path.to_path_buf());
    }
}
