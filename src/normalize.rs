// 🔤 Name Normalizer - raw filer name → grouping key
// Keys are only used for grouping and identity, never displayed

use regex::Regex;
use std::sync::LazyLock;

/// Business suffix groups, matched on word boundaries anywhere in the name
static SUFFIX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(llc|l\.l\.c\.?|inc\.?|incorporated|corp\.?|corporation|co\.?|company)\b",
        r"\b(ltd\.?|limited|lp|l\.p\.?|llp|l\.l\.p\.?)\b",
        r"\b(pllc|p\.l\.l\.c\.?|pc|p\.c\.?)\b",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// "doing business as" marker and everything after it, whatever follows the marker
static DBA_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",?\s*\b(d/?b/?a|doing business as)\b.*$").ok());

static PUNCTUATION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^\w\s]").ok());

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Normalize a company name for deduplication.
///
/// Lowercases, removes business suffixes, drops any d/b/a tail, turns
/// punctuation into spaces and collapses whitespace. An empty result means
/// the name cannot be clustered. The cleanup is repeated until the key stops
/// changing, so normalizing a key again returns it unchanged.
pub fn normalize_company_name(name: &str) -> String {
    let mut key = normalize_once(name);

    // Every pass that changes an already lowercased key makes it shorter
    loop {
        let next = normalize_once(&key);
        if next == key || next.len() >= key.len() {
            return key;
        }
        key = next;
    }
}

fn normalize_once(name: &str) -> String {
    let mut key = name.trim().to_lowercase();
    if key.is_empty() {
        return key;
    }

    for pattern in SUFFIX_PATTERNS.iter() {
        key = pattern.replace_all(&key, "").into_owned();
    }

    if let Some(dba) = DBA_PATTERN.as_ref() {
        key = dba.replace(&key, "").into_owned();
    }

    if let Some(punctuation) = PUNCTUATION.as_ref() {
        key = punctuation.replace_all(&key, " ").into_owned();
    }

    if let Some(whitespace) = WHITESPACE.as_ref() {
        key = whitespace.replace_all(&key, " ").into_owned();
    }

    key.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_suffixes_and_case() {
        assert_eq!(normalize_company_name("Acme Communications LLC"), "acme communications");
        assert_eq!(normalize_company_name("  ACME COMMUNICATIONS, INC.  "), "acme communications");
        assert_eq!(normalize_company_name("Stratus Networks Corp."), "stratus networks");
        assert_eq!(normalize_company_name("Bandwidth L.L.C."), "bandwidth");
        assert_eq!(normalize_company_name("Lumen Ltd"), "lumen");
        assert_eq!(normalize_company_name("Smith & Jones PLLC"), "smith jones");
    }

    #[test]
    fn test_suffix_requires_word_boundary() {
        // "co" inside a word is not a suffix
        assert_eq!(normalize_company_name("Comcast Cable"), "comcast cable");
        assert_eq!(normalize_company_name("Telco Inc"), "telco");
        assert_eq!(normalize_company_name("Pincus Voice"), "pincus voice");
    }

    #[test]
    fn test_truncates_at_dba() {
        assert_eq!(normalize_company_name("Acme Holdings d/b/a Acme Voice"), "acme holdings");
        assert_eq!(normalize_company_name("Acme Holdings, DBA Acme Voice"), "acme holdings");
        assert_eq!(
            normalize_company_name("Acme Holdings LLC doing business as AcmeTel"),
            "acme holdings"
        );
    }

    #[test]
    fn test_dba_marker_followed_by_punctuation() {
        assert_eq!(normalize_company_name("Acme Telecom, DBA: Beta Voice"), "acme telecom");
        assert_eq!(normalize_company_name("Acme dba-Net Inc"), "acme");
        assert_eq!(normalize_company_name("Acme Holdings d/b/a"), "acme holdings");
        // "dba" inside a word is not a marker
        assert_eq!(normalize_company_name("Dbase Voice"), "dbase voice");
    }

    #[test]
    fn test_punctuation_becomes_single_space() {
        assert_eq!(normalize_company_name("Voice-Over-Net, Inc."), "voice over net");
        assert_eq!(normalize_company_name("A.B.C.   Telecom"), "a b c telecom");
    }

    #[test]
    fn test_empty_and_suffix_only_inputs() {
        assert_eq!(normalize_company_name(""), "");
        assert_eq!(normalize_company_name("   "), "");
        assert_eq!(normalize_company_name("LLC"), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Acme Communications LLC",
            "Stratus Networks, Inc. d/b/a Stratus",
            "O'Brien Telecom Co.",
            "Voice-Over-Net, Inc.",
            "Müller Télécom GmbH",
            "co-op networks",
            "Acme Telecom, DBA: Beta Voice",
            "Acme dba-Net Inc",
            "Acme.Inc Voice",
            "Beta (d/b/a) Gamma, L.L.C.",
        ];

        for sample in samples {
            let once = normalize_company_name(sample);
            assert_eq!(normalize_company_name(&once), once, "not idempotent for {sample:?}");
        }
    }
}
