// 📐 Shape Layer - Schema Validation
// Validates assembled companies (and their filings) before they are emitted

use crate::records::{Company, Filing};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// VALIDATION ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{context}] {field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    fn new(context: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// One-line summary of a failed validation, used for logs and error samples
pub fn describe_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        SchemaValidator
    }

    /// Validate a company record and every filing it owns
    pub fn validate_company(&self, company: &Company) -> ValidationResult {
        let mut errors = Vec::new();

        if Uuid::parse_str(&company.id).is_err() {
            errors.push(ValidationError::new(
                "Company",
                "id",
                format!("Not a valid UUID: {:?}", company.id),
            ));
        }

        if company.entity_name.trim().is_empty() {
            errors.push(ValidationError::new("Company", "entity_name", "Required field is empty"));
        }

        if company.normalized_name.is_empty() {
            errors.push(ValidationError::new(
                "Company",
                "normalized_name",
                "Required field is empty",
            ));
        }

        if company.filing_count != company.filings.len() {
            errors.push(ValidationError::new(
                "Company",
                "filing_count",
                format!(
                    "Must equal number of filings ({}), got {}",
                    company.filings.len(),
                    company.filing_count
                ),
            ));
        }

        for (position, filing) in company.filings.iter().enumerate() {
            if let Err(filing_errors) = self.validate_filing(filing, position) {
                errors.extend(filing_errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate one filing; `position` is its index within the company
    pub fn validate_filing(&self, filing: &Filing, position: usize) -> ValidationResult {
        let mut errors = Vec::new();
        let context = format!("Filing[{}]", position);

        if filing.filing_id.trim().is_empty() {
            errors.push(ValidationError::new(&context, "filing_id", "Required field is empty"));
        }

        if filing.document_urls.iter().any(|url| url.trim().is_empty()) {
            errors.push(ValidationError::new(
                &context,
                "document_urls",
                "Contains an empty URL",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
