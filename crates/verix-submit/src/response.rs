//! # Authority Responses and Outcomes
//!
//! [`RawResponse`] is what the protocol layer hands back for one submission
//! attempt. [`SubmissionOutcome`] is the analyzed, aggregated view of it
//! produced by [`ResponseAnalyzer`](crate::analyzer::ResponseAnalyzer).
//! Both are plain immutable values; an outcome is folded into the
//! session result and never updated afterwards.

use serde::{Deserialize, Serialize};

use crate::catalog::{ErrorCategory, ErrorDescriptor};

/// Response-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalStatus {
    /// Every record was accepted (possibly with admissible errors).
    Accepted,
    /// Some records were accepted and some rejected.
    PartiallyAccepted,
    /// No record was accepted.
    Rejected,
}

/// Verdict for one submitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineState {
    Accepted,
    AcceptedWithErrors,
    Rejected,
}

/// The authority's verdict for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineResult {
    pub state: LineState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    /// Invoice series/number the verdict refers to.
    pub invoice_ref: String,
    /// Identifier of an earlier submission this record duplicates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
}

impl LineResult {
    /// An `Accepted` line with no error.
    pub fn accepted(invoice_ref: impl Into<String>) -> Self {
        Self {
            state: LineState::Accepted,
            error_code: None,
            error_description: None,
            invoice_ref: invoice_ref.into(),
            duplicate_of: None,
        }
    }

    /// An `AcceptedWithErrors` line carrying `code`.
    pub fn accepted_with_errors(invoice_ref: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            state: LineState::AcceptedWithErrors,
            error_code: Some(code.into()),
            ..Self::accepted(invoice_ref)
        }
    }

    /// A `Rejected` line carrying `code`.
    pub fn rejected(invoice_ref: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            state: LineState::Rejected,
            error_code: Some(code.into()),
            ..Self::accepted(invoice_ref)
        }
    }

    /// Attach the authority's free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// Mark the line as a duplicate of an earlier submission.
    pub fn with_duplicate_of(mut self, original: impl Into<String>) -> Self {
        self.duplicate_of = Some(original.into());
        self
    }
}

/// One attempt's response as decoded by the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub global_status: GlobalStatus,
    #[serde(default)]
    pub lines: Vec<LineResult>,
    /// Seconds the authority asks the client to wait before resubmitting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_wait_hint_seconds: Option<u64>,
    /// Receipt issued by the authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_token: Option<String>,
}

impl RawResponse {
    /// A response with the given status and lines and no hint or token.
    pub fn new(global_status: GlobalStatus, lines: Vec<LineResult>) -> Self {
        Self {
            global_status,
            lines,
            server_wait_hint_seconds: None,
            confirmation_token: None,
        }
    }

    pub fn with_wait_hint(mut self, seconds: u64) -> Self {
        self.server_wait_hint_seconds = Some(seconds);
        self
    }

    pub fn with_confirmation(mut self, token: impl Into<String>) -> Self {
        self.confirmation_token = Some(token.into());
        self
    }
}

/// A classified line error, tied to the record it was reported for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub invoice_ref: String,
    pub descriptor: ErrorDescriptor,
    /// Description sent by the authority, if any. May differ from the
    /// catalog description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_description: Option<String>,
}

impl ClassifiedError {
    pub fn category(&self) -> ErrorCategory {
        self.descriptor.category
    }

    pub fn code(&self) -> &str {
        &self.descriptor.code
    }
}

/// Aggregated result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub global_status: GlobalStatus,
    pub processed: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub accepted_with_errors: usize,
    pub duplicates: usize,
    /// Errors from `Rejected` lines.
    pub non_admissible_errors: Vec<ClassifiedError>,
    /// Errors from `AcceptedWithErrors` lines.
    pub admissible_errors: Vec<ClassifiedError>,
    /// Operator-facing notes, such as duplicate references.
    pub diagnostics: Vec<String>,
    pub fully_successful: bool,
    pub partial_failure: bool,
    pub has_recoverable_errors: bool,
    pub requires_subsanacion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_wait_hint_seconds: Option<u64>,
}

impl SubmissionOutcome {
    /// Codes of all non-admissible errors, in line order.
    pub fn rejection_codes(&self) -> Vec<&str> {
        self.non_admissible_errors.iter().map(ClassifiedError::code).collect()
    }

    /// One-line summary of the counters.
    pub fn summary(&self) -> String {
        format!(
            "{:?}: processed={} accepted={} accepted_with_errors={} rejected={} duplicates={}",
            self.global_status,
            self.processed,
            self.accepted,
            self.accepted_with_errors,
            self.rejected,
            self.duplicates,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_response_decodes_with_optional_fields_absent() {
        let json = r#"{
            "global_status": "PartiallyAccepted",
            "lines": [
                {"state": "Accepted", "invoice_ref": "F-1"},
                {"state": "Rejected", "invoice_ref": "F-2", "error_code": "2001"}
            ]
        }"#;
        let r: RawResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.global_status, GlobalStatus::PartiallyAccepted);
        assert_eq!(r.lines.len(), 2);
        assert_eq!(r.lines[1].error_code.as_deref(), Some("2001"));
        assert_eq!(r.server_wait_hint_seconds, None);
        assert_eq!(r.confirmation_token, None);
    }

    #[test]
    fn line_builders_set_state_and_code() {
        let l = LineResult::rejected("F-9", "3000")
            .with_description("dup")
            .with_duplicate_of("CSV-1");
        assert_eq!(l.state, LineState::Rejected);
        assert_eq!(l.error_code.as_deref(), Some("3000"));
        assert_eq!(l.error_description.as_deref(), Some("dup"));
        assert_eq!(l.duplicate_of.as_deref(), Some("CSV-1"));
        assert_eq!(LineResult::accepted("F-1").error_code, None);
    }

    #[test]
    fn serialization_skips_absent_optionals() {
        let json = serde_json::to_value(RawResponse::new(
            GlobalStatus::Accepted,
            vec![LineResult::accepted("F-1")],
        ))
        .unwrap();
        assert!(json.get("server_wait_hint_seconds").is_none());
        assert!(json["lines"][0].get("error_code").is_none());
    }
}
