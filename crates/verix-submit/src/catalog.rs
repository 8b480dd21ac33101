//! # Authority Error Catalog
//!
//! Maps authority error codes to a category, an admissibility flag and a
//! recommended operator action. The table is built once per process behind
//! a `OnceLock` and never mutated afterwards, so concurrent sessions read it
//! without synchronization.
//!
//! ## Lookup Rules
//!
//! [`ErrorClassifier::lookup`] is total:
//!
//! - catalogued codes return their entry verbatim;
//! - the empty (or blank) code returns the "unspecified error" descriptor,
//!   `NonRecoverable`, not admissible;
//! - any other code is synthesized from its first character and is never
//!   written back into the table:
//!
//! | Prefix | Class | Category |
//! |--------|-------|----------|
//! | `1` | configuration / credential | `NonRecoverable` |
//! | `2` | transient service condition | `Recoverable` |
//! | `3` | record business rule | `RequiresCorrection` |
//! | `4` | format / schema | `RequiresCorrection` |
//! | `5` | authority internal error | `Recoverable` |
//! | other | unknown | `RequiresCorrection` |
//!
//! Synthesized descriptors are never admissible.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// How a classified error affects the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Transient service-side condition; eligible for automatic retry.
    Recoverable,
    /// Malformed or invalid data; surfaced for correction, never retried.
    RequiresCorrection,
    /// Record accepted with a non-blocking defect; a corrective submission
    /// (subsanación) is recommended. Not retried within the session.
    RequiresSubsanacion,
    /// Fatal configuration or credential issue; the session aborts.
    NonRecoverable,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::RequiresCorrection => write!(f, "RequiresCorrection"),
            Self::RequiresSubsanacion => write!(f, "RequiresSubsanacion"),
            Self::NonRecoverable => write!(f, "NonRecoverable"),
        }
    }
}

/// Classification of one authority error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// The authority code, empty for the unspecified descriptor.
    pub code: String,
    /// Retry/abort category.
    pub category: ErrorCategory,
    /// Whether the defect leaves the record accepted.
    pub admissible: bool,
    /// What the code means.
    pub description: String,
    /// What an operator should do about it.
    pub recommended_action: String,
    /// True if the descriptor came from the catalog rather than inference.
    pub catalogued: bool,
}

impl ErrorDescriptor {
    fn catalogued(
        code: &str,
        category: ErrorCategory,
        admissible: bool,
        description: &str,
        recommended_action: &str,
    ) -> Self {
        Self {
            code: code.to_string(),
            category,
            admissible,
            description: description.to_string(),
            recommended_action: recommended_action.to_string(),
            catalogued: true,
        }
    }

    fn unspecified() -> Self {
        Self {
            code: String::new(),
            category: ErrorCategory::NonRecoverable,
            admissible: false,
            description: "unspecified error".to_string(),
            recommended_action:
                "Inspect the raw response; contact the authority if the rejection persists"
                    .to_string(),
            catalogued: false,
        }
    }
}

use ErrorCategory::{NonRecoverable, Recoverable, RequiresCorrection, RequiresSubsanacion};

/// `(code, category, admissible, description, recommended action)`.
const CATALOG: &[(&str, ErrorCategory, bool, &str, &str)] = &[
    // -- 1xxx: configuration and credentials ---------------------------------
    ("1001", NonRecoverable, false,
        "Certificate not valid for the submitting party",
        "Install a certificate issued to the submitter or its representative"),
    ("1002", NonRecoverable, false,
        "Certificate expired or revoked",
        "Renew the signing certificate"),
    ("1003", NonRecoverable, false,
        "Submitter is not authorized to act for the issuer",
        "Register the representation with the authority"),
    ("1004", NonRecoverable, false,
        "Issuer NIF not identified in the tax census",
        "Verify the issuer NIF with the authority"),
    ("1005", NonRecoverable, false,
        "Invoicing system not declared for the issuer",
        "File the invoicing system declaration"),
    ("1006", NonRecoverable, false,
        "Submission channel not enabled for the issuer",
        "Enable the submission channel in the issuer's registration"),
    // -- 2xxx: transient service conditions -----------------------------------
    ("2001", Recoverable, false,
        "Service temporarily unavailable",
        "Retry after the indicated wait"),
    ("2002", Recoverable, false,
        "Submission rate limit exceeded",
        "Wait the time declared by the authority before resubmitting"),
    ("2003", Recoverable, false,
        "Processing timed out at the authority",
        "Retry the submission"),
    ("2004", Recoverable, false,
        "Previous record in the chain is still being processed",
        "Retry once the predecessor is confirmed"),
    // -- 3xxx: record business rules ------------------------------------------
    ("3000", RequiresCorrection, false,
        "Duplicate invoice record",
        "Check the original submission; do not resend the same record"),
    ("3001", RequiresCorrection, false,
        "Record to cancel does not exist",
        "Verify the invoice reference of the cancellation"),
    ("3002", RequiresCorrection, false,
        "Record already cancelled",
        "No action; the cancellation is already registered"),
    ("3003", RequiresCorrection, false,
        "Chain fingerprint does not match the previous record",
        "Rebuild the link from the last confirmed record and resubmit"),
    ("3004", RequiresCorrection, false,
        "Issue date later than the submission date",
        "Correct the issue date"),
    ("3005", RequiresCorrection, false,
        "Total amount inconsistent with the tax breakdown",
        "Recompute totals and resubmit"),
    ("3006", RequiresCorrection, false,
        "Corrective invoice does not reference the rectified invoice",
        "Add the rectified invoice reference"),
    ("3101", RequiresSubsanacion, true,
        "Recipient NIF not identified in the tax census",
        "Submit a corrective record with the recipient's identification"),
    ("3102", RequiresSubsanacion, true,
        "Generation timestamp outside the accepted margin",
        "Review the system clock; submit a corrective record if required"),
    ("3103", RequiresSubsanacion, true,
        "Tax rate not consistent with the operation date",
        "Submit a corrective record with the applicable rate"),
    ("3104", RequiresSubsanacion, true,
        "Recipient address data incomplete",
        "Submit a corrective record with the full address"),
    // -- 4xxx: format and schema ----------------------------------------------
    ("4001", RequiresCorrection, false,
        "Document does not conform to the schema",
        "Fix the payload generator"),
    ("4002", RequiresCorrection, false,
        "Mandatory field missing",
        "Fill in the missing field"),
    ("4003", RequiresCorrection, false,
        "Invalid field value or type",
        "Correct the field value"),
    ("4004", RequiresCorrection, false,
        "Invalid date format",
        "Send dates as DD-MM-YYYY"),
    ("4005", RequiresCorrection, false,
        "Too many records in one submission",
        "Split the submission"),
    // -- 5xxx: authority internal errors --------------------------------------
    ("5001", Recoverable, false,
        "Unexpected internal error at the authority",
        "Retry the submission"),
    ("5002", Recoverable, false,
        "Authority storage temporarily unavailable",
        "Retry the submission"),
];

/// Read-only lookup table of authority error codes.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    entries: HashMap<String, ErrorDescriptor>,
}

impl ErrorClassifier {
    /// The process-wide standard catalog.
    pub fn standard() -> Arc<ErrorClassifier> {
        static STANDARD: OnceLock<Arc<ErrorClassifier>> = OnceLock::new();
        STANDARD
            .get_or_init(|| {
                Arc::new(Self::from_entries(CATALOG.iter().map(
                    |(code, category, admissible, description, action)| {
                        ErrorDescriptor::catalogued(code, *category, *admissible, description, action)
                    },
                )))
            })
            .clone()
    }

    /// A classifier over a custom table. Later duplicates replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = ErrorDescriptor>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|d| (d.code.clone(), d))
                .collect(),
        }
    }

    /// Classify `code`. Never fails.
    pub fn lookup(&self, code: &str) -> ErrorDescriptor {
        let code = code.trim();
        if code.is_empty() {
            return ErrorDescriptor::unspecified();
        }
        match self.entries.get(code) {
            Some(descriptor) => descriptor.clone(),
            None => infer(code),
        }
    }

    /// `lookup(code).category == Recoverable`.
    pub fn is_recoverable(&self, code: &str) -> bool {
        self.lookup(code).category == ErrorCategory::Recoverable
    }

    /// `lookup(code).admissible`.
    pub fn is_admissible(&self, code: &str) -> bool {
        self.lookup(code).admissible
    }

    /// `lookup(code).category == RequiresSubsanacion`.
    pub fn requires_subsanacion(&self, code: &str) -> bool {
        self.lookup(code).category == ErrorCategory::RequiresSubsanacion
    }

    /// All catalogued descriptors, sorted by code.
    pub fn entries(&self) -> Vec<&ErrorDescriptor> {
        let mut all: Vec<_> = self.entries.values().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        all
    }

    /// Catalogued codes in `category`, sorted.
    pub fn codes_in(&self, category: ErrorCategory) -> Vec<&str> {
        let mut codes: Vec<&str> = self
            .entries
            .values()
            .filter(|d| d.category == category)
            .map(|d| d.code.as_str())
            .collect();
        codes.sort_unstable();
        codes
    }

    /// Number of catalogued codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Category for an uncatalogued code, from its leading character.
pub fn inferred_category(code: &str) -> ErrorCategory {
    match code.trim().chars().next() {
        Some('1') => NonRecoverable,
        Some('2') | Some('5') => Recoverable,
        Some('3') | Some('4') => RequiresCorrection,
        _ => RequiresCorrection,
    }
}

fn infer(code: &str) -> ErrorDescriptor {
    let category = inferred_category(code);
    let class = match code.chars().next() {
        Some('1') => "configuration or credential issue",
        Some('2') => "transient service condition",
        Some('3') => "record business-rule violation",
        Some('4') => "format or schema violation",
        Some('5') => "authority internal error",
        _ => "unknown error class",
    };
    let recommended_action = match category {
        Recoverable => "Retry the submission; escalate if the code persists",
        NonRecoverable => "Review credentials and registration before resubmitting",
        RequiresCorrection | RequiresSubsanacion => "Review the record data against the authority's response",
    };
    ErrorDescriptor {
        code: code.to_string(),
        category,
        admissible: false,
        description: format!("uncatalogued error code {code} ({class})"),
        recommended_action: recommended_action.to_string(),
        catalogued: false,
    }
}
