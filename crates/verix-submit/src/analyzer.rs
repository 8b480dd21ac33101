//! # Response Analysis
//!
//! Folds one [`RawResponse`] into a [`SubmissionOutcome`] and answers the two
//! questions the orchestrator asks after every attempt: may this be retried,
//! and how long to wait first.
//!
//! ## Bucketing
//!
//! The line's own state decides where its error goes. An `AcceptedWithErrors`
//! line lands in `admissible_errors` even when the catalog calls its code
//! non-admissible; the catalog flag is only reported. A `Rejected` line
//! always lands in `non_admissible_errors`; without a code it is recorded as
//! the unspecified, non-recoverable error so it blocks retry.
//!
//! ## Wait Time
//!
//! A positive server hint wins over the profile's exponential schedule.
//! Either way the result never exceeds the profile's `max_delay_secs`.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::catalog::{ErrorCategory, ErrorClassifier};
use crate::profile::RetryProfile;
use crate::response::{
    ClassifiedError, GlobalStatus, LineResult, LineState, RawResponse, SubmissionOutcome,
};

/// Classifies responses against an [`ErrorClassifier`].
#[derive(Debug, Clone)]
pub struct ResponseAnalyzer {
    classifier: Arc<ErrorClassifier>,
}

impl Default for ResponseAnalyzer {
    fn default() -> Self {
        Self::new(ErrorClassifier::standard())
    }
}

impl ResponseAnalyzer {
    pub fn new(classifier: Arc<ErrorClassifier>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Aggregate every line of `response`.
    pub fn analyze(&self, response: &RawResponse) -> SubmissionOutcome {
        let mut processed = 0;
        let mut accepted = 0;
        let mut rejected = 0;
        let mut accepted_with_errors = 0;
        let mut duplicates = 0;
        let mut non_admissible_errors = Vec::new();
        let mut admissible_errors = Vec::new();
        let mut diagnostics = Vec::new();

        for line in &response.lines {
            processed += 1;
            match line.state {
                LineState::Accepted => accepted += 1,
                LineState::AcceptedWithErrors => {
                    accepted_with_errors += 1;
                    if let Some(code) = line.error_code.as_deref() {
                        admissible_errors.push(self.classify(code, line));
                    }
                }
                LineState::Rejected => {
                    rejected += 1;
                    let code = line.error_code.as_deref().unwrap_or("");
                    non_admissible_errors.push(self.classify(code, line));
                }
            }

            if let Some(original) = line.duplicate_of.as_deref() {
                duplicates += 1;
                diagnostics.push(format!(
                    "{} duplicates prior submission {original}",
                    line.invoice_ref
                ));
            }
        }

        let all_lines_accepted = rejected == 0 && accepted_with_errors == 0;
        let has_recoverable_errors = non_admissible_errors
            .iter()
            .any(|e: &ClassifiedError| e.category() == ErrorCategory::Recoverable);
        let requires_subsanacion = admissible_errors
            .iter()
            .any(|e: &ClassifiedError| e.category() == ErrorCategory::RequiresSubsanacion);

        SubmissionOutcome {
            global_status: response.global_status,
            processed,
            accepted,
            rejected,
            accepted_with_errors,
            duplicates,
            non_admissible_errors,
            admissible_errors,
            diagnostics,
            fully_successful: response.global_status == GlobalStatus::Accepted
                && all_lines_accepted,
            partial_failure: response.global_status == GlobalStatus::PartiallyAccepted,
            has_recoverable_errors,
            requires_subsanacion,
            confirmation_token: response.confirmation_token.clone(),
            server_wait_hint_seconds: response.server_wait_hint_seconds,
        }
    }

    /// True iff something was rejected and every rejection is recoverable.
    pub fn should_retry(&self, outcome: &SubmissionOutcome) -> bool {
        outcome.rejected > 0
            && outcome
                .non_admissible_errors
                .iter()
                .all(|e| e.category() == ErrorCategory::Recoverable)
    }

    /// Wait before the attempt following `attempt_index` (zero-based).
    ///
    /// Returns the server hint when it is positive, else
    /// `min(base · 2^attempt_index, max)`. Both are capped at the profile's
    /// max delay.
    pub fn compute_wait_time(
        &self,
        outcome: &SubmissionOutcome,
        attempt_index: u32,
        profile: &RetryProfile,
    ) -> Duration {
        match outcome.server_wait_hint_seconds {
            Some(hint) if hint > 0 => Duration::from_secs(hint).min(profile.max_delay()),
            _ => profile.exponential_delay(attempt_index),
        }
    }

    fn classify(&self, code: &str, line: &LineResult) -> ClassifiedError {
        ClassifiedError {
            invoice_ref: line.invoice_ref.clone(),
            descriptor: self.classifier.lookup(code),
            authority_description: line.error_description.clone(),
        }
    }
}

/// Backoff after a transport error: `base · 2^attempt` scaled by a uniform
/// factor in `[0.75, 1.25]`, capped at the profile's max delay.
pub fn backoff_with_jitter<R: Rng + ?Sized>(
    attempt: u32,
    profile: &RetryProfile,
    rng: &mut R,
) -> Duration {
    profile.jittered_delay(attempt, rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> ResponseAnalyzer {
        ResponseAnalyzer::default()
    }

    #[test]
    fn all_accepted_is_fully_successful() {
        let r = RawResponse::new(
            GlobalStatus::Accepted,
            vec![LineResult::accepted("F-1"), LineResult::accepted("F-2")],
        )
        .with_confirmation("CSV-0001");
        let o = analyzer().analyze(&r);
        assert_eq!((o.processed, o.accepted, o.rejected), (2, 2, 0));
        assert!(o.fully_successful);
        assert!(!o.partial_failure);
        assert_eq!(o.confirmation_token.as_deref(), Some("CSV-0001"));
        assert!(!analyzer().should_retry(&o));
    }

    #[test]
    fn accepted_with_errors_is_not_fully_successful() {
        let r = RawResponse::new(
            GlobalStatus::Accepted,
            vec![LineResult::accepted_with_errors("F-1", "3101")],
        );
        let o = analyzer().analyze(&r);
        assert!(!o.fully_successful);
        assert_eq!(o.accepted_with_errors, 1);
        assert_eq!(o.admissible_errors.len(), 1);
        assert!(o.requires_subsanacion);
        assert!(!analyzer().should_retry(&o));
    }

    #[test]
    fn line_state_governs_bucket_over_catalog_flag() {
        // 4001 is catalogued non-admissible, but the line says accepted.
        let r = RawResponse::new(
            GlobalStatus::Accepted,
            vec![LineResult::accepted_with_errors("F-1", "4001")],
        );
        let o = analyzer().analyze(&r);
        assert_eq!(o.admissible_errors.len(), 1);
        assert!(o.non_admissible_errors.is_empty());
        assert!(!o.admissible_errors[0].descriptor.admissible);
    }

    #[test]
    fn partial_acceptance_with_recoverable_rejection_retries() {
        let r = RawResponse::new(
            GlobalStatus::PartiallyAccepted,
            vec![LineResult::accepted("F-1"), LineResult::rejected("F-2", "2001")],
        );
        let o = analyzer().analyze(&r);
        assert!(o.partial_failure);
        assert!(o.has_recoverable_errors);
        assert!(analyzer().should_retry(&o));
    }

    #[test]
    fn any_blocking_rejection_prevents_retry() {
        let r = RawResponse::new(
            GlobalStatus::Rejected,
            vec![LineResult::rejected("F-1", "2001"), LineResult::rejected("F-2", "4002")],
        );
        let o = analyzer().analyze(&r);
        assert!(o.has_recoverable_errors);
        assert!(!analyzer().should_retry(&o));
    }

    #[test]
    fn rejection_without_code_is_fail_safe() {
        let r = RawResponse::new(
            GlobalStatus::Rejected,
            vec![LineResult {
                state: LineState::Rejected,
                error_code: None,
                error_description: None,
                invoice_ref: "F-1".into(),
                duplicate_of: None,
            }],
        );
        let o = analyzer().analyze(&r);
        assert_eq!(o.non_admissible_errors.len(), 1);
        assert_eq!(o.non_admissible_errors[0].category(), ErrorCategory::NonRecoverable);
        assert!(!o.has_recoverable_errors);
        assert!(!analyzer().should_retry(&o));
    }

    #[test]
    fn duplicates_are_counted_with_diagnostic() {
        let r = RawResponse::new(
            GlobalStatus::Rejected,
            vec![LineResult::rejected("F-7", "3000").with_duplicate_of("PREV-123")],
        );
        let o = analyzer().analyze(&r);
        assert_eq!(o.duplicates, 1);
        assert!(o.diagnostics.iter().any(|d| d.contains("PREV-123")));
        assert!(o.diagnostics[0].starts_with("F-7"));
    }

    #[test]
    fn authority_description_is_preserved() {
        let r = RawResponse::new(
            GlobalStatus::Rejected,
            vec![LineResult::rejected("F-1", "4003").with_description("NIF mal formado")],
        );
        let o = analyzer().analyze(&r);
        assert_eq!(
            o.non_admissible_errors[0].authority_description.as_deref(),
            Some("NIF mal formado")
        );
    }

    #[test]
    fn wait_time_prefers_positive_hint() {
        let p = RetryProfile::default();
        let mut o = analyzer().analyze(
            &RawResponse::new(GlobalStatus::Rejected, vec![LineResult::rejected("F", "2002")])
                .with_wait_hint(120),
        );
        assert_eq!(analyzer().compute_wait_time(&o, 0, &p), Duration::from_secs(120));

        o.server_wait_hint_seconds = Some(0);
        assert_eq!(analyzer().compute_wait_time(&o, 0, &p), Duration::from_secs(2));
        o.server_wait_hint_seconds = None;
        assert_eq!(analyzer().compute_wait_time(&o, 3, &p), Duration::from_secs(16));
    }

    #[test]
    fn wait_time_never_exceeds_max() {
        let p = RetryProfile::fast_test();
        let o = analyzer().analyze(
            &RawResponse::new(GlobalStatus::Rejected, vec![]).with_wait_hint(3600),
        );
        assert_eq!(analyzer().compute_wait_time(&o, 0, &p), Duration::from_secs(60));
    }

    #[test]
    fn huge_cap_with_hint_uses_the_hint() {
        let p = RetryProfile::new(3, 1.0, 1e18).unwrap();
        let o = analyzer().analyze(
            &RawResponse::new(GlobalStatus::Rejected, vec![LineResult::rejected("F", "2002")])
                .with_wait_hint(120),
        );
        assert_eq!(analyzer().compute_wait_time(&o, 0, &p), Duration::from_secs(120));
        let unhinted = analyzer().analyze(&RawResponse::new(GlobalStatus::Rejected, vec![]));
        assert!(analyzer().compute_wait_time(&unhinted, 200, &p) <= p.max_delay());
    }
}
