//! Verification result types.

use crate::error::ProducerError;
use crate::matching::MatchResult;
use serde::Serialize;
use uuid::Uuid;

/// Result of verifying one interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResult {
    /// Position of the interaction in its document
    pub index: usize,
    /// Interaction description
    pub description: String,
    /// Mismatches found in the message contents
    pub content_mismatches: Vec<MatchResult>,
    /// Mismatches found in the message metadata
    pub metadata_mismatches: Vec<MatchResult>,
    /// Set when the message could not be produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_error: Option<ProducerError>,
}

impl InteractionResult {
    /// Result for an interaction whose message was produced and matched.
    #[must_use]
    pub fn matched(
        index: usize,
        description: impl Into<String>,
        content_mismatches: Vec<MatchResult>,
        metadata_mismatches: Vec<MatchResult>,
    ) -> Self {
        Self {
            index,
            description: description.into(),
            content_mismatches,
            metadata_mismatches,
            producer_error: None,
        }
    }

    /// Result for an interaction whose producer was missing or failed.
    #[must_use]
    pub fn producer_failed(
        index: usize,
        description: impl Into<String>,
        error: ProducerError,
    ) -> Self {
        Self {
            index,
            description: description.into(),
            content_mismatches: Vec::new(),
            metadata_mismatches: Vec::new(),
            producer_error: Some(error),
        }
    }

    /// Passed iff no mismatches and no producer error.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.producer_error.is_none()
            && self.content_mismatches.is_empty()
            && self.metadata_mismatches.is_empty()
    }

    /// Total number of mismatches.
    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.content_mismatches.len() + self.metadata_mismatches.len()
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Every interaction passed
    Passed,
    /// At least one interaction failed
    Failed,
    /// The run was cancelled before every interaction was verified
    Aborted,
}

/// Outcome of verifying one contract document. Immutable once built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    run_id: Uuid,
    provider_name: String,
    consumer_name: String,
    results: Vec<InteractionResult>,
    overall_passed: bool,
    status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    abort_reason: Option<String>,
}

impl VerificationOutcome {
    /// AND-reduce interaction results into a completed outcome.
    ///
    /// Results are ordered by interaction index regardless of input order.
    #[must_use]
    pub fn aggregate(
        provider_name: impl Into<String>,
        consumer_name: impl Into<String>,
        results: Vec<InteractionResult>,
    ) -> Self {
        Self::build(
            Uuid::new_v4(),
            provider_name.into(),
            consumer_name.into(),
            results,
            None,
        )
    }

    pub(crate) fn build(
        run_id: Uuid,
        provider_name: String,
        consumer_name: String,
        mut results: Vec<InteractionResult>,
        abort_reason: Option<String>,
    ) -> Self {
        results.sort_by_key(|r| r.index);
        let overall_passed = results.iter().all(InteractionResult::passed);
        let status = if abort_reason.is_some() {
            VerificationStatus::Aborted
        } else if overall_passed {
            VerificationStatus::Passed
        } else {
            VerificationStatus::Failed
        };
        Self {
            run_id,
            provider_name,
            consumer_name,
            results,
            overall_passed,
            status,
            abort_reason,
        }
    }

    /// Identifier of the run, used for log correlation.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Provider name from the contract document.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Consumer name from the contract document.
    #[must_use]
    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Per-interaction results in document order.
    #[must_use]
    pub fn results(&self) -> &[InteractionResult] {
        &self.results
    }

    /// AND over every recorded interaction result.
    ///
    /// An aborted run may report `true` here for the interactions it reached;
    /// check [`VerificationOutcome::status`] to tell completed runs apart.
    #[must_use]
    pub const fn overall_passed(&self) -> bool {
        self.overall_passed
    }

    /// Terminal status.
    #[must_use]
    pub const fn status(&self) -> VerificationStatus {
        self.status
    }

    /// Whether the run completed and every interaction passed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == VerificationStatus::Passed
    }

    /// Cancellation reason of an aborted run.
    #[must_use]
    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Results of failed interactions.
    pub fn failures(&self) -> impl Iterator<Item = &InteractionResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// Number of passed interactions.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Number of failed interactions.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }
}
