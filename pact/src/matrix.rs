//! Can-i-deploy decision over a set of verification outcomes.

use crate::verification::VerificationOutcome;
use serde::Serialize;

/// Result of a can-i-deploy check.
#[derive(Debug, Clone, Serialize)]
pub struct CanIDeployResult {
    /// Whether deployment is allowed
    pub ok: bool,
    /// Reason for result
    pub reason: String,
    /// Verification matrix
    pub matrix: Vec<MatrixEntry>,
}

impl CanIDeployResult {
    /// Create from matrix entries.
    #[must_use]
    pub fn from_matrix(matrix: Vec<MatrixEntry>) -> Self {
        let ok = matrix.iter().all(|e| e.success);
        let reason = if ok {
            "All contracts verified".to_string()
        } else {
            let failed: Vec<_> = matrix
                .iter()
                .filter(|e| !e.success)
                .map(|e| format!("{} -> {}", e.consumer, e.provider))
                .collect();
            format!("Verification failed: {}", failed.join(", "))
        };

        Self { ok, reason, matrix }
    }

    /// One matrix entry per outcome. Aborted runs count as unverified.
    #[must_use]
    pub fn from_outcomes<'a>(
        outcomes: impl IntoIterator<Item = &'a VerificationOutcome>,
        provider_version: Option<&str>,
    ) -> Self {
        Self::from_matrix(
            outcomes
                .into_iter()
                .map(|outcome| MatrixEntry::from_outcome(outcome, provider_version))
                .collect(),
        )
    }

    /// Check if deployment is allowed.
    #[must_use]
    pub const fn can_deploy(&self) -> bool {
        self.ok
    }
}

/// Entry in the verification matrix.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixEntry {
    /// Consumer name
    pub consumer: String,
    /// Provider name
    pub provider: String,
    /// Provider version, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_version: Option<String>,
    /// Whether verification succeeded
    pub success: bool,
}

impl MatrixEntry {
    /// Create a new matrix entry.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>, success: bool) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            provider_version: None,
            success,
        }
    }

    /// Set the provider version.
    #[must_use]
    pub fn with_provider_version(mut self, version: impl Into<String>) -> Self {
        self.provider_version = Some(version.into());
        self
    }

    fn from_outcome(outcome: &VerificationOutcome, provider_version: Option<&str>) -> Self {
        Self {
            consumer: outcome.consumer_name().to_string(),
            provider: outcome.provider_name().to_string(),
            provider_version: provider_version.map(str::to_string),
            success: outcome.succeeded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProducerError;
    use crate::verification::InteractionResult;

    #[test]
    fn test_can_deploy_all_success() {
        let matrix = vec![
            MatrixEntry::new("test_consumer", "test_provider", true),
            MatrixEntry::new("audit_consumer", "test_provider", true)
                .with_provider_version("1.2.0"),
        ];

        let result = CanIDeployResult::from_matrix(matrix);
        assert!(result.can_deploy());
        assert!(result.reason.contains("All contracts verified"));
    }

    #[test]
    fn test_can_deploy_with_failure() {
        let matrix = vec![
            MatrixEntry::new("test_consumer", "test_provider", true),
            MatrixEntry::new("audit_consumer", "test_provider", false),
        ];

        let result = CanIDeployResult::from_matrix(matrix);
        assert!(!result.can_deploy());
        assert_eq!(
            result.reason,
            "Verification failed: audit_consumer -> test_provider"
        );
    }

    #[test]
    fn test_empty_matrix() {
        let result = CanIDeployResult::from_matrix(vec![]);
        assert!(result.can_deploy());
    }

    #[test]
    fn test_from_outcomes() {
        let passed = VerificationOutcome::aggregate(
            "test_provider",
            "test_consumer",
            vec![InteractionResult::matched(0, "a hello message", vec![], vec![])],
        );
        let failed = VerificationOutcome::aggregate(
            "test_provider",
            "audit_consumer",
            vec![InteractionResult::producer_failed(
                0,
                "an audit event",
                ProducerError::NotFound("an audit event".to_string()),
            )],
        );

        let result = CanIDeployResult::from_outcomes([&passed], Some("abc123"));
        assert!(result.can_deploy());
        assert_eq!(result.matrix[0].provider_version.as_deref(), Some("abc123"));

        let result = CanIDeployResult::from_outcomes([&passed, &failed], None);
        assert!(!result.can_deploy());
        assert!(result.reason.contains("audit_consumer -> test_provider"));
    }
}
