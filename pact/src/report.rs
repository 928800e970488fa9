//! Reporting and result publishing.
//!
//! Nothing here mutates a [`VerificationOutcome`]. The broker itself is an
//! external collaborator behind [`ResultPublisher`]; this module only decides
//! whether to publish and builds the payload.

use crate::config::VerifierConfig;
use crate::error::PactResult;
use crate::matching::MatchResult;
use crate::value::Value;
use crate::verification::{InteractionResult, VerificationOutcome, VerificationStatus};
use chrono::{SecondsFormat, Utc};
use pact_common::PlatformError;
use serde::Serialize;
use std::fmt::Write;
use tracing::{debug, info};
use uuid::Uuid;

/// Render a human-readable report listing every mismatch of every failed interaction.
#[must_use]
pub fn render(outcome: &VerificationOutcome) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, outcome);
    out
}

fn write_report(out: &mut String, outcome: &VerificationOutcome) -> std::fmt::Result {
    writeln!(
        out,
        "Verifying a pact between {} and {}",
        outcome.consumer_name(),
        outcome.provider_name()
    )?;
    for result in outcome.results() {
        let mark = if result.passed() { "OK" } else { "FAILED" };
        writeln!(out, "  {} ... {mark}", result.description)?;
    }

    let failures: Vec<_> = outcome.failures().collect();
    if !failures.is_empty() {
        writeln!(out, "\nFailures:")?;
        for (n, result) in failures.iter().enumerate() {
            writeln!(out, "\n{}) {}", n + 1, result.description)?;
            if let Some(error) = &result.producer_error {
                writeln!(out, "    {error}")?;
            }
            let mismatches = result
                .content_mismatches
                .iter()
                .map(|m| ("content", m))
                .chain(result.metadata_mismatches.iter().map(|m| ("metadata", m)));
            for (i, (field, mismatch)) in mismatches.enumerate() {
                write_mismatch(out, n + 1, i + 1, field, mismatch)?;
            }
        }
    }

    writeln!(
        out,
        "\n{} interaction(s), {} failure(s)",
        outcome.results().len(),
        outcome.failed_count()
    )?;
    match outcome.status() {
        VerificationStatus::Passed => writeln!(out, "Status: PASSED"),
        VerificationStatus::Failed => writeln!(out, "Status: FAILED"),
        VerificationStatus::Aborted => writeln!(
            out,
            "Status: ABORTED ({})",
            outcome.abort_reason().unwrap_or("cancelled")
        ),
    }
}

fn write_mismatch(
    out: &mut String,
    n: usize,
    i: usize,
    field: &str,
    mismatch: &MatchResult,
) -> std::fmt::Result {
    writeln!(
        out,
        "    {n}.{i}) {field} {} [{}]: {}",
        mismatch.path, mismatch.kind, mismatch.description
    )?;
    let show = |value: Option<&Value>| {
        value.map_or_else(|| "<absent>".to_string(), ToString::to_string)
    };
    let expected = show(mismatch.expected.as_ref());
    let actual = show(mismatch.actual.as_ref());
    writeln!(out, "         expected: {expected}")?;
    writeln!(out, "         actual:   {actual}")
}

/// Render the outcome as pretty-printed JSON.
///
/// # Errors
///
/// Returns a serialization error if the outcome cannot be encoded.
pub fn render_json(outcome: &VerificationOutcome) -> PactResult<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

/// Per-interaction entry of a publish payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDiagnostic {
    /// Whether the interaction passed
    pub success: bool,
    /// Full interaction result
    #[serde(flatten)]
    pub result: InteractionResult,
}

/// Verification results as handed to the broker. Every key, including those
/// of the nested interaction results, is camelCase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPayload {
    /// Run identifier
    pub run_id: Uuid,
    /// Provider name
    pub provider_name: String,
    /// Consumer name
    pub consumer_name: String,
    /// AND over every interaction result
    pub overall_passed: bool,
    /// Terminal status
    pub status: VerificationStatus,
    /// Provider version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_version: Option<String>,
    /// Provider branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_branch: Option<String>,
    /// RFC 3339 timestamp of payload creation
    pub verified_at: String,
    /// Per-interaction diagnostics
    pub interactions: Vec<InteractionDiagnostic>,
}

impl PublishPayload {
    /// Build the payload for an outcome.
    #[must_use]
    pub fn from_outcome(outcome: &VerificationOutcome, config: &VerifierConfig) -> Self {
        Self {
            run_id: outcome.run_id(),
            provider_name: outcome.provider_name().to_string(),
            consumer_name: outcome.consumer_name().to_string(),
            overall_passed: outcome.overall_passed(),
            status: outcome.status(),
            provider_version: config.provider_version.clone(),
            provider_branch: config.provider_branch.clone(),
            verified_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            interactions: outcome
                .results()
                .iter()
                .map(|result| InteractionDiagnostic {
                    success: result.passed(),
                    result: result.clone(),
                })
                .collect(),
        }
    }
}

/// Destination for verification results, typically a pact broker client.
pub trait ResultPublisher: Send + Sync {
    /// Publish one payload.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`] if the destination rejects the payload.
    fn publish(&self, payload: &PublishPayload) -> Result<(), PlatformError>;
}

/// Whether results of `outcome` should be published under `config`.
///
/// Aborted runs are never published.
#[must_use]
pub fn should_publish(config: &VerifierConfig, outcome: &VerificationOutcome) -> bool {
    config.publish_results
        && (!config.publish_only_on_ci || config.ci)
        && (!config.publish_only_if_passed || outcome.overall_passed())
        && outcome.status() != VerificationStatus::Aborted
}

/// Publish `outcome` if [`should_publish`] allows it. Returns whether it did.
///
/// # Errors
///
/// Returns the publisher's error.
pub fn publish_if_enabled<P: ResultPublisher + ?Sized>(
    config: &VerifierConfig,
    outcome: &VerificationOutcome,
    publisher: &P,
) -> PactResult<bool> {
    if !should_publish(config, outcome) {
        debug!(run_id = %outcome.run_id(), "publishing disabled for this run");
        return Ok(false);
    }
    let payload = PublishPayload::from_outcome(outcome, config);
    publisher.publish(&payload)?;
    info!(
        run_id = %outcome.run_id(),
        provider = %payload.provider_name,
        consumer = %payload.consumer_name,
        success = payload.overall_passed,
        "verification results published"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProducerError;
    use crate::matching::MismatchKind;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        payloads: Mutex<Vec<PublishPayload>>,
    }

    impl ResultPublisher for RecordingPublisher {
        fn publish(&self, payload: &PublishPayload) -> Result<(), PlatformError> {
            self.payloads.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    struct UnavailableBroker;

    impl ResultPublisher for UnavailableBroker {
        fn publish(&self, _payload: &PublishPayload) -> Result<(), PlatformError> {
            Err(PlatformError::unavailable("broker"))
        }
    }

    const SONG: &str = "You can hear happiness staggering on down the street";

    fn failing_outcome() -> VerificationOutcome {
        let lyric = MatchResult {
            path: "$.song".to_string(),
            kind: MismatchKind::Mismatch,
            expected: Some(Value::from("And the wind whispers Mary")),
            actual: Some(Value::from("wrong lyric")),
            description: "Expected a different lyric".to_string(),
        };
        let missing = ProducerError::NotFound("unregistered".to_string());
        VerificationOutcome::aggregate(
            "test_provider",
            "test_consumer",
            vec![
                InteractionResult::matched(0, "a hello message", vec![], vec![]),
                InteractionResult::matched(1, SONG, vec![lyric], vec![]),
                InteractionResult::producer_failed(2, "unregistered", missing),
            ],
        )
    }

    fn collect_keys(value: &serde_json::Value, keys: &mut Vec<String>) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, child) in map {
                    keys.push(key.clone());
                    collect_keys(child, keys);
                }
            }
            serde_json::Value::Array(items) => {
                for child in items {
                    collect_keys(child, keys);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_render_lists_every_mismatch() {
        let report = render(&failing_outcome());

        assert!(report.contains("Verifying a pact between test_consumer and test_provider"));
        assert!(report.contains("a hello message ... OK"));
        assert!(report.contains(&format!("{SONG} ... FAILED")));
        assert!(report.contains("content $.song [Mismatch]"));
        assert!(report.contains("expected: \"And the wind whispers Mary\""));
        assert!(report.contains("actual:   \"wrong lyric\""));
        assert!(report.contains("No producer registered for 'unregistered'"));
        assert!(report.contains("3 interaction(s), 2 failure(s)"));
        assert!(report.ends_with("Status: FAILED\n"));
    }

    #[test]
    fn test_render_does_not_mutate_outcome() {
        let outcome = failing_outcome();
        let before = render_json(&outcome).unwrap();
        let _ = render(&outcome);
        assert_eq!(render_json(&outcome).unwrap(), before);
    }

    #[test]
    fn test_render_passed() {
        let results = vec![InteractionResult::matched(0, "a", vec![], vec![])];
        let outcome = VerificationOutcome::aggregate("p", "c", results);
        let report = render(&outcome);
        assert!(!report.contains("Failures:"));
        assert!(report.ends_with("Status: PASSED\n"));
    }

    #[test]
    fn test_should_publish_gates() {
        let passed = VerificationOutcome::aggregate("p", "c", vec![]);
        let failed = failing_outcome();

        assert!(!should_publish(&VerifierConfig::default(), &passed));

        let config = VerifierConfig::default().with_publish_results(true);
        assert!(should_publish(&config, &passed));
        assert!(should_publish(&config, &failed));

        let config = VerifierConfig::default()
            .with_publish_results(true)
            .publish_only_if_passed();
        assert!(should_publish(&config, &passed));
        assert!(!should_publish(&config, &failed));

        let config = VerifierConfig::default()
            .with_publish_results(true)
            .publish_only_on_ci();
        assert!(!should_publish(&config, &passed));
        assert!(should_publish(&config.with_ci(true), &passed));
    }

    #[test]
    fn test_publish_payload() {
        let config = VerifierConfig::new("test_provider")
            .with_provider_version("abc123")
            .with_provider_branch("main");
        let payload = PublishPayload::from_outcome(&failing_outcome(), &config);

        assert!(!payload.overall_passed);
        assert_eq!(payload.interactions.len(), 3);
        assert!(payload.interactions[0].success);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["providerName"], "test_provider");
        assert_eq!(json["providerVersion"], "abc123");
        let song = &json["interactions"][1];
        assert_eq!(song["success"], false);
        assert_eq!(song["contentMismatches"][0]["path"], "$.song");
        assert_eq!(
            json["interactions"][2]["producerError"],
            json!({"kind": "not_found", "message": "unregistered"})
        );
    }

    #[test]
    fn test_publish_payload_keys_are_camel_case() {
        let config = VerifierConfig::new("test_provider").with_provider_version("abc123");
        let payload = PublishPayload::from_outcome(&failing_outcome(), &config);

        let mut keys = Vec::new();
        collect_keys(&serde_json::to_value(&payload).unwrap(), &mut keys);
        assert!(keys.contains(&"verifiedAt".to_string()));
        assert!(keys.contains(&"metadataMismatches".to_string()));
        let snake: Vec<_> = keys.iter().filter(|k| k.contains('_')).collect();
        assert!(snake.is_empty(), "snake_case keys in payload: {snake:?}");
    }

    #[test]
    fn test_render_json_keys_are_camel_case() {
        let rendered = render_json(&failing_outcome()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert!(json["runId"].is_string());
        assert_eq!(json["overallPassed"], false);
        let mismatch = &json["results"][1]["contentMismatches"][0];
        assert_eq!(mismatch["kind"], "mismatch");
    }

    #[test]
    fn test_publish_if_enabled() {
        let publisher = RecordingPublisher::default();
        let outcome = failing_outcome();

        assert!(!publish_if_enabled(&VerifierConfig::default(), &outcome, &publisher).unwrap());
        assert!(publisher.payloads.lock().unwrap().is_empty());

        let config = VerifierConfig::default().with_publish_results(true);
        assert!(publish_if_enabled(&config, &outcome, &publisher).unwrap());
        assert_eq!(publisher.payloads.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_publish_error_propagates() {
        let config = VerifierConfig::default().with_publish_results(true);
        let outcome = failing_outcome();
        let err = publish_if_enabled(&config, &outcome, &UnavailableBroker).unwrap_err();
        assert_eq!(err.to_string(), "Service unavailable: broker");
    }
}
