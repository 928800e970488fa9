//! Verification runner.
//!
//! For every selected interaction, in document order: look up its producer,
//! invoke it, match contents and metadata independently and record the
//! result. A missing or failing producer fails only its own interaction.
//! Producers are never retried.
//!
//! The cancellation token is checked before each interaction starts. A
//! cancelled run returns the interactions verified so far with
//! [`VerificationStatus::Aborted`](crate::VerificationStatus::Aborted).

use crate::cancellation::CancellationToken;
use crate::config::FilterInfo;
use crate::contract::{ContractDocument, Interaction};
use crate::error::ProducerError;
use crate::matching::{MatchingConfig, match_value_with};
use crate::registry::ProducerRegistry;
use crate::verification::{InteractionResult, VerificationOutcome, VerificationStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Matching behaviour
    pub matching: MatchingConfig,
    /// Interaction selection
    pub filter: FilterInfo,
}

/// Verify every interaction of `document` against `registry`.
#[must_use]
pub fn run(document: &ContractDocument, registry: &ProducerRegistry) -> VerificationOutcome {
    let options = RunOptions::default();
    run_with(document, registry, &options, &CancellationToken::new())
}

/// Like [`run`], stopping early once `token` is cancelled.
#[must_use]
pub fn run_with_cancellation(
    document: &ContractDocument,
    registry: &ProducerRegistry,
    token: &CancellationToken,
) -> VerificationOutcome {
    run_with(document, registry, &RunOptions::default(), token)
}

/// Sequential run with explicit options.
#[must_use]
pub fn run_with(
    document: &ContractDocument,
    registry: &ProducerRegistry,
    options: &RunOptions,
    token: &CancellationToken,
) -> VerificationOutcome {
    let run_id = Uuid::new_v4();
    let span = run_span(run_id, document);
    let _guard = span.enter();
    info!(interactions = document.interactions().len(), "starting verification");

    let mut results = Vec::with_capacity(document.interactions().len());
    let mut abort_reason = None;
    for (index, interaction) in document.interactions().iter().enumerate() {
        if token.is_cancelled() {
            abort_reason = Some(cancel_reason(token));
            break;
        }
        if !options.filter.matches(interaction) {
            debug!(description = %interaction.description, "interaction excluded by filter");
            continue;
        }
        results.push(verify_interaction(index, interaction, registry, &options.matching));
    }

    finish(run_id, document, results, abort_reason)
}

/// Verify interactions on a bounded pool of blocking workers.
///
/// Results are ordered by interaction index, not completion order. A
/// producer failure never affects sibling interactions.
pub async fn run_concurrent(
    document: Arc<ContractDocument>,
    registry: Arc<ProducerRegistry>,
    options: RunOptions,
    token: CancellationToken,
    max_workers: usize,
) -> VerificationOutcome {
    let run_id = Uuid::new_v4();
    let span = run_span(run_id, &document);

    async move {
        info!(
            interactions = document.interactions().len(),
            max_workers, "starting concurrent verification"
        );
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();
        let mut abort_reason = None;

        for (index, interaction) in document.interactions().iter().enumerate() {
            if !options.filter.matches(interaction) {
                debug!(description = %interaction.description, "interaction excluded by filter");
                continue;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                abort_reason = Some("worker pool closed".to_string());
                break;
            };
            if token.is_cancelled() {
                abort_reason = Some(cancel_reason(&token));
                break;
            }

            let document = Arc::clone(&document);
            let registry = Arc::clone(&registry);
            let matching = options.matching;
            let worker_span = Span::current();
            let handle = tasks.spawn_blocking(move || {
                let _permit = permit;
                worker_span.in_scope(|| {
                    let interaction = &document.interactions()[index];
                    verify_interaction(index, interaction, &registry, &matching)
                })
            });
            in_flight.insert(handle.id(), (index, interaction.description.clone()));
        }

        let mut results = Vec::with_capacity(in_flight.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => {
                    if let Some((index, description)) = in_flight.remove(&err.id()) {
                        warn!(%description, error = %err, "verification worker failed");
                        results.push(InteractionResult::producer_failed(
                            index,
                            description,
                            ProducerError::Panicked(err.to_string()),
                        ));
                    }
                }
            }
        }

        finish(run_id, &document, results, abort_reason)
    }
    .instrument(span)
    .await
}

/// Verify a single interaction.
pub(crate) fn verify_interaction(
    index: usize,
    interaction: &Interaction,
    registry: &ProducerRegistry,
    matching: &MatchingConfig,
) -> InteractionResult {
    let description = interaction.description.as_str();
    let message = match registry.produce(description) {
        Ok(message) => message,
        Err(error) => {
            warn!(%description, %error, "could not produce message");
            return InteractionResult::producer_failed(index, description, error);
        }
    };

    let content_mismatches = match_value_with(
        &interaction.expected_content,
        &message.contents,
        &interaction.matching_rules.content,
        matching,
    );
    let metadata_mismatches = match_value_with(
        &interaction.expected_metadata,
        &message.metadata_value(),
        &interaction.matching_rules.metadata,
        matching,
    );

    debug!(
        %description,
        content_mismatches = content_mismatches.len(),
        metadata_mismatches = metadata_mismatches.len(),
        "interaction verified"
    );
    InteractionResult::matched(index, description, content_mismatches, metadata_mismatches)
}

fn run_span(run_id: Uuid, document: &ContractDocument) -> Span {
    info_span!(
        "verify",
        %run_id,
        provider = document.provider_name(),
        consumer = document.consumer_name()
    )
}

fn cancel_reason(token: &CancellationToken) -> String {
    token.reason().unwrap_or_else(|| "cancelled".to_string())
}

fn finish(
    run_id: Uuid,
    document: &ContractDocument,
    results: Vec<InteractionResult>,
    abort_reason: Option<String>,
) -> VerificationOutcome {
    let outcome = VerificationOutcome::build(
        run_id,
        document.provider_name().to_string(),
        document.consumer_name().to_string(),
        results,
        abort_reason,
    );

    match outcome.status() {
        VerificationStatus::Passed => info!(passed = outcome.passed_count(), "verification passed"),
        VerificationStatus::Failed => warn!(
            passed = outcome.passed_count(),
            failed = outcome.failed_count(),
            "verification failed"
        ),
        VerificationStatus::Aborted => warn!(
            verified = outcome.results().len(),
            reason = outcome.abort_reason().unwrap_or_default(),
            "verification aborted"
        ),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MismatchKind;
    use crate::registry::Message;
    use crate::value::Value;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HELLO: &str = "a hello message";
    const SONG: &str = "You can hear happiness staggering on down the street";
    const LYRIC: &str = "And the wind whispers Mary";

    fn document() -> ContractDocument {
        let metadata = Value::from(json!({"queue": "myKey"}));
        ContractDocument::new(
            "test_provider",
            "test_consumer",
            vec![
                Interaction::new(HELLO, json!({"text": "Hello Mary"}), metadata.clone()),
                Interaction::new(SONG, json!({"song": LYRIC}), metadata),
            ],
        )
        .unwrap()
    }

    fn hello(queue: &str) -> Message {
        Message::new(json!({"text": "Hello Mary"})).with_metadata("queue", queue)
    }

    fn song(lyric: &str) -> Message {
        Message::new(json!({"song": lyric})).with_metadata("queue", "myKey")
    }

    fn registry(lyric: &'static str) -> ProducerRegistry {
        ProducerRegistry::new()
            .with_producer(HELLO, || Ok(hello("myKey")))
            .with_producer(SONG, move || Ok(song(lyric)))
    }

    #[test]
    fn test_all_interactions_pass() {
        let outcome = run(&document(), &registry(LYRIC));
        assert!(outcome.overall_passed());
        assert_eq!(outcome.status(), VerificationStatus::Passed);
        assert_eq!(outcome.results().len(), 2);
        assert!(outcome.results().iter().all(InteractionResult::passed));
    }

    #[test]
    fn test_wrong_lyric_fails_second_interaction() {
        let outcome = run(&document(), &registry("wrong lyric"));
        assert!(!outcome.overall_passed());
        assert!(outcome.results()[0].passed());

        let second = &outcome.results()[1];
        assert_eq!(second.content_mismatches.len(), 1);
        assert_eq!(second.content_mismatches[0].kind, MismatchKind::Mismatch);
        assert_eq!(second.content_mismatches[0].path, "$.song");
    }

    #[test]
    fn test_missing_producer_does_not_stop_siblings() {
        let registry = ProducerRegistry::new().with_producer(SONG, || Ok(song(LYRIC)));

        let outcome = run(&document(), &registry);
        assert_eq!(outcome.status(), VerificationStatus::Failed);
        assert_eq!(
            outcome.results()[0].producer_error,
            Some(ProducerError::NotFound(HELLO.to_string()))
        );
        assert!(outcome.results()[1].passed());
    }

    #[test]
    fn test_metadata_checked_independently() {
        let registry = registry(LYRIC).with_producer(HELLO, || Ok(hello("otherKey")));

        let outcome = run(&document(), &registry);
        let first = &outcome.results()[0];
        assert!(first.content_mismatches.is_empty());
        assert_eq!(first.metadata_mismatches.len(), 1);
        assert_eq!(first.metadata_mismatches[0].path, "$.queue");
    }

    #[test]
    fn test_cancelled_before_start_is_aborted() {
        let token = CancellationToken::new();
        token.cancel("shutting down");

        let outcome = run_with_cancellation(&document(), &registry(LYRIC), &token);
        assert_eq!(outcome.status(), VerificationStatus::Aborted);
        assert!(outcome.results().is_empty());
        assert_eq!(outcome.abort_reason(), Some("shutting down"));
    }

    #[test]
    fn test_cancelled_mid_run_keeps_processed_results() {
        let token = CancellationToken::new();
        let producer_token = token.clone();
        let registry = registry(LYRIC).with_producer(HELLO, move || {
            producer_token.cancel("stop after first");
            Ok(hello("myKey"))
        });

        let outcome = run_with_cancellation(&document(), &registry, &token);
        assert_eq!(outcome.status(), VerificationStatus::Aborted);
        assert_eq!(outcome.results().len(), 1);
        assert!(outcome.overall_passed());
    }

    #[test]
    fn test_filter_skips_interactions() {
        let options = RunOptions {
            filter: FilterInfo::none().with_description("^a hello").unwrap(),
            ..Default::default()
        };
        let registry = ProducerRegistry::new().with_producer(HELLO, || Ok(hello("myKey")));

        let outcome = run_with(&document(), &registry, &options, &CancellationToken::new());

        assert_eq!(outcome.results().len(), 1);
        assert!(outcome.succeeded());
    }

    #[test]
    fn test_producers_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = registry(LYRIC).with_producer(HELLO, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ProducerError::failed("transient"))
        });

        let outcome = run(&document(), &registry);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!outcome.results()[0].passed());
        assert!(outcome.results()[1].passed());
    }

    #[tokio::test]
    async fn test_concurrent_run_preserves_order() {
        let outcome = run_concurrent(
            Arc::new(document()),
            Arc::new(registry("wrong lyric")),
            RunOptions::default(),
            CancellationToken::new(),
            4,
        )
        .await;

        let indices: Vec<_> = outcome.results().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(outcome.results()[0].passed());
        assert_eq!(outcome.results()[1].content_mismatches[0].path, "$.song");
        assert_eq!(outcome.status(), VerificationStatus::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_run_isolates_panics() {
        let registry = registry(LYRIC).with_producer(HELLO, || panic!("kaboom"));
        let outcome = run_concurrent(
            Arc::new(document()),
            Arc::new(registry),
            RunOptions::default(),
            CancellationToken::new(),
            2,
        )
        .await;

        assert_eq!(
            outcome.results()[0].producer_error,
            Some(ProducerError::Panicked("kaboom".to_string()))
        );
        assert!(outcome.results()[1].passed());
    }

    #[tokio::test]
    async fn test_concurrent_run_cancelled() {
        let token = CancellationToken::new();
        token.cancel("deadline");
        let outcome = run_concurrent(
            Arc::new(document()),
            Arc::new(registry(LYRIC)),
            RunOptions::default(),
            token,
            1,
        )
        .await;

        assert_eq!(outcome.status(), VerificationStatus::Aborted);
        assert!(outcome.results().is_empty());
    }
}
