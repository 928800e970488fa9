//! File-level verification entry point.
//!
//! A [`Verifier`] pairs a [`VerifierConfig`] with a [`ProducerRegistry`] and
//! verifies pact files against it, one [`VerificationOutcome`] per file.

use crate::cancellation::CancellationToken;
use crate::config::VerifierConfig;
use crate::contract::{ContractDocument, parse};
use crate::error::{PactError, PactResult, ParseError};
use crate::matrix::{CanIDeployResult, MatrixEntry};
use crate::registry::ProducerRegistry;
use crate::runner::{run_concurrent, run_with};
use crate::verification::VerificationOutcome;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of verifying one pact file.
#[derive(Debug)]
pub struct FileOutcome {
    /// File that was verified
    pub path: PathBuf,
    /// Verification outcome, or why the file could not be verified
    pub outcome: PactResult<VerificationOutcome>,
}

impl FileOutcome {
    /// Whether the file was verified and every interaction passed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome
            .as_ref()
            .is_ok_and(VerificationOutcome::succeeded)
    }
}

/// Verifies pact files against registered message producers.
#[derive(Debug, Clone)]
pub struct Verifier {
    config: VerifierConfig,
    registry: Arc<ProducerRegistry>,
    token: CancellationToken,
}

impl Verifier {
    /// Create a verifier.
    #[must_use]
    pub fn new(config: VerifierConfig, registry: ProducerRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            token: CancellationToken::new(),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Registered producers.
    #[must_use]
    pub fn registry(&self) -> &ProducerRegistry {
        &self.registry
    }

    /// Token that cancels every run started by this verifier.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Verify an already parsed document.
    #[must_use]
    pub fn verify_document(&self, document: &ContractDocument) -> VerificationOutcome {
        self.check_provider(document);
        run_with(
            document,
            &self.registry,
            &self.config.run_options(),
            &self.token,
        )
    }

    /// Parse and verify a document held in memory.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] if the document is unusable; no partial
    /// outcome is produced.
    pub fn verify_bytes(&self, bytes: &[u8]) -> Result<VerificationOutcome, ParseError> {
        let document = parse(bytes)?;
        Ok(self.verify_document(&document))
    }

    /// Read, parse and verify one pact file.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Io`] if the file cannot be read and
    /// [`PactError::Parse`] if it is not a usable contract document.
    pub fn verify_file(&self, path: impl AsRef<Path>) -> PactResult<VerificationOutcome> {
        let path = path.as_ref();
        info!(path = %path.display(), "verifying pact file");
        let bytes = std::fs::read(path).map_err(|source| PactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.verify_bytes(&bytes)?)
    }

    /// Verify several pact files in order. A file that cannot be read or
    /// parsed yields an error for that file only.
    pub fn verify_files<I, P>(&self, paths: I) -> Vec<FileOutcome>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref().to_path_buf();
                let outcome = self.verify_file(&path);
                if let Err(err) = &outcome {
                    error!(
                        path = %path.display(),
                        error = %err,
                        "pact file could not be verified"
                    );
                }
                FileOutcome { path, outcome }
            })
            .collect()
    }

    /// Read and verify one pact file on the concurrent runner, using
    /// `max_concurrency` workers.
    ///
    /// # Errors
    ///
    /// Same as [`Verifier::verify_file`].
    pub async fn verify_file_concurrent(
        &self,
        path: impl AsRef<Path>,
    ) -> PactResult<VerificationOutcome> {
        let path = path.as_ref();
        info!(path = %path.display(), "verifying pact file concurrently");
        let bytes = tokio::fs::read(path).await.map_err(|source| PactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = parse(&bytes)?;
        self.check_provider(&document);
        Ok(run_concurrent(
            Arc::new(document),
            Arc::clone(&self.registry),
            self.config.run_options(),
            self.token.clone(),
            self.config.max_concurrency,
        )
        .await)
    }

    /// Can-i-deploy summary over file outcomes. Files that could not be
    /// verified count as failed contracts.
    #[must_use]
    pub fn can_i_deploy(&self, files: &[FileOutcome]) -> CanIDeployResult {
        let provider = self
            .config
            .provider_name
            .as_deref()
            .unwrap_or("unknown provider");
        let matrix = files
            .iter()
            .map(|file| {
                let entry = match &file.outcome {
                    Ok(outcome) => MatrixEntry::new(
                        outcome.consumer_name(),
                        outcome.provider_name(),
                        outcome.succeeded(),
                    ),
                    Err(_) => MatrixEntry::new(file.path.display().to_string(), provider, false),
                };
                match &self.config.provider_version {
                    Some(version) => entry.with_provider_version(version),
                    None => entry,
                }
            })
            .collect();
        CanIDeployResult::from_matrix(matrix)
    }

    fn check_provider(&self, document: &ContractDocument) {
        let Some(expected) = &self.config.provider_name else {
            return;
        };
        if expected != document.provider_name() {
            warn!(
                expected = %expected,
                actual = document.provider_name(),
                "pact names a different provider, verifying anyway"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterInfo;
    use crate::registry::Message;
    use crate::verification::VerificationStatus;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HELLO: &str = "a hello message";
    const SONG: &str = "You can hear happiness staggering on down the street";
    const LYRIC: &str = "And the wind whispers Mary";

    fn pact_json() -> serde_json::Value {
        json!({
            "consumer": {"name": "test_consumer"},
            "provider": {"name": "test_provider"},
            "messages": [
                {
                    "description": HELLO,
                    "contents": {"text": "Hello Mary"},
                    "metadata": {"queue": "myKey"}
                },
                {
                    "description": SONG,
                    "contents": {"song": LYRIC},
                    "metadata": {"queue": "myKey"}
                }
            ],
            "metadata": {"pactSpecification": {"version": "3.0.0"}}
        })
    }

    fn pact_bytes() -> Vec<u8> {
        pact_json().to_string().into_bytes()
    }

    fn registry(song: &'static str) -> ProducerRegistry {
        ProducerRegistry::new()
            .with_producer(HELLO, || {
                let message = Message::new(json!({"text": "Hello Mary"}));
                Ok(message.with_metadata("queue", "myKey"))
            })
            .with_producer(SONG, move || {
                let message = Message::new(json!({"song": song}));
                Ok(message.with_metadata("queue", "myKey"))
            })
    }

    fn write_pact(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_verify_bytes() {
        let verifier = Verifier::new(VerifierConfig::new("test_provider"), registry(LYRIC));
        let outcome = verifier.verify_bytes(&pact_bytes()).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.results().len(), 2);
    }

    #[test]
    fn test_verify_bytes_parse_error() {
        let verifier = Verifier::new(VerifierConfig::default(), registry(LYRIC));
        let err = verifier.verify_bytes(b"{ not json").unwrap_err();
        assert!(matches!(err, ParseError::MalformedStructure(_)));
    }

    #[test]
    fn test_verify_file() {
        let pact = write_pact(&pact_bytes());
        let verifier = Verifier::new(VerifierConfig::new("someProvider"), registry("wrong"));

        let outcome = verifier.verify_file(pact.path()).unwrap();
        assert_eq!(outcome.status(), VerificationStatus::Failed);
        assert!(outcome.results()[0].passed());
        assert_eq!(outcome.results()[1].content_mismatches[0].path, "$.song");
    }

    #[test]
    fn test_verify_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Verifier::new(VerifierConfig::default(), ProducerRegistry::new());

        let err = verifier
            .verify_file(dir.path().join("consumer-provider.json"))
            .unwrap_err();
        assert!(matches!(err, PactError::Io { .. }));
    }

    #[test]
    fn test_verify_files_isolates_bad_file() {
        let good = write_pact(&pact_bytes());
        let bad = write_pact(br#"{"consumer": {"name": "c"}}"#);
        let verifier = Verifier::new(VerifierConfig::new("test_provider"), registry(LYRIC));

        let files = verifier.verify_files([good.path(), bad.path()]);
        assert_eq!(files.len(), 2);
        assert!(files[0].succeeded());
        assert!(matches!(
            files[1].outcome,
            Err(PactError::Parse(ParseError::MissingRequiredField(_)))
        ));

        let summary = verifier.can_i_deploy(&files);
        assert!(!summary.can_deploy());
        assert_eq!(summary.matrix[0].consumer, "test_consumer");
        assert!(!summary.matrix[1].success);
    }

    #[test]
    fn test_verify_with_filter() {
        let filter = FilterInfo::none().with_description("^a hello").unwrap();
        let config = VerifierConfig::new("test_provider").with_filter(filter);
        let verifier = Verifier::new(config, registry("wrong lyric"));

        let outcome = verifier.verify_bytes(&pact_bytes()).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.results().len(), 1);
    }

    #[test]
    fn test_cancelled_verifier_aborts() {
        let verifier = Verifier::new(VerifierConfig::default(), registry(LYRIC));
        verifier.cancellation_token().cancel("shutdown");

        let outcome = verifier.verify_bytes(&pact_bytes()).unwrap();
        assert_eq!(outcome.status(), VerificationStatus::Aborted);
        assert!(outcome.results().is_empty());
    }

    #[tokio::test]
    async fn test_verify_file_concurrent() {
        let pact = write_pact(&pact_bytes());
        let config = VerifierConfig::new("test_provider").with_max_concurrency(2);
        let verifier = Verifier::new(config, registry(LYRIC));

        let outcome = verifier.verify_file_concurrent(pact.path()).await.unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.results()[0].description, HELLO);
    }
}
