//! Verifier configuration.

use crate::contract::Interaction;
use crate::matching::MatchingConfig;
use crate::runner::RunOptions;
use pact_common::PlatformError;
use regex::Regex;

const DEFAULT_MAX_CONCURRENCY: usize = 4;
const MAX_CONCURRENCY: usize = 64;

/// Selects which interactions of a document are verified.
#[derive(Debug, Clone, Default)]
pub struct FilterInfo {
    description: Option<Regex>,
    state: Option<String>,
}

impl FilterInfo {
    /// A filter that selects every interaction.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Only verify interactions whose description matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidInput`] if `pattern` is not a valid regex.
    pub fn with_description(mut self, pattern: &str) -> Result<Self, PlatformError> {
        let regex = Regex::new(pattern).map_err(|e| {
            PlatformError::invalid_input(format!("invalid description filter '{pattern}': {e}"))
        })?;
        self.description = Some(regex);
        Ok(self)
    }

    /// Only verify interactions declaring the named provider state.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Whether no filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.state.is_none()
    }

    /// Whether the interaction is selected.
    #[must_use]
    pub fn matches(&self, interaction: &Interaction) -> bool {
        let description_ok = self
            .description
            .as_ref()
            .is_none_or(|re| re.is_match(&interaction.description));
        let state_ok = self
            .state
            .as_ref()
            .is_none_or(|state| interaction.provider_states.iter().any(|s| &s.name == state));
        description_ok && state_ok
    }
}

/// Verifier configuration.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Expected provider name; a document naming another provider is verified with a warning
    pub provider_name: Option<String>,
    /// Provider version reported to the broker
    pub provider_version: Option<String>,
    /// Provider branch reported to the broker
    pub provider_branch: Option<String>,
    /// Whether results should be published at all
    pub publish_results: bool,
    /// Only publish when running on CI
    pub publish_only_on_ci: bool,
    /// Only publish when verification passed
    pub publish_only_if_passed: bool,
    /// Whether the process runs on CI
    pub ci: bool,
    /// Worker pool size for concurrent verification
    pub max_concurrency: usize,
    /// Interaction selection
    pub filter: FilterInfo,
    /// Matching behaviour
    pub matching: MatchingConfig,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            provider_version: None,
            provider_branch: None,
            publish_results: false,
            publish_only_on_ci: false,
            publish_only_if_passed: false,
            ci: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            filter: FilterInfo::none(),
            matching: MatchingConfig::default(),
        }
    }
}

impl VerifierConfig {
    /// Create a configuration for the named provider.
    #[must_use]
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: Some(provider_name.into()),
            ..Default::default()
        }
    }

    /// Load configuration from the process environment.
    ///
    /// Reads `PACT_PROVIDER_NAME`, `GIT_COMMIT` (or `PACT_PROVIDER_VERSION`),
    /// `GIT_BRANCH`, `PACT_PUBLISH_RESULTS`, `CI`, `PACT_MAX_WORKERS`,
    /// `PACT_DESCRIPTION` and `PACT_PROVIDER_STATE`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidInput`] for unparseable values.
    pub fn from_env() -> Result<Self, PlatformError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidInput`] for unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlatformError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            provider_name: lookup("PACT_PROVIDER_NAME"),
            provider_version: lookup("GIT_COMMIT").or_else(|| lookup("PACT_PROVIDER_VERSION")),
            provider_branch: lookup("GIT_BRANCH"),
            publish_results: lookup("PACT_PUBLISH_RESULTS").is_some_and(|v| v == "true"),
            ci: lookup("CI").is_some_and(|v| !v.is_empty() && v != "false"),
            ..Default::default()
        };

        if let Some(workers) = lookup("PACT_MAX_WORKERS") {
            let workers = workers.trim().parse::<usize>().map_err(|_| {
                let reason = format!("PACT_MAX_WORKERS is not a positive integer: '{workers}'");
                PlatformError::invalid_input(reason)
            })?;
            config = config.with_max_concurrency(workers);
        }
        if let Some(pattern) = lookup("PACT_DESCRIPTION") {
            config.filter = config.filter.with_description(&pattern)?;
        }
        if let Some(state) = lookup("PACT_PROVIDER_STATE") {
            config.filter = config.filter.with_state(state);
        }
        Ok(config)
    }

    /// Set the provider version.
    #[must_use]
    pub fn with_provider_version(mut self, version: impl Into<String>) -> Self {
        self.provider_version = Some(version.into());
        self
    }

    /// Set the provider branch.
    #[must_use]
    pub fn with_provider_branch(mut self, branch: impl Into<String>) -> Self {
        self.provider_branch = Some(branch.into());
        self
    }

    /// Enable or disable result publishing.
    #[must_use]
    pub const fn with_publish_results(mut self, publish: bool) -> Self {
        self.publish_results = publish;
        self
    }

    /// Restrict publishing to CI runs.
    #[must_use]
    pub const fn publish_only_on_ci(mut self) -> Self {
        self.publish_only_on_ci = true;
        self
    }

    /// Restrict publishing to passing runs.
    #[must_use]
    pub const fn publish_only_if_passed(mut self) -> Self {
        self.publish_only_if_passed = true;
        self
    }

    /// Mark the process as running on CI.
    #[must_use]
    pub const fn with_ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    /// Set the worker pool size (clamped to 1-64).
    #[must_use]
    pub fn with_max_concurrency(mut self, workers: usize) -> Self {
        self.max_concurrency = workers.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the interaction filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterInfo) -> Self {
        self.filter = filter;
        self
    }

    /// Set the matching behaviour.
    #[must_use]
    pub const fn with_matching(mut self, matching: MatchingConfig) -> Self {
        self.matching = matching;
        self
    }

    /// Options handed to the runner.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            matching: self.matching,
            filter: self.filter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ProviderState;
    use crate::value::Value;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = VerifierConfig::default();
        assert!(!config.publish_results);
        assert_eq!(config.max_concurrency, 4);
        assert!(config.filter.is_empty());
        assert!(config.matching.allow_unexpected_keys);
    }

    #[test]
    fn test_from_lookup() {
        let config = VerifierConfig::from_lookup(lookup(&[
            ("PACT_PROVIDER_NAME", "someProvider"),
            ("GIT_COMMIT", "abc123"),
            ("GIT_BRANCH", "main"),
            ("PACT_PUBLISH_RESULTS", "true"),
            ("CI", "1"),
            ("PACT_MAX_WORKERS", "8"),
        ]))
        .unwrap();

        assert_eq!(config.provider_name.as_deref(), Some("someProvider"));
        assert_eq!(config.provider_version.as_deref(), Some("abc123"));
        assert_eq!(config.provider_branch.as_deref(), Some("main"));
        assert!(config.publish_results);
        assert!(config.ci);
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_from_lookup_rejects_bad_workers() {
        let err = VerifierConfig::from_lookup(lookup(&[("PACT_MAX_WORKERS", "many")])).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidInput(_)));

        let err = VerifierConfig::from_lookup(lookup(&[("PACT_DESCRIPTION", "(")])).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidInput(_)));
    }

    #[test]
    fn test_ci_false_is_not_ci() {
        let config = VerifierConfig::from_lookup(lookup(&[("CI", "false")])).unwrap();
        assert!(!config.ci);
    }

    #[test]
    fn test_concurrency_clamping() {
        let clamped = |n| VerifierConfig::default().with_max_concurrency(n).max_concurrency;
        assert_eq!(clamped(0), 1);
        assert_eq!(clamped(8), 8);
        assert_eq!(clamped(1000), 64);
    }

    #[test]
    fn test_filter_matches() {
        let empty = Value::empty_mapping;
        let hello = Interaction::new("a hello message", empty(), empty());
        let song = Interaction::new("a song", empty(), empty())
            .with_provider_state(ProviderState::new("radio on"));

        let by_description = FilterInfo::none().with_description("^a hello").unwrap();
        assert!(by_description.matches(&hello));
        assert!(!by_description.matches(&song));

        let by_state = FilterInfo::none().with_state("radio on");
        assert!(!by_state.matches(&hello));
        assert!(by_state.matches(&song));

        assert!(FilterInfo::none().matches(&hello));
    }
}
