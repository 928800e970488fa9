//! Property-based tests for pact-common.

use pact_common::{PlatformError, TracingConfig};
use proptest::prelude::*;

fn log_level_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["trace", "debug", "info", "warn", "error"]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Constructor messages survive into the rendered error.
    #[test]
    fn prop_error_messages_preserved(msg in "[a-zA-Z0-9 _.-]{1,50}") {
        let errors = [
            (PlatformError::invalid_input(msg.clone()), "Invalid input: "),
            (PlatformError::unavailable(msg.clone()), "Service unavailable: "),
            (PlatformError::internal(msg.clone()), "Internal error: "),
        ];
        for (err, prefix) in errors {
            prop_assert_eq!(err.to_string(), format!("{prefix}{msg}"));
        }
    }

    /// Builder settings are kept verbatim.
    #[test]
    fn prop_tracing_builder(name in "[a-z][a-z-]{0,20}", level in log_level_strategy()) {
        let config = TracingConfig::default()
            .with_service_name(name.clone())
            .with_log_level(level.clone());
        prop_assert_eq!(config.service_name, name);
        prop_assert_eq!(config.log_level, level);
        prop_assert!(!config.json_output);
    }
}
