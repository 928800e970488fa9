//! Message pact verification engine.
//!
//! Verifies that a provider's message producers still satisfy the contracts
//! recorded by its consumers, without any network exchange between the two.
//!
//! The moving parts, leaves first:
//! - [`contract`]: parses pact documents into an immutable [`ContractDocument`]
//! - [`matching`]: structural matching of expected against actual values
//! - [`registry`]: maps interaction descriptions to producer callbacks
//! - [`runner`]: verifies every interaction, sequentially or on a worker pool
//! - [`report`]: renders outcomes and builds the broker publish payload

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cancellation;
pub mod config;
pub mod contract;
pub mod error;
pub mod matching;
pub mod matrix;
pub mod path;
pub mod registry;
pub mod report;
pub mod rules;
pub mod runner;
pub mod value;
pub mod verification;
pub mod verifier;

pub use cancellation::CancellationToken;
pub use config::{FilterInfo, VerifierConfig};
pub use contract::{ContractDocument, Interaction, PactSpecification, ProviderState, parse};
pub use error::{PactError, PactResult, ParseError, ProducerError};
pub use matching::{MatchResult, MatchingConfig, MismatchKind, match_value, match_value_with};
pub use matrix::{CanIDeployResult, MatrixEntry};
pub use path::{Path, PathPattern};
pub use registry::{Message, Producer, ProducerRegistry};
pub use report::{
    PublishPayload, ResultPublisher, publish_if_enabled, render, render_json, should_publish,
};
pub use rules::{MatchingRule, MessageRules, RuleLogic, RuleSet};
pub use runner::{RunOptions, run, run_concurrent, run_with, run_with_cancellation};
pub use value::{Scalar, Value, ValueKind};
pub use verification::{InteractionResult, VerificationOutcome, VerificationStatus};
pub use verifier::{FileOutcome, Verifier};
