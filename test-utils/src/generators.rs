//! Shared proptest generators.
//!
//! Values are plain `serde_json::Value`s. Floats are never generated so that
//! equality after a parse is exact.

use crate::fixtures::{message, message_pact};
use proptest::collection::{btree_map, btree_set, vec};
use proptest::prelude::*;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

/// Mapping keys: short lowercase identifiers.
pub fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

/// Interaction descriptions.
pub fn description_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z ]{3,30}[a-z]"
}

/// Participant names.
pub fn participant_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("test_consumer".to_string()),
        Just("test_provider".to_string()),
        Just("order-service".to_string()),
        Just("billing-worker".to_string()),
        "[a-z][a-z_-]{2,20}",
    ]
}

/// Scalars: null, booleans, integers and strings.
pub fn scalar_strategy() -> impl Strategy<Value = Json> {
    prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        (-1_000_000_i64..1_000_000).prop_map(Json::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Json::String),
    ]
}

/// Arbitrary trees of scalars, sequences and mappings.
pub fn json_value_strategy() -> impl Strategy<Value = Json> {
    scalar_strategy().prop_recursive(3, 32, 5, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Json::Array),
            btree_map(key_strategy(), inner, 0..5).prop_map(to_object),
        ]
    })
}

/// Non-empty mappings, as message contents usually are.
pub fn json_object_strategy() -> impl Strategy<Value = Json> {
    btree_map(key_strategy(), json_value_strategy(), 1..6).prop_map(to_object)
}

/// Message metadata: string values only.
pub fn metadata_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    btree_map(key_strategy(), "[a-zA-Z0-9]{1,12}", 0..4)
}

/// Supported pact specification versions for message pacts.
pub fn supported_version_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("2.0.0".to_string()),
        Just("3.0.0".to_string()),
        "[23]\\.[0-9]\\.[0-9]",
    ]
}

/// Versions no verifier accepts.
pub fn unsupported_version_strategy() -> impl Strategy<Value = String> {
    "(1|[5-9])\\.[0-9]\\.[0-9]"
}

/// One generated message: description, contents and metadata.
#[derive(Debug, Clone)]
pub struct GeneratedMessage {
    /// Interaction description
    pub description: String,
    /// Expected contents
    pub contents: Json,
    /// Expected metadata
    pub metadata: BTreeMap<String, String>,
}

impl GeneratedMessage {
    /// The message entry as it appears in a pact document.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let metadata = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Json::String(v.clone())))
            .collect::<Map<_, _>>();
        message(
            &self.description,
            self.contents.clone(),
            Json::Object(metadata),
        )
    }
}

/// Between one and `max` messages with distinct descriptions.
pub fn messages_strategy(max: usize) -> impl Strategy<Value = Vec<GeneratedMessage>> {
    btree_set(description_strategy(), 1..=max.max(1)).prop_flat_map(|descriptions| {
        let count = descriptions.len();
        (
            Just(descriptions.into_iter().collect::<Vec<_>>()),
            vec(json_object_strategy(), count),
            vec(metadata_strategy(), count),
        )
            .prop_map(|(descriptions, contents, metadata)| {
                descriptions
                    .into_iter()
                    .zip(contents)
                    .zip(metadata)
                    .map(|((description, contents), metadata)| GeneratedMessage {
                        description,
                        contents,
                        metadata,
                    })
                    .collect()
            })
    })
}

/// A whole v2/v3 message pact together with the messages it declares.
pub fn message_pact_strategy(
    max_messages: usize,
) -> impl Strategy<Value = (Json, Vec<GeneratedMessage>)> {
    (
        participant_strategy(),
        participant_strategy(),
        supported_version_strategy(),
        messages_strategy(max_messages),
    )
        .prop_map(|(consumer, provider, version, messages)| {
            let entries = messages.iter().map(GeneratedMessage::to_json);
            let pact = message_pact(&consumer, &provider, &version, entries);
            (pact, messages)
        })
}

fn to_object(map: BTreeMap<String, Json>) -> Json {
    Json::Object(map.into_iter().collect())
}
