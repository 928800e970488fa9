//! Contract document model.
//!
//! A message pact names its consumer and provider and lists the messages the
//! consumer expects, each with contents, metadata and optional matching
//! rules. Version 2 and 3 documents list them under `messages`; version 4
//! documents list them under `interactions` alongside HTTP interactions,
//! which are skipped here.

use crate::error::ParseError;
use crate::rules::MessageRules;
use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

const DEFAULT_SPECIFICATION: &str = "3.0.0";
const V4_MESSAGE_TYPE: &str = "Asynchronous/Messages";

/// Parsed contract document. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ContractDocument {
    provider_name: String,
    consumer_name: String,
    interactions: Vec<Interaction>,
    specification: PactSpecification,
}

/// A provider state (precondition) attached to an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderState {
    /// State name
    pub name: String,
    /// State parameters
    #[serde(default, deserialize_with = "null_as_empty")]
    pub params: BTreeMap<String, Json>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Json>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl ProviderState {
    /// Create a state without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }
}

/// One expected message.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Description, the key producers are registered under
    pub description: String,
    /// Preconditions declared by the consumer
    pub provider_states: Vec<ProviderState>,
    /// Expected message contents
    pub expected_content: Value,
    /// Expected message metadata
    pub expected_metadata: Value,
    /// Matching rules for contents and metadata
    pub matching_rules: MessageRules,
}

impl Interaction {
    /// Create an interaction matched by equality.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        content: impl Into<Value>,
        metadata: impl Into<Value>,
    ) -> Self {
        Self {
            description: description.into(),
            provider_states: Vec::new(),
            expected_content: content.into(),
            expected_metadata: metadata.into(),
            matching_rules: MessageRules::default(),
        }
    }

    /// Attach matching rules.
    #[must_use]
    pub fn with_rules(mut self, rules: MessageRules) -> Self {
        self.matching_rules = rules;
        self
    }

    /// Attach a provider state.
    #[must_use]
    pub fn with_provider_state(mut self, state: ProviderState) -> Self {
        self.provider_states.push(state);
        self
    }
}

/// Pact specification version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PactSpecification {
    /// Version string
    pub version: String,
}

impl PactSpecification {
    /// Major version number, if the version string starts with one.
    #[must_use]
    pub fn major(&self) -> Option<u32> {
        self.version.split('.').next()?.trim().parse().ok()
    }

    /// Whether this engine can verify documents of this version.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self.major(), Some(2..=4))
    }
}

impl Default for PactSpecification {
    fn default() -> Self {
        Self {
            version: DEFAULT_SPECIFICATION.to_string(),
        }
    }
}

impl ContractDocument {
    /// Build a document, rejecting duplicate interaction descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::DuplicateDescription`] naming the first repeat.
    pub fn new(
        provider_name: impl Into<String>,
        consumer_name: impl Into<String>,
        interactions: Vec<Interaction>,
    ) -> Result<Self, ParseError> {
        let mut seen = HashSet::with_capacity(interactions.len());
        for interaction in &interactions {
            let description = interaction.description.as_str();
            if !seen.insert(description) {
                return Err(ParseError::DuplicateDescription(description.to_string()));
            }
        }
        Ok(Self {
            provider_name: provider_name.into(),
            consumer_name: consumer_name.into(),
            interactions,
            specification: PactSpecification::default(),
        })
    }

    /// Provider name.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Consumer name.
    #[must_use]
    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Interactions in document order.
    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Declared specification version.
    #[must_use]
    pub const fn specification(&self) -> &PactSpecification {
        &self.specification
    }
}

/// Parse a contract document from JSON bytes.
///
/// # Errors
///
/// Returns a [`ParseError`] if the input is not a well-formed message pact,
/// declares an unsupported version, lacks a required field, repeats an
/// interaction description or contains an invalid matching rule.
pub fn parse(bytes: &[u8]) -> Result<ContractDocument, ParseError> {
    let root: Json =
        serde_json::from_slice(bytes).map_err(|e| ParseError::malformed(e.to_string()))?;
    let obj = root
        .as_object()
        .ok_or_else(|| ParseError::malformed("contract document must be a JSON object"))?;

    let specification = specification(obj)?;
    let consumer = participant(obj, "consumer")?;
    let provider = participant(obj, "provider")?;

    let interactions = if specification.major() == Some(4) {
        parse_v4_interactions(obj)?
    } else {
        let messages = obj
            .get("messages")
            .ok_or_else(|| ParseError::missing("messages"))?
            .as_array()
            .ok_or_else(|| ParseError::malformed("'messages' must be an array"))?;
        messages
            .iter()
            .enumerate()
            .map(|(i, message)| parse_message(&format!("messages[{i}]"), message, false))
            .collect::<Result<Vec<_>, _>>()?
    };

    debug!(
        consumer = %consumer,
        provider = %provider,
        version = %specification.version,
        interactions = interactions.len(),
        "parsed contract document"
    );

    let mut document = ContractDocument::new(provider, consumer, interactions)?;
    document.specification = specification;
    Ok(document)
}

fn specification(obj: &Map<String, Json>) -> Result<PactSpecification, ParseError> {
    let Some(metadata) = obj.get("metadata") else {
        return Ok(PactSpecification::default());
    };
    let metadata = metadata
        .as_object()
        .ok_or_else(|| ParseError::malformed("'metadata' must be an object"))?;

    let version = ["pactSpecification", "pact-specification"]
        .iter()
        .find_map(|key| metadata.get(*key))
        .and_then(|spec| spec.get("version"))
        .or_else(|| metadata.get("pactSpecificationVersion"));

    let specification = match version {
        None => PactSpecification::default(),
        Some(Json::String(version)) => PactSpecification {
            version: version.clone(),
        },
        Some(other) => return Err(ParseError::UnsupportedVersion(other.to_string())),
    };
    if !specification.is_supported() {
        return Err(ParseError::UnsupportedVersion(specification.version));
    }
    Ok(specification)
}

fn participant(obj: &Map<String, Json>, field: &str) -> Result<String, ParseError> {
    let name = match obj.get(field) {
        None | Some(Json::Null) => return Err(ParseError::missing(field)),
        Some(Json::String(name)) => Some(name.as_str()),
        Some(Json::Object(participant)) => participant.get("name").and_then(Json::as_str),
        Some(_) => {
            let reason = format!("'{field}' must be an object or a string");
            return Err(ParseError::malformed(reason));
        }
    };
    match name {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err(ParseError::missing(format!("{field}.name"))),
    }
}

fn parse_v4_interactions(obj: &Map<String, Json>) -> Result<Vec<Interaction>, ParseError> {
    let interactions = obj
        .get("interactions")
        .ok_or_else(|| ParseError::missing("interactions"))?
        .as_array()
        .ok_or_else(|| ParseError::malformed("'interactions' must be an array"))?;

    let mut messages = Vec::new();
    for (i, interaction) in interactions.iter().enumerate() {
        let location = format!("interactions[{i}]");
        match interaction.get("type").and_then(Json::as_str) {
            Some(V4_MESSAGE_TYPE) => messages.push(parse_message(&location, interaction, true)?),
            Some(other) => {
                debug!(%location, interaction_type = other, "skipping non-message interaction");
            }
            None => return Err(ParseError::missing(format!("{location}.type"))),
        }
    }
    Ok(messages)
}

fn parse_message(location: &str, message: &Json, v4: bool) -> Result<Interaction, ParseError> {
    let obj = message
        .as_object()
        .ok_or_else(|| ParseError::malformed(format!("{location} must be an object")))?;

    let description = match obj.get("description") {
        Some(Json::String(description)) => description.clone(),
        Some(_) => {
            let reason = format!("{location}.description must be a string");
            return Err(ParseError::malformed(reason));
        }
        None => return Err(ParseError::missing(format!("{location}.description"))),
    };

    let contents = obj
        .get("contents")
        .ok_or_else(|| ParseError::missing(format!("{location}.contents")))?;
    let contents = if v4 {
        contents.get("content").unwrap_or(contents)
    } else {
        contents
    };

    // pact-ruby and pact-php write message metadata as `metaData`
    let metadata = match obj.get("metadata").or_else(|| obj.get("metaData")) {
        None | Some(Json::Null) => Value::empty_mapping(),
        Some(metadata @ Json::Object(_)) => Value::from(metadata.clone()),
        Some(_) => {
            let reason = format!("{location}.metadata must be an object");
            return Err(ParseError::malformed(reason));
        }
    };

    let matching_rules = match obj.get("matchingRules") {
        None | Some(Json::Null) => MessageRules::default(),
        Some(rules) => MessageRules::from_json(rules)?,
    };

    Ok(Interaction {
        description,
        provider_states: provider_states(location, obj)?,
        expected_content: Value::from(contents.clone()),
        expected_metadata: metadata,
        matching_rules,
    })
}

fn provider_states(
    location: &str,
    obj: &Map<String, Json>,
) -> Result<Vec<ProviderState>, ParseError> {
    if let Some(states) = obj.get("providerStates") {
        return serde_json::from_value(states.clone())
            .map_err(|e| ParseError::malformed(format!("{location}.providerStates: {e}")));
    }
    match obj.get("providerState") {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::String(name)) => Ok(vec![ProviderState::new(name.as_str())]),
        Some(_) => {
            let reason = format!("{location}.providerState must be a string");
            Err(ParseError::malformed(reason))
        }
    }
}
