//! Producer registry.
//!
//! Maps interaction descriptions to the provider-side callbacks that build
//! the actual message. Registering a description twice replaces the earlier
//! producer: the last registration wins, so setup code may redefine a
//! producer without having to remove it first.

use crate::error::ProducerError;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::debug;

/// The message a producer emits.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Message contents
    pub contents: Value,
    /// Message metadata (headers, routing keys, ...)
    pub metadata: HashMap<String, String>,
}

impl Message {
    /// Create a message without metadata.
    #[must_use]
    pub fn new(contents: impl Into<Value>) -> Self {
        Self {
            contents: contents.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata as a mapping value, for matching.
    #[must_use]
    pub fn metadata_value(&self) -> Value {
        Value::from(self.metadata.clone())
    }
}

/// A zero-argument message producer.
pub type Producer = Arc<dyn Fn() -> Result<Message, ProducerError> + Send + Sync>;

/// Registry of producers keyed by interaction description.
///
/// Read-only once verification starts; cheap to share behind an [`Arc`].
#[derive(Clone, Default)]
pub struct ProducerRegistry {
    producers: HashMap<String, Producer>,
}

impl ProducerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a producer, replacing any earlier one for the same description.
    ///
    /// Returns the replaced producer, if any.
    pub fn register<F>(&mut self, description: impl Into<String>, producer: F) -> Option<Producer>
    where
        F: Fn() -> Result<Message, ProducerError> + Send + Sync + 'static,
    {
        let description = description.into();
        let replaced = self.producers.insert(description.clone(), Arc::new(producer));
        if replaced.is_some() {
            debug!(%description, "producer registration replaced");
        }
        replaced
    }

    /// Builder form of [`ProducerRegistry::register`].
    #[must_use]
    pub fn with_producer<F>(mut self, description: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> Result<Message, ProducerError> + Send + Sync + 'static,
    {
        self.register(description, producer);
        self
    }

    /// Find the producer for a description.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::NotFound`] if nothing is registered under it.
    pub fn lookup(&self, description: &str) -> Result<&Producer, ProducerError> {
        self.producers
            .get(description)
            .ok_or_else(|| ProducerError::NotFound(description.to_string()))
    }

    /// Look up and invoke the producer for a description.
    ///
    /// A panicking producer is reported as [`ProducerError::Panicked`].
    ///
    /// # Errors
    ///
    /// Returns the lookup error or whatever the producer failed with.
    pub fn produce(&self, description: &str) -> Result<Message, ProducerError> {
        let producer = self.lookup(description)?;
        catch_unwind(AssertUnwindSafe(|| producer())).unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(ProducerError::Panicked(reason))
        })
    }

    /// Whether a producer is registered for the description.
    #[must_use]
    pub fn contains(&self, description: &str) -> bool {
        self.producers.contains_key(description)
    }

    /// Registered descriptions, sorted.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        let mut descriptions: Vec<_> = self.producers.keys().map(String::as_str).collect();
        descriptions.sort_unstable();
        descriptions
    }

    /// Number of registered producers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Whether no producers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

impl fmt::Debug for ProducerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerRegistry")
            .field("descriptions", &self.descriptions())
            .finish()
    }
}
