//! Shared setup for the end-to-end tests.
//!
//! Producers here are the provider side of the example pact: they build the
//! greeting and the song message the way a real provider would publish them.
//! The fixture pact writes the song's metadata as `metaData`, the spelling
//! pact-php emits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use message_pact::{Message, ProducerRegistry};
use pact_test_utils::fixtures::{HELLO_DESCRIPTION, SONG_DESCRIPTION, SONG_LYRIC};
use serde_json::json;
use std::path::PathBuf;

/// Queue both example messages are published on.
pub const QUEUE: &str = "myKey";

/// Path of a pact file under `tests/fixtures`.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// The example pact file.
#[must_use]
pub fn example_pact_path() -> PathBuf {
    fixture_path("test_consumer-test_provider.json")
}

/// Build the greeting message.
#[must_use]
pub fn hello_message(name: &str) -> Message {
    Message::new(json!({"text": format!("Hello {name}")})).with_metadata("queue", QUEUE)
}

/// Build the song message.
#[must_use]
pub fn song_message(lyric: &str) -> Message {
    Message::new(json!({"song": lyric})).with_metadata("queue", QUEUE)
}

/// Registry with producers for both example messages, the song carrying `lyric`.
#[must_use]
pub fn example_registry(lyric: &str) -> ProducerRegistry {
    let lyric = lyric.to_string();
    ProducerRegistry::new()
        .with_producer(HELLO_DESCRIPTION, || Ok(hello_message("Mary")))
        .with_producer(SONG_DESCRIPTION, move || Ok(song_message(&lyric)))
}

/// Registry whose producers satisfy the example pact.
#[must_use]
pub fn passing_registry() -> ProducerRegistry {
    example_registry(SONG_LYRIC)
}
