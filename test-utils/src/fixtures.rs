//! Test fixtures with sample data.
//!
//! The example pact has two messages, a greeting and a song lyric, both
//! published on the `myKey` queue.

use serde_json::{Value as Json, json};

/// Consumer of the example pact.
pub const EXAMPLE_CONSUMER: &str = "test_consumer";

/// Provider of the example pact.
pub const EXAMPLE_PROVIDER: &str = "test_provider";

/// Description of the greeting message.
pub const HELLO_DESCRIPTION: &str = "a hello message";

/// Description of the song message.
pub const SONG_DESCRIPTION: &str = "You can hear happiness staggering on down the street";

/// Lyric the song message is expected to carry.
pub const SONG_LYRIC: &str = "And the wind whispers Mary";

/// Contents of the greeting message.
#[must_use]
pub fn hello_contents() -> Json {
    json!({"text": "Hello Mary"})
}

/// Contents of the song message.
#[must_use]
pub fn song_contents() -> Json {
    json!({"song": SONG_LYRIC})
}

/// Metadata shared by both example messages.
#[must_use]
pub fn queue_metadata() -> Json {
    json!({"queue": "myKey"})
}

/// One message entry of a v2/v3 pact.
#[must_use]
pub fn message(description: &str, contents: Json, metadata: Json) -> Json {
    json!({
        "description": description,
        "contents": contents,
        "metadata": metadata,
    })
}

/// A v2/v3 message pact document.
#[must_use]
pub fn message_pact(
    consumer: &str,
    provider: &str,
    version: &str,
    messages: impl IntoIterator<Item = Json>,
) -> Json {
    json!({
        "consumer": {"name": consumer},
        "provider": {"name": provider},
        "messages": messages.into_iter().collect::<Vec<_>>(),
        "metadata": {"pactSpecification": {"version": version}},
    })
}

/// A v4 pact carrying the given messages as asynchronous interactions.
#[must_use]
pub fn v4_message_pact(
    consumer: &str,
    provider: &str,
    messages: impl IntoIterator<Item = Json>,
) -> Json {
    let interactions: Vec<Json> = messages
        .into_iter()
        .map(|message| {
            json!({
                "type": "Asynchronous/Messages",
                "description": message["description"],
                "contents": {"content": message["contents"], "contentType": "application/json"},
                "metadata": message["metadata"],
            })
        })
        .collect();
    json!({
        "consumer": {"name": consumer},
        "provider": {"name": provider},
        "interactions": interactions,
        "metadata": {"pactSpecification": {"version": "4.0"}},
    })
}

/// The example two-message pact between `test_consumer` and `test_provider`.
#[must_use]
pub fn example_pact() -> Json {
    message_pact(
        EXAMPLE_CONSUMER,
        EXAMPLE_PROVIDER,
        "3.0.0",
        [
            message(HELLO_DESCRIPTION, hello_contents(), queue_metadata()),
            message(SONG_DESCRIPTION, song_contents(), queue_metadata()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_pact_shape() {
        let pact = example_pact();
        assert_eq!(pact["consumer"]["name"], EXAMPLE_CONSUMER);
        assert_eq!(pact["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(pact["messages"][1]["contents"]["song"], SONG_LYRIC);
        assert_eq!(pact["metadata"]["pactSpecification"]["version"], "3.0.0");
    }

    #[test]
    fn test_v4_wraps_contents() {
        let pact = v4_message_pact("c", "p", [message("m", json!({"a": 1}), json!({}))]);
        assert_eq!(pact["interactions"][0]["type"], "Asynchronous/Messages");
        assert_eq!(pact["interactions"][0]["contents"]["content"]["a"], 1);
    }
}
