//! Conversation event model shared by the runtime, the durable store, and the
//! HTTP surface.
//!
//! The wire/persisted shape is `{content: {role?, parts: [...]}}` where a part
//! is either free text or a named tool result. The runtime additionally stamps
//! bookkeeping fields (usage accounting, action directives) on events; those
//! are returned to clients raw but stripped before persistence.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record of a conversation step. Ordering is insertion order and is
/// significant: the sequence is the model's context window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Usage accounting from the runtime. Not part of the conversation;
    /// stripped before persistence.
    #[serde(
        default,
        rename = "usageMetadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage_metadata: Option<serde_json::Value>,

    /// Runtime action directives (state deltas and the like). Not part of the
    /// conversation; stripped before persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Tagged variant over the part kinds we understand. Anything else a runtime
/// may emit decodes as `Unrecognized` and never reaches durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    Unrecognized(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl Event {
    /// A caller-authored message event.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            author: Some("user".to_string()),
            content: Some(Content {
                role: Some("user".to_string()),
                parts: vec![Part::Text { text: text.into() }],
            }),
            usage_metadata: None,
            actions: None,
        }
    }

    /// An agent-authored text reply.
    pub fn agent_text(author: &str, text: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            author: Some(author.to_string()),
            content: Some(Content {
                role: Some("model".to_string()),
                parts: vec![Part::Text { text: text.into() }],
            }),
            usage_metadata: None,
            actions: None,
        }
    }

    /// An agent-authored tool-result event.
    pub fn tool_response(author: &str, name: &str, response: serde_json::Value) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            author: Some(author.to_string()),
            content: Some(Content {
                role: Some("model".to_string()),
                parts: vec![Part::FunctionResponse {
                    function_response: FunctionResponse {
                        name: name.to_string(),
                        response: Some(response),
                    },
                }],
            }),
            usage_metadata: None,
            actions: None,
        }
    }

    /// A structural marker event carrying only a state delta. Empty parts
    /// flag it for exclusion from persisted history.
    pub fn state_delta_marker(author: &str, delta: serde_json::Value) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            author: Some(author.to_string()),
            content: Some(Content {
                role: Some("model".to_string()),
                parts: Vec::new(),
            }),
            usage_metadata: None,
            actions: Some(serde_json::json!({ "stateDelta": delta })),
        }
    }

    pub fn with_usage(mut self, usage: serde_json::Value) -> Self {
        self.usage_metadata = Some(usage);
        self
    }

    /// Concatenated text content, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

/// Prepare a runtime event log for durable persistence: drop structural
/// marker events (empty part sequence), drop unrecognized part shapes, and
/// strip runtime bookkeeping from every retained event.
pub fn clean_events(events: &[Event]) -> Vec<Event> {
    events
        .iter()
        .filter_map(|event| {
            let mut event = event.clone();
            if let Some(content) = event.content.as_mut() {
                content
                    .parts
                    .retain(|part| !matches!(part, Part::Unrecognized(_)));
                if content.parts.is_empty() {
                    return None;
                }
            }
            event.usage_metadata = None;
            event.actions = None;
            Some(event)
        })
        .collect()
}

/// Encode an event log for the durable `events` column.
pub fn encode_events(events: &[Event]) -> serde_json::Result<String> {
    serde_json::to_string(events)
}

/// Decode a durable event log. Strict: callers that want the degrade-to-empty
/// behavior go through `SessionRecord::decode_events`.
pub fn decode_events(raw: &str) -> serde_json::Result<Vec<Event>> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> Event {
        Event::state_delta_marker("countries_agent", serde_json::json!({"k": "v"}))
    }

    #[test]
    fn clean_drops_empty_part_marker_events() {
        let events = vec![
            Event::user("hello"),
            marker(),
            Event::agent_text("countries_agent", "hi"),
        ];
        let cleaned = clean_events(&events);
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|e| e
            .content
            .as_ref()
            .is_some_and(|c| !c.parts.is_empty())));
    }

    #[test]
    fn clean_strips_bookkeeping_fields() {
        let events = vec![Event::agent_text("countries_agent", "hi")
            .with_usage(serde_json::json!({"totalTokenCount": 12}))];
        let cleaned = clean_events(&events);
        assert_eq!(cleaned[0].usage_metadata, None);
        assert_eq!(cleaned[0].actions, None);
        assert_eq!(cleaned[0].text().as_deref(), Some("hi"));
    }

    #[test]
    fn clean_drops_unrecognized_parts() {
        let raw = r#"[{"content": {"role": "model", "parts": [
            {"text": "ok"},
            {"inlineData": {"mimeType": "image/png"}}
        ]}}]"#;
        let events = decode_events(raw).unwrap();
        let cleaned = clean_events(&events);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].content.as_ref().unwrap().parts.len(), 1);
    }

    #[test]
    fn clean_drops_event_left_with_no_recognized_parts() {
        let raw = r#"[{"content": {"role": "model", "parts": [
            {"inlineData": {"mimeType": "image/png"}}
        ]}}]"#;
        let events = decode_events(raw).unwrap();
        assert!(clean_events(&events).is_empty());
    }

    #[test]
    fn cleaned_log_round_trips_through_codec() {
        let events = vec![
            Event::user("Capital of France?"),
            Event::tool_response(
                "countries_agent",
                "get_country_capital",
                serde_json::json!({"status": "success", "result": "Paris"}),
            ),
            Event::agent_text(
                "countries_agent",
                r#"{"message": "The capital of France is Paris.", "status": "success"}"#,
            )
            .with_usage(serde_json::json!({"totalTokenCount": 9})),
            marker(),
        ];

        let cleaned = clean_events(&events);
        let encoded = encode_events(&cleaned).unwrap();
        let decoded = decode_events(&encoded).unwrap();
        assert_eq!(decoded, cleaned);
    }

    #[test]
    fn tool_result_part_keeps_tool_name_across_codec() {
        let event = Event::tool_response(
            "countries_agent",
            "get_country_flag",
            serde_json::json!({"status": "success", "result": "🇯🇵"}),
        );
        let encoded = encode_events(std::slice::from_ref(&event)).unwrap();
        let decoded = decode_events(&encoded).unwrap();
        let Part::FunctionResponse { function_response } =
            &decoded[0].content.as_ref().unwrap().parts[0]
        else {
            panic!("expected a functionResponse part");
        };
        assert_eq!(function_response.name, "get_country_flag");
    }

    #[test]
    fn events_without_content_survive_cleaning() {
        let raw = r#"[{"author": "countries_agent"}]"#;
        let events = decode_events(raw).unwrap();
        assert_eq!(clean_events(&events).len(), 1);
    }
}
