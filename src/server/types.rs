// Request and response bodies for the HTTP surface

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::StatPayloads;
use crate::error::{RelayError, Result};

/// Body of `POST /ai-context`
///
/// Either a narrative the dashboard already assembled, or the raw stat
/// payloads for the server to assemble itself.
#[derive(Debug, Clone)]
pub enum ContextUpdate {
    Prebuilt { context: String },
    Structured(Box<StatPayloads>),
}

impl ContextUpdate {
    /// A `context` key selects the prebuilt form and must hold a string;
    /// any other object is read as stat payloads.
    pub fn from_json(body: Value) -> Result<Self> {
        let Value::Object(mut fields) = body else {
            return Err(RelayError::Validation(
                "context update must be a JSON object".to_string(),
            ));
        };

        match fields.remove("context") {
            Some(Value::String(context)) => Ok(ContextUpdate::Prebuilt { context }),
            Some(_) => Err(RelayError::Validation("context must be a string".to_string())),
            None => serde_json::from_value::<StatPayloads>(Value::Object(fields))
                .map(|payloads| ContextUpdate::Structured(Box::new(payloads)))
                .map_err(|e| RelayError::Validation(format!("invalid stat payloads: {e}"))),
        }
    }
}

/// Body of `POST /ai`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

/// Reply to `POST /ai`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub summary: String,
}

/// Reply to `POST /ai-context`; always the empty object
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextAccepted {}

/// Reply to `DELETE /ai-context`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictResponse {
    pub evicted: bool,
}

/// Reply to `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_update_prebuilt() {
        let update = ContextUpdate::from_json(json!({"context": "Jane Doe has 3 wins."})).unwrap();
        assert!(matches!(update, ContextUpdate::Prebuilt { ref context } if context.contains("Jane")));
    }

    #[test]
    fn test_context_update_structured() {
        let update =
            ContextUpdate::from_json(json!({"player": {"full_name": "Jane Doe", "wins": 3}}))
                .unwrap();
        match update {
            ContextUpdate::Structured(payloads) => assert!(payloads.player.is_some()),
            other => panic!("expected structured payloads, got {other:?}"),
        }
    }

    #[test]
    fn test_non_string_context_is_rejected() {
        for body in [json!({"context": 42}), json!({"context": null})] {
            match ContextUpdate::from_json(body) {
                Err(RelayError::Validation(msg)) => assert!(msg.contains("context")),
                other => panic!("expected a validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_bad_nested_field_is_validation_error() {
        let err = ContextUpdate::from_json(json!({"player": {"wins": [1, 2]}})).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, RelayError::Validation(_)));
        assert!(message.contains("invalid stat payloads"), "got: {message}");
        assert!(!message.contains("ContextUpdate"), "got: {message}");
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(
            ContextUpdate::from_json(json!(["context"])),
            Err(RelayError::Validation(_))
        ));
    }

    #[test]
    fn test_context_accepted_is_empty_object() {
        assert_eq!(serde_json::to_string(&ContextAccepted {}).unwrap(), "{}");
    }
}
