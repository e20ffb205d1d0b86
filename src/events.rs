// Event types and payload structures for generation progress
// Emitted by a generation session to whatever surface is listening

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::GenerationStep;

// Event name constants
pub const EVENT_GENERATION_PROGRESS: &str = "generation:progress";
pub const EVENT_GENERATION_COMPLETED: &str = "generation:completed";
pub const EVENT_GENERATION_FAILED: &str = "generation:failed";

/// Payload for progress events, sent after every chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgressPayload {
    pub session_id: String,
    pub steps: Vec<GenerationStep>,
}

/// Payload for completed events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCompletedPayload {
    pub session_id: String,
    pub file_count: usize,
    pub incomplete_count: usize,
    pub has_preview: bool,
    pub token_count: u64,
}

/// Payload for failed events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationFailedPayload {
    pub session_id: String,
    pub error: String,
    pub user_message: String,
    pub rate_limited: bool,
    pub retry_after_ms: Option<u64>,
}

/// A named event with its JSON payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationEvent {
    pub name: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Trait for emitting generation events
/// This abstracts over how events reach the UI (channel, stdout, websocket)
pub trait GenerationEventEmitter: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}

/// Serialize a payload and emit it. Serialization failures are logged and dropped.
pub fn emit_payload<E, P>(emitter: &E, event: &str, payload: &P)
where
    E: GenerationEventEmitter + ?Sized,
    P: Serialize,
{
    match serde_json::to_value(payload) {
        Ok(value) => emitter.emit(event, value),
        Err(e) => log::warn!("Failed to serialize {} payload: {}", event, e),
    }
}

/// Channel-based emitter, the receiving half is owned by the caller
pub struct ChannelEmitter {
    sender: mpsc::UnboundedSender<GenerationEvent>,
}

impl ChannelEmitter {
    pub fn new(sender: mpsc::UnboundedSender<GenerationEvent>) -> Self {
        Self { sender }
    }

    /// Create an emitter together with its receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GenerationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl GenerationEventEmitter for ChannelEmitter {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        let event = GenerationEvent {
            name: event.to_string(),
            payload,
            timestamp: Utc::now(),
        };
        if self.sender.send(event).is_err() {
            log::debug!("Event receiver dropped, discarding event");
        }
    }
}

/// Emitter that drops every event
pub struct NoopEmitter;

impl GenerationEventEmitter for NoopEmitter {
    fn emit(&self, _event: &str, _payload: serde_json::Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationStep, StepStatus};

    #[test]
    fn test_event_constants() {
        assert_eq!(EVENT_GENERATION_PROGRESS, "generation:progress");
        assert_eq!(EVENT_GENERATION_COMPLETED, "generation:completed");
        assert_eq!(EVENT_GENERATION_FAILED, "generation:failed");
    }

    #[test]
    fn test_progress_payload_serialization() {
        let payload = GenerationProgressPayload {
            session_id: "session-1".to_string(),
            steps: vec![GenerationStep {
                id: "App.tsx".to_string(),
                label: "Creating App.tsx".to_string(),
                status: StepStatus::InProgress,
                line_count: None,
            }],
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"sessionId\":\"session-1\""));
        assert!(json.contains("\"status\":\"in_progress\""));
        assert!(json.contains("\"label\":\"Creating App.tsx\""));
    }

    #[test]
    fn test_completed_payload_serialization() {
        let payload = GenerationCompletedPayload {
            session_id: "session-1".to_string(),
            file_count: 3,
            incomplete_count: 1,
            has_preview: true,
            token_count: 42,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"fileCount\":3"));
        assert!(json.contains("\"incompleteCount\":1"));
        assert!(json.contains("\"hasPreview\":true"));
        assert!(json.contains("\"tokenCount\":42"));
    }

    #[test]
    fn test_failed_payload_serialization() {
        let payload = GenerationFailedPayload {
            session_id: "session-1".to_string(),
            error: "Rate limited: 429".to_string(),
            user_message: "Too many requests, try again later".to_string(),
            rate_limited: true,
            retry_after_ms: Some(30000),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"userMessage\""));
        assert!(json.contains("\"rateLimited\":true"));
        assert!(json.contains("\"retryAfterMs\":30000"));
    }

    #[test]
    fn test_channel_emitter_forwards_events() {
        let (emitter, mut rx) = ChannelEmitter::channel();
        emit_payload(
            &emitter,
            EVENT_GENERATION_COMPLETED,
            &GenerationCompletedPayload {
                session_id: "s".to_string(),
                file_count: 1,
                incomplete_count: 0,
                has_preview: false,
                token_count: 2,
            },
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, EVENT_GENERATION_COMPLETED);
        assert_eq!(event.payload["fileCount"], 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_emitter_survives_dropped_receiver() {
        let (emitter, rx) = ChannelEmitter::channel();
        drop(rx);
        emitter.emit(EVENT_GENERATION_PROGRESS, serde_json::json!({}));
    }
}
