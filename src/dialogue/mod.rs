//! Dialogue-bus boundary — intent event types and the outbound API seam.
//!
//! The bus itself (session management, intent recognition, text-to-speech)
//! lives on the other side of the broker; this crate only consumes
//! recognized-intent events and publishes the two dialogue operations a
//! skill needs.  Handlers and tests depend on the [`DialogueApi`] trait, not
//! on the MQTT binding, so the dispatcher can be exercised without a broker.

pub mod mqtt;

use serde::Deserialize;

use crate::error::AppError;

/// The recognized-intent classification attached to an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPayload {
    /// Intent name as trained in the assistant, e.g. `"searchWeatherForecast"`.
    pub intent_name: String,
    #[serde(default)]
    pub confidence_score: Option<f32>,
}

/// A recognized-intent event delivered by the bus.
///
/// Owned by the dialogue framework and consumed read-only here: the
/// dispatcher reads fields to route the event and handlers read fields to
/// address their replies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMessage {
    /// Dialogue session this utterance belongs to.
    pub session_id: String,
    /// Site that captured the utterance — replies are addressed here.
    pub site_id: String,
    pub intent: IntentPayload,
    /// Raw transcribed input, when the bus provides it.
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub custom_data: Option<String>,
}

/// Outbound dialogue operations available to intent handlers.
///
/// Per-handler convention: end the current session first (empty `text`
/// means no follow-up prompt), perform the action, then optionally start a
/// notification session on the originating site with the spoken result.
pub trait DialogueApi: Send + Sync {
    /// End the dialogue session `session_id`, optionally speaking `text`
    /// before the session closes.
    fn end_session(&self, session_id: &str, text: &str) -> Result<(), AppError>;

    /// Start a new notification session on `site_id`, speaking `text`.
    fn start_session_notification(
        &self,
        site_id: &str,
        text: &str,
        custom_data: Option<&str>,
    ) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_message_decodes_bus_json() {
        let json = r#"{
            "sessionId": "677a2717-7ac8-44f8-9013-db2222f7923d",
            "siteId": "kitchen",
            "input": "turn on the light",
            "intent": {
                "intentName": "intent_1",
                "confidenceScore": 0.87
            },
            "slots": []
        }"#;
        let msg: IntentMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.session_id, "677a2717-7ac8-44f8-9013-db2222f7923d");
        assert_eq!(msg.site_id, "kitchen");
        assert_eq!(msg.intent.intent_name, "intent_1");
        assert_eq!(msg.input.as_deref(), Some("turn on the light"));
        assert_eq!(msg.custom_data, None);
    }

    #[test]
    fn intent_message_without_intent_name_is_rejected() {
        let json = r#"{"sessionId": "s", "siteId": "default", "intent": {}}"#;
        assert!(serde_json::from_str::<IntentMessage>(json).is_err());
    }
}
