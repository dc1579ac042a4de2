//! Wire messages exchanged with the scoring service
//!
//! Every message is a JSON object `{"type": <tag>, "data": {...}}`. Inbound
//! payload fields are all optional; which ones are present depends on the tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::pose::Landmark;

// ============================================================================
// Outbound
// ============================================================================

/// Client -> server messages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// One camera frame as a `data:image/jpeg;base64,...` URL
    Frame { frame: String },
    ChangeExercise { exercise_name: String },
    GetExercises {},
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Known inbound message tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    SessionInfo,
    AnalysisResult,
    ExerciseChanged,
    ExercisesList,
    Error,
    Unknown,
}

impl MessageTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "session_info" => MessageTag::SessionInfo,
            "analysis_result" => MessageTag::AnalysisResult,
            "exercise_changed" => MessageTag::ExerciseChanged,
            "exercises_list" => MessageTag::ExercisesList,
            "error" => MessageTag::Error,
            _ => MessageTag::Unknown,
        }
    }
}

/// Payload of an inbound message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    pub exercises: Option<Vec<String>>,
    pub current_exercise: Option<String>,
    pub success: Option<bool>,
    pub score: Option<f64>,
    pub is_correct: Option<bool>,
    pub exercise_name: Option<String>,
    pub feedback_messages: Option<Vec<String>>,
    pub audio_feedback: Option<String>,
    /// Base64 JPEG with pose overlays drawn by the server
    pub annotated_frame: Option<String>,
    pub individual_scores: Option<BTreeMap<String, f64>>,
    pub landmarks: Option<Vec<Landmark>>,
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Server -> client message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: MessageData,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn tag(&self) -> MessageTag {
        MessageTag::parse(&self.kind)
    }

    pub fn is_success(&self) -> bool {
        self.data.success.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_message_shape() {
        let msg = OutboundMessage::Frame {
            frame: "data:image/jpeg;base64,AAAA".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "frame", "data": {"frame": "data:image/jpeg;base64,AAAA"}})
        );
    }

    #[test]
    fn test_change_exercise_and_list_shapes() {
        let change = serde_json::to_value(OutboundMessage::ChangeExercise {
            exercise_name: "squat".to_string(),
        })
        .unwrap();
        assert_eq!(
            change,
            json!({"type": "change_exercise", "data": {"exercise_name": "squat"}})
        );

        let list = serde_json::to_value(OutboundMessage::GetExercises {}).unwrap();
        assert_eq!(list, json!({"type": "get_exercises", "data": {}}));
    }

    #[test]
    fn test_parse_analysis_result() {
        let msg = InboundMessage::parse(
            r#"{"type":"analysis_result","data":{"success":true,"score":0.82,"is_correct":true,
                "feedback_messages":["Raise your arm higher"],
                "individual_scores":{"elbow":0.9},
                "landmarks":[{"x":0.1,"y":0.2,"z":0.0,"visibility":0.99}]}}"#,
        )
        .unwrap();

        assert_eq!(msg.tag(), MessageTag::AnalysisResult);
        assert!(msg.is_success());
        assert_eq!(msg.data.score, Some(0.82));
        assert_eq!(msg.data.individual_scores.unwrap()["elbow"], 0.9);
        assert_eq!(msg.data.landmarks.unwrap()[0].visibility, 0.99);
    }

    #[test]
    fn test_parse_without_data() {
        let msg = InboundMessage::parse(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(msg.tag(), MessageTag::Unknown);
        assert_eq!(msg.data, MessageData::default());
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let msg = InboundMessage::parse(
            r#"{"type":"session_info","data":{"session_id":"abc","exercises":["squat"],"current_exercise":"squat"}}"#,
        )
        .unwrap();
        assert_eq!(msg.tag(), MessageTag::SessionInfo);
        assert_eq!(msg.data.exercises, Some(vec!["squat".to_string()]));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(InboundMessage::parse("not json").is_err());
        assert!(InboundMessage::parse(r#"{"data":{}}"#).is_err());
    }
}
