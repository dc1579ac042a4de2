//! Observable analysis state and the message reducer
//!
//! `reduce` is a pure function: it takes the current state and one inbound
//! message and returns the next state plus the side effects the caller must
//! run (currently only speech). The client applies it under its state lock.

use std::collections::BTreeMap;

use serde::Serialize;

use super::messages::{InboundMessage, MessageData, MessageTag};
use crate::models::pose::Landmark;

pub const ANALYSIS_FAILED: &str = "Analysis failed";
pub const CHANGE_EXERCISE_FAILED: &str = "Failed to change exercise";
pub const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

/// Everything the UI can observe about the running analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisState {
    pub current_exercise: Option<String>,
    pub available_exercises: Vec<String>,
    /// Payload of the most recent successful analysis
    pub last_result: Option<MessageData>,
    /// Last user-facing error; `None` once cleared
    pub error: Option<String>,

    // Projection of the latest recognized message
    pub success: Option<bool>,
    pub score: Option<f64>,
    pub is_correct: Option<bool>,
    pub exercise_name: Option<String>,
    pub feedback_messages: Vec<String>,
    pub audio_feedback: Option<String>,
    pub annotated_frame: Option<String>,
    pub individual_scores: BTreeMap<String, f64>,
    pub landmarks: Vec<Landmark>,
}

/// Work the caller performs after a state update
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Speak(String),
}

/// Apply one inbound message. Unknown tags return the state untouched.
pub fn reduce(state: AnalysisState, message: &InboundMessage) -> (AnalysisState, Vec<Effect>) {
    let tag = message.tag();
    if tag == MessageTag::Unknown {
        return (state, Vec::new());
    }

    let data = &message.data;
    let mut next = project(state, data);
    let mut effects = Vec::new();

    match tag {
        MessageTag::SessionInfo | MessageTag::ExercisesList => {
            next.available_exercises = data.exercises.clone().unwrap_or_default();
            next.current_exercise = data.current_exercise.clone();
        }
        MessageTag::AnalysisResult => {
            if message.is_success() {
                next.last_result = Some(data.clone());
                if let Some(text) = data.audio_feedback.as_deref().filter(|t| !t.is_empty()) {
                    effects.push(Effect::Speak(text.to_string()));
                }
            } else {
                next.error = Some(non_empty_or(data.error.as_deref(), ANALYSIS_FAILED));
            }
        }
        MessageTag::ExerciseChanged => {
            if message.is_success() {
                let exercise = data
                    .current_exercise
                    .clone()
                    .or_else(|| data.exercise_name.clone());
                if let Some(name) = &exercise {
                    effects.push(Effect::Speak(format!("Now performing {}", name)));
                }
                next.current_exercise = exercise;
            } else {
                next.error = Some(non_empty_or(data.message.as_deref(), CHANGE_EXERCISE_FAILED));
            }
        }
        MessageTag::Error => {
            next.error = Some(non_empty_or(data.error.as_deref(), UNKNOWN_SERVER_ERROR));
        }
        MessageTag::Unknown => {}
    }

    (next, effects)
}

/// Overwrite the projected result fields wholesale from `data`
fn project(state: AnalysisState, data: &MessageData) -> AnalysisState {
    AnalysisState {
        success: data.success,
        score: data.score,
        is_correct: data.is_correct,
        exercise_name: data.exercise_name.clone(),
        feedback_messages: data.feedback_messages.clone().unwrap_or_default(),
        audio_feedback: data.audio_feedback.clone(),
        annotated_frame: data.annotated_frame.clone(),
        individual_scores: data.individual_scores.clone().unwrap_or_default(),
        landmarks: data.landmarks.clone().unwrap_or_default(),
        ..state
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(json: &str) -> InboundMessage {
        InboundMessage::parse(json).unwrap()
    }

    #[test]
    fn test_successful_result_overwrites_projection() {
        let (state, effects) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"analysis_result","data":{"success":true,"score":0.82,"is_correct":true,
                "feedback_messages":["Raise your arm higher"],"annotated_frame":"QUJD"}}"#),
        );

        assert_eq!(state.score, Some(0.82));
        assert_eq!(state.is_correct, Some(true));
        assert_eq!(state.feedback_messages, vec!["Raise your arm higher"]);
        assert_eq!(state.annotated_frame.as_deref(), Some("QUJD"));
        assert!(state.last_result.is_some());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_last_write_wins_without_merge() {
        let (state, _) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"analysis_result","data":{"success":true,"score":0.5,
                "feedback_messages":["a","b"],"annotated_frame":"X","individual_scores":{"knee":0.4}}}"#),
        );
        let (state, _) = reduce(
            state,
            &msg(r#"{"type":"analysis_result","data":{"success":true,"score":0.9,"is_correct":false}}"#),
        );

        assert_eq!(state.score, Some(0.9));
        assert_eq!(state.is_correct, Some(false));
        assert!(state.feedback_messages.is_empty());
        assert!(state.annotated_frame.is_none());
        assert!(state.individual_scores.is_empty());
    }

    #[test]
    fn test_audio_feedback_is_spoken() {
        let (_, effects) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"analysis_result","data":{"success":true,"audio_feedback":"Good form"}}"#),
        );
        assert_eq!(effects, vec![Effect::Speak("Good form".to_string())]);

        let (_, effects) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"analysis_result","data":{"success":true,"audio_feedback":""}}"#),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn test_failed_result_sets_error() {
        let (state, effects) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"analysis_result","data":{"success":false,"error":"No person detected"}}"#),
        );
        assert_eq!(state.error.as_deref(), Some("No person detected"));
        assert!(state.last_result.is_none());
        assert!(effects.is_empty());

        let (state, _) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"analysis_result","data":{"success":false}}"#),
        );
        assert_eq!(state.error.as_deref(), Some(ANALYSIS_FAILED));
    }

    #[test]
    fn test_session_info_sets_exercises() {
        let (state, _) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"session_info","data":{"exercises":["squat","lunge"],"current_exercise":"squat"}}"#),
        );
        assert_eq!(state.available_exercises, vec!["squat", "lunge"]);
        assert_eq!(state.current_exercise.as_deref(), Some("squat"));
    }

    #[test]
    fn test_exercise_changed() {
        let (state, effects) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"exercise_changed","data":{"success":true,"current_exercise":"lunge"}}"#),
        );
        assert_eq!(state.current_exercise.as_deref(), Some("lunge"));
        assert_eq!(effects, vec![Effect::Speak("Now performing lunge".to_string())]);

        let (state, effects) = reduce(
            state,
            &msg(r#"{"type":"exercise_changed","data":{"success":false,"message":"Unknown exercise"}}"#),
        );
        assert_eq!(state.error.as_deref(), Some("Unknown exercise"));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_error_tag_defaults() {
        let (state, _) = reduce(AnalysisState::default(), &msg(r#"{"type":"error","data":{}}"#));
        assert_eq!(state.error.as_deref(), Some(UNKNOWN_SERVER_ERROR));

        let (state, _) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"error","data":{"error":"Invalid frame"}}"#),
        );
        assert_eq!(state.error.as_deref(), Some("Invalid frame"));
    }

    #[test]
    fn test_unknown_tag_leaves_state() {
        let (before, _) = reduce(
            AnalysisState::default(),
            &msg(r#"{"type":"analysis_result","data":{"success":true,"score":0.7}}"#),
        );
        let (after, effects) = reduce(
            before.clone(),
            &msg(r#"{"type":"heartbeat","data":{"score":0.1}}"#),
        );
        assert_eq!(after, before);
        assert!(effects.is_empty());
    }
}
