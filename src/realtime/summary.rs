//! Running tally of one analysis session, turned into a progress entry when
//! the session ends

use std::collections::BTreeMap;
use std::time::Instant;

use super::messages::MessageData;
use crate::models::pose::Landmark;
use crate::models::progress::{NewProgressEntry, VideoAnalysisData};

#[derive(Debug, Clone)]
pub struct SessionTally {
    started: Instant,
    results: u32,
    correct: u32,
    score_sum: f64,
    exercise_name: Option<String>,
    feedback: Vec<String>,
    individual_scores: BTreeMap<String, f64>,
    landmarks: Vec<Landmark>,
}

impl Default for SessionTally {
    fn default() -> Self {
        Self::start()
    }
}

impl SessionTally {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            results: 0,
            correct: 0,
            score_sum: 0.0,
            exercise_name: None,
            feedback: Vec::new(),
            individual_scores: BTreeMap::new(),
            landmarks: Vec::new(),
        }
    }

    /// Count one successful analysis result
    pub fn record(&mut self, data: &MessageData) {
        self.results += 1;
        if data.is_correct == Some(true) {
            self.correct += 1;
        }
        self.score_sum += data.score.unwrap_or(0.0);

        if let Some(name) = &data.exercise_name {
            self.exercise_name = Some(name.clone());
        }
        for message in data.feedback_messages.iter().flatten() {
            if !self.feedback.contains(message) {
                self.feedback.push(message.clone());
            }
        }
        if let Some(scores) = &data.individual_scores {
            self.individual_scores = scores.clone();
        }
        if let Some(landmarks) = &data.landmarks {
            self.landmarks = landmarks.clone();
        }
    }

    pub fn results(&self) -> u32 {
        self.results
    }

    /// Percentage of correct results, rounded
    pub fn accuracy(&self) -> f64 {
        if self.results == 0 {
            return 0.0;
        }
        (self.correct as f64 / self.results as f64 * 100.0).round()
    }

    pub fn mean_score(&self) -> f64 {
        if self.results == 0 {
            return 0.0;
        }
        self.score_sum / self.results as f64
    }

    pub fn elapsed_secs(&self) -> u32 {
        u32::try_from(self.started.elapsed().as_secs()).unwrap_or(u32::MAX)
    }

    /// Progress entry for this session, `None` if nothing was analyzed.
    /// `fallback_exercise` names the entry when no result carried a name.
    pub fn into_progress(
        self,
        patient_id: &str,
        assignment_id: Option<&str>,
        fallback_exercise: Option<&str>,
    ) -> Option<NewProgressEntry> {
        if self.results == 0 {
            return None;
        }

        let exercise_name = self
            .exercise_name
            .clone()
            .or_else(|| fallback_exercise.map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());

        Some(NewProgressEntry {
            patient_id: patient_id.to_string(),
            exercise_assignment_id: assignment_id.map(str::to_string),
            exercise_name,
            duration: self.elapsed_secs(),
            accuracy: self.accuracy(),
            score: self.mean_score(),
            reps: None,
            sets: None,
            feedback: self.feedback.clone(),
            video_analysis_data: Some(VideoAnalysisData {
                individual_scores: self.individual_scores,
                pose_landmarks: self.landmarks,
                exercise_specific_feedback: self.feedback,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: f64, correct: bool, feedback: &[&str]) -> MessageData {
        MessageData {
            success: Some(true),
            score: Some(score),
            is_correct: Some(correct),
            exercise_name: Some("Arm Curl".to_string()),
            feedback_messages: Some(feedback.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_tally_has_no_progress() {
        let tally = SessionTally::start();
        assert_eq!(tally.accuracy(), 0.0);
        assert!(tally.into_progress("patient_1", None, None).is_none());
    }

    #[test]
    fn test_accuracy_and_mean_score() {
        let mut tally = SessionTally::start();
        tally.record(&result(0.9, true, &[]));
        tally.record(&result(0.6, false, &[]));
        tally.record(&result(0.6, true, &[]));

        // 2 of 3 correct
        assert_eq!(tally.accuracy(), 67.0);
        assert!((tally.mean_score() - 0.7).abs() < 1e-9);
        assert_eq!(tally.results(), 3);
    }

    #[test]
    fn test_feedback_distinct_in_first_seen_order() {
        let mut tally = SessionTally::start();
        tally.record(&result(0.5, false, &["Raise your arm higher", "Slow down"]));
        tally.record(&result(0.5, false, &["Slow down", "Keep elbows in"]));

        let entry = tally.into_progress("patient_1", Some("assignment_1"), None).unwrap();
        assert_eq!(
            entry.feedback,
            vec!["Raise your arm higher", "Slow down", "Keep elbows in"]
        );
        assert_eq!(entry.exercise_assignment_id.as_deref(), Some("assignment_1"));
        assert_eq!(entry.exercise_name, "Arm Curl");
    }

    #[test]
    fn test_latest_scores_and_landmarks_kept() {
        let mut tally = SessionTally::start();
        let mut first = result(0.5, true, &[]);
        first.individual_scores = Some([("elbow".to_string(), 0.4)].into_iter().collect());
        let mut second = result(0.8, true, &[]);
        second.individual_scores = Some([("elbow".to_string(), 0.9)].into_iter().collect());
        second.landmarks = Some(vec![Landmark { x: 0.5, y: 0.5, z: 0.0, visibility: 1.0 }]);
        tally.record(&first);
        tally.record(&second);

        let analysis = tally
            .into_progress("patient_1", None, None)
            .unwrap()
            .video_analysis_data
            .unwrap();
        assert_eq!(analysis.individual_scores["elbow"], 0.9);
        assert_eq!(analysis.pose_landmarks.len(), 1);
    }

    #[test]
    fn test_fallback_exercise_name() {
        let mut tally = SessionTally::start();
        tally.record(&MessageData {
            success: Some(true),
            score: Some(1.0),
            ..Default::default()
        });

        let entry = tally.into_progress("patient_1", None, Some("Knee Raises")).unwrap();
        assert_eq!(entry.exercise_name, "Knee Raises");
        assert_eq!(entry.accuracy, 0.0);
    }
}
