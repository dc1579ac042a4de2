//! Spoken feedback
//!
//! At most one utterance is in flight: saying something new cancels whatever
//! is still being spoken. There is no queue.

use std::process::{Child, Command, Stdio};

use thiserror::Error;

use crate::config::SpeechConfig;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Failed to start speech program {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Text plus the voice settings to speak it with
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, settings: &SpeechConfig) -> Self {
        Self {
            text: text.into(),
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
            voice: settings.voice.clone(),
        }
    }
}

/// Platform text-to-speech backend
pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError>;

    /// Stop the current utterance, if any
    fn cancel(&mut self);

    /// Whether the last utterance is still being spoken
    fn is_speaking(&mut self) -> bool;
}

/// Single-slot speech: each `say` replaces the previous utterance
pub struct SpeechSlot {
    synth: Box<dyn SpeechSynthesizer>,
    settings: SpeechConfig,
    current: Option<String>,
}

impl SpeechSlot {
    pub fn new(synth: Box<dyn SpeechSynthesizer>, settings: SpeechConfig) -> Self {
        Self {
            synth,
            settings,
            current: None,
        }
    }

    /// Cancel what is being spoken and speak `text`. Empty text is ignored.
    pub fn say(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        self.synth.cancel();
        let utterance = Utterance::new(text, &self.settings);
        match self.synth.speak(&utterance) {
            Ok(()) => self.current = Some(utterance.text),
            Err(e) => {
                tracing::warn!("Speech failed: {}", e);
                self.current = None;
            }
        }
    }

    pub fn cancel(&mut self) {
        self.synth.cancel();
        self.current = None;
    }

    /// Text still being spoken. Cleared once the synthesizer finishes.
    pub fn current(&mut self) -> Option<&str> {
        if self.current.is_some() && !self.synth.is_speaking() {
            self.current = None;
        }
        self.current.as_deref()
    }
}

// ============================================================================
// Synthesizers
// ============================================================================

/// Records utterances in the log instead of producing audio
#[derive(Debug, Default)]
pub struct LogSynthesizer;

impl SpeechSynthesizer for LogSynthesizer {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        tracing::info!(
            rate = utterance.rate,
            pitch = utterance.pitch,
            volume = utterance.volume,
            "Feedback: {}",
            utterance.text
        );
        Ok(())
    }

    fn cancel(&mut self) {}

    // Logging completes immediately
    fn is_speaking(&mut self) -> bool {
        false
    }
}

/// Speaks through an external program with espeak-style flags
pub struct ProcessSynthesizer {
    program: String,
    child: Option<Child>,
}

impl ProcessSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            child: None,
        }
    }

    /// Command-line arguments for `utterance`
    pub fn args(utterance: &Utterance) -> Vec<String> {
        let words_per_minute = (175.0 * utterance.rate).round() as i32;
        let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0) as i32;
        let amplitude = (100.0 * utterance.volume).round().clamp(0.0, 200.0) as i32;

        let mut args = vec![
            "-s".to_string(),
            words_per_minute.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
        ];
        if let Some(voice) = &utterance.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        args.push(utterance.text.clone());
        args
    }
}

impl SpeechSynthesizer for ProcessSynthesizer {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        let child = Command::new(&self.program)
            .args(Self::args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                if let Err(e) = child.kill() {
                    tracing::debug!("Failed to stop speech program: {}", e);
                }
            }
            // Reap so the process does not linger as a zombie
            let _ = child.wait();
        }
    }

    fn is_speaking(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                self.child = None;
                false
            }
            Err(e) => {
                tracing::debug!("Failed to poll speech program: {}", e);
                false
            }
        }
    }
}

impl Drop for ProcessSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}
