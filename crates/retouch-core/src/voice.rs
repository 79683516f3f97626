use std::sync::mpsc;

use thiserror::Error;

/// One event from a speech capture session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Partial text for the segment being spoken; superseded by the next event.
    Interim(String),
    /// Settled text for a segment.
    Final(String),
    /// Capture failed; the session is over.
    Error(String),
    /// Capture stopped (by the user, the device, or end of input).
    Ended,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("speech capture is not supported")]
    Unsupported,

    #[error("speech capture failed to start: {0}")]
    Failed(String),
}

/// Speech-to-text capability with explicit start/stop.
///
/// `start` returns the event channel for the new session. `stop` must be
/// safe to call at any time, including when nothing is running.
pub trait SpeechCapture: Send {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<mpsc::Receiver<TranscriptEvent>, VoiceError>;

    fn stop(&mut self);
}

/// How transcripts land in the prompt field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceMode {
    /// Transcript replaces the prompt.
    #[default]
    Replace,
    /// Transcript is appended to the existing prompt.
    Append,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceInput {
    pub mode: VoiceMode,
    /// Submit the prompt as soon as a final transcript arrives.
    pub submit_on_final: bool,
}

/// Join a base prompt and a transcript with a single space.
pub(crate) fn compose_prompt(base: &str, transcript: &str) -> String {
    let base = base.trim_end();
    let transcript = transcript.trim();
    match (base.is_empty(), transcript.is_empty()) {
        (true, _) => transcript.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base} {transcript}"),
    }
}
