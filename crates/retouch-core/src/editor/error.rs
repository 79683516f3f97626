use thiserror::Error;

use crate::collab::CollaboratorError;

/// Category of a message shown in an error slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    PolicyRejection,
    MalformedResponse,
    Transport,
    /// Local decode/encode failure (upload, export adjustment).
    LocalTransform,
    /// A capability (voice, share) is missing on this device.
    Unsupported,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration => write!(f, "Configuration"),
            Self::PolicyRejection => write!(f, "Content policy"),
            Self::MalformedResponse => write!(f, "Unexpected response"),
            Self::Transport => write!(f, "Network"),
            Self::LocalTransform => write!(f, "Image processing"),
            Self::Unsupported => write!(f, "Unsupported"),
        }
    }
}

/// The single message held by an error slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EditorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&CollaboratorError> for EditorError {
    fn from(e: &CollaboratorError) -> Self {
        let kind = match e {
            CollaboratorError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            CollaboratorError::PolicyRejection(_) => ErrorKind::PolicyRejection,
            CollaboratorError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            CollaboratorError::Transport(_) => ErrorKind::Transport,
        };
        Self::new(kind, e.to_string())
    }
}

impl std::fmt::Display for EditorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A user intent refused because its preconditions do not hold. The
/// equivalent of a disabled control; state is left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    #[error("another operation is in progress")]
    Busy,

    #[error("no image loaded")]
    NoImage,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("suggestions are already being fetched")]
    SuggestionsInFlight,

    #[error("voice capture is already running")]
    VoiceActive,

    #[error("voice capture is unavailable")]
    VoiceUnavailable,

    #[error("no prepared export to share")]
    NothingToShare,

    #[error("no suggestion at that position")]
    InvalidIndex,

    #[error("background worker is not running")]
    WorkerUnavailable,
}
