use thiserror::Error;

/// Failure reported by a hosted model collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Bad or missing credentials, unknown model, bad endpoint.
    #[error("The AI service is not configured correctly: {0}")]
    InvalidConfiguration(String),

    /// The request or its result was blocked by content safety.
    #[error("The request was blocked by the content policy: {0}")]
    PolicyRejection(String),

    /// The service answered without the expected payload.
    #[error("The AI service returned an unexpected response: {0}")]
    MalformedResponse(String),

    /// Network, timeout or server-side failure.
    #[error("Could not reach the AI service: {0}")]
    Transport(String),
}

impl CollaboratorError {
    /// The collaborator's own message, without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidConfiguration(m)
            | Self::PolicyRejection(m)
            | Self::MalformedResponse(m)
            | Self::Transport(m) => m,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
