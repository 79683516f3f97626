mod error;
#[cfg(feature = "remote")]
pub mod remote;

use serde_json::Value;

use crate::image_state::ImageState;

pub use error::CollaboratorError;

/// Edit request sent to the image model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditRequest {
    pub image_base64: String,
    pub media_type: String,
    pub instruction: String,
}

impl EditRequest {
    pub fn new(image: &ImageState, instruction: impl Into<String>) -> Self {
        Self {
            image_base64: image.base64_payload().to_string(),
            media_type: image.media_type().to_string(),
            instruction: instruction.into(),
        }
    }
}

/// Edited image returned by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditResponse {
    pub image_base64: String,
    pub media_type: String,
}

impl EditResponse {
    /// Turn the response into a history version. Anything that could not be
    /// decoded or persisted later is a malformed response.
    pub fn into_image_state(self) -> Result<ImageState, CollaboratorError> {
        if self.image_base64.is_empty() {
            return Err(CollaboratorError::MalformedResponse(
                "no image was returned".into(),
            ));
        }
        if !self.media_type.starts_with("image/") {
            return Err(CollaboratorError::MalformedResponse(format!(
                "returned media type '{}' is not an image",
                self.media_type
            )));
        }

        let content = format!("data:{};base64,{}", self.media_type, self.image_base64);
        let state = ImageState::from_parts(content, self.media_type)
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;
        state.to_bytes().map_err(|e| {
            CollaboratorError::MalformedResponse(format!("image payload is unreadable: {e}"))
        })?;
        Ok(state)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub image_base64: String,
    pub media_type: String,
}

impl SuggestionRequest {
    pub fn new(image: &ImageState) -> Self {
        Self {
            image_base64: image.base64_payload().to_string(),
            media_type: image.media_type().to_string(),
        }
    }
}

/// Hosted model applying a text instruction to an image.
///
/// Calls block; the editor runs them on a worker thread.
pub trait ImageEditModel: Send + Sync {
    fn edit(&self, request: &EditRequest) -> Result<EditResponse, CollaboratorError>;
}

/// Hosted model proposing edit instructions for an image.
pub trait SuggestionModel: Send + Sync {
    fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<String>, CollaboratorError>;
}

/// Accept only a JSON array of strings; blank entries are dropped.
pub fn parse_suggestions(value: &Value) -> Result<Vec<String>, CollaboratorError> {
    let not_strings =
        || CollaboratorError::MalformedResponse("response was not a sequence of strings".into());

    let items = value.as_array().ok_or_else(not_strings)?;
    items
        .iter()
        .map(|item| item.as_str().map(str::trim).ok_or_else(not_strings))
        .filter(|item| !matches!(item, Ok("")))
        .map(|item| item.map(str::to_string))
        .collect()
}
