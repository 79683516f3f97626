mod store;
mod writer;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::consts::{SESSION_IMAGE_KEY, SESSION_PROMPT_KEY};
use crate::error::{Result, RetouchError};
use crate::image_state::ImageState;

pub use store::{FileStore, MemoryStore, Store};
pub use writer::SessionWriter;

/// The persisted part of an editing session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub image: Option<ImageState>,
    pub prompt_text: String,
}

/// Reads and writes [`SessionSnapshot`]s under two independent keys.
///
/// Writes are best effort: failures are logged and swallowed. Reads
/// self-heal: anything that fails validation is deleted and reported as
/// absent.
#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn Store>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn save(&self, snapshot: &SessionSnapshot) {
        let image_result = match &snapshot.image {
            Some(image) => serde_json::to_string(image)
                .map_err(RetouchError::from)
                .and_then(|json| self.store.set(SESSION_IMAGE_KEY, &json)),
            None => self.store.remove(SESSION_IMAGE_KEY),
        };
        if let Err(e) = image_result {
            warn!(error = %e, "Failed to persist session image");
        }

        if let Err(e) = self.store.set(SESSION_PROMPT_KEY, &snapshot.prompt_text) {
            warn!(error = %e, "Failed to persist session prompt");
        }
    }

    /// Load the stored snapshot. Returns `None` when nothing is stored or
    /// the stored data is corrupt (in which case both keys are removed).
    pub fn load(&self) -> Option<SessionSnapshot> {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                warn!(%reason, "Discarding corrupt session snapshot");
                self.clear();
                None
            }
        }
    }

    pub fn clear(&self) {
        for key in [SESSION_IMAGE_KEY, SESSION_PROMPT_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove session key");
            }
        }
    }

    fn try_load(&self) -> std::result::Result<Option<SessionSnapshot>, String> {
        let raw_image = self.store.get(SESSION_IMAGE_KEY).map_err(|e| e.to_string())?;
        let prompt = self.store.get(SESSION_PROMPT_KEY).map_err(|e| e.to_string())?;

        if raw_image.is_none() && prompt.is_none() {
            debug!("No stored session");
            return Ok(None);
        }

        let image = raw_image
            .map(|raw| parse_image_entry(&raw))
            .transpose()
            .map_err(|e| e.to_string())?;

        Ok(Some(SessionSnapshot {
            image,
            prompt_text: prompt.unwrap_or_default(),
        }))
    }
}

/// Validate the stored image entry: an object with string `dataUrl` and
/// `mimeType` fields holding a base64 data URI.
fn parse_image_entry(raw: &str) -> Result<ImageState> {
    let value: Value = serde_json::from_str(raw)?;
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RetouchError::CorruptSnapshot(format!("missing string field '{name}'")))
    };
    ImageState::from_parts(field("dataUrl")?, field("mimeType")?)
}
