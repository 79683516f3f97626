//! Shared setup for commands: config, storage, collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use retouch_core::collab::{ImageEditModel, SuggestionModel};
use retouch_core::config::RetouchConfig;
use retouch_core::editor::Collaborators;
use retouch_core::image_state::sniff_media_type;
use retouch_core::session::{FileStore, Store};
use retouch_core::share::{NoShare, ShareTarget};
use retouch_core::voice::SpeechCapture;
use tracing::debug;

use crate::capture::CommandSpeech;
use crate::share::CommandShare;

/// Load the config from `explicit`, else from the user config dir if a
/// file exists there, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<RetouchConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match dirs::config_dir().map(|d| d.join("retouch").join("config.toml")) {
            Some(path) if path.is_file() => path,
            _ => return Ok(RetouchConfig::default()),
        },
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Directory holding the saved session and preferences.
pub fn state_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => dirs::data_dir()
            .map(|d| d.join("retouch"))
            .ok_or_else(|| anyhow!("No data directory on this platform; pass --state-dir")),
    }
}

pub fn open_store(dir: &Path) -> Result<Arc<dyn Store>> {
    let store = FileStore::open(dir)
        .with_context(|| format!("Failed to open session store {}", dir.display()))?;
    Ok(Arc::new(store))
}

/// Read an image file and detect its media type from its contents.
pub fn read_image(path: &Path) -> Result<(Vec<u8>, String)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let media_type = sniff_media_type(&bytes)
        .ok_or_else(|| anyhow!("{} is not a recognised image", path.display()))?;
    Ok((bytes, media_type.to_string()))
}

/// Write exported bytes, adding the media type's extension when the path
/// has none. Returns the path written.
pub fn write_export(path: &Path, bytes: &[u8], extension: &str) -> Result<PathBuf> {
    let path = if path.extension().is_none() {
        path.with_extension(extension)
    } else {
        path.to_path_buf()
    };
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn collaborators(config: &RetouchConfig, with_voice: bool) -> Result<Collaborators> {
    let speech: Option<Box<dyn SpeechCapture>> = if with_voice && !config.voice.command.is_empty() {
        Some(Box::new(CommandSpeech::new(config.voice.command.clone())))
    } else {
        None
    };
    let (edit_model, suggestion_model) = models(config)?;
    Ok(Collaborators {
        edit_model,
        suggestion_model,
        speech,
    })
}

pub fn share_target(config: &RetouchConfig) -> Box<dyn ShareTarget> {
    if config.share.command.is_empty() {
        Box::new(NoShare)
    } else {
        Box::new(CommandShare::new(config.share.command.clone()))
    }
}

/// Upper bound for one model round trip, retries included.
pub fn model_timeout(config: &RetouchConfig) -> Duration {
    let attempts = u64::from(config.model.max_retries) + 1;
    Duration::from_secs(config.model.timeout_secs * attempts + 30)
}

type Models = (Arc<dyn ImageEditModel>, Arc<dyn SuggestionModel>);

#[cfg(feature = "remote")]
fn models(config: &RetouchConfig) -> Result<Models> {
    let client = Arc::new(retouch_core::collab::remote::GeminiClient::new(
        config.model.clone(),
    )?);
    let edit: Arc<dyn ImageEditModel> = client.clone();
    let suggest: Arc<dyn SuggestionModel> = client;
    Ok((edit, suggest))
}

#[cfg(not(feature = "remote"))]
fn models(_config: &RetouchConfig) -> Result<Models> {
    let offline = Arc::new(offline::Offline);
    let edit: Arc<dyn ImageEditModel> = offline.clone();
    let suggest: Arc<dyn SuggestionModel> = offline;
    Ok((edit, suggest))
}

#[cfg(not(feature = "remote"))]
mod offline {
    use retouch_core::collab::{
        CollaboratorError, EditRequest, EditResponse, ImageEditModel, SuggestionModel,
        SuggestionRequest,
    };

    const MESSAGE: &str = "this build has no model client (enable the `remote` feature)";

    pub struct Offline;

    impl ImageEditModel for Offline {
        fn edit(&self, _request: &EditRequest) -> Result<EditResponse, CollaboratorError> {
            Err(CollaboratorError::InvalidConfiguration(MESSAGE.into()))
        }
    }

    impl SuggestionModel for Offline {
        fn suggest(&self, _request: &SuggestionRequest) -> Result<Vec<String>, CollaboratorError> {
            Err(CollaboratorError::InvalidConfiguration(MESSAGE.into()))
        }
    }
}
