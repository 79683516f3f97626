use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use crate::collab::{CollaboratorError, EditResponse, ImageEditModel, SuggestionModel};
use crate::config::{ExportConfig, UploadConfig};
use crate::error::{Result, RetouchError};
use crate::image_state::ImageState;
use crate::transform::{optimize_for_upload, prepare_download};

use super::messages::{EditCommand, SuggestCommand, WorkerEvent};

/// Everything the edit-class worker needs, moved onto its thread.
pub(crate) struct EditWorkerContext {
    pub(crate) model: Arc<dyn ImageEditModel>,
    pub(crate) upload: UploadConfig,
    pub(crate) export: ExportConfig,
}

/// Spawn the edit-class worker thread. Returns the command sender.
pub(crate) fn spawn_edit_worker(
    ctx: EditWorkerContext,
    events: mpsc::Sender<WorkerEvent>,
) -> Result<mpsc::Sender<EditCommand>> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<EditCommand>();

    std::thread::Builder::new()
        .name("retouch-edit-worker".into())
        .spawn(move || edit_loop(cmd_rx, events, ctx))?;

    Ok(cmd_tx)
}

/// Spawn the suggestion worker thread. Returns the command sender.
pub(crate) fn spawn_suggest_worker(
    model: Arc<dyn SuggestionModel>,
    events: mpsc::Sender<WorkerEvent>,
) -> Result<mpsc::Sender<SuggestCommand>> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SuggestCommand>();

    std::thread::Builder::new()
        .name("retouch-suggest-worker".into())
        .spawn(move || suggest_loop(cmd_rx, events, model))?;

    Ok(cmd_tx)
}

fn edit_loop(
    cmd_rx: mpsc::Receiver<EditCommand>,
    tx: mpsc::Sender<WorkerEvent>,
    ctx: EditWorkerContext,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        let event = match cmd {
            EditCommand::Optimize { bytes, media_type } => {
                handle_optimize(bytes, &media_type, &ctx.upload)
            }
            EditCommand::Edit { request } => {
                let start = Instant::now();
                debug!(instruction = %request.instruction, "Sending edit request");
                let result = catch_panic(
                    || {
                        ctx.model
                            .edit(&request)
                            .and_then(EditResponse::into_image_state)
                    },
                    |msg| CollaboratorError::Transport(format!("the image model crashed: {msg}")),
                );
                WorkerEvent::Edited {
                    result,
                    elapsed: start.elapsed(),
                }
            }
            EditCommand::PrepareDownload {
                image,
                adjustments,
                tier,
            } => {
                let result = catch_panic(
                    || prepare_download(&image, adjustments, tier, &ctx.export).map_err(|e| e.to_string()),
                    |msg| msg,
                )
                .map_err(|msg| format!("Failed to prepare download: {msg}"));
                WorkerEvent::DownloadReady { result, tier }
            }
        };

        if tx.send(event).is_err() {
            // Editor is gone.
            break;
        }
    }
}

fn suggest_loop(
    cmd_rx: mpsc::Receiver<SuggestCommand>,
    tx: mpsc::Sender<WorkerEvent>,
    model: Arc<dyn SuggestionModel>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        let event = match cmd {
            SuggestCommand::Suggest {
                request,
                generation,
            } => WorkerEvent::Suggested {
                result: catch_panic(
                    || model.suggest(&request),
                    |msg| CollaboratorError::Transport(format!("the suggestion model crashed: {msg}")),
                ),
                generation,
            },
        };
        if tx.send(event).is_err() {
            break;
        }
    }
}

fn handle_optimize(bytes: Vec<u8>, media_type: &str, config: &UploadConfig) -> WorkerEvent {
    let start = Instant::now();
    let result = catch_panic(
        || load_upload(bytes, media_type, config).map_err(|e| e.to_string()),
        |msg| msg,
    )
    .map_err(|msg| format!("Failed to load image: {msg}"));
    WorkerEvent::Optimized {
        result,
        elapsed: start.elapsed(),
    }
}

fn load_upload(bytes: Vec<u8>, media_type: &str, config: &UploadConfig) -> Result<ImageState> {
    if bytes.is_empty() {
        return Err(RetouchError::EmptyImage);
    }
    if !media_type.starts_with("image/") {
        return Err(RetouchError::UnsupportedMediaType(media_type.to_string()));
    }
    let (bytes, media_type) = optimize_for_upload(bytes, media_type, config);
    Ok(ImageState::from_bytes(&bytes, media_type))
}

/// Run one task, turning a panic into an error so the worker survives and
/// the editor leaves its busy state.
fn catch_panic<T, E>(
    task: impl FnOnce() -> std::result::Result<T, E>,
    on_panic: impl FnOnce(String) -> E,
) -> std::result::Result<T, E> {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(%message, "Worker task panicked");
            Err(on_panic(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
