//! Edit orchestrator.
//!
//! The [`Editor`] is owned by the presentation thread. Collaborator calls
//! run on two worker threads (edit class and suggestion class) and report
//! back over a single channel; results are applied only inside [`Editor::poll`]
//! and [`Editor::wait_idle`], in the order they complete. History is
//! therefore never mutated concurrently, and a result always lands after
//! whatever the cursor points to when it is applied.

mod error;
mod messages;
mod state;
mod worker;

use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::collab::{EditRequest, ImageEditModel, SuggestionModel, SuggestionRequest};
use crate::config::{EditorConfig, RetouchConfig};
use crate::consts::{SHARE_UNSUPPORTED_MESSAGE, SUGGESTION_FAILURE_MESSAGE, VOICE_UNSUPPORTED_MESSAGE};
use crate::error::Result;
use crate::history::History;
use crate::image_state::ImageState;
use crate::session::{SessionPersistence, SessionSnapshot, SessionWriter};
use crate::share::{ShareError, ShareTarget};
use crate::transform::QualityTier;
use crate::voice::{compose_prompt, SpeechCapture, TranscriptEvent, VoiceError, VoiceInput, VoiceMode};

pub use error::{EditorError, ErrorKind, Rejected};
pub use state::{EditorUiState, LoadingStage, PendingDownload, Viewport};

use messages::{EditCommand, SuggestCommand, WorkerEvent};
use worker::EditWorkerContext;

/// How often `wait_idle` wakes up to drain voice events.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// External services the editor drives.
pub struct Collaborators {
    pub edit_model: Arc<dyn ImageEditModel>,
    pub suggestion_model: Arc<dyn SuggestionModel>,
    pub speech: Option<Box<dyn SpeechCapture>>,
}

/// What an applied asynchronous result did to the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An upload became the new session root.
    ImageLoaded,
    UploadFailed(EditorError),
    /// An edit was pushed; `version` is its 1-based position in history.
    EditApplied { version: usize },
    /// An edit finished after the session was cleared and was dropped.
    EditDiscarded,
    EditFailed(EditorError),
    SuggestionsReady(usize),
    SuggestionsFailed,
    DownloadReady { tier: QualityTier },
    DownloadFailed(EditorError),
    /// The prompt changed from dictation.
    PromptDictated { is_final: bool },
    /// A voice-submit flow started an edit.
    EditSubmitted,
    /// A voice-submit flow could not submit.
    SubmitRejected(Rejected),
    VoiceEnded,
    VoiceFailed(String),
}

struct VoiceSession {
    events: mpsc::Receiver<TranscriptEvent>,
    input: VoiceInput,
    /// Prompt text that transcripts are composed onto.
    base: String,
}

pub struct Editor {
    history: History,
    prompt: String,
    ui: EditorUiState,
    config: EditorConfig,
    session: SessionWriter,
    edit_tx: mpsc::Sender<EditCommand>,
    suggest_tx: mpsc::Sender<SuggestCommand>,
    events: mpsc::Receiver<WorkerEvent>,
    speech: Option<Box<dyn SpeechCapture>>,
    voice: Option<VoiceSession>,
    /// Bumped whenever the session root changes (upload, clear).
    generation: u64,
}

impl Editor {
    /// Build an editor, restoring the persisted session (read once, here).
    pub fn new(
        config: &RetouchConfig,
        collaborators: Collaborators,
        persistence: SessionPersistence,
    ) -> Result<Self> {
        let (history, prompt) = match persistence.load() {
            Some(SessionSnapshot { image, prompt_text }) => {
                let history = image.map(History::with_original).unwrap_or_default();
                info!(
                    has_image = !history.is_empty(),
                    prompt_len = prompt_text.len(),
                    "Session restored"
                );
                (history, prompt_text)
            }
            None => (History::new(), String::new()),
        };

        let (event_tx, events) = mpsc::channel();
        let edit_tx = worker::spawn_edit_worker(
            EditWorkerContext {
                model: collaborators.edit_model,
                upload: config.upload.clone(),
                export: config.export.clone(),
            },
            event_tx.clone(),
        )?;
        let suggest_tx = worker::spawn_suggest_worker(collaborators.suggestion_model, event_tx)?;

        Ok(Self {
            history,
            prompt,
            ui: EditorUiState::default(),
            config: config.editor.clone(),
            session: SessionWriter::spawn(persistence),
            edit_tx,
            suggest_tx,
            events,
            speech: collaborators.speech,
            voice: None,
            generation: 0,
        })
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current(&self) -> Option<&ImageState> {
        self.history.current()
    }

    pub fn original(&self) -> Option<&ImageState> {
        self.history.original()
    }

    /// The image to display: the original while comparing, else the current version.
    pub fn displayed(&self) -> Option<&ImageState> {
        if self.ui.comparing {
            self.history.original()
        } else {
            self.history.current()
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn ui(&self) -> &EditorUiState {
        &self.ui
    }

    /// An edit, upload or export is in flight.
    pub fn is_busy(&self) -> bool {
        self.ui.is_busy()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() && self.history_unlocked()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo() && self.history_unlocked()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_busy() && self.current().is_some() && !self.prompt.trim().is_empty()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            image: self.history.current().cloned(),
            prompt_text: self.prompt.clone(),
        }
    }

    // ---------------------------------------------------------------------
    // Edit-class intents
    // ---------------------------------------------------------------------

    /// Load a new image. On success it replaces the whole history.
    pub fn upload(&mut self, bytes: Vec<u8>, media_type: impl Into<String>) -> std::result::Result<(), Rejected> {
        if self.is_busy() {
            return Err(Rejected::Busy);
        }
        let media_type = media_type.into();
        debug!(bytes = bytes.len(), %media_type, "Upload requested");
        self.ui.begin(LoadingStage::Optimizing);
        self.dispatch_edit(EditCommand::Optimize { bytes, media_type })
    }

    /// Send the prompt to the image model for the current version.
    pub fn submit_prompt(&mut self) -> std::result::Result<(), Rejected> {
        if self.is_busy() {
            return Err(Rejected::Busy);
        }
        let image = self.history.current().ok_or(Rejected::NoImage)?;
        let instruction = self.prompt.trim();
        if instruction.is_empty() {
            return Err(Rejected::EmptyPrompt);
        }

        let request = EditRequest::new(image, instruction);
        info!(instruction = %request.instruction, "Submitting edit");
        self.ui.begin(LoadingStage::ApplyingEdit);
        self.ui.reset_view();
        self.dispatch_edit(EditCommand::Edit { request })
    }

    /// Adjust and compress the current version for export. The result is
    /// collected with [`Editor::take_download`] once it arrives.
    pub fn prepare_download(&mut self, tier: QualityTier) -> std::result::Result<(), Rejected> {
        if self.is_busy() {
            return Err(Rejected::Busy);
        }
        let image = self.history.current().cloned().ok_or(Rejected::NoImage)?;
        self.ui.begin(LoadingStage::PreparingDownload);
        self.ui.pending_download = None;
        self.dispatch_edit(EditCommand::PrepareDownload {
            image,
            adjustments: self.ui.adjustments,
            tier,
        })
    }

    pub fn take_download(&mut self) -> Option<PendingDownload> {
        self.ui.pending_download.take()
    }

    /// Hand the prepared export to a share target. Failures land in the
    /// main error slot and the export stays available for saving.
    pub fn share_download(
        &mut self,
        target: &dyn ShareTarget,
        file_name: &str,
    ) -> std::result::Result<bool, Rejected> {
        let pending = self.ui.pending_download.take().ok_or(Rejected::NothingToShare)?;
        self.ui.error = None;
        match target.share(&pending.image, file_name) {
            Ok(()) => {
                info!(file_name, "Export shared");
                Ok(true)
            }
            Err(e) => {
                let err = match e {
                    ShareError::Unsupported => {
                        EditorError::new(ErrorKind::Unsupported, SHARE_UNSUPPORTED_MESSAGE)
                    }
                    ShareError::Failed(msg) => EditorError::new(ErrorKind::Transport, msg),
                };
                warn!(error = %err, "Share failed");
                self.ui.error = Some(err);
                self.ui.pending_download = Some(pending);
                Ok(false)
            }
        }
    }

    // ---------------------------------------------------------------------
    // History intents
    // ---------------------------------------------------------------------

    /// Step back one version. `Ok(false)` at the start of history.
    pub fn undo(&mut self) -> std::result::Result<bool, Rejected> {
        self.check_history_unlocked()?;
        let moved = self.history.undo();
        if moved {
            self.persist();
        }
        Ok(moved)
    }

    /// Step forward one version. `Ok(false)` at the end of history.
    pub fn redo(&mut self) -> std::result::Result<bool, Rejected> {
        self.check_history_unlocked()?;
        let moved = self.history.redo();
        if moved {
            self.persist();
        }
        Ok(moved)
    }

    pub fn reset_to_original(&mut self) -> std::result::Result<(), Rejected> {
        self.check_history_unlocked()?;
        if self.history.is_empty() {
            return Err(Rejected::NoImage);
        }
        self.history.reset_to_original();
        self.ui.reset_view();
        self.persist();
        Ok(())
    }

    /// Drop everything and start a brand-new session.
    pub fn clear_session(&mut self) -> std::result::Result<(), Rejected> {
        self.check_history_unlocked()?;
        self.stop_voice();
        self.history.clear();
        self.prompt.clear();
        self.generation += 1;
        self.ui.reset_for_new_session();
        self.session.clear();
        info!("Session cleared");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Prompt and suggestions
    // ---------------------------------------------------------------------

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
        self.persist();
    }

    /// Ask for edit suggestions for the current version. A second request
    /// while one is outstanding is refused.
    pub fn fetch_suggestions(&mut self) -> std::result::Result<(), Rejected> {
        if self.ui.suggestions_loading {
            return Err(Rejected::SuggestionsInFlight);
        }
        let image = self.history.current().ok_or(Rejected::NoImage)?;
        let request = SuggestionRequest::new(image);

        self.ui.suggestions.clear();
        self.ui.suggestion_error = None;
        self.ui.suggestions_loading = true;
        let cmd = SuggestCommand::Suggest {
            request,
            generation: self.generation,
        };
        if self.suggest_tx.send(cmd).is_err() {
            self.ui.suggestions_loading = false;
            self.ui.suggestion_error = Some(SUGGESTION_FAILURE_MESSAGE.into());
            return Err(Rejected::WorkerUnavailable);
        }
        Ok(())
    }

    /// Copy a suggestion into the prompt field.
    pub fn apply_suggestion(&mut self, index: usize) -> std::result::Result<(), Rejected> {
        let text = self.ui.suggestions.get(index).cloned().ok_or(Rejected::InvalidIndex)?;
        self.set_prompt(text);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // View state
    // ---------------------------------------------------------------------

    pub fn set_brightness(&mut self, pct: u32) {
        self.ui.adjustments.set_brightness(pct);
    }

    pub fn set_contrast(&mut self, pct: u32) {
        self.ui.adjustments.set_contrast(pct);
    }

    pub fn reset_adjustments(&mut self) {
        self.ui.adjustments.reset();
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.ui.viewport.zoom_by(factor);
    }

    pub fn set_zoom(&mut self, scale: f32) {
        self.ui.viewport.set_zoom(scale);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.ui.viewport.pan(dx, dy);
    }

    pub fn reset_view(&mut self) {
        self.ui.viewport.reset();
    }

    /// Toggle before/after comparison. Returns the new state.
    pub fn toggle_compare(&mut self) -> bool {
        self.ui.comparing = !self.ui.comparing && self.history.original().is_some();
        self.ui.comparing
    }

    // ---------------------------------------------------------------------
    // Voice
    // ---------------------------------------------------------------------

    pub fn start_voice(&mut self, input: VoiceInput) -> std::result::Result<(), Rejected> {
        if self.voice.is_some() {
            return Err(Rejected::VoiceActive);
        }
        self.ui.voice_error = None;

        let started = match self.speech.as_mut() {
            Some(speech) if speech.is_supported() => speech.start(),
            _ => Err(VoiceError::Unsupported),
        };
        let events = match started {
            Ok(events) => events,
            Err(e) => {
                let message = match e {
                    VoiceError::Unsupported => VOICE_UNSUPPORTED_MESSAGE.to_string(),
                    VoiceError::Failed(_) => e.to_string(),
                };
                warn!(%message, "Voice capture unavailable");
                self.ui.voice_error = Some(message);
                return Err(Rejected::VoiceUnavailable);
            }
        };

        let base = match input.mode {
            VoiceMode::Replace => String::new(),
            VoiceMode::Append => self.prompt.clone(),
        };
        self.voice = Some(VoiceSession {
            events,
            input,
            base,
        });
        self.ui.voice_active = true;
        debug!(?input, "Voice capture started");
        Ok(())
    }

    /// Stop voice capture. Safe to call when nothing is running.
    pub fn stop_voice(&mut self) {
        if let Some(speech) = self.speech.as_mut() {
            speech.stop();
        }
        if self.voice.take().is_some() {
            debug!("Voice capture stopped");
        }
        self.ui.voice_active = false;
    }

    // ---------------------------------------------------------------------
    // Result processing
    // ---------------------------------------------------------------------

    /// Apply every result that has already arrived. Never blocks.
    pub fn poll(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            outcomes.push(self.apply_event(event));
        }
        self.drain_voice(&mut outcomes);
        outcomes
    }

    /// Block until no edit-class or suggestion operation is in flight, or
    /// until `timeout` elapses, applying results as they arrive.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<Outcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = self.poll();

        while self.has_pending_work() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.events.recv_timeout((deadline - now).min(IDLE_POLL_INTERVAL)) {
                Ok(event) => outcomes.push(self.apply_event(event)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.drain_voice(&mut outcomes);
        }
        outcomes
    }

    /// Block until every queued session write has reached the store.
    pub fn flush_session(&self) {
        self.session.flush();
    }

    fn has_pending_work(&self) -> bool {
        self.ui.is_busy() || self.ui.suggestions_loading
    }

    fn apply_event(&mut self, event: WorkerEvent) -> Outcome {
        match event {
            WorkerEvent::Optimized { result, elapsed } => {
                self.ui.finish();
                match result {
                    Ok(state) => {
                        info!(
                            media_type = state.media_type(),
                            bytes = state.byte_len(),
                            ?elapsed,
                            "Image loaded as new session root"
                        );
                        self.history.reset(state);
                        self.generation += 1;
                        self.ui.reset_for_new_session();
                        self.persist();
                        Outcome::ImageLoaded
                    }
                    Err(message) => {
                        let err = EditorError::new(ErrorKind::LocalTransform, message);
                        warn!(error = %err, "Upload failed");
                        self.ui.error = Some(err.clone());
                        Outcome::UploadFailed(err)
                    }
                }
            }
            WorkerEvent::Edited { result, elapsed } => {
                self.ui.finish();
                match result {
                    Ok(state) => {
                        if self.history.current().is_none() {
                            info!("Edit finished after the session was cleared; discarding");
                            return Outcome::EditDiscarded;
                        }
                        self.history.push(state);
                        self.prompt.clear();
                        self.persist();
                        let version = self.history.len();
                        info!(version, ?elapsed, "Edit applied");
                        Outcome::EditApplied { version }
                    }
                    Err(e) => {
                        let err = EditorError::from(&e);
                        warn!(error = %e, "Edit failed");
                        self.ui.error = Some(err.clone());
                        Outcome::EditFailed(err)
                    }
                }
            }
            WorkerEvent::Suggested { result, generation } => {
                self.ui.suggestions_loading = false;
                match result {
                    _ if generation != self.generation => {
                        debug!("Suggestions arrived for a previous session; discarding");
                        Outcome::SuggestionsReady(0)
                    }
                    Ok(suggestions) => {
                        let count = suggestions.len();
                        self.ui.suggestions = suggestions;
                        Outcome::SuggestionsReady(count)
                    }
                    Err(e) => {
                        warn!(error = %e, "Suggestion request failed");
                        self.ui.suggestion_error = Some(SUGGESTION_FAILURE_MESSAGE.into());
                        Outcome::SuggestionsFailed
                    }
                }
            }
            WorkerEvent::DownloadReady { result, tier } => {
                self.ui.finish();
                match result {
                    Ok(image) => {
                        info!(%tier, bytes = image.byte_len(), "Export ready");
                        self.ui.pending_download = Some(PendingDownload { image, tier });
                        Outcome::DownloadReady { tier }
                    }
                    Err(message) => {
                        let err = EditorError::new(ErrorKind::LocalTransform, message);
                        warn!(error = %err, "Export failed");
                        self.ui.error = Some(err.clone());
                        Outcome::DownloadFailed(err)
                    }
                }
            }
        }
    }

    fn drain_voice(&mut self, outcomes: &mut Vec<Outcome>) {
        loop {
            let Some(session) = self.voice.as_mut() else {
                return;
            };
            let event = match session.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => TranscriptEvent::Ended,
            };
            self.apply_transcript(event, outcomes);
        }
    }

    fn apply_transcript(&mut self, event: TranscriptEvent, outcomes: &mut Vec<Outcome>) {
        let Some(session) = self.voice.as_mut() else {
            return;
        };
        match event {
            TranscriptEvent::Interim(text) => {
                self.prompt = compose_prompt(&session.base, &text);
                outcomes.push(Outcome::PromptDictated { is_final: false });
            }
            TranscriptEvent::Final(text) => {
                let prompt = compose_prompt(&session.base, &text);
                session.base = prompt.clone();
                let submit = session.input.submit_on_final;
                self.set_prompt(prompt);
                outcomes.push(Outcome::PromptDictated { is_final: true });

                if submit {
                    self.stop_voice();
                    outcomes.push(Outcome::VoiceEnded);
                    match self.submit_prompt() {
                        Ok(()) => outcomes.push(Outcome::EditSubmitted),
                        Err(reason) => {
                            warn!(%reason, "Voice submit rejected");
                            outcomes.push(Outcome::SubmitRejected(reason));
                        }
                    }
                }
            }
            TranscriptEvent::Error(message) => {
                self.stop_voice();
                self.ui.voice_error = Some(message.clone());
                outcomes.push(Outcome::VoiceFailed(message));
            }
            TranscriptEvent::Ended => {
                self.stop_voice();
                outcomes.push(Outcome::VoiceEnded);
            }
        }
    }

    fn dispatch_edit(&mut self, cmd: EditCommand) -> std::result::Result<(), Rejected> {
        if self.edit_tx.send(cmd).is_err() {
            self.ui.finish();
            self.ui.error = Some(EditorError::new(
                ErrorKind::LocalTransform,
                "Background worker is not running",
            ));
            return Err(Rejected::WorkerUnavailable);
        }
        Ok(())
    }

    fn history_unlocked(&self) -> bool {
        !(self.config.lock_history_while_busy && self.is_busy())
    }

    fn check_history_unlocked(&self) -> std::result::Result<(), Rejected> {
        if self.history_unlocked() {
            Ok(())
        } else {
            Err(Rejected::Busy)
        }
    }

    fn persist(&self) {
        self.session.save(self.snapshot());
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.stop_voice();
    }
}
