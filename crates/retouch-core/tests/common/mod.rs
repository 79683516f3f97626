use std::io::Cursor;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use retouch_core::collab::{
    CollaboratorError, EditRequest, EditResponse, ImageEditModel, SuggestionModel,
    SuggestionRequest,
};
use retouch_core::config::RetouchConfig;
use retouch_core::editor::{Collaborators, Editor};
use retouch_core::image_state::ImageState;
use retouch_core::session::{MemoryStore, SessionPersistence, Store};
use retouch_core::voice::{SpeechCapture, TranscriptEvent, VoiceError};

pub const WAIT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Encode a solid-colour RGB image as PNG.
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// Encode a solid-colour RGBA image as PNG.
pub fn solid_png_rgba(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(rgba));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// Encode a solid-colour RGB image as JPEG.
pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn png_state(rgb: [u8; 3]) -> ImageState {
    ImageState::from_bytes(&solid_png(4, 4, rgb), "image/png")
}

pub fn decode(state: &ImageState) -> DynamicImage {
    image::load_from_memory(&state.to_bytes().unwrap()).unwrap()
}

/// What the edit model "returns" for a given colour.
pub fn edited(rgb: [u8; 3]) -> Result<EditResponse, CollaboratorError> {
    let state = png_state(rgb);
    Ok(EditResponse {
        image_base64: state.base64_payload().to_string(),
        media_type: "image/png".into(),
    })
}

// ---------------------------------------------------------------------------
// Collaborator fakes
// ---------------------------------------------------------------------------

/// Edit model that blocks every call until the test releases a response.
pub struct GatedEditModel {
    responses: Mutex<mpsc::Receiver<Result<EditResponse, CollaboratorError>>>,
    requests: Mutex<Vec<EditRequest>>,
}

impl GatedEditModel {
    pub fn new() -> (Arc<Self>, mpsc::Sender<Result<EditResponse, CollaboratorError>>) {
        let (tx, rx) = mpsc::channel();
        let model = Arc::new(Self {
            responses: Mutex::new(rx),
            requests: Mutex::new(Vec::new()),
        });
        (model, tx)
    }

    pub fn requests(&self) -> Vec<EditRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ImageEditModel for GatedEditModel {
    fn edit(&self, request: &EditRequest) -> Result<EditResponse, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .recv()
            .unwrap_or_else(|_| Err(CollaboratorError::Transport("gate closed".into())))
    }
}

/// Suggestion model returning the same answer every time.
pub struct ScriptedSuggestions(pub Result<Vec<String>, CollaboratorError>);

impl ScriptedSuggestions {
    pub fn ok(items: &[&str]) -> Arc<Self> {
        Arc::new(Self(Ok(items.iter().map(|s| s.to_string()).collect())))
    }

    pub fn failing(err: CollaboratorError) -> Arc<Self> {
        Arc::new(Self(Err(err)))
    }
}

impl SuggestionModel for ScriptedSuggestions {
    fn suggest(&self, _request: &SuggestionRequest) -> Result<Vec<String>, CollaboratorError> {
        self.0.clone()
    }
}

/// Suggestion model that blocks every call until the test releases an answer.
pub struct GatedSuggestions {
    responses: Mutex<mpsc::Receiver<Vec<String>>>,
}

impl GatedSuggestions {
    pub fn new() -> (Arc<Self>, mpsc::Sender<Vec<String>>) {
        let (tx, rx) = mpsc::channel();
        (
            Arc::new(Self {
                responses: Mutex::new(rx),
            }),
            tx,
        )
    }
}

impl SuggestionModel for GatedSuggestions {
    fn suggest(&self, _request: &SuggestionRequest) -> Result<Vec<String>, CollaboratorError> {
        self.responses
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| CollaboratorError::Transport("gate closed".into()))
    }
}

/// Edit model that panics on every call.
pub struct PanickingEditModel;

impl ImageEditModel for PanickingEditModel {
    fn edit(&self, _request: &EditRequest) -> Result<EditResponse, CollaboratorError> {
        panic!("model exploded");
    }
}

/// Test side of a [`ScriptedSpeech`]: pushes transcript events into the
/// running capture session.
#[derive(Clone, Default)]
pub struct SpeechHandle {
    sender: Arc<Mutex<Option<mpsc::Sender<TranscriptEvent>>>>,
    starts: Arc<Mutex<usize>>,
}

impl SpeechHandle {
    pub fn send(&self, event: TranscriptEvent) {
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            tx.send(event).unwrap();
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    pub fn starts(&self) -> usize {
        *self.starts.lock().unwrap()
    }
}

pub struct ScriptedSpeech {
    handle: SpeechHandle,
}

impl ScriptedSpeech {
    pub fn new() -> (Box<dyn SpeechCapture>, SpeechHandle) {
        let handle = SpeechHandle::default();
        (
            Box::new(Self {
                handle: handle.clone(),
            }),
            handle,
        )
    }
}

impl SpeechCapture for ScriptedSpeech {
    fn start(&mut self) -> Result<mpsc::Receiver<TranscriptEvent>, VoiceError> {
        let (tx, rx) = mpsc::channel();
        *self.handle.sender.lock().unwrap() = Some(tx);
        *self.handle.starts.lock().unwrap() += 1;
        Ok(rx)
    }

    fn stop(&mut self) {
        self.handle.sender.lock().unwrap().take();
    }
}

// ---------------------------------------------------------------------------
// Editor harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub editor: Editor,
    pub store: Arc<MemoryStore>,
    pub gate: mpsc::Sender<Result<EditResponse, CollaboratorError>>,
    pub edit_model: Arc<GatedEditModel>,
}

pub struct HarnessBuilder {
    config: RetouchConfig,
    store: Arc<MemoryStore>,
    suggestions: Arc<dyn SuggestionModel>,
    speech: Option<Box<dyn SpeechCapture>>,
    edit_override: Option<Arc<dyn ImageEditModel>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: RetouchConfig::default(),
            store: Arc::new(MemoryStore::new()),
            suggestions: ScriptedSuggestions::ok(&["add a sunset", "make it black and white"]),
            speech: None,
            edit_override: None,
        }
    }

    pub fn unlocked_history(mut self) -> Self {
        self.config.editor.lock_history_while_busy = false;
        self
    }

    pub fn store(mut self, store: Arc<MemoryStore>) -> Self {
        self.store = store;
        self
    }

    pub fn suggestions(mut self, model: Arc<dyn SuggestionModel>) -> Self {
        self.suggestions = model;
        self
    }

    pub fn speech(mut self, speech: Box<dyn SpeechCapture>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Use `model` instead of the gated edit model; `gate` then goes unused.
    pub fn edit_model(mut self, model: Arc<dyn ImageEditModel>) -> Self {
        self.edit_override = Some(model);
        self
    }

    pub fn build(self) -> Harness {
        let (edit_model, gate) = GatedEditModel::new();
        let store: Arc<dyn Store> = self.store.clone();
        let model: Arc<dyn ImageEditModel> = match self.edit_override {
            Some(model) => model,
            None => edit_model.clone(),
        };
        let editor = Editor::new(
            &self.config,
            Collaborators {
                edit_model: model,
                suggestion_model: self.suggestions,
                speech: self.speech,
            },
            SessionPersistence::new(store),
        )
        .unwrap();
        Harness {
            editor,
            store: self.store,
            gate,
            edit_model,
        }
    }
}

impl Harness {
    /// Upload a small PNG and wait for it to become the session root.
    pub fn load_image(&mut self, rgb: [u8; 3]) {
        self.editor
            .upload(solid_png(4, 4, rgb), "image/png")
            .unwrap();
        self.editor.wait_idle(WAIT);
        assert!(self.editor.current().is_some(), "upload did not land");
    }

    /// Submit `prompt`, release the model with `rgb`, and wait for the result.
    pub fn apply_edit(&mut self, prompt: &str, rgb: [u8; 3]) {
        self.editor.set_prompt(prompt);
        self.editor.submit_prompt().unwrap();
        self.gate.send(edited(rgb)).unwrap();
        self.editor.wait_idle(WAIT);
    }

    pub fn persistence(&self) -> SessionPersistence {
        let store: Arc<dyn Store> = self.store.clone();
        SessionPersistence::new(store)
    }
}
