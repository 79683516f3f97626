#[allow(dead_code)]
mod common;

use std::sync::{Arc, Mutex};

use retouch_core::collab::{CollaboratorError, EditResponse};
use retouch_core::consts::{
    SESSION_IMAGE_KEY, SHARE_UNSUPPORTED_MESSAGE, SUGGESTION_FAILURE_MESSAGE,
    VOICE_UNSUPPORTED_MESSAGE,
};
use retouch_core::editor::{ErrorKind, LoadingStage, Outcome, Rejected};
use retouch_core::image_state::ImageState;
use retouch_core::session::{SessionSnapshot, Store};
use retouch_core::share::{NoShare, ShareError, ShareTarget};
use retouch_core::transform::QualityTier;
use retouch_core::voice::{TranscriptEvent, VoiceInput, VoiceMode};

use common::{
    edited, png_state, solid_png, GatedSuggestions, HarnessBuilder, PanickingEditModel,
    ScriptedSpeech, ScriptedSuggestions, WAIT,
};

const RED: [u8; 3] = [200, 30, 30];
const GREEN: [u8; 3] = [30, 200, 30];
const BLUE: [u8; 3] = [30, 30, 200];
const GREY: [u8; 3] = [100, 100, 100];

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[test]
fn test_upload_becomes_session_root() {
    let mut h = HarnessBuilder::new().build();
    let bytes = solid_png(4, 4, RED);

    h.editor.upload(bytes.clone(), "image/png").unwrap();
    assert_eq!(h.editor.ui().loading, Some(LoadingStage::Optimizing));
    assert_eq!(
        h.editor.ui().loading_label().as_deref(),
        Some("Optimizing image…")
    );

    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes, vec![Outcome::ImageLoaded]);
    assert!(!h.editor.is_busy());
    assert_eq!(h.editor.history().len(), 1);
    assert_eq!(h.editor.history().cursor(), Some(0));
    // Small PNGs pass through optimization untouched.
    assert_eq!(h.editor.current().unwrap().to_bytes().unwrap(), bytes);
    assert_eq!(h.editor.original(), h.editor.current());
}

#[test]
fn test_upload_replaces_existing_history() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.apply_edit("make it green", GREEN);
    assert_eq!(h.editor.history().len(), 2);

    h.load_image(BLUE);
    assert_eq!(h.editor.history().len(), 1);
    assert!(!h.editor.can_undo());
    assert_eq!(h.editor.ui().suggestions.len(), 0);
}

#[test]
fn test_upload_rejects_non_image_media_type() {
    let mut h = HarnessBuilder::new().build();
    h.editor.upload(b"hello".to_vec(), "text/plain").unwrap();

    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        Outcome::UploadFailed(err) => assert_eq!(err.kind, ErrorKind::LocalTransform),
        other => panic!("expected UploadFailed, got {other:?}"),
    }
    assert!(h.editor.current().is_none());
    assert!(h.editor.ui().error.is_some());
}

#[test]
fn test_upload_rejects_empty_file() {
    let mut h = HarnessBuilder::new().build();
    h.editor.upload(Vec::new(), "image/png").unwrap();
    let outcomes = h.editor.wait_idle(WAIT);
    assert!(matches!(outcomes[..], [Outcome::UploadFailed(_)]));
    assert!(h.editor.history().is_empty());
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

#[test]
fn test_basic_edit_pushes_version_and_clears_prompt() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);

    h.editor.set_prompt("  make it green  ");
    h.editor.submit_prompt().unwrap();
    assert_eq!(h.editor.ui().loading, Some(LoadingStage::ApplyingEdit));

    h.gate.send(edited(GREEN)).unwrap();
    let outcomes = h.editor.wait_idle(WAIT);

    assert_eq!(outcomes, vec![Outcome::EditApplied { version: 2 }]);
    assert_eq!(h.editor.history().len(), 2);
    assert_eq!(h.editor.history().cursor(), Some(1));
    assert_eq!(h.editor.current(), Some(&png_state(GREEN)));
    assert_eq!(h.editor.prompt(), "");
    assert!(h.editor.ui().error.is_none());

    let requests = h.edit_model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].instruction, "make it green");
    assert_eq!(requests[0].media_type, "image/png");
}

#[test]
fn test_edit_result_is_persisted() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.apply_edit("make it blue", BLUE);
    h.editor.flush_session();

    let raw = h.store.get(SESSION_IMAGE_KEY).unwrap().unwrap();
    assert!(raw.contains(png_state(BLUE).data_uri()));

    let snapshot = h.persistence().load().unwrap();
    assert_eq!(snapshot.image, Some(png_state(BLUE)));
    assert_eq!(snapshot.prompt_text, "");
}

#[test]
fn test_submit_requires_image_and_prompt() {
    let mut h = HarnessBuilder::new().build();
    h.editor.set_prompt("anything");
    assert_eq!(h.editor.submit_prompt(), Err(Rejected::NoImage));

    h.load_image(RED);
    h.editor.set_prompt("   ");
    assert_eq!(h.editor.submit_prompt(), Err(Rejected::EmptyPrompt));
    assert!(!h.editor.can_submit());
    assert!(h.edit_model.requests().is_empty());
}

#[test]
fn test_edit_failure_sets_error_and_keeps_history() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_prompt("something forbidden");
    h.editor.submit_prompt().unwrap();
    h.gate
        .send(Err(CollaboratorError::PolicyRejection("blocked".into())))
        .unwrap();

    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes.len(), 1);
    let err = h.editor.ui().error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::PolicyRejection);
    assert!(err.message.contains("blocked"), "got: {}", err.message);
    assert_eq!(outcomes[0], Outcome::EditFailed(err));

    assert_eq!(h.editor.history().len(), 1);
    // The prompt survives a failure so the user can retry.
    assert_eq!(h.editor.prompt(), "something forbidden");
}

#[test]
fn test_edit_with_empty_image_is_malformed() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_prompt("blank");
    h.editor.submit_prompt().unwrap();
    h.gate
        .send(Ok(EditResponse {
            image_base64: String::new(),
            media_type: "image/png".into(),
        }))
        .unwrap();

    h.editor.wait_idle(WAIT);
    let err = h.editor.ui().error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::MalformedResponse);
    assert_eq!(h.editor.history().len(), 1);
}

#[test]
fn test_edit_without_media_type_keeps_saved_session() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_prompt("no type");
    h.editor.submit_prompt().unwrap();
    h.gate
        .send(Ok(EditResponse {
            image_base64: png_state(GREEN).base64_payload().to_string(),
            media_type: String::new(),
        }))
        .unwrap();

    let outcomes = h.editor.wait_idle(WAIT);
    assert!(matches!(outcomes.as_slice(), [Outcome::EditFailed(_)]), "got {outcomes:?}");
    assert_eq!(h.editor.ui().error.as_ref().unwrap().kind, ErrorKind::MalformedResponse);
    assert_eq!(h.editor.history().len(), 1);

    h.editor.flush_session();
    let snapshot = h.persistence().load().expect("session survives a bad response");
    assert_eq!(snapshot.image, Some(png_state(RED)));
    assert_eq!(snapshot.prompt_text, "no type");
}

#[test]
fn test_edit_with_undecodable_payload_is_malformed() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_prompt("garbage");
    h.editor.submit_prompt().unwrap();
    h.gate
        .send(Ok(EditResponse {
            image_base64: "!!!not base64!!!".into(),
            media_type: "image/png".into(),
        }))
        .unwrap();

    h.editor.wait_idle(WAIT);
    assert_eq!(h.editor.ui().error.as_ref().unwrap().kind, ErrorKind::MalformedResponse);
    assert_eq!(h.editor.history().len(), 1);
    assert_eq!(h.editor.current(), Some(&png_state(RED)));
}

#[test]
fn test_panicking_model_does_not_wedge_editor() {
    let mut h = HarnessBuilder::new()
        .edit_model(Arc::new(PanickingEditModel))
        .build();
    h.load_image(RED);
    h.editor.set_prompt("explode");
    h.editor.submit_prompt().unwrap();

    let outcomes = h.editor.wait_idle(WAIT);
    assert!(matches!(outcomes.as_slice(), [Outcome::EditFailed(_)]), "got {outcomes:?}");
    assert_eq!(h.editor.ui().error.as_ref().unwrap().kind, ErrorKind::Transport);
    assert!(!h.editor.is_busy());
    assert_eq!(h.editor.undo(), Ok(false));

    // The worker is still alive and takes the next request.
    h.editor.submit_prompt().unwrap();
    let outcomes = h.editor.wait_idle(WAIT);
    assert!(matches!(outcomes.as_slice(), [Outcome::EditFailed(_)]), "got {outcomes:?}");
    assert!(!h.editor.is_busy());
}

#[test]
fn test_new_submission_clears_previous_error() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_prompt("first");
    h.editor.submit_prompt().unwrap();
    h.gate
        .send(Err(CollaboratorError::Transport("offline".into())))
        .unwrap();
    h.editor.wait_idle(WAIT);
    assert_eq!(h.editor.ui().error.as_ref().unwrap().kind, ErrorKind::Transport);

    h.editor.submit_prompt().unwrap();
    assert!(h.editor.ui().error.is_none());
    h.gate.send(edited(GREEN)).unwrap();
    h.editor.wait_idle(WAIT);
    assert_eq!(h.editor.history().len(), 2);
}

// ---------------------------------------------------------------------------
// Busy gating
// ---------------------------------------------------------------------------

#[test]
fn test_busy_rejects_conflicting_intents() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.apply_edit("green", GREEN);

    h.editor.set_prompt("blue");
    h.editor.submit_prompt().unwrap();
    assert!(h.editor.is_busy());

    assert_eq!(h.editor.submit_prompt(), Err(Rejected::Busy));
    assert_eq!(
        h.editor.upload(solid_png(4, 4, GREY), "image/png"),
        Err(Rejected::Busy)
    );
    assert_eq!(h.editor.prepare_download(QualityTier::High), Err(Rejected::Busy));
    assert_eq!(h.editor.undo(), Err(Rejected::Busy));
    assert_eq!(h.editor.redo(), Err(Rejected::Busy));
    assert_eq!(h.editor.reset_to_original(), Err(Rejected::Busy));
    assert_eq!(h.editor.clear_session(), Err(Rejected::Busy));
    assert!(!h.editor.can_undo());

    h.gate.send(edited(BLUE)).unwrap();
    h.editor.wait_idle(WAIT);
    assert_eq!(h.editor.history().len(), 3);
    assert!(h.editor.can_undo());
}

#[test]
fn test_edit_lands_after_cursor_when_undone_in_flight() {
    let mut h = HarnessBuilder::new().unlocked_history().build();
    h.load_image(RED);
    h.apply_edit("green", GREEN);

    h.editor.set_prompt("blue");
    h.editor.submit_prompt().unwrap();
    assert_eq!(h.editor.undo(), Ok(true));
    assert_eq!(h.editor.history().cursor(), Some(0));

    h.gate.send(edited(BLUE)).unwrap();
    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes, vec![Outcome::EditApplied { version: 2 }]);

    let versions = h.editor.history().versions();
    assert_eq!(versions, &[png_state(RED), png_state(BLUE)]);
    assert_eq!(h.editor.history().cursor(), Some(1));
    assert!(!h.editor.can_redo());
}

#[test]
fn test_clear_during_flight_discards_result() {
    let mut h = HarnessBuilder::new().unlocked_history().build();
    h.load_image(RED);
    h.editor.set_prompt("green");
    h.editor.submit_prompt().unwrap();

    h.editor.clear_session().unwrap();
    h.gate.send(edited(GREEN)).unwrap();
    let outcomes = h.editor.wait_idle(WAIT);

    assert_eq!(outcomes, vec![Outcome::EditDiscarded]);
    assert!(h.editor.history().is_empty());
    assert!(h.editor.current().is_none());
    h.editor.flush_session();
    assert!(h.persistence().load().is_none());
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[test]
fn test_undo_redo_walk_history() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.apply_edit("green", GREEN);
    h.apply_edit("blue", BLUE);

    assert_eq!(h.editor.undo(), Ok(true));
    assert_eq!(h.editor.current(), Some(&png_state(GREEN)));
    assert_eq!(h.editor.undo(), Ok(true));
    assert_eq!(h.editor.undo(), Ok(false));
    assert_eq!(h.editor.current(), Some(&png_state(RED)));

    assert_eq!(h.editor.redo(), Ok(true));
    assert_eq!(h.editor.redo(), Ok(true));
    assert_eq!(h.editor.redo(), Ok(false));
    assert_eq!(h.editor.current(), Some(&png_state(BLUE)));
}

#[test]
fn test_edit_after_undo_drops_redo_tail() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.apply_edit("green", GREEN);
    h.apply_edit("blue", BLUE);
    h.editor.undo().unwrap();

    h.apply_edit("grey", GREY);
    assert_eq!(
        h.editor.history().versions(),
        &[png_state(RED), png_state(GREEN), png_state(GREY)]
    );
    assert!(!h.editor.can_redo());
}

#[test]
fn test_reset_to_original() {
    let mut h = HarnessBuilder::new().build();
    assert_eq!(h.editor.reset_to_original(), Err(Rejected::NoImage));

    h.load_image(RED);
    h.apply_edit("green", GREEN);
    h.editor.set_zoom(3.0);

    h.editor.reset_to_original().unwrap();
    assert_eq!(h.editor.history().len(), 1);
    assert_eq!(h.editor.current(), Some(&png_state(RED)));
    assert!(h.editor.ui().viewport.is_reset());

    // Idempotent.
    h.editor.reset_to_original().unwrap();
    assert_eq!(h.editor.history().len(), 1);
}

#[test]
fn test_clear_session_resets_everything() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_prompt("pending text");
    h.editor.set_brightness(150);

    h.editor.clear_session().unwrap();
    assert!(h.editor.history().is_empty());
    assert_eq!(h.editor.prompt(), "");
    assert!(h.editor.ui().adjustments.is_neutral());

    h.editor.flush_session();
    assert!(h.persistence().load().is_none());
}

// ---------------------------------------------------------------------------
// Session restore
// ---------------------------------------------------------------------------

#[test]
fn test_new_editor_restores_saved_session() {
    let store = Arc::new(retouch_core::session::MemoryStore::new());
    {
        let h = HarnessBuilder::new().store(store.clone()).build();
        h.persistence().save(&SessionSnapshot {
            image: Some(png_state(GREEN)),
            prompt_text: "add a hat".into(),
        });
    }

    let h = HarnessBuilder::new().store(store).build();
    assert_eq!(h.editor.history().len(), 1);
    assert_eq!(h.editor.current(), Some(&png_state(GREEN)));
    assert_eq!(h.editor.prompt(), "add a hat");
}

#[test]
fn test_new_editor_starts_empty_without_session() {
    let h = HarnessBuilder::new().build();
    assert!(h.editor.history().is_empty());
    assert_eq!(h.editor.prompt(), "");
    assert!(!h.editor.is_busy());
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[test]
fn test_suggestions_fill_slot_and_apply_to_prompt() {
    let mut h = HarnessBuilder::new()
        .suggestions(ScriptedSuggestions::ok(&["add a rainbow", "remove the car", "warmer light"]))
        .build();
    h.load_image(RED);

    h.editor.fetch_suggestions().unwrap();
    assert!(h.editor.ui().suggestions_loading);
    assert_eq!(h.editor.fetch_suggestions(), Err(Rejected::SuggestionsInFlight));

    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes, vec![Outcome::SuggestionsReady(3)]);
    assert!(!h.editor.ui().suggestions_loading);

    h.editor.apply_suggestion(1).unwrap();
    assert_eq!(h.editor.prompt(), "remove the car");
    assert_eq!(h.editor.apply_suggestion(7), Err(Rejected::InvalidIndex));
}

#[test]
fn test_suggestion_failure_uses_fixed_message() {
    let mut h = HarnessBuilder::new()
        .suggestions(ScriptedSuggestions::failing(CollaboratorError::MalformedResponse(
            "response was not a sequence of strings".into(),
        )))
        .build();
    h.load_image(RED);

    h.editor.fetch_suggestions().unwrap();
    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes, vec![Outcome::SuggestionsFailed]);
    assert_eq!(
        h.editor.ui().suggestion_error.as_deref(),
        Some(SUGGESTION_FAILURE_MESSAGE)
    );
    assert!(h.editor.ui().suggestions.is_empty());
    // The main error slot is untouched.
    assert!(h.editor.ui().error.is_none());
}

#[test]
fn test_suggestions_need_an_image() {
    let mut h = HarnessBuilder::new().build();
    assert_eq!(h.editor.fetch_suggestions(), Err(Rejected::NoImage));
}

#[test]
fn test_suggestions_run_alongside_edit() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_prompt("green");
    h.editor.submit_prompt().unwrap();

    h.editor.fetch_suggestions().unwrap();
    // Suggestions complete while the edit is still gated.
    let start = std::time::Instant::now();
    while h.editor.ui().suggestions_loading && start.elapsed() < WAIT {
        h.editor.poll();
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(h.editor.ui().suggestions.len(), 2);
    assert!(h.editor.is_busy());

    h.gate.send(edited(GREEN)).unwrap();
    h.editor.wait_idle(WAIT);
    assert_eq!(h.editor.history().len(), 2);
}

#[test]
fn test_suggestions_for_previous_image_are_dropped() {
    let (model, release) = GatedSuggestions::new();
    let mut h = HarnessBuilder::new().suggestions(model).build();
    h.load_image(RED);
    h.editor.fetch_suggestions().unwrap();

    h.editor.upload(solid_png(4, 4, BLUE), "image/png").unwrap();
    let start = std::time::Instant::now();
    while h.editor.is_busy() && start.elapsed() < WAIT {
        h.editor.poll();
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(h.editor.history().len(), 1);
    assert!(h.editor.ui().suggestions_loading);

    release.send(vec!["make the red car blue".into()]).unwrap();
    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes, vec![Outcome::SuggestionsReady(0)]);
    assert!(h.editor.ui().suggestions.is_empty());
    assert!(!h.editor.ui().suggestions_loading);

    // A fresh request for the new image lands normally.
    h.editor.fetch_suggestions().unwrap();
    release.send(vec!["add clouds".into()]).unwrap();
    h.editor.wait_idle(WAIT);
    assert_eq!(h.editor.ui().suggestions, vec!["add clouds".to_string()]);
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

#[test]
fn test_adjustments_clamp_and_reset() {
    let mut h = HarnessBuilder::new().build();
    h.editor.set_brightness(500);
    h.editor.set_contrast(40);
    assert_eq!(h.editor.ui().adjustments.brightness, 200);
    assert_eq!(h.editor.ui().adjustments.contrast, 40);

    h.editor.reset_adjustments();
    assert!(h.editor.ui().adjustments.is_neutral());
}

#[test]
fn test_zoom_and_pan() {
    let mut h = HarnessBuilder::new().build();
    h.editor.pan(10.0, 10.0);
    assert_eq!(h.editor.ui().viewport.offset_x, 0.0);

    h.editor.zoom_by(2.0);
    h.editor.pan(10.0, -5.0);
    assert_eq!(h.editor.ui().viewport.scale, 2.0);
    assert_eq!(h.editor.ui().viewport.offset_x, 10.0);
    assert_eq!(h.editor.ui().viewport.offset_y, -5.0);

    h.editor.set_zoom(50.0);
    assert_eq!(h.editor.ui().viewport.scale, 10.0);
    h.editor.set_zoom(0.2);
    assert_eq!(h.editor.ui().viewport.scale, 1.0);
    assert_eq!(h.editor.ui().viewport.offset_x, 0.0);
}

#[test]
fn test_submit_resets_view() {
    let mut h = HarnessBuilder::new().build();
    h.load_image(RED);
    h.editor.set_zoom(4.0);
    h.editor.set_brightness(150);

    h.editor.set_prompt("green");
    h.editor.submit_prompt().unwrap();
    assert!(h.editor.ui().viewport.is_reset());
    assert!(h.editor.ui().adjustments.is_neutral());

    h.gate.send(edited(GREEN)).unwrap();
    h.editor.wait_idle(WAIT);
}

#[test]
fn test_compare_shows_original() {
    let mut h = HarnessBuilder::new().build();
    assert!(!h.editor.toggle_compare());

    h.load_image(RED);
    h.apply_edit("green", GREEN);
    assert_eq!(h.editor.displayed(), Some(&png_state(GREEN)));

    assert!(h.editor.toggle_compare());
    assert_eq!(h.editor.displayed(), Some(&png_state(RED)));
    assert!(!h.editor.toggle_compare());
    assert_eq!(h.editor.displayed(), Some(&png_state(GREEN)));
}

// ---------------------------------------------------------------------------
// Download and share
// ---------------------------------------------------------------------------

struct RecordingShare(Mutex<Vec<String>>);

impl ShareTarget for RecordingShare {
    fn share(&self, _image: &ImageState, file_name: &str) -> Result<(), ShareError> {
        self.0.lock().unwrap().push(file_name.to_string());
        Ok(())
    }
}

#[test]
fn test_prepare_download_produces_pending_export() {
    let mut h = HarnessBuilder::new().build();
    assert_eq!(h.editor.prepare_download(QualityTier::Low), Err(Rejected::NoImage));

    h.load_image(GREY);
    h.editor.prepare_download(QualityTier::Low).unwrap();
    assert_eq!(h.editor.ui().loading, Some(LoadingStage::PreparingDownload));

    let outcomes = h.editor.wait_idle(WAIT);
    assert_eq!(outcomes, vec![Outcome::DownloadReady { tier: QualityTier::Low }]);

    let pending = h.editor.take_download().unwrap();
    assert_eq!(pending.tier, QualityTier::Low);
    assert_eq!(pending.image.media_type(), "image/jpeg");
    assert!(h.editor.take_download().is_none());
    // Exporting never touches history.
    assert_eq!(h.editor.history().len(), 1);
}

#[test]
fn test_share_unsupported_keeps_export() {
    let mut h = HarnessBuilder::new().build();
    assert_eq!(
        h.editor.share_download(&NoShare, "edit.jpg"),
        Err(Rejected::NothingToShare)
    );

    h.load_image(GREY);
    h.editor.prepare_download(QualityTier::Medium).unwrap();
    h.editor.wait_idle(WAIT);

    assert_eq!(h.editor.share_download(&NoShare, "edit.jpg"), Ok(false));
    let err = h.editor.ui().error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::Unsupported);
    assert_eq!(err.message, SHARE_UNSUPPORTED_MESSAGE);
    assert!(h.editor.ui().pending_download.is_some());

    let target = RecordingShare(Mutex::new(Vec::new()));
    assert_eq!(h.editor.share_download(&target, "edit.jpg"), Ok(true));
    assert_eq!(*target.0.lock().unwrap(), vec!["edit.jpg".to_string()]);
    assert!(h.editor.ui().pending_download.is_none());
    assert!(h.editor.ui().error.is_none());
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

#[test]
fn test_voice_unsupported() {
    let mut h = HarnessBuilder::new().build();
    assert_eq!(
        h.editor.start_voice(VoiceInput::default()),
        Err(Rejected::VoiceUnavailable)
    );
    assert_eq!(h.editor.ui().voice_error.as_deref(), Some(VOICE_UNSUPPORTED_MESSAGE));
    assert!(!h.editor.ui().voice_active);
    // Stopping with nothing running is harmless.
    h.editor.stop_voice();
}

#[test]
fn test_voice_replace_mode() {
    let (speech, handle) = ScriptedSpeech::new();
    let mut h = HarnessBuilder::new().speech(speech).build();
    h.editor.set_prompt("old text");

    h.editor.start_voice(VoiceInput::default()).unwrap();
    assert!(h.editor.ui().voice_active);
    assert_eq!(
        h.editor.start_voice(VoiceInput::default()),
        Err(Rejected::VoiceActive)
    );

    handle.send(TranscriptEvent::Interim("make".into()));
    let outcomes = h.editor.poll();
    assert_eq!(outcomes, vec![Outcome::PromptDictated { is_final: false }]);
    assert_eq!(h.editor.prompt(), "make");

    handle.send(TranscriptEvent::Final("make it warm".into()));
    h.editor.poll();
    assert_eq!(h.editor.prompt(), "make it warm");
    assert!(h.editor.ui().voice_active);

    h.editor.stop_voice();
    assert!(!h.editor.ui().voice_active);
    assert!(!handle.is_running());
}

#[test]
fn test_voice_append_mode() {
    let (speech, handle) = ScriptedSpeech::new();
    let mut h = HarnessBuilder::new().speech(speech).build();
    h.editor.set_prompt("brighten the sky");

    h.editor
        .start_voice(VoiceInput {
            mode: VoiceMode::Append,
            submit_on_final: false,
        })
        .unwrap();
    handle.send(TranscriptEvent::Interim("and".into()));
    h.editor.poll();
    assert_eq!(h.editor.prompt(), "brighten the sky and");

    handle.send(TranscriptEvent::Final("and crop it".into()));
    handle.send(TranscriptEvent::Final("tightly".into()));
    h.editor.poll();
    assert_eq!(h.editor.prompt(), "brighten the sky and crop it tightly");
}

#[test]
fn test_voice_submit_on_final() {
    let (speech, handle) = ScriptedSpeech::new();
    let mut h = HarnessBuilder::new().speech(speech).build();
    h.load_image(RED);

    h.editor
        .start_voice(VoiceInput {
            mode: VoiceMode::Replace,
            submit_on_final: true,
        })
        .unwrap();
    handle.send(TranscriptEvent::Final("make it green".into()));
    let outcomes = h.editor.poll();

    assert_eq!(
        outcomes,
        vec![
            Outcome::PromptDictated { is_final: true },
            Outcome::VoiceEnded,
            Outcome::EditSubmitted,
        ]
    );
    assert!(h.editor.is_busy());
    assert!(!h.editor.ui().voice_active);
    assert!(!handle.is_running());

    h.gate.send(edited(GREEN)).unwrap();
    h.editor.wait_idle(WAIT);
    assert_eq!(h.editor.history().len(), 2);
    assert_eq!(h.edit_model.requests()[0].instruction, "make it green");
}

#[test]
fn test_voice_submit_without_image_is_rejected() {
    let (speech, handle) = ScriptedSpeech::new();
    let mut h = HarnessBuilder::new().speech(speech).build();

    h.editor
        .start_voice(VoiceInput {
            mode: VoiceMode::Replace,
            submit_on_final: true,
        })
        .unwrap();
    handle.send(TranscriptEvent::Final("add a hat".into()));
    let outcomes = h.editor.poll();

    assert!(outcomes.contains(&Outcome::SubmitRejected(Rejected::NoImage)));
    assert_eq!(h.editor.prompt(), "add a hat");
    assert!(!h.editor.is_busy());
}

#[test]
fn test_voice_error_ends_session() {
    let (speech, handle) = ScriptedSpeech::new();
    let mut h = HarnessBuilder::new().speech(speech).build();

    h.editor.start_voice(VoiceInput::default()).unwrap();
    handle.send(TranscriptEvent::Error("microphone unplugged".into()));
    let outcomes = h.editor.poll();

    assert_eq!(outcomes, vec![Outcome::VoiceFailed("microphone unplugged".into())]);
    assert!(!h.editor.ui().voice_active);
    assert_eq!(h.editor.ui().voice_error.as_deref(), Some("microphone unplugged"));

    // A fresh session can start afterwards.
    h.editor.start_voice(VoiceInput::default()).unwrap();
    assert_eq!(handle.starts(), 2);
    assert!(h.editor.ui().voice_error.is_none());
}

#[test]
fn test_voice_ended_by_capture() {
    let (speech, handle) = ScriptedSpeech::new();
    let mut h = HarnessBuilder::new().speech(speech).build();

    h.editor.start_voice(VoiceInput::default()).unwrap();
    handle.send(TranscriptEvent::Ended);
    assert_eq!(h.editor.poll(), vec![Outcome::VoiceEnded]);
    assert!(!h.editor.ui().voice_active);
}

#[test]
fn test_clear_session_stops_voice() {
    let (speech, handle) = ScriptedSpeech::new();
    let mut h = HarnessBuilder::new().speech(speech).build();
    h.editor.start_voice(VoiceInput::default()).unwrap();

    h.editor.clear_session().unwrap();
    assert!(!h.editor.ui().voice_active);
    assert!(!handle.is_running());
}
