use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use retouch_core::editor::{Editor, Outcome};

const TICK: Duration = Duration::from_millis(100);

pub fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} {elapsed:.dim}")?);
    pb.enable_steady_tick(TICK);
    Ok(pb)
}

/// What the spinner should say for the editor's current activity.
pub fn activity_label(editor: &Editor) -> Option<String> {
    editor.ui().loading_label().or_else(|| {
        editor
            .ui()
            .suggestions_loading
            .then(|| "Fetching suggestions…".to_string())
    })
}

/// Block with a spinner until the editor is idle. Fails on timeout.
pub fn wait_with_spinner(editor: &mut Editor, timeout: Duration) -> Result<Vec<Outcome>> {
    let pb = spinner()?;
    let deadline = Instant::now() + timeout;
    let mut outcomes = Vec::new();

    while let Some(label) = activity_label(editor) {
        if Instant::now() >= deadline {
            pb.finish_and_clear();
            bail!("Timed out: {label}");
        }
        pb.set_message(label);
        outcomes.extend(editor.wait_idle(TICK));
    }

    pb.finish_and_clear();
    Ok(outcomes)
}

/// Turn the editor's main error slot into a command failure.
pub fn ensure_no_error(editor: &Editor) -> Result<()> {
    match &editor.ui().error {
        Some(err) => bail!("{}: {}", err.kind, err.message),
        None => Ok(()),
    }
}
