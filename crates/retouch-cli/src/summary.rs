use std::fmt::Display;
use std::path::Path;

use console::Style;
use retouch_core::editor::{Editor, EditorError, Outcome, Rejected};
use retouch_core::image_state::ImageState;
use retouch_core::prefs::{Preferences, Theme};
use retouch_core::session::SessionSnapshot;

pub struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    ok: Style,
    warn: Style,
    error: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    pub fn new(theme: Theme) -> Self {
        let value = match theme {
            Theme::Light => Style::new().bold().black(),
            Theme::Dark => Style::new().bold().white(),
        };
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value,
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            error: Style::new().red().bold(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn image_line(image: Option<&ImageState>) -> String {
    match image {
        Some(img) => format!("{} ({:.1} KB)", img.media_type(), img.byte_len() as f64 / 1024.0),
        None => "none".to_string(),
    }
}

fn quoted(text: &str) -> String {
    if text.is_empty() {
        "(empty)".to_string()
    } else {
        format!("\"{text}\"")
    }
}

pub fn print_status(s: &Styles, editor: &Editor) {
    let ui = editor.ui();
    let history = editor.history();

    println!();
    println!("  {}", s.title.apply_to("Retouch Session"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(15)));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Image"),
        s.value.apply_to(image_line(editor.current()))
    );
    match history.cursor() {
        Some(cursor) => println!(
            "  {:<14}{}",
            s.label.apply_to("Version"),
            s.value.apply_to(format!("{} of {}", cursor + 1, history.len()))
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Version"),
            s.disabled.apply_to("no image loaded")
        ),
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Prompt"),
        s.value.apply_to(quoted(editor.prompt()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Undo / Redo"),
        s.value.apply_to(format!(
            "{} / {}",
            yes_no(editor.can_undo()),
            yes_no(editor.can_redo())
        ))
    );
    if let Some(label) = ui.loading_label() {
        println!("  {:<14}{}", s.label.apply_to("Working"), s.warn.apply_to(label));
    }
    println!();

    println!("  {}", s.header.apply_to("View"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Brightness"),
        s.value.apply_to(format!("{}%", ui.adjustments.brightness))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Contrast"),
        s.value.apply_to(format!("{}%", ui.adjustments.contrast))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Zoom"),
        s.value.apply_to(format!(
            "{:.1}x at ({:.0}, {:.0})",
            ui.viewport.scale, ui.viewport.offset_x, ui.viewport.offset_y
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Showing"),
        s.value
            .apply_to(if ui.comparing { "original" } else { "current" })
    );
    println!();

    if !ui.suggestions.is_empty() || ui.suggestions_loading || ui.suggestion_error.is_some() {
        println!("  {}", s.header.apply_to("Suggestions"));
        if ui.suggestions_loading {
            println!("    {}", s.disabled.apply_to("loading…"));
        }
        print_suggestion_list(s, &ui.suggestions);
        if let Some(msg) = &ui.suggestion_error {
            println!("    {}", s.warn.apply_to(msg));
        }
        println!();
    }

    if ui.voice_active {
        println!("  {:<14}{}", s.label.apply_to("Voice"), s.ok.apply_to("listening"));
    }
    if let Some(msg) = &ui.voice_error {
        println!("  {:<14}{}", s.label.apply_to("Voice"), s.warn.apply_to(msg));
    }
    if let Some(pending) = &ui.pending_download {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Export"),
            s.value
                .apply_to(format!("{} ready ({})", image_line(Some(&pending.image)), pending.tier))
        );
    }
    if let Some(err) = &ui.error {
        print_error(s, err);
    }
}

pub fn print_snapshot(s: &Styles, snapshot: Option<&SessionSnapshot>, dir: &Path, prefs: &Preferences) {
    println!();
    println!("  {}", s.title.apply_to("Saved Session"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(13)));
    println!("  {:<14}{}", s.label.apply_to("Location"), s.path.apply_to(dir.display()));
    match snapshot {
        Some(snap) => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Image"),
                s.value.apply_to(image_line(snap.image.as_ref()))
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("Prompt"),
                s.value.apply_to(quoted(&snap.prompt_text))
            );
        }
        None => println!("  {:<14}{}", s.label.apply_to("Session"), s.disabled.apply_to("none")),
    }
    println!("  {:<14}{}", s.label.apply_to("Theme"), s.value.apply_to(prefs.theme()));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Tutorial"),
        s.value.apply_to(if prefs.tutorial_seen() { "seen" } else { "not seen" })
    );
    println!();
}

pub fn print_suggestion_list(s: &Styles, suggestions: &[String]) {
    for (i, text) in suggestions.iter().enumerate() {
        println!("    {} {}", s.label.apply_to(format!("{}.", i + 1)), s.value.apply_to(text));
    }
}

pub fn print_error(s: &Styles, err: &EditorError) {
    println!(
        "  {} {}",
        s.error.apply_to(format!("{}:", err.kind)),
        err.message
    );
}

pub fn print_rejected(s: &Styles, reason: Rejected) {
    println!("  {} {}", s.warn.apply_to("Not now:"), reason);
}

pub fn print_warning(s: &Styles, msg: impl Display) {
    println!("  {}", s.warn.apply_to(msg));
}

pub fn print_failure(s: &Styles, err: &anyhow::Error) {
    println!("  {} {err:#}", s.error.apply_to("Error:"));
}

/// One line describing an applied result, or `None` when it needs no output.
pub fn describe_outcome(s: &Styles, outcome: &Outcome) -> Option<String> {
    let line = match outcome {
        Outcome::ImageLoaded => format!("{} Image loaded", s.ok.apply_to("✓")),
        Outcome::EditApplied { version } => {
            format!("{} Edit applied (version {version})", s.ok.apply_to("✓"))
        }
        Outcome::EditDiscarded => format!(
            "{} Edit finished after the session was cleared; discarded",
            s.disabled.apply_to("·")
        ),
        Outcome::UploadFailed(err) | Outcome::EditFailed(err) | Outcome::DownloadFailed(err) => {
            format!("{} {}", s.error.apply_to(format!("{}:", err.kind)), err.message)
        }
        Outcome::SuggestionsReady(count) => {
            format!("{} {count} suggestion(s); `use N` to copy one", s.ok.apply_to("✓"))
        }
        Outcome::SuggestionsFailed => return None,
        Outcome::DownloadReady { tier } => {
            format!("{} Export ready ({tier})", s.ok.apply_to("✓"))
        }
        Outcome::PromptDictated { .. } => return None,
        Outcome::EditSubmitted => format!("{} Prompt submitted by voice", s.ok.apply_to("✓")),
        Outcome::SubmitRejected(reason) => format!("{} {reason}", s.warn.apply_to("Not submitted:")),
        Outcome::VoiceEnded => format!("{} Voice input stopped", s.disabled.apply_to("·")),
        Outcome::VoiceFailed(msg) => format!("{} {msg}", s.warn.apply_to("Voice:")),
    };
    Some(line)
}

pub fn print_tutorial(s: &Styles) {
    println!();
    println!("  {}", s.title.apply_to("Welcome to Retouch"));
    println!();
    println!("  1. {} an image:        {}", s.header.apply_to("Open"), s.value.apply_to("open photo.jpg"));
    println!("  2. {} an edit:      {}", s.header.apply_to("Describe"), s.value.apply_to("edit add a sunset"));
    println!("  3. {} through versions: {}", s.header.apply_to("Step"), s.value.apply_to("undo / redo / reset"));
    println!("  4. {} the result:    {}", s.header.apply_to("Export"), s.value.apply_to("export out.jpg high"));
    println!();
    println!("  Type {} for every command. Your session is saved as you go.", s.value.apply_to("help"));
    println!();
}

pub fn print_help(s: &Styles) {
    let rows: &[(&str, &str)] = &[
        ("open PATH", "load an image (starts a new history)"),
        ("prompt TEXT", "set the prompt"),
        ("edit TEXT", "set the prompt and submit it"),
        ("submit", "send the current prompt"),
        ("undo / redo", "step through versions"),
        ("reset", "go back to the original"),
        ("clear", "start over with an empty session"),
        ("suggest", "ask for edit ideas"),
        ("use N", "copy suggestion N into the prompt"),
        ("brightness N", "export brightness, 0-200 (100 = unchanged)"),
        ("contrast N", "export contrast, 0-200 (100 = unchanged)"),
        ("zoom F / pan DX DY", "inspect the image"),
        ("view-reset", "reset zoom and pan"),
        ("compare", "toggle showing the original"),
        ("export PATH [low|medium|high]", "save the current version"),
        ("share [low|medium|high]", "send the current version to the share command"),
        ("voice [append] [submit]", "dictate the prompt"),
        ("stop", "stop dictation"),
        ("wait", "wait for running work to finish"),
        ("status", "show the session"),
        ("theme", "toggle light/dark output"),
        ("quit", "leave (the session is kept)"),
    ];
    println!();
    for (cmd, what) in rows {
        println!("  {:<32}{}", s.value.apply_to(cmd), s.label.apply_to(what));
    }
    println!();
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}
