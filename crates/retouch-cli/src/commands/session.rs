use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Result;
use clap::{Args, ValueEnum};
use indicatif::ProgressBar;
use retouch_core::config::RetouchConfig;
use retouch_core::editor::{Editor, Outcome, Rejected};
use retouch_core::prefs::{Preferences, Theme};
use retouch_core::session::SessionPersistence;
use retouch_core::share::ShareTarget;
use retouch_core::transform::QualityTier;
use retouch_core::voice::{VoiceInput, VoiceMode};
use tracing::{debug, warn};

use super::QualityArg;
use crate::context;
use crate::progress::{activity_label, spinner, wait_with_spinner};
use crate::summary::{
    describe_outcome, print_error, print_failure, print_help, print_rejected, print_status,
    print_suggestion_list, print_tutorial, print_warning, Styles,
};

const TICK: Duration = Duration::from_millis(100);

/// Base name handed to the share target; the extension follows the export.
const SHARE_FILE_STEM: &str = "retouch-edit";

#[derive(Args)]
pub struct SessionArgs {
    /// Session directory (defaults to the user data dir)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

/// One line of user input.
#[derive(Debug, PartialEq)]
enum Command {
    Empty,
    Open(PathBuf),
    Prompt(String),
    Edit(String),
    Submit,
    Undo,
    Redo,
    Reset,
    Clear,
    Suggest,
    /// Zero-based suggestion index.
    Use(usize),
    Brightness(u32),
    Contrast(u32),
    Zoom(f32),
    Pan(f32, f32),
    ViewReset,
    Compare,
    Export(PathBuf, QualityTier),
    Share(QualityTier),
    Voice(VoiceInput),
    Stop,
    Wait,
    Status,
    Theme,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match word {
        "" => Command::Empty,
        "open" if !rest.is_empty() => Command::Open(PathBuf::from(rest)),
        "open" => return Err("usage: open PATH".into()),
        "prompt" => Command::Prompt(rest.to_string()),
        "edit" if !rest.is_empty() => Command::Edit(rest.to_string()),
        "edit" => return Err("usage: edit TEXT".into()),
        "submit" => Command::Submit,
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "reset" => Command::Reset,
        "clear" => Command::Clear,
        "suggest" => Command::Suggest,
        "use" => match rest.parse::<usize>() {
            Ok(n) if n > 0 => Command::Use(n - 1),
            _ => return Err("usage: use N (N starts at 1)".into()),
        },
        "brightness" => Command::Brightness(parse_number(rest, "brightness N")?),
        "contrast" => Command::Contrast(parse_number(rest, "contrast N")?),
        "zoom" => Command::Zoom(parse_number(rest, "zoom F")?),
        "pan" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(dx), Some(dy), None) => {
                    Command::Pan(parse_number(dx, "pan DX DY")?, parse_number(dy, "pan DX DY")?)
                }
                _ => return Err("usage: pan DX DY".into()),
            }
        }
        "view-reset" => Command::ViewReset,
        "compare" => Command::Compare,
        "export" => {
            let mut parts = rest.split_whitespace();
            let path = parts
                .next()
                .ok_or_else(|| "usage: export PATH [low|medium|high]".to_string())?;
            let tier = parse_tier(parts.next())?;
            Command::Export(PathBuf::from(path), tier)
        }
        "share" => Command::Share(parse_tier(rest.split_whitespace().next())?),
        "voice" => {
            let mut input = VoiceInput::default();
            for flag in rest.split_whitespace() {
                match flag {
                    "append" => input.mode = VoiceMode::Append,
                    "replace" => input.mode = VoiceMode::Replace,
                    "submit" => input.submit_on_final = true,
                    other => return Err(format!("unknown voice option `{other}`")),
                }
            }
            Command::Voice(input)
        }
        "stop" => Command::Stop,
        "wait" => Command::Wait,
        "status" => Command::Status,
        "theme" => Command::Theme,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command `{other}` (try `help`)")),
    };
    Ok(cmd)
}

fn parse_number<T: std::str::FromStr>(text: &str, usage: &str) -> Result<T, String> {
    text.trim().parse().map_err(|_| format!("usage: {usage}"))
}

fn parse_tier(text: Option<&str>) -> Result<QualityTier, String> {
    match text {
        None => Ok(QualityTier::default()),
        Some(t) => QualityArg::from_str(t, true)
            .map(QualityTier::from)
            .map_err(|_| format!("unknown quality `{t}` (low, medium, high)")),
    }
}

/// Where a prepared export goes once it arrives.
enum ExportTarget {
    Save(PathBuf),
    Share,
}

enum Flow {
    Continue,
    Quit,
}

struct SessionLoop {
    editor: Editor,
    prefs: Preferences,
    styles: Styles,
    share: Box<dyn ShareTarget>,
    export: Option<ExportTarget>,
    spinner: Option<ProgressBar>,
    timeout: Duration,
}

pub fn run(args: &SessionArgs, config: &RetouchConfig) -> Result<()> {
    let dir = context::state_dir(args.state_dir.as_deref())?;
    let store = context::open_store(&dir)?;
    let mut prefs = Preferences::load(store.clone(), Theme::default());
    let editor = Editor::new(
        config,
        context::collaborators(config, true)?,
        SessionPersistence::new(store),
    )?;
    let styles = Styles::new(prefs.theme());

    if !prefs.tutorial_seen() {
        print_tutorial(&styles);
        prefs.mark_tutorial_seen();
    }
    if editor.current().is_some() {
        print_status(&styles, &editor);
    } else {
        println!("  Type `help` for commands.");
    }

    let mut session = SessionLoop {
        editor,
        prefs,
        styles,
        share: context::share_target(config),
        export: None,
        spinner: None,
        timeout: context::model_timeout(config),
    };
    let lines = spawn_reader()?;

    loop {
        match lines.recv_timeout(TICK) {
            Ok(line) => {
                session.hide_spinner();
                match parse_command(&line) {
                    Ok(cmd) => {
                        if let Flow::Quit = session.execute(cmd)? {
                            break;
                        }
                    }
                    Err(usage) => print_warning(&session.styles, usage),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Input closed: let running work land before leaving.
                session.hide_spinner();
                session.wait()?;
                break;
            }
        }
        let outcomes = session.editor.poll();
        session.report(outcomes);
        session.update_spinner()?;
    }

    session.hide_spinner();
    session.editor.stop_voice();
    session.editor.flush_session();
    debug!(dir = %dir.display(), "Session saved");
    Ok(())
}

fn spawn_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("retouch-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

impl SessionLoop {
    fn execute(&mut self, cmd: Command) -> Result<Flow> {
        let s = &self.styles;
        match cmd {
            Command::Empty => {}
            Command::Open(path) => match context::read_image(&path) {
                Ok((bytes, media_type)) => {
                    let result = self.editor.upload(bytes, media_type);
                    self.rejected(result);
                }
                Err(e) => print_failure(s, &e),
            },
            Command::Prompt(text) => self.editor.set_prompt(text),
            Command::Edit(text) => {
                self.editor.set_prompt(text);
                let result = self.editor.submit_prompt();
                self.rejected(result);
            }
            Command::Submit => {
                let result = self.editor.submit_prompt();
                self.rejected(result);
            }
            Command::Undo => {
                let result = self.editor.undo();
                self.stepped(result, "Nothing to undo");
            }
            Command::Redo => {
                let result = self.editor.redo();
                self.stepped(result, "Nothing to redo");
            }
            Command::Reset => {
                let result = self.editor.reset_to_original();
                if self.rejected(result).is_some() {
                    println!("  Back to the original");
                }
            }
            Command::Clear => {
                let result = self.editor.clear_session();
                if self.rejected(result).is_some() {
                    self.export = None;
                    println!("  Session cleared");
                }
            }
            Command::Suggest => {
                let result = self.editor.fetch_suggestions();
                self.rejected(result);
            }
            Command::Use(index) => {
                let result = self.editor.apply_suggestion(index);
                if self.rejected(result).is_some() {
                    println!("  Prompt: \"{}\"", self.editor.prompt());
                }
            }
            Command::Brightness(pct) => {
                self.editor.set_brightness(pct);
                println!("  Brightness {}%", self.editor.ui().adjustments.brightness);
            }
            Command::Contrast(pct) => {
                self.editor.set_contrast(pct);
                println!("  Contrast {}%", self.editor.ui().adjustments.contrast);
            }
            Command::Zoom(scale) => {
                self.editor.set_zoom(scale);
                println!("  Zoom {:.1}x", self.editor.ui().viewport.scale);
            }
            Command::Pan(dx, dy) => {
                self.editor.pan(dx, dy);
                let vp = self.editor.ui().viewport;
                println!("  Offset ({:.0}, {:.0})", vp.offset_x, vp.offset_y);
            }
            Command::ViewReset => {
                self.editor.reset_view();
                println!("  View reset");
            }
            Command::Compare => {
                if self.editor.toggle_compare() {
                    println!("  Showing the original");
                } else {
                    println!("  Showing the current version");
                }
            }
            Command::Export(path, tier) => {
                let result = self.editor.prepare_download(tier);
                if self.rejected(result).is_some() {
                    self.export = Some(ExportTarget::Save(path));
                }
            }
            Command::Share(tier) => {
                let result = self.editor.prepare_download(tier);
                if self.rejected(result).is_some() {
                    self.export = Some(ExportTarget::Share);
                }
            }
            Command::Voice(input) => match self.editor.start_voice(input) {
                Ok(()) => println!("  Listening… (`stop` to finish)"),
                Err(Rejected::VoiceUnavailable) => {
                    let msg = self.editor.ui().voice_error.clone().unwrap_or_default();
                    print_warning(s, msg);
                }
                Err(reason) => print_rejected(s, reason),
            },
            Command::Stop => self.editor.stop_voice(),
            Command::Wait => self.wait()?,
            Command::Status => print_status(s, &self.editor),
            Command::Theme => {
                let theme = self.prefs.toggle_theme();
                self.styles = Styles::new(theme);
                println!("  Theme: {theme}");
            }
            Command::Help => print_help(s),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Print a refusal; `Some` when the intent was accepted.
    fn rejected<T>(&self, result: std::result::Result<T, Rejected>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(reason) => {
                print_rejected(&self.styles, reason);
                None
            }
        }
    }

    fn stepped(&self, result: std::result::Result<bool, Rejected>, idle: &str) {
        match self.rejected(result) {
            Some(true) => {
                let history = self.editor.history();
                if let Some(cursor) = history.cursor() {
                    println!("  Version {} of {}", cursor + 1, history.len());
                }
            }
            Some(false) => println!("  {idle}"),
            None => {}
        }
    }

    fn wait(&mut self) -> Result<()> {
        match wait_with_spinner(&mut self.editor, self.timeout) {
            Ok(outcomes) => self.report(outcomes),
            Err(e) => print_failure(&self.styles, &e),
        }
        Ok(())
    }

    fn report(&mut self, outcomes: Vec<Outcome>) {
        for outcome in outcomes {
            if let Some(line) = describe_outcome(&self.styles, &outcome) {
                self.say(line);
            }
            match outcome {
                Outcome::SuggestionsReady(n) if n > 0 => {
                    self.suspended(|this| print_suggestion_list(&this.styles, &this.editor.ui().suggestions));
                }
                Outcome::SuggestionsFailed => {
                    if let Some(msg) = self.editor.ui().suggestion_error.clone() {
                        self.suspended(|this| print_warning(&this.styles, &msg));
                    }
                }
                Outcome::PromptDictated { is_final: true } => {
                    self.say(format!("  Prompt: \"{}\"", self.editor.prompt()));
                }
                Outcome::DownloadReady { .. } => self.deliver_export(),
                Outcome::DownloadFailed(_) => self.export = None,
                _ => {}
            }
        }
    }

    fn deliver_export(&mut self) {
        match self.export.take() {
            Some(ExportTarget::Save(path)) => {
                let Some(download) = self.editor.take_download() else {
                    return;
                };
                let written = download
                    .image
                    .to_bytes()
                    .map_err(anyhow::Error::from)
                    .and_then(|bytes| {
                        context::write_export(&path, &bytes, download.image.file_extension())
                    });
                match written {
                    Ok(path) => self.say(format!("  Saved {}", path.display())),
                    Err(e) => self.suspended(|this| print_failure(&this.styles, &e)),
                }
            }
            Some(ExportTarget::Share) => {
                let Some(extension) = self
                    .editor
                    .ui()
                    .pending_download
                    .as_ref()
                    .map(|d| d.image.file_extension())
                else {
                    return;
                };
                let file_name = format!("{SHARE_FILE_STEM}.{extension}");
                match self.editor.share_download(self.share.as_ref(), &file_name) {
                    Ok(true) => self.say("  Shared".to_string()),
                    Ok(false) => {
                        if let Some(err) = self.editor.ui().error.clone() {
                            self.suspended(|this| print_error(&this.styles, &err));
                        }
                    }
                    Err(reason) => self.suspended(|this| print_rejected(&this.styles, reason)),
                }
            }
            None => {}
        }
    }

    fn say(&self, line: String) {
        match &self.spinner {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
    }

    fn suspended(&self, f: impl FnOnce(&Self)) {
        match &self.spinner {
            Some(pb) => pb.suspend(|| f(self)),
            None => f(self),
        }
    }

    fn update_spinner(&mut self) -> Result<()> {
        match activity_label(&self.editor) {
            Some(label) => {
                if self.spinner.is_none() {
                    self.spinner = Some(spinner()?);
                }
                if let Some(pb) = &self.spinner {
                    pb.set_message(label);
                }
            }
            None => self.hide_spinner(),
        }
        Ok(())
    }

    fn hide_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}
