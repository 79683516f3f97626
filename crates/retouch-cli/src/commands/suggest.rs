use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use retouch_core::config::RetouchConfig;
use retouch_core::editor::Editor;
use retouch_core::prefs::Theme;
use retouch_core::session::{MemoryStore, SessionPersistence, Store};

use crate::context;
use crate::progress::{ensure_no_error, wait_with_spinner};
use crate::summary::{print_suggestion_list, Styles};

#[derive(Args)]
pub struct SuggestArgs {
    /// Input image
    pub file: PathBuf,
}

pub fn run(args: &SuggestArgs, config: &RetouchConfig) -> Result<()> {
    let (bytes, media_type) = context::read_image(&args.file)?;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut editor = Editor::new(
        config,
        context::collaborators(config, false)?,
        SessionPersistence::new(store),
    )?;
    let timeout = context::model_timeout(config);

    editor
        .upload(bytes, media_type)
        .map_err(|r| anyhow!("Cannot load image: {r}"))?;
    wait_with_spinner(&mut editor, timeout)?;
    ensure_no_error(&editor)?;

    editor
        .fetch_suggestions()
        .map_err(|r| anyhow!("Cannot fetch suggestions: {r}"))?;
    wait_with_spinner(&mut editor, timeout)?;

    if let Some(msg) = &editor.ui().suggestion_error {
        bail!("{msg}");
    }
    let suggestions = &editor.ui().suggestions;
    if suggestions.is_empty() {
        println!("No suggestions for {}", args.file.display());
    } else {
        print_suggestion_list(&Styles::new(Theme::default()), suggestions);
    }
    Ok(())
}
