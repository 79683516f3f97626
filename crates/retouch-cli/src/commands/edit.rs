use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Args;
use retouch_core::config::RetouchConfig;
use retouch_core::editor::Editor;
use retouch_core::session::{MemoryStore, SessionPersistence, Store};

use super::QualityArg;
use crate::context;
use crate::progress::{ensure_no_error, wait_with_spinner};

#[derive(Args)]
pub struct EditArgs {
    /// Input image
    pub file: PathBuf,

    /// Edit instruction sent to the model
    #[arg(short, long)]
    pub prompt: String,

    /// Output path (defaults to <input>-edited.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export quality tier
    #[arg(long, value_enum, default_value = "high")]
    pub quality: QualityArg,

    /// Brightness applied on export, in percent
    #[arg(long, default_value = "100")]
    pub brightness: u32,

    /// Contrast applied on export, in percent
    #[arg(long, default_value = "100")]
    pub contrast: u32,
}

/// One-shot edit. Runs in memory and leaves the saved session alone.
pub fn run(args: &EditArgs, config: &RetouchConfig) -> Result<()> {
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

    editor.set_prompt(args.prompt.as_str());
    editor
        .submit_prompt()
        .map_err(|r| anyhow!("Cannot submit prompt: {r}"))?;
    wait_with_spinner(&mut editor, timeout)?;
    ensure_no_error(&editor)?;

    editor.set_brightness(args.brightness);
    editor.set_contrast(args.contrast);
    editor
        .prepare_download(args.quality.into())
        .map_err(|r| anyhow!("Cannot export: {r}"))?;
    wait_with_spinner(&mut editor, timeout)?;
    ensure_no_error(&editor)?;

    let pending = editor
        .take_download()
        .ok_or_else(|| anyhow!("Export produced no image"))?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.file));
    let written = context::write_export(
        &output,
        &pending.image.to_bytes()?,
        pending.image.file_extension(),
    )?;

    println!("Edited image saved to {}", written.display());
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}-edited"))
}
