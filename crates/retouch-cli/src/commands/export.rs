use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use retouch_core::config::RetouchConfig;
use retouch_core::session::SessionPersistence;
use retouch_core::transform::{prepare_download, Adjustments};

use super::QualityArg;
use crate::context;
use crate::progress::spinner;

#[derive(Args)]
pub struct ExportArgs {
    /// Output path; the extension is added when missing
    pub output: PathBuf,

    /// Export quality tier
    #[arg(long, value_enum, default_value = "medium")]
    pub quality: QualityArg,

    /// Brightness in percent (0-200)
    #[arg(long, default_value = "100")]
    pub brightness: u32,

    /// Contrast in percent (0-200)
    #[arg(long, default_value = "100")]
    pub contrast: u32,

    /// Session directory (defaults to the user data dir)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

/// Export the current image of the saved session.
pub fn run(args: &ExportArgs, config: &RetouchConfig) -> Result<()> {
    let dir = context::state_dir(args.state_dir.as_deref())?;
    let image = SessionPersistence::new(context::open_store(&dir)?)
        .load()
        .and_then(|snapshot| snapshot.image)
        .ok_or_else(|| anyhow!("No saved image; open one with `retouch session`"))?;

    let mut adjustments = Adjustments::default();
    adjustments.set_brightness(args.brightness);
    adjustments.set_contrast(args.contrast);

    let pb = spinner()?;
    pb.set_message("Preparing download…");
    let exported = prepare_download(&image, adjustments, args.quality.into(), &config.export)
        .context("Failed to prepare download")?;
    pb.finish_and_clear();

    let written = context::write_export(
        &args.output,
        &exported.to_bytes()?,
        exported.file_extension(),
    )?;
    println!("Exported to {}", written.display());
    Ok(())
}
