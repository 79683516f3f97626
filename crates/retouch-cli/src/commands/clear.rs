use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use retouch_core::session::SessionPersistence;

use crate::context;

#[derive(Args)]
pub struct ClearArgs {
    /// Session directory (defaults to the user data dir)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

/// Delete the saved session. Preferences are kept.
pub fn run(args: &ClearArgs) -> Result<()> {
    let dir = context::state_dir(args.state_dir.as_deref())?;
    SessionPersistence::new(context::open_store(&dir)?).clear();
    println!("Session cleared ({})", dir.display());
    Ok(())
}
