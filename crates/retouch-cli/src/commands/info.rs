use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use retouch_core::prefs::{Preferences, Theme};
use retouch_core::session::SessionPersistence;

use crate::context;
use crate::summary::{print_snapshot, Styles};

#[derive(Args)]
pub struct InfoArgs {
    /// Session directory (defaults to the user data dir)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let dir = context::state_dir(args.state_dir.as_deref())?;
    let store = context::open_store(&dir)?;
    let prefs = Preferences::load(store.clone(), Theme::default());
    let snapshot = SessionPersistence::new(store).load();

    print_snapshot(&Styles::new(prefs.theme()), snapshot.as_ref(), &dir, &prefs);
    Ok(())
}
