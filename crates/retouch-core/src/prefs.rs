use std::sync::Arc;

use tracing::warn;

use crate::consts::{PREFS_THEME_KEY, PREFS_TUTORIAL_KEY};
use crate::session::Store;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preferences, read once at startup and written on every change.
///
/// Passed explicitly to whoever needs it; there is no process-wide copy.
pub struct Preferences {
    store: Arc<dyn Store>,
    theme: Theme,
    tutorial_seen: bool,
}

impl Preferences {
    /// Read preferences from `store`, falling back to `os_theme` when no
    /// theme has been stored (or the stored value is unreadable).
    pub fn load(store: Arc<dyn Store>, os_theme: Theme) -> Self {
        let theme = match store.get(PREFS_THEME_KEY) {
            Ok(Some(raw)) => Theme::parse(&raw).unwrap_or(os_theme),
            Ok(None) => os_theme,
            Err(e) => {
                warn!(error = %e, "Failed to read theme preference");
                os_theme
            }
        };
        let tutorial_seen = matches!(store.get(PREFS_TUTORIAL_KEY), Ok(Some(v)) if v == "true");

        Self {
            store,
            theme,
            tutorial_seen,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.store.set(PREFS_THEME_KEY, theme.as_str()) {
            warn!(error = %e, "Failed to persist theme preference");
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    pub fn tutorial_seen(&self) -> bool {
        self.tutorial_seen
    }

    pub fn mark_tutorial_seen(&mut self) {
        self.tutorial_seen = true;
        if let Err(e) = self.store.set(PREFS_TUTORIAL_KEY, "true") {
            warn!(error = %e, "Failed to persist tutorial flag");
        }
    }
}
