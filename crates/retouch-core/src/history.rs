use crate::image_state::ImageState;

/// Linear (branch-free) version history with a movable cursor.
///
/// `versions[0]` is the original image of the session. Pushing after an
/// undo discards the redo tail; nothing is ever merged back.
#[derive(Clone, Debug, Default)]
pub struct History {
    versions: Vec<ImageState>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history rooted at `original`.
    pub fn with_original(original: ImageState) -> Self {
        Self {
            versions: vec![original],
            cursor: 0,
        }
    }

    /// Append a new version after the cursor, dropping any redo tail.
    ///
    /// On an empty history the pushed state becomes the original.
    pub fn push(&mut self, state: ImageState) {
        if self.versions.is_empty() {
            self.reset(state);
            return;
        }
        self.versions.truncate(self.cursor + 1);
        self.versions.push(state);
        self.cursor = self.versions.len() - 1;
    }

    /// Step back one version. Returns `false` at the start of history.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one version. Returns `false` at the end of history.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Replace the whole history with a single version.
    pub fn reset(&mut self, to: ImageState) {
        self.versions = vec![to];
        self.cursor = 0;
    }

    /// Collapse the history to its original version. No-op when empty.
    pub fn reset_to_original(&mut self) {
        if let Some(original) = self.versions.first().cloned() {
            self.reset(original);
        }
    }

    pub fn clear(&mut self) {
        self.versions.clear();
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&ImageState> {
        self.versions.get(self.cursor)
    }

    pub fn original(&self) -> Option<&ImageState> {
        self.versions.first()
    }

    pub fn can_undo(&self) -> bool {
        !self.versions.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.versions.is_empty() && self.cursor < self.versions.len() - 1
    }

    /// Cursor position, or `None` when the history is empty.
    pub fn cursor(&self) -> Option<usize> {
        (!self.versions.is_empty()).then_some(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn versions(&self) -> &[ImageState] {
        &self.versions
    }
}
