//! Share target that pipes the exported image into an external program.

use std::io::Write;
use std::process::{Command, Stdio};

use retouch_core::image_state::ImageState;
use retouch_core::share::{ShareError, ShareTarget};
use tracing::debug;

/// Runs `argv` with the image bytes on stdin. The suggested file name and
/// media type are passed as `RETOUCH_FILE_NAME` and `RETOUCH_MEDIA_TYPE`.
pub struct CommandShare {
    argv: Vec<String>,
}

impl CommandShare {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl ShareTarget for CommandShare {
    fn share(&self, image: &ImageState, file_name: &str) -> Result<(), ShareError> {
        let (program, args) = self.argv.split_first().ok_or(ShareError::Unsupported)?;
        let bytes = image
            .to_bytes()
            .map_err(|e| ShareError::Failed(e.to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .env("RETOUCH_FILE_NAME", file_name)
            .env("RETOUCH_MEDIA_TYPE", image.media_type())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| ShareError::Failed(format!("{program}: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&bytes)
                .map_err(|e| ShareError::Failed(e.to_string()))?;
        }

        let status = child
            .wait()
            .map_err(|e| ShareError::Failed(e.to_string()))?;
        if !status.success() {
            return Err(ShareError::Failed(format!("{program} exited with {status}")));
        }
        debug!(program = %program, bytes = bytes.len(), "Shared export");
        Ok(())
    }
}
