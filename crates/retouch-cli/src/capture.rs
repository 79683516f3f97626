//! Speech capture backed by an external speech-to-text program.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;

use retouch_core::voice::{SpeechCapture, TranscriptEvent, VoiceError};
use tracing::{debug, warn};

/// Runs `argv` and turns each stdout line into a transcript: lines starting
/// with `~` are interim, everything else is final. EOF ends the session.
pub struct CommandSpeech {
    argv: Vec<String>,
    child: Option<Child>,
}

impl CommandSpeech {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv, child: None }
    }
}

impl SpeechCapture for CommandSpeech {
    fn is_supported(&self) -> bool {
        !self.argv.is_empty()
    }

    fn start(&mut self) -> Result<mpsc::Receiver<TranscriptEvent>, VoiceError> {
        self.stop();
        let (program, args) = self.argv.split_first().ok_or(VoiceError::Unsupported)?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VoiceError::Failed(format!("{program}: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VoiceError::Failed("speech program has no stdout".into()))?;

        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("retouch-voice".into())
            .spawn(move || read_transcripts(stdout, tx));
        if let Err(e) = spawned {
            let _ = child.kill();
            let _ = child.wait();
            return Err(VoiceError::Failed(e.to_string()));
        }

        debug!(program = %program, "Speech program started");
        self.child = Some(child);
        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "Speech program already exited");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_transcripts(stdout: impl Read, tx: mpsc::Sender<TranscriptEvent>) {
    for line in BufReader::new(stdout).lines() {
        let event = match line {
            Ok(line) => match parse_line(&line) {
                Some(event) => event,
                None => continue,
            },
            Err(e) => {
                warn!(error = %e, "Speech program output unreadable");
                let _ = tx.send(TranscriptEvent::Error(e.to_string()));
                return;
            }
        };
        if tx.send(event).is_err() {
            return;
        }
    }
    let _ = tx.send(TranscriptEvent::Ended);
}

fn parse_line(line: &str) -> Option<TranscriptEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line.strip_prefix('~') {
        Some(interim) => TranscriptEvent::Interim(interim.trim().to_string()),
        None => TranscriptEvent::Final(line.to_string()),
    })
}
