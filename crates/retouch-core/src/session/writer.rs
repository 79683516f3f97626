use std::sync::mpsc;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use super::{SessionPersistence, SessionSnapshot};

enum WriteCommand {
    Save(SessionSnapshot),
    Clear,
    Flush(mpsc::Sender<()>),
}

/// Fire-and-forget session persistence on a background thread.
///
/// Saves are snapshots, not deltas, so queued saves collapse to the newest
/// one. `clear` and `flush` keep their position relative to saves.
pub struct SessionWriter {
    tx: Option<mpsc::Sender<WriteCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl SessionWriter {
    pub fn spawn(persistence: SessionPersistence) -> Self {
        let (tx, rx) = mpsc::channel::<WriteCommand>();

        let handle = std::thread::Builder::new()
            .name("retouch-session-writer".into())
            .spawn(move || writer_loop(rx, persistence));

        match handle {
            Ok(handle) => Self {
                tx: Some(tx),
                handle: Some(handle),
            },
            Err(e) => {
                // Persistence is advisory; run without it rather than fail.
                warn!(error = %e, "Failed to spawn session writer; session will not be saved");
                Self {
                    tx: None,
                    handle: None,
                }
            }
        }
    }

    pub fn save(&self, snapshot: SessionSnapshot) {
        self.send(WriteCommand::Save(snapshot));
    }

    pub fn clear(&self) {
        self.send(WriteCommand::Clear);
    }

    /// Block until every command queued before this call has been applied.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.send(WriteCommand::Flush(ack_tx));
        let _ = ack_rx.recv();
    }

    fn send(&self, cmd: WriteCommand) {
        if let Some(tx) = &self.tx {
            if tx.send(cmd).is_err() {
                warn!("Session writer has stopped; dropping write");
            }
        }
    }
}

impl Drop for SessionWriter {
    fn drop(&mut self) {
        // Closing the channel ends the loop once the queue is drained.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn writer_loop(rx: mpsc::Receiver<WriteCommand>, persistence: SessionPersistence) {
    let mut deferred: Option<WriteCommand> = None;

    loop {
        let cmd = match deferred.take() {
            Some(cmd) => cmd,
            None => match rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => break,
            },
        };

        match cmd {
            WriteCommand::Save(mut snapshot) => {
                let mut collapsed = 0usize;
                while let Ok(next) = rx.try_recv() {
                    match next {
                        WriteCommand::Save(newer) => {
                            snapshot = newer;
                            collapsed += 1;
                        }
                        other => {
                            deferred = Some(other);
                            break;
                        }
                    }
                }
                if collapsed > 0 {
                    debug!(collapsed, "Collapsed queued session saves");
                }
                persistence.save(&snapshot);
            }
            WriteCommand::Clear => persistence.clear(),
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
