//! Console output stream
//!
//! Handlers, the dispatcher and the scheduler write user-facing lines here.
//! The receiving half is drained by whatever presents output (the shell
//! printer in the binary, or a test).

use tokio::sync::mpsc;

/// Cloneable writer for user-facing output lines
#[derive(Clone, Debug)]
pub struct Console {
    tx: mpsc::UnboundedSender<String>,
}

/// Receiving half of a [`Console`]
#[derive(Debug)]
pub struct ConsoleOutput {
    rx: mpsc::UnboundedReceiver<String>,
}

impl Console {
    /// Create a console and its output stream
    pub fn channel() -> (Console, ConsoleOutput) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Console { tx }, ConsoleOutput { rx })
    }

    /// Write one line. Lines written after the output is dropped are discarded.
    pub fn write_line(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::trace!(target: "console", "{}", line);
        let _ = self.tx.send(line);
    }
}

impl ConsoleOutput {
    /// Wait for the next line; `None` once every console is dropped
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take every line written so far without waiting
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            lines.push(line);
        }
        lines
    }
}
