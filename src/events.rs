//! Advisory status events emitted by the pipeline.
//!
//! The pipeline is the producer; a front-end (or the bundled binary) may
//! subscribe and render the messages. Events are best-effort: dropping the
//! receiver never stalls or fails a run.

use std::fmt;

use tokio::sync::mpsc;

/// One human-readable progress notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineEvent {
    /// Pipeline stage the message belongs to, e.g. `"chunking"`.
    pub scope: String,
    pub message: String,
}

impl PipelineEvent {
    pub fn new(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scope, self.message)
    }
}

/// Sending half of the status stream. A disabled sender swallows events.
#[derive(Clone, Debug, Default)]
pub struct StatusSender {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl StatusSender {
    /// A sender that discards everything, for callers without a UI.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates a connected sender/receiver pair.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Emits an event. Send failures (receiver gone) are ignored.
    pub fn emit(&self, scope: impl Into<String>, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(PipelineEvent::new(scope, message));
        }
    }
}
