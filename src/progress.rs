use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;

/// Externally visible pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Initializing,
    Downloading,
    Transcribing,
    Translating,
    Finalizing,
    Cached,
}

/// Successful outcome of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub vtt: String,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress {
        stage: Stage,
        percent: u8,
        detail: String,
    },
    #[serde(rename = "transcribe_result")]
    Result {
        vtt: String,
        cached: bool,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    /// Serialize as one line of newline-delimited JSON
    pub fn to_ndjson_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"action":"error","message":"failed to serialize event: {}"}}"#, e)
        });
        line.push('\n');
        line
    }
}

#[derive(Debug)]
enum Envelope {
    Event(ProgressEvent),
    Close,
}

#[derive(Default)]
struct SenderState {
    last_percent: HashMap<Stage, u8>,
    terminated: bool,
}

/// Producer handle for one request's event queue
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<Envelope>,
    state: Arc<Mutex<SenderState>>,
}

impl ProgressSender {
    fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            tx,
            state: Arc::new(Mutex::new(SenderState::default())),
        }
    }

    /// Push a progress event; percent never decreases within a stage
    pub fn progress<S: Into<String>>(&self, stage: Stage, percent: u8, detail: S) {
        let mut state = self.state.lock();
        if state.terminated {
            debug!("Dropping progress event after terminal event");
            return;
        }

        let last = state.last_percent.entry(stage).or_insert(0);
        let percent = percent.min(100).max(*last);
        *last = percent;

        let event = ProgressEvent::Progress {
            stage,
            percent,
            detail: detail.into(),
        };
        // Receiver gone means the consumer disconnected; the run continues regardless.
        let _ = self.tx.send(Envelope::Event(event));
    }

    /// Reporter that maps a sub-stage's 0-100 progress into `range`
    pub fn reporter(&self, stage: Stage, range: StageRange) -> StageReporter {
        StageReporter {
            sender: self.clone(),
            stage,
            range,
        }
    }

    fn terminate(&self, event: ProgressEvent) {
        let mut state = self.state.lock();
        if state.terminated {
            warn!("Pipeline attempted to emit a second terminal event");
            return;
        }
        state.terminated = true;
        let _ = self.tx.send(Envelope::Event(event));
        let _ = self.tx.send(Envelope::Close);
    }
}

/// Overall percent range a sub-stage is mapped into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRange {
    pub start: u8,
    pub end: u8,
}

impl StageRange {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Map a sub-stage percent (0-100) into this range
    pub fn map(&self, sub_percent: f32) -> u8 {
        let fraction = (sub_percent / 100.0).clamp(0.0, 1.0);
        let span = self.end.saturating_sub(self.start) as f32;
        (self.start as f32 + span * fraction).round() as u8
    }
}

/// Progress callback handed to a sub-stage
#[derive(Clone)]
pub struct StageReporter {
    sender: ProgressSender,
    stage: Stage,
    range: StageRange,
}

impl StageReporter {
    pub fn report<S: Into<String>>(&self, sub_percent: f32, detail: S) {
        self.sender.progress(self.stage, self.range.map(sub_percent), detail);
    }
}

/// Consumer side of one request's event queue
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Envelope>,
    closed: bool,
}

impl EventReceiver {
    /// Next event, or `None` once the close sentinel was seen
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        if self.closed {
            return None;
        }
        match self.rx.recv().await {
            Some(Envelope::Event(event)) => Some(event),
            Some(Envelope::Close) | None => {
                self.closed = true;
                None
            }
        }
    }

    /// Drain the queue, forwarding every event until the stream closes
    pub async fn drain<F: FnMut(ProgressEvent)>(mut self, mut forward: F) {
        while let Some(event) = self.recv().await {
            forward(event);
        }
    }

    /// Collect every event; mainly useful for tests and the CLI
    pub async fn collect(self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        self.drain(|event| events.push(event)).await;
        events
    }

    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        futures::stream::unfold(self, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
    }

    /// Events as NDJSON lines, ready to become an HTTP response body
    pub fn into_ndjson_stream(
        self,
    ) -> impl Stream<Item = std::result::Result<String, Infallible>> + Send + 'static {
        use futures::StreamExt;
        self.into_stream().map(|event| Ok(event.to_ndjson_line()))
    }
}

/// Spawns pipeline runs as producer tasks
pub struct ProgressStream;

impl ProgressStream {
    /// Run `producer` on its own task and return the consumer end of its queue.
    ///
    /// The producer's result becomes the terminal event. Errors and panics
    /// are converted into a single `Error` event.
    pub fn spawn<F, Fut>(producer: F) -> EventReceiver
    where
        F: FnOnce(ProgressSender) -> Fut,
        Fut: Future<Output = Result<TranscriptResult>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = ProgressSender::new(tx);
        let run = producer(sender.clone());

        tokio::spawn(async move {
            let terminal = match tokio::spawn(run).await {
                Ok(Ok(result)) => ProgressEvent::Result {
                    vtt: result.vtt,
                    cached: result.cached,
                },
                Ok(Err(e)) => {
                    warn!("Pipeline failed: {}", e);
                    ProgressEvent::Error {
                        message: e.to_string(),
                    }
                }
                Err(join_error) => {
                    warn!("Pipeline task aborted: {}", join_error);
                    ProgressEvent::Error {
                        message: format!("Internal error: pipeline task aborted ({})", join_error),
                    }
                }
            };
            sender.terminate(terminal);
        });

        EventReceiver { rx, closed: false }
    }
}
