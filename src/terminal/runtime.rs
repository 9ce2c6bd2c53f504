//! Async driver for a terminal dispatcher.
//!
//! One task owns the input stream and a periodic tick. The tick enforces the
//! command timeout, so a backend that never reports readiness cannot leave the
//! terminal in Processing forever.

use crate::config::TerminalConfig;
use crate::error::TerminalError;
use crate::sync::protocol::BackendEvent;
use crate::terminal::dispatcher::{OutputSink, TerminalDispatcher};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Dispatcher shared between the runtime task and the event router
pub type SharedDispatcher<S> = Arc<Mutex<TerminalDispatcher<S>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalInput {
    Line(String),
    Interrupt,
    Backend(BackendEvent),
}

/// Sending side of a running terminal
#[derive(Debug, Clone)]
pub struct TerminalHandle {
    tx: mpsc::UnboundedSender<TerminalInput>,
}

impl TerminalHandle {
    pub fn submit(&self, line: impl Into<String>) -> Result<(), TerminalError> {
        self.send(TerminalInput::Line(line.into()))
    }

    pub fn interrupt(&self) -> Result<(), TerminalError> {
        self.send(TerminalInput::Interrupt)
    }

    pub fn backend(&self, event: BackendEvent) -> Result<(), TerminalError> {
        self.send(TerminalInput::Backend(event))
    }

    fn send(&self, input: TerminalInput) -> Result<(), TerminalError> {
        self.tx.send(input).map_err(|_| TerminalError::InputClosed)
    }
}

pub struct TerminalRuntime<S: OutputSink> {
    dispatcher: SharedDispatcher<S>,
    tick: Duration,
}

impl<S: OutputSink + 'static> TerminalRuntime<S> {
    pub fn new(dispatcher: SharedDispatcher<S>, tick: Duration) -> Self {
        Self { dispatcher, tick }
    }

    /// Tick period taken from `terminal.tick_ms`
    pub fn with_config(dispatcher: SharedDispatcher<S>, config: &TerminalConfig) -> Self {
        Self::new(dispatcher, Duration::from_millis(config.tick_ms.max(1)))
    }

    /// Start the driver task; it stops once every handle is dropped.
    pub fn spawn(self) -> (TerminalHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            self.run(rx).await;
        });
        (TerminalHandle { tx }, handle)
    }

    pub async fn run(self, mut input: mpsc::UnboundedReceiver<TerminalInput>) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(tick_ms = self.tick.as_millis() as u64, "Terminal runtime started");

        loop {
            tokio::select! {
                received = input.recv() => {
                    let Some(received) = received else {
                        break;
                    };
                    self.handle(received);
                }
                _ = ticker.tick() => {
                    if let Some(err) = self.dispatcher.lock().check_timeout() {
                        warn!(error = %err, "Command aborted by timeout");
                    }
                }
            }
        }
        info!("Terminal input closed, runtime stopped");
    }

    fn handle(&self, input: TerminalInput) {
        let mut dispatcher = self.dispatcher.lock();
        match input {
            TerminalInput::Line(line) => match dispatcher.submit(&line) {
                Ok(outcome) => debug!(?outcome, "Line submitted"),
                Err(err) => debug!(error = %err, "Line failed"),
            },
            TerminalInput::Interrupt => {
                dispatcher.interrupt();
            }
            TerminalInput::Backend(event) => dispatcher.handle_backend(event),
        }
    }
}
