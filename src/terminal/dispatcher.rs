//! TerminalDispatcher: the Idle / Processing state machine of one terminal
//!
//! Virtual commands resolve against the shared tree and finish immediately.
//! Remote commands go to the backend shell and keep the dispatcher in
//! Processing until the backend reports readiness, the command times out,
//! or the user interrupts it. Lines submitted while Processing wait in a
//! bounded queue.

use crate::config::TerminalConfig;
use crate::error::{TerminalError, WorkspaceError};
use crate::sync::protocol::{
    BackendEvent, Envelope, ProtocolEvent, Recipient, Signal, TerminalCommand, TerminalSignal,
};
use crate::sync::transport::EventTransport;
use crate::terminal::command::Command;
use crate::terminal::dedup::OutputDeduper;
use crate::terminal::render;
use crate::tree::{PathResolver, TreeModel};
use crate::types::{NodeId, SocketId};
use crate::workspace::SharedWorkspace;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Where terminal output goes
pub trait OutputSink: Send {
    fn write(&mut self, text: &str);
}

/// Collects output in memory
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    buffer: String,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

impl OutputSink for BufferSink {
    fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

impl OutputSink for mpsc::UnboundedSender<String> {
    fn write(&mut self, text: &str) {
        let _ = self.send(text.to_string());
    }
}

/// Logical position of the terminal in the tree.
///
/// `file_id` is set after `cd` onto a file; `dir_id` is then the directory
/// holding it and `path` ends with the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationState {
    pub dir_id: NodeId,
    pub file_id: Option<NodeId>,
    pub path: String,
}

impl LocationState {
    pub fn root(tree: &TreeModel) -> Self {
        Self {
            dir_id: tree.root_id().clone(),
            file_id: None,
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Processing { command: String, started: Instant },
}

/// Outcome of submitting one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank line
    Ignored,
    /// A virtual command ran to completion
    Completed,
    /// Sent to the backend; the dispatcher is now Processing
    Forwarded,
    /// Waiting behind the command in flight (1-based position)
    Queued { position: usize },
}

#[derive(Debug, Clone)]
pub struct TerminalSettings {
    pub command_timeout: Duration,
    pub dedup_window: Duration,
    pub max_pending: usize,
    pub highlight_urls: bool,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self::from(&TerminalConfig::default())
    }
}

impl From<&TerminalConfig> for TerminalSettings {
    fn from(config: &TerminalConfig) -> Self {
        Self {
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            dedup_window: Duration::from_millis(config.dedup_window_ms),
            max_pending: config.max_pending_commands,
            highlight_urls: config.highlight_urls,
        }
    }
}

pub struct TerminalDispatcher<S: OutputSink = BufferSink> {
    workspace: SharedWorkspace,
    transport: Arc<dyn EventTransport>,
    socket_id: SocketId,
    settings: TerminalSettings,
    location: LocationState,
    state: DispatcherState,
    pending: VecDeque<String>,
    dedup: OutputDeduper,
    sink: S,
}

impl<S: OutputSink> TerminalDispatcher<S> {
    pub fn new(
        workspace: SharedWorkspace,
        transport: Arc<dyn EventTransport>,
        socket_id: SocketId,
        settings: TerminalSettings,
        sink: S,
    ) -> Self {
        let location = LocationState::root(workspace.read().tree());
        let dedup = OutputDeduper::new(settings.dedup_window);
        Self {
            workspace,
            transport,
            socket_id,
            settings,
            location,
            state: DispatcherState::Idle,
            pending: VecDeque::new(),
            dedup,
            sink,
        }
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DispatcherState::Idle
    }

    pub fn location(&self) -> &LocationState {
        &self.location
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn prompt(&self) -> String {
        render::prompt(&self.location.path)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// When the command in flight times out, if any
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            DispatcherState::Processing { started, .. } => {
                Some(*started + self.settings.command_timeout)
            }
            DispatcherState::Idle => None,
        }
    }

    /// Submit one input line.
    ///
    /// Failures are written to the sink as well as returned.
    pub fn submit(&mut self, line: &str) -> Result<Submission, TerminalError> {
        if Command::parse(line).is_none() {
            return Ok(Submission::Ignored);
        }
        if !self.is_idle() {
            if self.pending.len() >= self.settings.max_pending {
                let err = TerminalError::QueueFull {
                    limit: self.settings.max_pending,
                };
                self.sink.write(&render::error_line(&err.to_string()));
                warn!(limit = self.settings.max_pending, "Terminal queue full, command rejected");
                return Err(err);
            }
            self.pending.push_back(line.trim().to_string());
            debug!(pending = self.pending.len(), "Queued command behind command in flight");
            return Ok(Submission::Queued {
                position: self.pending.len(),
            });
        }
        self.run(line)
    }

    fn run(&mut self, line: &str) -> Result<Submission, TerminalError> {
        let Some(command) = Command::parse(line) else {
            return Ok(Submission::Ignored);
        };
        self.refresh_location();
        let result = match command {
            Command::Remote(line) => return self.forward(line),
            Command::List => self.list(),
            Command::ChangeDir(target) => self.change_dir(&target).map(|()| String::new()),
            Command::PrintDir => Ok(format!("{}\r\n", self.location.path)),
            Command::Help => Ok(render::HELP_TEXT.to_string()),
            Command::Clear => Ok(render::CLEAR_SCREEN.to_string()),
        };
        match result {
            Ok(output) => {
                self.sink.write(&output);
                Ok(Submission::Completed)
            }
            Err(err) => {
                self.sink.write(&render::error_line(&err.to_string()));
                Err(err)
            }
        }
    }

    fn forward(&mut self, line: String) -> Result<Submission, TerminalError> {
        if !self.transport.is_connected() {
            return Err(self.unavailable());
        }
        let cwd = self.remote_cwd();
        let envelope = Envelope::new(
            self.socket_id.clone(),
            Recipient::Backend,
            ProtocolEvent::TerminalCommand(TerminalCommand {
                command: line.clone(),
                cwd: cwd.clone(),
            }),
        );
        if let Err(err) = self.transport.emit(envelope) {
            debug!(error = %err, "Backend emit failed");
            return Err(self.unavailable());
        }
        info!(command = %line, cwd = %cwd, "Forwarded command to backend");
        self.state = DispatcherState::Processing {
            command: line,
            started: Instant::now(),
        };
        Ok(Submission::Forwarded)
    }

    fn unavailable(&mut self) -> TerminalError {
        let err = TerminalError::TransportUnavailable;
        self.sink.write(&render::error_line(&err.to_string()));
        warn!("Remote command issued while backend is not connected");
        err
    }

    /// Handle an event from the backend shell
    pub fn handle_backend(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Output(data) => {
                if !self.dedup.admit(&data) {
                    debug!(bytes = data.len(), "Dropped repeated output chunk");
                    return;
                }
                self.sink.write(&data);
                if self.settings.highlight_urls {
                    for url in render::find_urls(&data) {
                        self.sink.write(&render::link_line(url));
                    }
                }
            }
            BackendEvent::Error(message) => {
                warn!(error = %message, "Backend reported an error");
                self.sink.write(&render::backend_error_line(&message));
            }
            BackendEvent::Ready => match std::mem::replace(&mut self.state, DispatcherState::Idle) {
                DispatcherState::Processing { command, started } => {
                    debug!(command = %command, elapsed_ms = started.elapsed().as_millis() as u64, "Command finished");
                    self.drain_pending();
                }
                DispatcherState::Idle => debug!("Readiness signal while idle"),
            },
        }
    }

    /// Cancel the command in flight and everything queued behind it.
    ///
    /// Returns whether the signal reached the backend.
    pub fn interrupt(&mut self) -> bool {
        let dropped = self.pending.len();
        self.pending.clear();
        let was_processing = !self.is_idle();
        self.state = DispatcherState::Idle;
        self.sink.write("^C\r\n");

        if !self.transport.is_connected() {
            debug!("Interrupt handled locally, backend not connected");
            return false;
        }
        let envelope = Envelope::new(
            self.socket_id.clone(),
            Recipient::Backend,
            ProtocolEvent::TerminalSignal(TerminalSignal {
                signal: Signal::Interrupt,
                project_path: self.remote_cwd(),
            }),
        );
        let sent = self.transport.emit(envelope).is_ok();
        info!(was_processing, dropped, sent, "Interrupt");
        sent
    }

    /// Abort the command in flight if its deadline passed.
    pub fn check_timeout(&mut self) -> Option<TerminalError> {
        let deadline = self.deadline()?;
        if Instant::now() < deadline {
            return None;
        }
        let DispatcherState::Processing { command, .. } =
            std::mem::replace(&mut self.state, DispatcherState::Idle)
        else {
            return None;
        };
        let err = TerminalError::Timeout {
            command,
            millis: u64::try_from(self.settings.command_timeout.as_millis()).unwrap_or(u64::MAX),
        };
        warn!(error = %err, "Backend did not report readiness");
        self.sink.write(&render::backend_error_line(&err.to_string()));
        self.drain_pending();
        Some(err)
    }

    /// Run queued lines until one is in flight or the queue is empty.
    fn drain_pending(&mut self) {
        while self.is_idle() {
            let Some(line) = self.pending.pop_front() else {
                break;
            };
            if let Err(err) = self.run(&line) {
                debug!(error = %err, command = %line, "Queued command failed");
            }
        }
    }

    /// Re-derive the location from the current tree.
    ///
    /// Falls back to the root when the directory is gone and drops the file
    /// part when the file is gone; renames are picked up in the path.
    pub fn refresh_location(&mut self) {
        let workspace = self.workspace.read();
        let tree = workspace.tree();
        if tree.require_directory(&self.location.dir_id).is_err() {
            debug!(dir_id = %self.location.dir_id, "Terminal directory vanished, back to root");
            self.location = LocationState::root(tree);
            return;
        }
        if let Some(file) = &self.location.file_id {
            let still_inside = tree.require_file(file).is_ok()
                && tree.parent_of(file).map(|p| &p.id) == Some(&self.location.dir_id);
            if !still_inside {
                self.location.file_id = None;
            }
        }
        let anchor = self
            .location
            .file_id
            .as_ref()
            .unwrap_or(&self.location.dir_id);
        if let Ok(path) = tree.path_of(anchor) {
            self.location.path = path;
        }
    }

    fn list(&self) -> Result<String, TerminalError> {
        let workspace = self.workspace.read();
        let children = workspace
            .tree()
            .children(&self.location.dir_id)
            .map_err(|_| TerminalError::InvalidDirectory)?;
        Ok(render::render_listing(&children))
    }

    fn change_dir(&mut self, target: &str) -> Result<(), TerminalError> {
        let workspace = self.workspace.read();
        let tree = workspace.tree();
        let resolver = PathResolver::new(tree);
        let mut next = if target.starts_with('/') {
            LocationState::root(tree)
        } else {
            self.location.clone()
        };

        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." if next.file_id.is_some() => next.file_id = None,
                ".." => next.dir_id = step(&resolver, &next.dir_id, "..", target)?,
                name => {
                    if next.file_id.is_some() {
                        return Err(TerminalError::NoSuchPath(target.to_string()));
                    }
                    let record = resolver
                        .step(&next.dir_id, name)
                        .map_err(|_| TerminalError::NoSuchPath(target.to_string()))?;
                    if record.is_directory() {
                        next.dir_id = record.id.clone();
                    } else {
                        next.file_id = Some(record.id.clone());
                    }
                }
            }
        }

        let anchor = next.file_id.as_ref().unwrap_or(&next.dir_id);
        next.path = tree
            .path_of(anchor)
            .map_err(|_| TerminalError::InvalidDirectory)?;
        debug!(from = %self.location.path, to = %next.path, "Changed directory");
        drop(workspace);
        self.location = next;
        Ok(())
    }

    /// Working directory sent to the backend: the directory part of the location
    fn remote_cwd(&self) -> String {
        self.workspace
            .read()
            .tree()
            .path_of(&self.location.dir_id)
            .unwrap_or_else(|_| "/".to_string())
    }
}

fn step(
    resolver: &PathResolver<'_>,
    from: &NodeId,
    segment: &str,
    target: &str,
) -> Result<NodeId, TerminalError> {
    resolver
        .step(from, segment)
        .map(|record| record.id.clone())
        .map_err(|err| match err {
            WorkspaceError::NotFound(_) => TerminalError::NoSuchPath(target.to_string()),
            _ => TerminalError::InvalidDirectory,
        })
}
