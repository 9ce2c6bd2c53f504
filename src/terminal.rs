//! Terminal domain: command grammar, the dispatcher state machine, output
//! handling, and the async runtime driving it.

pub mod command;
pub mod dedup;
pub mod dispatcher;
pub mod render;
pub mod runtime;

pub use command::Command;
pub use dispatcher::{
    BufferSink, DispatcherState, LocationState, OutputSink, Submission, TerminalDispatcher,
    TerminalSettings,
};
pub use runtime::{SharedDispatcher, TerminalHandle, TerminalInput, TerminalRuntime};
