//! Runs compiled jsaot modules under wasmtime.
//!
//! [`Executor`] provides the host side of the module ABI (allocation and
//! console output). Debug builds additionally report line, call and exit
//! markers to a [`Debugger`], which drives a [`Frontend`] such as the
//! terminal REPL whenever execution pauses.

mod debugger;
mod error;
mod executor;
pub mod format;
mod imports;
mod repl;

pub use debugger::{
    Breakpoint, CallFrame, Command, CommandOutcome, DebugSession, Debugger, Frontend, PauseReason,
    RunState, Step,
};
pub use error::{DebugError, RuntimeError};
pub use executor::{DebugOutcome, ExitStatus, Executor, RunOutput};
pub use imports::Console;
pub use repl::TerminalRepl;
