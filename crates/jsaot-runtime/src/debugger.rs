//! Source-level debugger.
//!
//! [`DebugSession`] is a pure state machine fed by the markers of a debug
//! build: it owns breakpoints, the shadow call stack and step requests, and
//! decides when execution pauses. [`Debugger`] couples a session to a
//! [`Frontend`] that reads commands while paused.

use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use jsaot_passes::DebugInfo;

use crate::error::DebugError;

const SCROLLBACK_LIMIT: usize = 500;

const HELP: &str = "\
commands:
  c, continue        run until the next breakpoint
  n, next            run to the next line in this function or its caller
  s, step            stop at the next line or function entry
  o, out             run until the current function returns
  b, break N         set a breakpoint on line N
  d, delete N        remove the breakpoint on line N
  disable N          keep the breakpoint on line N but do not stop there
  enable N           re-enable the breakpoint on line N
  l, list            show breakpoints
  bt, backtrace      show the call stack
  h, help            show this help
  q, quit            abort the program";

/// A breakpoint on a 0-based source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub line: u32,
    pub enabled: bool,
}

/// One entry of the shadow call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Debug id of the function, as assigned by instrumentation.
    pub func_id: u32,
    pub name: String,
    /// 0-based line that was executing when the function was entered.
    pub start_line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Finished,
}

/// Pending step request, consumed by the next pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    None,
    StopOnEntry,
    /// Stop at the next line whose stack depth is at most `depth`.
    Over { depth: usize },
    /// Stop at the next line or function entry.
    In,
    /// Stop at the next line whose stack depth is below `depth`.
    Out { depth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    Entry,
    Breakpoint,
    Step,
    Call,
}

/// A parsed REPL command. Line numbers are 1-based, as the user sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Continue,
    Next,
    Step,
    Out,
    Break(u32),
    Delete(u32),
    Disable(u32),
    Enable(u32),
    List,
    Backtrace,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = DebugError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut words = input.split_whitespace();
        let name = words.next().unwrap_or_default();
        let line = |command: &'static str, arg: Option<&str>| -> Result<u32, DebugError> {
            let arg = arg.ok_or(DebugError::MissingLine { command })?;
            arg.parse::<u32>()
                .map_err(|_| DebugError::InvalidNumber(arg.to_string()))
        };
        let command = match name {
            "c" | "continue" => Command::Continue,
            "n" | "next" => Command::Next,
            "s" | "step" => Command::Step,
            "o" | "out" | "finish" => Command::Out,
            "b" | "break" => Command::Break(line("break", words.next())?),
            "d" | "delete" => Command::Delete(line("delete", words.next())?),
            "disable" => Command::Disable(line("disable", words.next())?),
            "enable" => Command::Enable(line("enable", words.next())?),
            "l" | "list" => Command::List,
            "bt" | "backtrace" => Command::Backtrace,
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => return Err(DebugError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// What the session wants after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Resume,
    Message(String),
    Quit,
}

/// Program output kept for display while paused, split into lines.
#[derive(Debug, Default)]
struct Scrollback {
    lines: VecDeque<String>,
    partial: String,
}

impl Scrollback {
    fn push(&mut self, text: &str) {
        let mut rest = text;
        while let Some(pos) = rest.find('\n') {
            self.partial.push_str(&rest[..pos]);
            let line = std::mem::take(&mut self.partial);
            if self.lines.len() == SCROLLBACK_LIMIT {
                self.lines.pop_front();
            }
            self.lines.push_back(line);
            rest = &rest[pos + 1..];
        }
        self.partial.push_str(rest);
    }

    fn lines(&self) -> impl Iterator<Item = &str> {
        let partial = (!self.partial.is_empty()).then_some(self.partial.as_str());
        self.lines.iter().map(String::as_str).chain(partial)
    }
}

/// Debugger state for one run of a debug build.
#[derive(Debug)]
pub struct DebugSession {
    info: DebugInfo,
    source: Vec<String>,
    breakpoints: BTreeMap<u32, Breakpoint>,
    frames: Vec<CallFrame>,
    state: RunState,
    step: Step,
    current_line: Option<u32>,
    last_pause: Option<PauseReason>,
    pauses: usize,
    detached: bool,
    output: Scrollback,
    warnings: Vec<String>,
}

impl DebugSession {
    pub fn new(source: &str, info: DebugInfo) -> Self {
        Self {
            info,
            source: source.lines().map(str::to_string).collect(),
            breakpoints: BTreeMap::new(),
            frames: Vec::new(),
            state: RunState::Running,
            step: Step::None,
            current_line: None,
            last_pause: None,
            pauses: 0,
            detached: false,
            output: Scrollback::default(),
            warnings: Vec::new(),
        }
    }

    /// Pause at the first statement.
    pub fn stop_on_entry(&mut self) {
        self.step = Step::StopOnEntry;
    }

    // ── Breakpoints (1-based lines) ─────────────────────────

    pub fn set_breakpoint(&mut self, line: u32) -> Result<(), DebugError> {
        let index = line
            .checked_sub(1)
            .filter(|index| self.info.has_line(*index))
            .ok_or(DebugError::NoStatement(line))?;
        self.breakpoints.insert(
            index,
            Breakpoint {
                line: index,
                enabled: true,
            },
        );
        Ok(())
    }

    pub fn delete_breakpoint(&mut self, line: u32) -> Result<(), DebugError> {
        line.checked_sub(1)
            .and_then(|index| self.breakpoints.remove(&index))
            .map(|_| ())
            .ok_or(DebugError::NoBreakpoint(line))
    }

    pub fn enable_breakpoint(&mut self, line: u32, enabled: bool) -> Result<(), DebugError> {
        let breakpoint = line
            .checked_sub(1)
            .and_then(|index| self.breakpoints.get_mut(&index))
            .ok_or(DebugError::NoBreakpoint(line))?;
        breakpoint.enabled = enabled;
        Ok(())
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    pub fn has_breakpoint(&self, index: u32) -> bool {
        self.breakpoints.get(&index).is_some_and(|bp| bp.enabled)
    }

    // ── Markers ─────────────────────────────────────────────

    /// A statement on 0-based `line` is about to run.
    pub fn on_line(&mut self, line: u32) -> Option<PauseReason> {
        self.current_line = Some(line);
        if self.detached {
            return None;
        }
        let depth = self.frames.len();
        let stepped = match self.step {
            Step::None => false,
            Step::StopOnEntry => return Some(self.pause(PauseReason::Entry)),
            Step::In => true,
            Step::Over { depth: target } => depth <= target,
            Step::Out { depth: target } => depth < target,
        };
        if stepped {
            Some(self.pause(PauseReason::Step))
        } else if self.has_breakpoint(line) {
            Some(self.pause(PauseReason::Breakpoint))
        } else {
            None
        }
    }

    /// Function `debug_id` was entered.
    pub fn on_call(&mut self, debug_id: u32) -> Option<PauseReason> {
        let name = self
            .info
            .function_name(debug_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("<function {debug_id}>"));
        self.frames.push(CallFrame {
            func_id: debug_id,
            name,
            start_line: self.current_line,
        });
        (!self.detached && self.step == Step::In).then(|| self.pause(PauseReason::Call))
    }

    /// Function `debug_id` is returning. Frames above the matching one are
    /// discarded; an exit with no matching frame leaves the stack alone.
    pub fn on_exit(&mut self, debug_id: u32) {
        match self.frames.iter().rposition(|frame| frame.func_id == debug_id) {
            Some(pos) => {
                if pos + 1 != self.frames.len() {
                    tracing::warn!(
                        debug_id,
                        discarded = self.frames.len() - pos - 1,
                        "exit marker does not match the innermost frame"
                    );
                }
                self.frames.truncate(pos);
            }
            None => tracing::warn!(debug_id, "exit marker for a function that is not on the stack"),
        }
    }

    fn pause(&mut self, reason: PauseReason) -> PauseReason {
        self.state = RunState::Paused;
        self.step = Step::None;
        self.last_pause = Some(reason);
        self.pauses += 1;
        reason
    }

    // ── Commands ────────────────────────────────────────────

    pub fn execute(&mut self, command: Command) -> CommandOutcome {
        let depth = self.frames.len();
        let message = match command {
            Command::Continue => return self.resume_with(Step::None),
            Command::Next => return self.resume_with(Step::Over { depth }),
            Command::Step => return self.resume_with(Step::In),
            Command::Out => return self.resume_with(Step::Out { depth }),
            Command::Quit => return CommandOutcome::Quit,
            Command::Break(line) => self
                .set_breakpoint(line)
                .map(|_| format!("breakpoint set on line {line}")),
            Command::Delete(line) => self
                .delete_breakpoint(line)
                .map(|_| format!("breakpoint on line {line} deleted")),
            Command::Disable(line) => self
                .enable_breakpoint(line, false)
                .map(|_| format!("breakpoint on line {line} disabled")),
            Command::Enable(line) => self
                .enable_breakpoint(line, true)
                .map(|_| format!("breakpoint on line {line} enabled")),
            Command::List => Ok(self.breakpoint_list()),
            Command::Backtrace => Ok(self.backtrace()),
            Command::Help => Ok(HELP.to_string()),
        };
        CommandOutcome::Message(message.unwrap_or_else(|err| err.to_string()))
    }

    fn resume_with(&mut self, step: Step) -> CommandOutcome {
        self.step = step;
        CommandOutcome::Resume
    }

    pub fn resume(&mut self) {
        self.state = RunState::Running;
    }

    /// Stop pausing for the rest of the run.
    pub fn detach(&mut self) {
        self.detached = true;
        self.step = Step::None;
        self.state = RunState::Running;
    }

    pub fn finish(&mut self) {
        self.state = RunState::Finished;
    }

    pub fn breakpoint_list(&self) -> String {
        if self.breakpoints.is_empty() {
            return "no breakpoints".to_string();
        }
        self.breakpoints
            .values()
            .map(|bp| {
                let status = if bp.enabled { "" } else { " (disabled)" };
                format!("line {}{status}", bp.line + 1)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Call stack, innermost frame first, with 1-based lines.
    pub fn backtrace(&self) -> String {
        let mut out = Vec::with_capacity(self.frames.len() + 1);
        for (i, frame) in self.frames.iter().rev().enumerate() {
            match frame.start_line {
                Some(line) => out.push(format!("#{i} {} (called from line {})", frame.name, line + 1)),
                None => out.push(format!("#{i} {}", frame.name)),
            }
        }
        out.push(format!("#{} <top level>", self.frames.len()));
        out.join("\n")
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn current_line(&self) -> Option<u32> {
        self.current_line
    }

    pub fn last_pause(&self) -> Option<PauseReason> {
        self.last_pause
    }

    /// How many times execution has paused so far.
    pub fn pause_count(&self) -> usize {
        self.pauses
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn source_line(&self, index: u32) -> Option<&str> {
        self.source.get(index as usize).map(String::as_str)
    }

    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    pub fn debug_info(&self) -> &DebugInfo {
        &self.info
    }

    pub fn record_output(&mut self, text: &str) {
        self.output.push(text);
    }

    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

/// Reads commands while execution is paused.
pub trait Frontend {
    /// Show the paused session and return the next command line, or `None`
    /// once input is exhausted.
    fn read_command(&mut self, session: &DebugSession) -> Result<Option<String>, DebugError>;

    /// Show the reply to a command that did not resume execution.
    fn show_message(&mut self, message: &str) -> Result<(), DebugError>;

    /// The program ended; the session is final.
    fn finished(&mut self, _session: &DebugSession) -> Result<(), DebugError> {
        Ok(())
    }
}

/// Raised through the marker imports to abort a paused program.
#[derive(Debug, thiserror::Error)]
#[error("debugger session quit")]
pub(crate) struct SessionQuit;

/// A session plus the frontend that controls it.
pub struct Debugger {
    session: DebugSession,
    frontend: Box<dyn Frontend>,
}

impl Debugger {
    pub fn new(session: DebugSession, frontend: impl Frontend + 'static) -> Self {
        Self {
            session,
            frontend: Box::new(frontend),
        }
    }

    pub fn session(&self) -> &DebugSession {
        &self.session
    }

    pub fn into_session(self) -> DebugSession {
        self.session
    }

    pub(crate) fn on_line(&mut self, line: u32) -> Result<(), SessionQuit> {
        match self.session.on_line(line) {
            Some(reason) => self.command_loop(reason),
            None => Ok(()),
        }
    }

    pub(crate) fn on_call(&mut self, debug_id: u32) -> Result<(), SessionQuit> {
        match self.session.on_call(debug_id) {
            Some(reason) => self.command_loop(reason),
            None => Ok(()),
        }
    }

    pub(crate) fn on_exit(&mut self, debug_id: u32) {
        self.session.on_exit(debug_id);
    }

    pub(crate) fn record_output(&mut self, text: &str) {
        self.session.record_output(text);
    }

    pub(crate) fn finish(&mut self) {
        self.session.finish();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.frontend.finished(&self.session)));
        self.check_frontend(result);
    }

    /// Read and apply commands until one resumes execution. Frontend errors
    /// and panics resume the program; end of input detaches the session.
    fn command_loop(&mut self, reason: PauseReason) -> Result<(), SessionQuit> {
        tracing::debug!(
            ?reason,
            line = ?self.session.current_line(),
            depth = self.session.depth(),
            "paused"
        );
        loop {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.frontend.read_command(&self.session)
            }));
            let input = match result {
                Ok(Ok(Some(input))) => input,
                Ok(Ok(None)) => {
                    tracing::debug!("debugger input closed, running to completion");
                    self.session.detach();
                    return Ok(());
                }
                failed => {
                    self.check_frontend(failed.map(|r| r.map(|_| ())));
                    self.session.resume();
                    return Ok(());
                }
            };

            let input = input.trim();
            if input.is_empty() {
                continue;
            }
            let outcome = match input.parse::<Command>() {
                Ok(command) => self.session.execute(command),
                Err(err) => CommandOutcome::Message(err.to_string()),
            };
            match outcome {
                CommandOutcome::Resume => {
                    self.session.resume();
                    return Ok(());
                }
                CommandOutcome::Quit => return Err(SessionQuit),
                CommandOutcome::Message(message) => {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.frontend.show_message(&message)
                    }));
                    self.check_frontend(result);
                }
            }
        }
    }

    fn check_frontend(&mut self, result: std::thread::Result<Result<(), DebugError>>) {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.session.warn(format!("debugger frontend error: {err}")),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.session.warn(format!("debugger frontend panicked: {message}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn info(functions: &[&str], lines: &[u32]) -> DebugInfo {
        DebugInfo {
            functions: functions.iter().map(|s| s.to_string()).collect(),
            lines: lines.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn session() -> DebugSession {
        DebugSession::new("a\nb\nc\nd\n", info(&["f", "g"], &[0, 1, 2, 3]))
    }

    #[test]
    fn parse_commands() {
        assert_eq!("c".parse::<Command>().unwrap(), Command::Continue);
        assert_eq!("break 12".parse::<Command>().unwrap(), Command::Break(12));
        assert_eq!("  bt ".parse::<Command>().unwrap(), Command::Backtrace);
        assert!(matches!(
            "break".parse::<Command>(),
            Err(DebugError::MissingLine { command: "break" })
        ));
        assert!(matches!("b x".parse::<Command>(), Err(DebugError::InvalidNumber(_))));
        assert!(matches!("jump 3".parse::<Command>(), Err(DebugError::UnknownCommand(_))));
    }

    #[test]
    fn breakpoints_only_on_instrumented_lines() {
        let mut s = DebugSession::new("x\n\ny\n", info(&[], &[0, 2]));
        assert!(s.set_breakpoint(1).is_ok());
        assert!(matches!(s.set_breakpoint(2), Err(DebugError::NoStatement(2))));
        assert!(matches!(s.set_breakpoint(0), Err(DebugError::NoStatement(0))));
        assert!(s.set_breakpoint(3).is_ok());
        assert_eq!(s.breakpoint_list(), "line 1\nline 3");
    }

    #[test]
    fn breakpoint_pauses_unless_disabled() {
        let mut s = session();
        s.set_breakpoint(2).unwrap();
        assert_eq!(s.on_line(0), None);
        assert_eq!(s.on_line(1), Some(PauseReason::Breakpoint));
        assert_eq!(s.state(), RunState::Paused);
        s.resume();

        s.enable_breakpoint(2, false).unwrap();
        assert_eq!(s.on_line(1), None);
        assert_eq!(s.breakpoint_list(), "line 2 (disabled)");

        s.delete_breakpoint(2).unwrap();
        assert!(matches!(s.delete_breakpoint(2), Err(DebugError::NoBreakpoint(2))));
    }

    #[test]
    fn stop_on_entry_pauses_at_first_line() {
        let mut s = session();
        s.stop_on_entry();
        assert_eq!(s.on_line(0), Some(PauseReason::Entry));
        assert_eq!(s.on_line(1), None);
    }

    #[test]
    fn step_over_skips_callee_lines() {
        let mut s = session();
        s.stop_on_entry();
        s.on_line(0);
        assert_eq!(s.execute(Command::Next), CommandOutcome::Resume);
        s.on_call(0);
        assert_eq!(s.on_line(3), None);
        s.on_exit(0);
        assert_eq!(s.on_line(1), Some(PauseReason::Step));
    }

    #[test]
    fn step_in_pauses_on_call() {
        let mut s = session();
        s.stop_on_entry();
        s.on_line(0);
        s.execute(Command::Step);
        assert_eq!(s.on_call(1), Some(PauseReason::Call));
        assert_eq!(s.frames()[0].name, "g");
        assert_eq!(s.frames()[0].start_line, Some(0));
    }

    #[test]
    fn step_out_waits_for_return() {
        let mut s = session();
        s.on_line(0);
        s.on_call(0);
        s.stop_on_entry();
        s.on_line(3);
        s.execute(Command::Out);
        assert_eq!(s.on_line(2), None);
        s.on_exit(0);
        assert_eq!(s.on_line(1), Some(PauseReason::Step));
    }

    #[test]
    fn mismatched_exit_unwinds_to_matching_frame() {
        let mut s = session();
        s.on_call(0);
        s.on_call(1);
        s.on_exit(0);
        assert_eq!(s.depth(), 0);
        s.on_call(1);
        s.on_exit(0);
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn backtrace_lists_innermost_first() {
        let mut s = session();
        s.on_line(3);
        s.on_call(0);
        s.on_line(1);
        s.on_call(1);
        assert_eq!(
            s.backtrace(),
            "#0 g (called from line 2)\n#1 f (called from line 4)\n#2 <top level>"
        );
    }

    #[test]
    fn detached_session_never_pauses() {
        let mut s = session();
        s.set_breakpoint(1).unwrap();
        s.detach();
        assert_eq!(s.on_line(0), None);
        assert!(s.is_detached());
    }

    #[test]
    fn scrollback_splits_lines() {
        let mut s = session();
        s.record_output("1");
        s.record_output("5\nab");
        assert_eq!(s.output_lines().collect::<Vec<_>>(), vec!["15", "ab"]);
    }

    #[test]
    fn invalid_commands_keep_the_session_paused() {
        let mut s = session();
        match s.execute(Command::Break(9)) {
            CommandOutcome::Message(message) => assert!(message.contains("line 9")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(s.execute(Command::Quit), CommandOutcome::Quit);
    }
}
