//! Debug builds driven by a scripted frontend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use jsaot_codegen_wasm::{CompileOptions, CompiledModule, WasmCodegen};
use jsaot_parser::parse_source;
use jsaot_passes::{analyze, instrument};
use jsaot_runtime::{
    DebugError, DebugOutcome, DebugSession, Debugger, Executor, ExitStatus, Frontend, PauseReason,
};

const NESTED: &str = r#"function outer(n) {
  function inner(m) {
    return m * 2;
  }
  return inner(n) + 1;
}
console.log(outer(4));
"#;

#[derive(Debug, Clone, PartialEq)]
struct Pause {
    line: Option<u32>,
    frames: Vec<String>,
    reason: Option<PauseReason>,
}

#[derive(Default)]
struct Log {
    pauses: Vec<Pause>,
    messages: Vec<String>,
}

enum Behavior {
    Script,
    Fail,
    Panic,
}

struct ScriptedFrontend {
    commands: VecDeque<String>,
    log: Arc<Mutex<Log>>,
    behavior: Behavior,
}

impl Frontend for ScriptedFrontend {
    fn read_command(&mut self, session: &DebugSession) -> Result<Option<String>, DebugError> {
        self.log.lock().unwrap().pauses.push(Pause {
            line: session.current_line(),
            frames: session.frames().iter().map(|f| f.name.clone()).collect(),
            reason: session.last_pause(),
        });
        match self.behavior {
            Behavior::Script => Ok(self.commands.pop_front()),
            Behavior::Fail => Err(DebugError::Frontend("terminal went away".to_string())),
            Behavior::Panic => panic!("frontend bug"),
        }
    }

    fn show_message(&mut self, message: &str) -> Result<(), DebugError> {
        self.log.lock().unwrap().messages.push(message.to_string());
        Ok(())
    }
}

fn compile_debug(src: &str) -> CompiledModule {
    let mut program = parse_source(src).expect("parse failed");
    let info = instrument(&mut program);
    let analysis = analyze(&program).expect("analysis failed");
    WasmCodegen::new(CompileOptions { debug: true })
        .compile(&program, &analysis, Some(&info))
        .expect("codegen failed")
}

fn debug_run(
    src: &str,
    behavior: Behavior,
    commands: &[&str],
    setup: impl FnOnce(&mut DebugSession),
) -> (DebugOutcome, Arc<Mutex<Log>>) {
    let module = compile_debug(src);
    let info = module.debug_info.clone().expect("debug info");
    let mut session = DebugSession::new(src, info);
    setup(&mut session);

    let log = Arc::new(Mutex::new(Log::default()));
    let frontend = ScriptedFrontend {
        commands: commands.iter().map(|c| c.to_string()).collect(),
        log: Arc::clone(&log),
        behavior,
    };
    let outcome = Executor::new()
        .unwrap()
        .run_debug(&module, Debugger::new(session, frontend))
        .expect("run failed");
    (outcome, log)
}

fn pause_lines(log: &Arc<Mutex<Log>>) -> Vec<(Option<u32>, usize)> {
    log.lock()
        .unwrap()
        .pauses
        .iter()
        .map(|p| (p.line, p.frames.len()))
        .collect()
}

#[test]
fn breakpoint_in_nested_function() {
    let (outcome, log) = debug_run(NESTED, Behavior::Script, &["bt", "c"], |s| {
        s.set_breakpoint(3).unwrap();
    });
    assert_eq!(outcome.status, ExitStatus::Completed);
    assert_eq!(String::from_utf8(outcome.output).unwrap(), "9\n");

    let log = log.lock().unwrap();
    assert_eq!(
        log.pauses,
        vec![
            Pause {
                line: Some(2),
                frames: vec!["outer".to_string(), "inner".to_string()],
                reason: Some(PauseReason::Breakpoint),
            };
            2
        ]
    );
    assert_eq!(
        log.messages,
        vec!["#0 inner (called from line 5)\n#1 outer (called from line 7)\n#2 <top level>"]
    );
}

#[test]
fn step_over_stays_at_top_level() {
    let (outcome, log) = debug_run(NESTED, Behavior::Script, &["n", "n", "n"], |s| s.stop_on_entry());
    assert_eq!(outcome.status, ExitStatus::Completed);
    assert_eq!(pause_lines(&log), vec![(Some(0), 0), (Some(6), 0)]);
    assert_eq!(outcome.session.depth(), 0);
}

#[test]
fn step_in_enters_functions() {
    let (outcome, log) = debug_run(NESTED, Behavior::Script, &["s", "s", "s", "c"], |s| s.stop_on_entry());
    assert_eq!(outcome.status, ExitStatus::Completed);
    assert_eq!(
        pause_lines(&log),
        vec![(Some(0), 0), (Some(6), 0), (Some(6), 1), (Some(1), 1)]
    );
    assert_eq!(log.lock().unwrap().pauses[2].reason, Some(PauseReason::Call));
}

#[test]
fn step_out_returns_to_caller() {
    let src = r#"function outer(n) {
  function inner(m) {
    return m * 2;
  }
  let r = inner(n);
  return r + 1;
}
console.log(outer(4));
"#;
    let (outcome, log) = debug_run(src, Behavior::Script, &["o", "c"], |s| {
        s.set_breakpoint(3).unwrap();
    });
    assert_eq!(pause_lines(&log), vec![(Some(2), 2), (Some(5), 1)]);
    assert_eq!(String::from_utf8(outcome.output).unwrap(), "9\n");
}

#[test]
fn one_line_if_pauses_once_per_execution() {
    let src = "let x = 1;\nif (x) { console.log(x); }\nconsole.log(2);\n";
    let (outcome, log) = debug_run(src, Behavior::Script, &["c", "c", "c"], |s| {
        s.set_breakpoint(2).unwrap();
    });
    assert_eq!(pause_lines(&log), vec![(Some(1), 0)]);
    assert_eq!(String::from_utf8(outcome.output).unwrap(), "1\n2\n");

    let (_, log) = debug_run(src, Behavior::Script, &["n", "n", "c"], |s| {
        s.set_breakpoint(2).unwrap();
    });
    assert_eq!(pause_lines(&log), vec![(Some(1), 0), (Some(2), 0)]);
}

#[test]
fn breakpoints_can_be_added_while_paused() {
    let (_, log) = debug_run(NESTED, Behavior::Script, &["b 3", "b 4", "c", "c"], |s| s.stop_on_entry());
    assert_eq!(pause_lines(&log), vec![(Some(0), 0), (Some(0), 0), (Some(0), 0), (Some(2), 2)]);
    let log = log.lock().unwrap();
    assert_eq!(log.messages[0], "breakpoint set on line 3");
    assert_eq!(log.messages[1], "line 4 has no statement to stop at");
}

#[test]
fn quit_aborts_the_program() {
    let (outcome, log) = debug_run(NESTED, Behavior::Script, &["q"], |s| {
        s.set_breakpoint(3).unwrap();
    });
    assert_eq!(outcome.status, ExitStatus::Quit);
    assert!(outcome.output.is_empty());
    assert_eq!(log.lock().unwrap().pauses.len(), 1);
}

#[test]
fn end_of_input_runs_to_completion() {
    let (outcome, log) = debug_run(NESTED, Behavior::Script, &[], |s| {
        s.stop_on_entry();
        s.set_breakpoint(3).unwrap();
    });
    assert_eq!(outcome.status, ExitStatus::Completed);
    assert_eq!(pause_lines(&log), vec![(Some(0), 0)]);
    assert!(outcome.session.is_detached());
    assert_eq!(outcome.session.output_lines().collect::<Vec<_>>(), vec!["9"]);
}

#[test]
fn frontend_errors_resume_execution() {
    let (outcome, _) = debug_run(NESTED, Behavior::Fail, &[], |s| s.stop_on_entry());
    assert_eq!(outcome.status, ExitStatus::Completed);
    assert_eq!(String::from_utf8(outcome.output).unwrap(), "9\n");
    assert_eq!(outcome.session.warnings().len(), 1);
    assert!(outcome.session.warnings()[0].contains("terminal went away"));
}

#[test]
fn frontend_panics_resume_execution() {
    let (outcome, _) = debug_run(NESTED, Behavior::Panic, &[], |s| s.stop_on_entry());
    assert_eq!(outcome.status, ExitStatus::Completed);
    assert!(outcome.session.warnings()[0].contains("frontend bug"));
}

#[test]
fn trap_is_reported_in_outcome() {
    let src = "let x = 1;\nx();\n";
    let (outcome, _) = debug_run(src, Behavior::Script, &[], |_| {});
    assert!(matches!(outcome.status, ExitStatus::Trapped(_)));
}

#[test]
fn unknown_commands_are_reported() {
    let (_, log) = debug_run(NESTED, Behavior::Script, &["jump", "c"], |s| s.stop_on_entry());
    let log = log.lock().unwrap();
    assert_eq!(log.messages, vec!["unknown command 'jump', type 'help' for a list"]);
}
