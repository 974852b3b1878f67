use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use jsaot_codegen_wasm::CompileOptions;
use jsaot_runtime::{Console, DebugSession, Debugger, Executor, ExitStatus, TerminalRepl};
use tracing_subscriber::EnvFilter;

mod oracle;
mod pipeline;

fn print_usage() {
    eprintln!("jsaot - ahead-of-time JavaScript to WebAssembly compiler");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  jsaot build <file.js> [-o out.wasm] [--debug]   Compile to a .wasm module");
    eprintln!("  jsaot run <file.js>                             Compile and execute");
    eprintln!("  jsaot debug <file.js> [--break N]...            Execute under the debugger");
    eprintln!("  jsaot captures <file.js>                        Print captured variables");
    eprintln!("  jsaot test [--filter S] [--fixtures DIR]        Run the regression fixtures");
    eprintln!();
    eprintln!("Set JSAOT_LOG (e.g. JSAOT_LOG=debug) to control log output on stderr.");
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("JSAOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Compile `input` or print the error.
fn compile_file(input: &Path, options: CompileOptions) -> Option<(String, jsaot_codegen_wasm::CompiledModule)> {
    let compiled = pipeline::read_source(input)
        .and_then(|source| pipeline::compile(&source, options).map(|module| (source, module)));
    match compiled {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            eprintln!("{e}");
            None
        }
    }
}

fn cmd_build(args: &[String]) -> i32 {
    let mut input = None;
    let mut output = None;
    let mut debug = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-o" => {
                let Some(path) = args.get(i + 1) else {
                    eprintln!("Missing value for -o");
                    return 1;
                };
                output = Some(PathBuf::from(path));
                i += 1;
            }
            "--debug" => debug = true,
            arg if input.is_none() && !arg.starts_with('-') => input = Some(PathBuf::from(arg)),
            other => {
                eprintln!("Unknown argument for build: {other}");
                return 1;
            }
        }
        i += 1;
    }
    let Some(input) = input else {
        print_usage();
        return 1;
    };
    let output = output.unwrap_or_else(|| input.with_extension("wasm"));

    let Some((_, module)) = compile_file(&input, CompileOptions { debug }) else {
        return 1;
    };
    if let Err(e) = fs::write(&output, &module.wasm) {
        eprintln!("Failed to write {}: {e}", output.display());
        return 1;
    }
    println!(
        "Compiled {} -> {} ({} bytes, {} functions{})",
        input.display(),
        output.display(),
        module.wasm.len(),
        module.table.len(),
        if debug { ", debug" } else { "" }
    );
    0
}

fn cmd_run(args: &[String]) -> i32 {
    let [input] = args else {
        print_usage();
        return 1;
    };
    let Some((_, module)) = compile_file(Path::new(input), CompileOptions::default()) else {
        return 1;
    };
    let result = Executor::new().and_then(|executor| executor.run(&module, Console::Stdout));
    match result {
        Ok(output) => {
            tracing::debug!(allocated = output.allocated, allocations = output.allocations, "run finished");
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn cmd_debug(args: &[String]) -> i32 {
    let mut input = None;
    let mut breakpoints = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--break" | "-b" => {
                let Some(line) = args.get(i + 1).and_then(|v| v.parse::<u32>().ok()) else {
                    eprintln!("--break expects a line number");
                    return 1;
                };
                breakpoints.push(line);
                i += 1;
            }
            arg if input.is_none() && !arg.starts_with('-') => input = Some(PathBuf::from(arg)),
            other => {
                eprintln!("Unknown argument for debug: {other}");
                return 1;
            }
        }
        i += 1;
    }
    let Some(input) = input else {
        print_usage();
        return 1;
    };

    let Some((source, module)) = compile_file(&input, CompileOptions { debug: true }) else {
        return 1;
    };
    let Some(info) = module.debug_info.clone() else {
        eprintln!("Debug build produced no debug info");
        return 1;
    };

    let mut session = DebugSession::new(&source, info);
    let mut armed = 0;
    for line in breakpoints {
        match session.set_breakpoint(line) {
            Ok(()) => armed += 1,
            Err(e) => eprintln!("warning: {e}"),
        }
    }
    if armed == 0 {
        session.stop_on_entry();
    }

    let debugger = Debugger::new(session, TerminalRepl::stdio());
    let outcome = match Executor::new().and_then(|executor| executor.run_debug(&module, debugger)) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    for warning in outcome.session.warnings() {
        eprintln!("warning: {warning}");
    }
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(&outcome.output).and_then(|_| stdout.flush()) {
        eprintln!("Output error: {e}");
        return 1;
    }
    match outcome.status {
        ExitStatus::Completed | ExitStatus::Quit => 0,
        ExitStatus::Trapped(message) => {
            eprintln!("Execution failed: {message}");
            1
        }
    }
}

fn cmd_captures(args: &[String]) -> i32 {
    let [input] = args else {
        print_usage();
        return 1;
    };
    let report = pipeline::read_source(Path::new(input)).and_then(|source| pipeline::capture_report(&source));
    match report {
        Ok(report) => {
            print!("{report}");
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let rest = &args[2..];
    let code = match args[1].as_str() {
        "build" => cmd_build(rest),
        "run" => cmd_run(rest),
        "debug" => cmd_debug(rest),
        "captures" => cmd_captures(rest),
        "test" => oracle::cmd_test(rest),
        "help" | "-h" | "--help" => {
            print_usage();
            0
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            1
        }
    };
    process::exit(code);
}
