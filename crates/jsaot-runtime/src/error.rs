/// Failures while loading or running a module.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Failed to create engine: {0}")]
    Engine(String),
    #[error("Failed to load WASM module: {0}")]
    Load(String),
    #[error("Failed to register env.{name}: {message}")]
    Link { name: &'static str, message: String },
    #[error("Failed to instantiate module: {0}")]
    Instantiate(String),
    #[error("Module does not export '{0}'")]
    MissingExport(&'static str),
    #[error("Execution failed: {0}")]
    Trap(String),
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures inside a debugger session. None of these stop the program.
#[derive(Debug, thiserror::Error)]
pub enum DebugError {
    #[error("unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),
    #[error("'{command}' expects a line number")]
    MissingLine { command: &'static str },
    #[error("'{0}' is not a line number")]
    InvalidNumber(String),
    #[error("line {0} has no statement to stop at")]
    NoStatement(u32),
    #[error("no breakpoint on line {0}")]
    NoBreakpoint(u32),
    #[error("frontend failed: {0}")]
    Frontend(String),
    #[error("frontend I/O error: {0}")]
    Io(#[from] std::io::Error),
}
