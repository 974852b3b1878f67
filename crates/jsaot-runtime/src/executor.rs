use jsaot_codegen_wasm::{CompiledModule, abi};
use wasmtime::{Config, Engine, Linker, Module, Store, StoreLimitsBuilder};

use crate::debugger::{DebugSession, Debugger, SessionQuit};
use crate::error::RuntimeError;
use crate::imports::{Console, HostState, define_imports};

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutput {
    /// Captured console output; empty when writing to stdout.
    pub output: Vec<u8>,
    /// Bytes allocated for closure contexts.
    pub allocated: u64,
    pub allocations: u64,
}

impl RunOutput {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// How a debug run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Completed,
    Trapped(String),
    /// The user quit from the debugger.
    Quit,
}

#[derive(Debug)]
pub struct DebugOutcome {
    pub status: ExitStatus,
    pub session: DebugSession,
    pub output: Vec<u8>,
}

/// Loads compiled modules into wasmtime and runs `_start`.
pub struct Executor {
    engine: Engine,
    memory_limit: Option<usize>,
}

impl Executor {
    pub fn new() -> Result<Self, RuntimeError> {
        let mut config = Config::new();
        // Arithmetic on the `undefined` NaN must produce an ordinary NaN
        config.cranelift_nan_canonicalization(true);
        let engine = Engine::new(&config).map_err(|e| RuntimeError::Engine(e.to_string()))?;
        Ok(Self {
            engine,
            memory_limit: None,
        })
    }

    /// Cap linear memory; allocations beyond it trap with "out of memory".
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Run a module to completion. Traps become [`RuntimeError::Trap`].
    pub fn run(&self, module: &CompiledModule, console: Console) -> Result<RunOutput, RuntimeError> {
        let (state, result) = self.execute(module, HostState::new(console, None, self.limits()))?;
        let HostState {
            mut console,
            allocated,
            allocations,
            ..
        } = state;
        console.flush()?;
        result.map_err(|e| RuntimeError::Trap(trap_message(&e)))?;
        Ok(RunOutput {
            output: console.into_bytes(),
            allocated,
            allocations,
        })
    }

    /// Run a debug build under `debugger`. Console output is captured and
    /// returned with the final session; traps and quitting are reported in
    /// the outcome rather than as errors.
    pub fn run_debug(&self, module: &CompiledModule, debugger: Debugger) -> Result<DebugOutcome, RuntimeError> {
        if !module.is_debug() {
            tracing::warn!("running a release build under the debugger; no markers will fire");
        }
        let state = HostState::new(Console::buffer(), Some(debugger), self.limits());
        let (state, result) = self.execute(module, state)?;
        let status = match result {
            Ok(()) => ExitStatus::Completed,
            Err(e) if e.downcast_ref::<SessionQuit>().is_some() => ExitStatus::Quit,
            Err(e) => ExitStatus::Trapped(trap_message(&e)),
        };

        let mut debugger = state
            .debugger
            .ok_or_else(|| RuntimeError::Trap("debugger detached from the store".to_string()))?;
        if status != ExitStatus::Quit {
            debugger.finish();
        }
        Ok(DebugOutcome {
            status,
            session: debugger.into_session(),
            output: state.console.into_bytes(),
        })
    }

    fn limits(&self) -> wasmtime::StoreLimits {
        let builder = StoreLimitsBuilder::new();
        match self.memory_limit {
            Some(bytes) => builder.memory_size(bytes).build(),
            None => builder.build(),
        }
    }

    /// Instantiate and call `_start`. Setup failures are errors; the outcome
    /// of the call is returned alongside the store data.
    fn execute(
        &self,
        module: &CompiledModule,
        state: HostState,
    ) -> Result<(HostState, wasmtime::Result<()>), RuntimeError> {
        let wasm_module =
            Module::new(&self.engine, &module.wasm).map_err(|e| RuntimeError::Load(format!("{e:#}")))?;

        let mut store = Store::new(&self.engine, state);
        store.limiter(|state| &mut state.limits);
        let mut linker = Linker::new(&self.engine);
        define_imports(&mut linker)?;

        let instance = linker
            .instantiate(&mut store, &wasm_module)
            .map_err(|e| RuntimeError::Instantiate(format!("{e:#}")))?;
        let start = instance
            .get_typed_func::<(), ()>(&mut store, abi::START_EXPORT)
            .map_err(|_| RuntimeError::MissingExport(abi::START_EXPORT))?;

        tracing::debug!(bytes = module.wasm.len(), debug = module.is_debug(), "running module");
        let result = start.call(&mut store, ());
        if let Err(e) = &result {
            tracing::debug!(error = %trap_message(e), "module trapped");
        }
        Ok((store.into_data(), result))
    }
}

/// The trap or host error that stopped execution, without wasm backtraces.
fn trap_message(err: &wasmtime::Error) -> String {
    match err.downcast_ref::<wasmtime::Trap>() {
        Some(trap) => trap.to_string(),
        None => err.root_cause().to_string(),
    }
}
