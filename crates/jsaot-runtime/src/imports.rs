//! Host functions imported by generated modules (`env.*`).

use std::io::Write;

use jsaot_codegen_wasm::abi;
use wasmtime::{Caller, Extern, Linker, Memory, StoreLimits, Val};

use crate::debugger::Debugger;
use crate::error::RuntimeError;
use crate::format::format_number;

const PAGE_SIZE: u64 = 65536;

/// Where `console.log` output goes.
#[derive(Debug)]
pub enum Console {
    Stdout,
    Buffer(Vec<u8>),
}

impl Console {
    pub fn buffer() -> Self {
        Console::Buffer(Vec::new())
    }

    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Console::Stdout => std::io::stdout().lock().write_all(bytes),
            Console::Buffer(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    pub(crate) fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Console::Stdout => std::io::stdout().flush(),
            Console::Buffer(_) => Ok(()),
        }
    }

    /// Captured bytes; empty for stdout.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Console::Stdout => Vec::new(),
            Console::Buffer(buf) => buf,
        }
    }
}

/// Store data shared by every host function.
pub(crate) struct HostState {
    pub(crate) console: Console,
    pub(crate) debugger: Option<Debugger>,
    pub(crate) limits: StoreLimits,
    /// Bytes handed out by `alloc`.
    pub(crate) allocated: u64,
    pub(crate) allocations: u64,
}

impl HostState {
    pub(crate) fn new(console: Console, debugger: Option<Debugger>, limits: StoreLimits) -> Self {
        Self {
            console,
            debugger,
            limits,
            allocated: 0,
            allocations: 0,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> wasmtime::Result<()> {
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.record_output(&String::from_utf8_lossy(bytes));
        }
        self.console
            .write(bytes)
            .map_err(|e| wasmtime::Error::msg(format!("console write failed: {e}")))
    }
}

fn memory(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<Memory> {
    caller
        .get_export(abi::MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .ok_or_else(|| wasmtime::Error::msg("missing memory export"))
}

fn heap_ptr(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<u32> {
    let global = caller
        .get_export(abi::HEAP_BASE_EXPORT)
        .and_then(Extern::into_global)
        .ok_or_else(|| wasmtime::Error::msg("missing __heap_base global"))?;
    match global.get(&mut *caller) {
        Val::I32(v) => Ok(v as u32),
        _ => Err(wasmtime::Error::msg("__heap_base is not i32")),
    }
}

fn set_heap_ptr(caller: &mut Caller<'_, HostState>, ptr: u32) -> wasmtime::Result<()> {
    let global = caller
        .get_export(abi::HEAP_BASE_EXPORT)
        .and_then(Extern::into_global)
        .ok_or_else(|| wasmtime::Error::msg("missing __heap_base global"))?;
    global.set(&mut *caller, Val::I32(ptr as i32))
}

/// Bump allocation from `__heap_base`. Blocks are 8-byte aligned and zeroed,
/// memory grows on demand and is never freed.
fn alloc(caller: &mut Caller<'_, HostState>, size: i32) -> wasmtime::Result<i32> {
    let size = u32::try_from(size).map_err(|_| wasmtime::Error::msg(format!("invalid allocation size {size}")))?;
    let start = heap_ptr(caller)?.next_multiple_of(8);
    let end = start
        .checked_add(size)
        .ok_or_else(|| wasmtime::Error::msg("out of memory"))?;

    let memory = memory(caller)?;
    let current = memory.data_size(&*caller) as u64;
    if u64::from(end) > current {
        let pages = (u64::from(end) - current).div_ceil(PAGE_SIZE);
        memory
            .grow(&mut *caller, pages)
            .map_err(|_| wasmtime::Error::msg("out of memory"))?;
        tracing::trace!(pages, "grew linear memory");
    }
    memory.data_mut(&mut *caller)[start as usize..end as usize].fill(0);
    set_heap_ptr(caller, end)?;

    let state = caller.data_mut();
    state.allocated += u64::from(size);
    state.allocations += 1;
    Ok(start as i32)
}

/// JavaScript `%`: the remainder truncated toward zero, with the sign of the
/// dividend. NaN results lose any payload so `undefined % x` is plain NaN.
fn fmod(a: f64, b: f64) -> f64 {
    let rem = a % b;
    if rem.is_nan() { f64::NAN } else { rem }
}

fn console_write(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> wasmtime::Result<()> {
    let start = ptr as u32 as usize;
    let end = start + len as u32 as usize;
    let memory = memory(caller)?;
    let bytes = memory
        .data(&*caller)
        .get(start..end)
        .ok_or_else(|| wasmtime::Error::msg("console_write out of bounds"))?
        .to_vec();
    caller.data_mut().write(&bytes)
}

/// Register every `env.*` import. Marker imports are harmless for release
/// builds, which never import them, and no-ops when no debugger is attached.
pub(crate) fn define_imports(linker: &mut Linker<HostState>) -> Result<(), RuntimeError> {
    let link_err = |name: &'static str| move |e: wasmtime::Error| RuntimeError::Link {
        name,
        message: e.to_string(),
    };

    // env.alloc(i32) -> i32
    linker
        .func_wrap(
            abi::IMPORT_MODULE,
            abi::ALLOC,
            |mut caller: Caller<'_, HostState>, size: i32| -> wasmtime::Result<i32> {
                alloc(&mut caller, size)
            },
        )
        .map_err(link_err(abi::ALLOC))?;

    // env.console_write(i32 ptr, i32 len)
    linker
        .func_wrap(
            abi::IMPORT_MODULE,
            abi::CONSOLE_WRITE,
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
                console_write(&mut caller, ptr, len)
            },
        )
        .map_err(link_err(abi::CONSOLE_WRITE))?;

    // env.write_number(f64)
    linker
        .func_wrap(
            abi::IMPORT_MODULE,
            abi::WRITE_NUMBER,
            |mut caller: Caller<'_, HostState>, value: f64| -> wasmtime::Result<()> {
                let text = format_number(value);
                caller.data_mut().write(text.as_bytes())
            },
        )
        .map_err(link_err(abi::WRITE_NUMBER))?;

    // env.fmod(f64, f64) -> f64
    linker
        .func_wrap(abi::IMPORT_MODULE, abi::FMOD, |a: f64, b: f64| -> f64 { fmod(a, b) })
        .map_err(link_err(abi::FMOD))?;

    // env.line_marker(i32 line)
    linker
        .func_wrap(
            abi::IMPORT_MODULE,
            abi::LINE_MARKER,
            |mut caller: Caller<'_, HostState>, line: i32| -> wasmtime::Result<()> {
                match caller.data_mut().debugger.as_mut() {
                    Some(debugger) => debugger.on_line(line as u32).map_err(wasmtime::Error::new),
                    None => Ok(()),
                }
            },
        )
        .map_err(link_err(abi::LINE_MARKER))?;

    // env.call_marker(i32 debug_id)
    linker
        .func_wrap(
            abi::IMPORT_MODULE,
            abi::CALL_MARKER,
            |mut caller: Caller<'_, HostState>, debug_id: i32| -> wasmtime::Result<()> {
                match caller.data_mut().debugger.as_mut() {
                    Some(debugger) => debugger.on_call(debug_id as u32).map_err(wasmtime::Error::new),
                    None => Ok(()),
                }
            },
        )
        .map_err(link_err(abi::CALL_MARKER))?;

    // env.exit_marker(i32 debug_id)
    linker
        .func_wrap(
            abi::IMPORT_MODULE,
            abi::EXIT_MARKER,
            |mut caller: Caller<'_, HostState>, debug_id: i32| {
                if let Some(debugger) = caller.data_mut().debugger.as_mut() {
                    debugger.on_exit(debug_id as u32);
                }
            },
        )
        .map_err(link_err(abi::EXIT_MARKER))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmod_matches_javascript_remainder() {
        assert_eq!(fmod(7.0, 3.0), 1.0);
        assert_eq!(fmod(-5.0, 3.0), -2.0);
        assert_eq!(fmod(5.0, f64::INFINITY), 5.0);
        assert_eq!(fmod(1e17, 3.0), 1.0);
        assert_eq!(fmod(5.5, 2.0), 1.5);
        assert!(fmod(-0.0, 1.0).is_sign_negative());
        assert!(fmod(1.0, 0.0).is_nan());
        assert!(fmod(f64::INFINITY, 2.0).is_nan());
    }

    #[test]
    fn fmod_of_undefined_is_plain_nan() {
        let result = fmod(abi::undefined(), 2.0);
        assert!(result.is_nan());
        assert!(!abi::is_undefined(result));
    }
}
