pub mod abi;
mod codegen;

pub use codegen::{CodegenError, CompileOptions, CompiledModule, TableEntry, WasmCodegen};
