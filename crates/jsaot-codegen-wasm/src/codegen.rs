use std::borrow::Cow;
use std::collections::HashMap;

use jsaot_lexer::Span;
use jsaot_parser::{
    AssignOp, BinaryOp, Expr, FuncId, Function, FunctionBody, LogicalOp, Marker, Program, Stmt,
    UnaryOp, UpdateOp, VarKind,
};
use jsaot_passes::{CaptureAnalysis, DebugInfo, FunctionScope, Resolution};

use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, DataSection, ElementSection, Elements, EntityType,
    ExportKind, ExportSection, Function as WasmFunction, FunctionSection, GlobalSection,
    GlobalType, ImportSection, InstructionSink, MemArg, MemorySection, MemoryType, Module,
    RefType, TableSection, TableType, TypeSection, ValType,
};

use crate::abi;

mod collect_functions;
mod collect_strings;
mod compile_expr;
mod compile_func;
mod compile_stmt;
mod context;
mod types;

use types::{Binding, FuncCtx, LoopInfo};

fn unsupported(construct: impl Into<String>, span: &Span) -> CodegenError {
    CodegenError::Unsupported {
        construct: construct.into(),
        line: span.line,
        column: span.column,
    }
}

fn internal(message: impl Into<String>) -> CodegenError {
    CodegenError::Internal(message.into())
}

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("Codegen error at line {line}, column {column}: unsupported {construct}")]
    Unsupported {
        construct: String,
        line: usize,
        column: usize,
    },
    #[error("Codegen error: {0}")]
    Internal(String),
}

/// Compiler switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Import the debugger markers and emit exit markers.
    pub debug: bool,
}

/// One funcref table slot. Slot 0 is left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub slot: u32,
    pub func_id: FuncId,
    pub name: String,
    pub params: usize,
}

/// A finished module plus what the runtime needs to know about it.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub wasm: Vec<u8>,
    pub table: Vec<TableEntry>,
    /// Imported host functions, in import order.
    pub imports: Vec<&'static str>,
    pub exports: Vec<&'static str>,
    /// Present for debug builds.
    pub debug_info: Option<DebugInfo>,
}

impl CompiledModule {
    pub fn is_debug(&self) -> bool {
        self.debug_info.is_some()
    }
}

/// WASM code generator: compiles an analyzed program into a module
pub struct WasmCodegen {
    options: CompileOptions,
    /// Type section entries: each is (params, results)
    types: Vec<(Vec<ValType>, Vec<ValType>)>,
    /// Imported host functions: (name, type index); function index = position
    imports: Vec<(&'static str, u32)>,
    /// Parameter count shared by every user function type
    max_arity: usize,
    /// Type index of `(i32 env, f64 x max_arity) -> f64`
    closure_type: u32,
    /// String pool: maps a string literal to (address, length) in linear memory
    string_pool: HashMap<String, (u32, u32)>,
    /// Raw bytes placed into linear memory at `abi::DATA_BASE`
    string_data: Vec<u8>,
    /// Top-level variable -> global index
    global_map: HashMap<String, u32>,
}

impl WasmCodegen {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            types: Vec::new(),
            imports: Vec::new(),
            max_arity: 0,
            closure_type: 0,
            string_pool: HashMap::new(),
            string_data: Vec::new(),
            global_map: HashMap::new(),
        }
    }

    /// Register a type and return its index
    fn add_type(&mut self, params: Vec<ValType>, results: Vec<ValType>) -> u32 {
        for (i, (p, r)) in self.types.iter().enumerate() {
            if p == &params && r == &results {
                return i as u32;
            }
        }
        let idx = self.types.len() as u32;
        self.types.push((params, results));
        idx
    }

    /// `(i32 env, f64 x arity) -> f64`. Every user function is padded to
    /// the widest parameter list so any function value fits any call site.
    fn closure_signature(arity: usize) -> Vec<ValType> {
        let mut params = vec![ValType::I32];
        params.extend(std::iter::repeat_n(ValType::F64, arity));
        params
    }

    fn add_import(&mut self, name: &'static str, params: Vec<ValType>, results: Vec<ValType>) {
        let type_idx = self.add_type(params, results);
        self.imports.push((name, type_idx));
    }

    fn import_index(&self, name: &str) -> Option<u32> {
        self.imports
            .iter()
            .position(|(import, _)| *import == name)
            .map(|i| i as u32)
    }

    fn num_imports(&self) -> u32 {
        self.imports.len() as u32
    }

    /// Wasm function index of a user function.
    fn func_index(&self, id: FuncId) -> u32 {
        self.num_imports() + id.0
    }

    /// Funcref table slot of a user function.
    fn table_slot(id: FuncId) -> u32 {
        id.0 + 1
    }

    /// Compile an analyzed (and, for debug builds, instrumented) program.
    pub fn compile(
        &mut self,
        program: &Program,
        analysis: &CaptureAnalysis,
        debug_info: Option<&DebugInfo>,
    ) -> Result<CompiledModule, CodegenError> {
        if self.options.debug && debug_info.is_none() {
            return Err(internal("debug build requested for an uninstrumented program"));
        }

        // Phase 0: string pool, function list, widest parameter list
        self.collect_strings(program);
        let functions = self.collect_functions(program)?;
        self.max_arity = functions.iter().map(|f| f.params.len()).max().unwrap_or(0);

        // Phase 1: imports
        self.add_import(abi::ALLOC, vec![ValType::I32], vec![ValType::I32]);
        self.add_import(abi::CONSOLE_WRITE, vec![ValType::I32, ValType::I32], vec![]);
        self.add_import(abi::WRITE_NUMBER, vec![ValType::F64], vec![]);
        self.add_import(abi::FMOD, vec![ValType::F64, ValType::F64], vec![ValType::F64]);
        if self.options.debug {
            self.add_import(abi::LINE_MARKER, vec![ValType::I32], vec![]);
            self.add_import(abi::CALL_MARKER, vec![ValType::I32], vec![]);
            self.add_import(abi::EXIT_MARKER, vec![ValType::I32], vec![]);
        }

        // Phase 2: the shared user function type and the start function
        self.closure_type = self.add_type(Self::closure_signature(self.max_arity), vec![ValType::F64]);
        let start_type_idx = self.add_type(vec![], vec![]);
        let start_func_idx = self.num_imports() + functions.len() as u32;

        // Globals: index 0 is __heap_base, top-level variables follow
        for (i, name) in analysis.globals().enumerate() {
            self.global_map.insert(name.to_string(), i as u32 + 1);
        }

        // Phase 3: build sections
        let mut type_section = TypeSection::new();
        for (params, results) in &self.types {
            type_section
                .ty()
                .function(params.iter().copied(), results.iter().copied());
        }

        let mut import_section = ImportSection::new();
        for (name, type_idx) in &self.imports {
            import_section.import(abi::IMPORT_MODULE, name, EntityType::Function(*type_idx));
        }

        let mut function_section = FunctionSection::new();
        let mut code_section = CodeSection::new();
        for func in &functions {
            function_section.function(self.closure_type);
            let wasm_func = self.compile_function(func, analysis)?;
            code_section.function(&wasm_func);
        }
        function_section.function(start_type_idx);
        let start = self.compile_start(program, analysis)?;
        code_section.function(&start);

        // Table section: slot 0 stays empty so calling a non-function traps
        let table_size = functions.len() as u64 + 1;
        let mut table_section = TableSection::new();
        table_section.table(TableType {
            element_type: RefType::FUNCREF,
            minimum: table_size,
            maximum: Some(table_size),
            table64: false,
            shared: false,
        });

        let mut element_section = ElementSection::new();
        if !functions.is_empty() {
            let func_indices: Vec<u32> = functions.iter().map(|f| self.func_index(f.id)).collect();
            element_section.active(
                None,
                &ConstExpr::i32_const(1),
                Elements::Functions(Cow::Owned(func_indices)),
            );
        }

        let mut memory_section = MemorySection::new();
        memory_section.memory(MemoryType {
            minimum: 1,
            maximum: None,
            memory64: false,
            shared: false,
            page_size_log2: None,
        });

        // __heap_base: first 8-aligned byte after the data segment
        let data_end = abi::DATA_BASE + self.string_data.len() as u32;
        let heap_base = (data_end + 7) & !7;
        let mut global_section = GlobalSection::new();
        global_section.global(
            GlobalType {
                val_type: ValType::I32,
                mutable: true,
                shared: false,
            },
            &ConstExpr::i32_const(heap_base as i32),
        );
        for _ in analysis.globals() {
            global_section.global(
                GlobalType {
                    val_type: ValType::F64,
                    mutable: true,
                    shared: false,
                },
                &ConstExpr::f64_const(abi::undefined()),
            );
        }

        let mut export_section = ExportSection::new();
        export_section.export(abi::START_EXPORT, ExportKind::Func, start_func_idx);
        export_section.export(abi::MEMORY_EXPORT, ExportKind::Memory, 0);
        export_section.export(abi::HEAP_BASE_EXPORT, ExportKind::Global, 0);

        let mut data_section = DataSection::new();
        if !self.string_data.is_empty() {
            let offset_expr = ConstExpr::i32_const(abi::DATA_BASE as i32);
            data_section.active(0, &offset_expr, self.string_data.iter().copied());
        }

        // Section order: type, import, function, table, memory, global, export, element, code, data
        let mut module = Module::new();
        module.section(&type_section);
        module.section(&import_section);
        module.section(&function_section);
        module.section(&table_section);
        module.section(&memory_section);
        module.section(&global_section);
        module.section(&export_section);
        if !functions.is_empty() {
            module.section(&element_section);
        }
        module.section(&code_section);
        if !self.string_data.is_empty() {
            module.section(&data_section);
        }
        let wasm = module.finish();

        tracing::debug!(
            functions = functions.len(),
            globals = self.global_map.len(),
            bytes = wasm.len(),
            debug = self.options.debug,
            "compiled module"
        );

        let table = functions
            .iter()
            .map(|f| TableEntry {
                slot: Self::table_slot(f.id),
                func_id: f.id,
                name: f.display_name(),
                params: f.params.len(),
            })
            .collect();
        Ok(CompiledModule {
            wasm,
            table,
            imports: self.imports.iter().map(|(name, _)| *name).collect(),
            exports: vec![abi::START_EXPORT, abi::MEMORY_EXPORT, abi::HEAP_BASE_EXPORT],
            debug_info: debug_info.filter(|_| self.options.debug).cloned(),
        })
    }
}
