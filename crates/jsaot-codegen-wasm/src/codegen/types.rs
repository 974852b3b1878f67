use std::collections::HashMap;

use jsaot_parser::FuncId;
use jsaot_passes::{CaptureAnalysis, FunctionScope};
use wasm_encoder::ValType;

/// Where a name's value lives, seen from the function being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Binding {
    Local(u32),
    Global(u32),
    /// Cell `slot` of the context owned by `owner`
    Cell { owner: FuncId, slot: u32 },
    /// Top-level function, called directly
    Function(FuncId),
    Builtin,
}

#[derive(Clone, Copy)]
pub(super) struct LoopInfo {
    /// Label depth for `break` (the outer block)
    pub(super) break_depth: u32,
    /// Label depth for `continue`
    pub(super) continue_depth: u32,
}

/// Context for compiling a single function body (or `_start`)
pub(super) struct FuncCtx<'a> {
    pub(super) analysis: &'a CaptureAnalysis,
    /// `None` while compiling top-level code
    pub(super) scope: Option<&'a FunctionScope>,
    /// Debug id of the function, for exit markers
    pub(super) debug_id: Option<u32>,
    /// Map from variable name to local index
    pub(super) locals: HashMap<String, u32>,
    /// Next local index to assign
    next_local: u32,
    /// Additional locals declared in the body (beyond parameters)
    pub(super) extra_locals: Vec<ValType>,
    /// Local holding the env pointer; `None` at top level (env is 0)
    pub(super) env: Option<u32>,
    /// Shared f64 temp used only between computing a value and storing it
    store_temp: Option<u32>,
    /// Current nesting depth of break/continue targets.
    pub(super) loop_depth_stack: Vec<LoopInfo>,
    /// Current block nesting depth (incremented for every block/loop/if)
    pub(super) block_depth: u32,
}

impl<'a> FuncCtx<'a> {
    pub(super) fn new(analysis: &'a CaptureAnalysis, scope: Option<&'a FunctionScope>) -> Self {
        Self {
            analysis,
            scope,
            debug_id: None,
            locals: HashMap::new(),
            next_local: 0,
            extra_locals: Vec::new(),
            env: None,
            store_temp: None,
            loop_depth_stack: Vec::new(),
            block_depth: 0,
        }
    }

    pub(super) fn func_id(&self) -> Option<FuncId> {
        self.scope.map(|scope| scope.id)
    }

    /// Parameters come first; pass `None` for the hidden env parameter.
    pub(super) fn add_param(&mut self, name: Option<&str>) -> u32 {
        let idx = self.next_local;
        if let Some(name) = name {
            self.locals.insert(name.to_string(), idx);
        }
        self.next_local += 1;
        idx
    }

    pub(super) fn declare_local(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.locals.get(name) {
            return idx;
        }
        let idx = self.alloc_anonymous_local(ValType::F64);
        self.locals.insert(name.to_string(), idx);
        idx
    }

    pub(super) fn alloc_anonymous_local(&mut self, ty: ValType) -> u32 {
        let idx = self.next_local;
        self.next_local += 1;
        self.extra_locals.push(ty);
        idx
    }

    pub(super) fn store_temp(&mut self) -> u32 {
        match self.store_temp {
            Some(idx) => idx,
            None => {
                let idx = self.alloc_anonymous_local(ValType::F64);
                self.store_temp = Some(idx);
                idx
            }
        }
    }

    pub(super) fn get_local(&self, name: &str) -> Option<u32> {
        self.locals.get(name).copied()
    }

    /// Local declarations for `Function::new`
    pub(super) fn local_decls(&self) -> Vec<(u32, ValType)> {
        self.extra_locals.iter().map(|ty| (1u32, *ty)).collect()
    }
}
