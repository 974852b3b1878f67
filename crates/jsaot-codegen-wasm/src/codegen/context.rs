//! Closure contexts: name binding, parent-chain walks and cell access.

use super::*;

fn i32_mem(offset: u64) -> MemArg {
    MemArg {
        offset,
        align: 2,
        memory_index: 0,
    }
}

fn f64_mem(offset: u64) -> MemArg {
    MemArg {
        offset,
        align: 3, // 2^3 = 8 byte alignment
        memory_index: 0,
    }
}

impl WasmCodegen {
    /// Decide where `name` lives from the function being compiled.
    pub(super) fn binding(&self, name: &str, span: &Span, ctx: &FuncCtx) -> Result<Binding, CodegenError> {
        let resolution = ctx
            .analysis
            .resolve(ctx.func_id(), name)
            .ok_or_else(|| internal(format!("'{name}' at line {} was not resolved", span.line)))?;
        match resolution {
            Resolution::Local => ctx
                .get_local(name)
                .map(Binding::Local)
                .ok_or_else(|| internal(format!("no local slot for '{name}'"))),
            Resolution::Captured { owner } => {
                let slot = ctx
                    .analysis
                    .slot_of(owner, name)
                    .ok_or_else(|| internal(format!("no context slot for '{name}' in {owner}")))?;
                Ok(Binding::Cell { owner, slot })
            }
            Resolution::Global => self
                .global_map
                .get(name)
                .copied()
                .map(Binding::Global)
                .ok_or_else(|| internal(format!("no global for '{name}'"))),
            Resolution::GlobalFunction => ctx
                .analysis
                .global_function(name)
                .map(Binding::Function)
                .ok_or_else(|| internal(format!("no function named '{name}'"))),
            Resolution::Builtin => Ok(Binding::Builtin),
        }
    }

    /// Number of parent links between the current env and `owner`'s context:
    /// one per context-owning function from the current one (inclusive) up to
    /// `owner` (exclusive).
    pub(super) fn context_hops(&self, owner: FuncId, ctx: &FuncCtx) -> Result<u32, CodegenError> {
        let mut current = ctx
            .func_id()
            .ok_or_else(|| internal(format!("top-level code cannot reach the context of {owner}")))?;
        let mut hops = 0;
        while current != owner {
            let scope = ctx
                .analysis
                .function(current)
                .ok_or_else(|| internal(format!("unknown function {current}")))?;
            if scope.owns_context() {
                hops += 1;
            }
            current = scope
                .parent
                .ok_or_else(|| internal(format!("{owner} does not enclose the current function")))?;
        }
        Ok(hops)
    }

    /// Push the env pointer the current function runs with.
    pub(super) fn emit_env(&self, insn: &mut InstructionSink<'_>, ctx: &FuncCtx) {
        match ctx.env {
            Some(env) => {
                insn.local_get(env);
            }
            None => {
                insn.i32_const(0);
            }
        }
    }

    /// Push the base address of `owner`'s context.
    fn emit_context_of(&self, owner: FuncId, insn: &mut InstructionSink<'_>, ctx: &FuncCtx) -> Result<(), CodegenError> {
        let hops = self.context_hops(owner, ctx)?;
        self.emit_env(insn, ctx);
        for _ in 0..hops {
            insn.i32_load(i32_mem(0));
        }
        Ok(())
    }

    /// Allocate the current function's context and link it to the incoming env.
    /// Captured parameters are copied into their cells, other cells start undefined.
    pub(super) fn emit_context_alloc(
        &self,
        scope: &FunctionScope,
        incoming_env: u32,
        insn: &mut InstructionSink<'_>,
        ctx: &FuncCtx,
    ) -> Result<(), CodegenError> {
        let env = ctx.env.ok_or_else(|| internal("context allocated without an env local"))?;
        let alloc = self
            .import_index(abi::ALLOC)
            .ok_or_else(|| internal("alloc is not imported"))?;

        insn.i32_const(abi::context_size(scope.captured.len()) as i32);
        insn.call(alloc);
        insn.local_set(env);

        insn.local_get(env);
        insn.local_get(incoming_env);
        insn.i32_store(i32_mem(0));

        for (slot, name) in scope.captured.keys().enumerate() {
            insn.local_get(env);
            match ctx.get_local(name) {
                Some(param) if scope.params.contains(name) => {
                    insn.local_get(param);
                }
                _ => {
                    insn.f64_const(abi::undefined());
                }
            }
            insn.f64_store(f64_mem(abi::cell_offset(slot as u32)));
        }
        Ok(())
    }

    /// Push the value bound to `name`.
    pub(super) fn emit_load(
        &self,
        name: &str,
        span: &Span,
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        match self.binding(name, span, ctx)? {
            Binding::Local(idx) => {
                insn.local_get(idx);
            }
            Binding::Global(idx) => {
                insn.global_get(idx);
            }
            Binding::Cell { owner, slot } => {
                self.emit_context_of(owner, insn, ctx)?;
                insn.f64_load(f64_mem(abi::cell_offset(slot)));
            }
            Binding::Function(id) => self.emit_function_value(id, false, insn, ctx),
            Binding::Builtin => match name {
                "undefined" => {
                    insn.f64_const(abi::undefined());
                }
                "NaN" => {
                    insn.f64_const(f64::NAN);
                }
                "Infinity" => {
                    insn.f64_const(f64::INFINITY);
                }
                other => return Err(unsupported(format!("use of '{other}' as a value"), span)),
            },
        }
        Ok(())
    }

    /// Store the f64 on top of the stack into `name`; with `keep` the value
    /// stays on the stack as the expression result.
    pub(super) fn emit_store(
        &self,
        name: &str,
        span: &Span,
        keep: bool,
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        match self.binding(name, span, ctx)? {
            Binding::Local(idx) => {
                if keep {
                    insn.local_tee(idx);
                } else {
                    insn.local_set(idx);
                }
            }
            Binding::Global(idx) => {
                insn.global_set(idx);
                if keep {
                    insn.global_get(idx);
                }
            }
            Binding::Cell { owner, slot } => {
                let temp = ctx.store_temp();
                insn.local_set(temp);
                self.emit_context_of(owner, insn, ctx)?;
                insn.local_get(temp);
                insn.f64_store(f64_mem(abi::cell_offset(slot)));
                if keep {
                    insn.local_get(temp);
                }
            }
            Binding::Function(_) | Binding::Builtin => {
                return Err(unsupported(format!("assignment to '{name}'"), span));
            }
        }
        Ok(())
    }

    /// Push the function value `(slot << 32) | env` as an f64. Top-level
    /// functions and functions created at top level carry a null context.
    pub(super) fn emit_function_value(
        &self,
        id: FuncId,
        with_env: bool,
        insn: &mut InstructionSink<'_>,
        ctx: &FuncCtx,
    ) {
        let value = abi::pack_function(Self::table_slot(id), 0);
        insn.i64_const(value.to_bits() as i64);
        if with_env && ctx.env.is_some() {
            self.emit_env(insn, ctx);
            insn.i64_extend_i32_u();
            insn.i64_or();
        }
        insn.f64_reinterpret_i64();
    }
}
