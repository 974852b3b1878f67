use super::*;

impl WasmCodegen {
    /// Compile one user function into a wasm Function of the shared closure
    /// type. Parameter slots past the declared ones are never read.
    pub(super) fn compile_function(
        &self,
        func: &Function,
        analysis: &CaptureAnalysis,
    ) -> Result<WasmFunction, CodegenError> {
        let scope = analysis
            .function(func.id)
            .ok_or_else(|| internal(format!("no analysis for function {}", func.id)))?;
        let mut ctx = FuncCtx::new(analysis, Some(scope));
        ctx.debug_id = func.debug_id;

        let incoming_env = ctx.add_param(None);
        for param in &func.params {
            ctx.add_param(Some(&param.name));
        }
        for _ in func.params.len()..self.max_arity {
            ctx.add_param(None);
        }
        for name in scope.body_locals() {
            if !scope.captured.contains_key(name) {
                ctx.declare_local(name);
            }
        }
        ctx.env = Some(if scope.owns_context() {
            ctx.alloc_anonymous_local(ValType::I32)
        } else {
            incoming_env
        });

        // Locals are only known once the body is compiled, so emit into a
        // scratch function and move the instruction bytes afterwards.
        let mut scratch = WasmFunction::new(Vec::new());
        let mut insn = scratch.instructions();

        if scope.owns_context() {
            self.emit_context_alloc(scope, incoming_env, &mut insn, &ctx)?;
        }
        for name in scope.body_locals() {
            if let Some(idx) = ctx.get_local(name) {
                insn.f64_const(abi::undefined());
                insn.local_set(idx);
            }
        }
        // Hoisted function declarations exist before the first statement runs
        for (name, id) in &scope.hoisted {
            self.emit_function_value(*id, true, &mut insn, &ctx);
            self.emit_store(name, &func.span, false, &mut insn, &mut ctx)?;
        }

        match &func.body {
            FunctionBody::Block(block) => {
                self.compile_stmts(&block.body, &mut insn, &mut ctx)?;
                self.emit_exit_marker(&mut insn, &ctx)?;
                insn.f64_const(abi::undefined());
            }
            FunctionBody::Expr(expr) => {
                self.compile_expr(expr, &mut insn, &mut ctx)?;
                self.emit_exit_marker(&mut insn, &ctx)?;
            }
        }
        insn.end();

        tracing::trace!(
            function = %func.id,
            name = %scope.name,
            locals = ctx.extra_locals.len(),
            context = scope.owns_context(),
            "compiled function"
        );
        Ok(finalize_function(scratch, &ctx))
    }

    /// Compile top-level statements into `_start`.
    pub(super) fn compile_start(
        &self,
        program: &Program,
        analysis: &CaptureAnalysis,
    ) -> Result<WasmFunction, CodegenError> {
        let mut ctx = FuncCtx::new(analysis, None);
        let mut scratch = WasmFunction::new(Vec::new());
        let mut insn = scratch.instructions();

        self.compile_stmts(&program.body, &mut insn, &mut ctx)?;
        insn.end();

        Ok(finalize_function(scratch, &ctx))
    }

    /// `exit_marker(debug_id)` in debug builds; leaves the stack untouched.
    pub(super) fn emit_exit_marker(&self, insn: &mut InstructionSink<'_>, ctx: &FuncCtx) -> Result<(), CodegenError> {
        if !self.options.debug {
            return Ok(());
        }
        let Some(debug_id) = ctx.debug_id else {
            return Ok(());
        };
        let exit_marker = self
            .import_index(abi::EXIT_MARKER)
            .ok_or_else(|| internal("exit_marker is not imported"))?;
        insn.i32_const(debug_id as i32);
        insn.call(exit_marker);
        Ok(())
    }
}

/// A scratch function's raw body starts with a single 0x00 byte (no local
/// declarations). Strip it and prepend the locals collected in `ctx`.
fn finalize_function(scratch: WasmFunction, ctx: &FuncCtx) -> WasmFunction {
    let raw = scratch.into_raw_body();
    let mut func = WasmFunction::new(ctx.local_decls());
    func.raw(raw[1..].iter().copied());
    func
}
