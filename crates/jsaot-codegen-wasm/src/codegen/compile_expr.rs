use super::*;

impl WasmCodegen {
    /// Compile an expression, leaving one f64 on the stack.
    pub(super) fn compile_expr(
        &self,
        expr: &Expr,
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        match expr {
            Expr::Number(value, _) => {
                insn.f64_const(*value);
            }
            Expr::Bool(value, _) => {
                insn.f64_const(if *value { 1.0 } else { 0.0 });
            }
            Expr::Str(_, span) => {
                return Err(unsupported("string value outside of console.log", span));
            }
            Expr::Ident(name, span) => self.emit_load(name, span, insn, ctx)?,
            Expr::Unary { op, operand, .. } => {
                self.compile_expr(operand, insn, ctx)?;
                match op {
                    UnaryOp::Neg => {
                        insn.f64_neg();
                    }
                    // ToNumber: turns undefined into NaN, keeps -0
                    UnaryOp::Plus => {
                        insn.f64_const(1.0);
                        insn.f64_mul();
                    }
                    UnaryOp::Not => {
                        self.emit_truthy(insn);
                        insn.i32_eqz();
                        insn.f64_convert_i32_u();
                    }
                }
            }
            Expr::Binary { left, op, right, .. } => {
                self.compile_expr(left, insn, ctx)?;
                self.compile_expr(right, insn, ctx)?;
                self.emit_binary_op(*op, insn, ctx)?;
            }
            Expr::Logical { left, op, right, .. } => {
                // value-returning short circuit: the left operand is the
                // result unless it decides to evaluate the right one
                let temp = ctx.alloc_anonymous_local(ValType::F64);
                self.compile_expr(left, insn, ctx)?;
                insn.local_tee(temp);
                self.emit_truthy(insn);
                insn.if_(BlockType::Result(ValType::F64));
                match op {
                    LogicalOp::And => {
                        self.compile_expr(right, insn, ctx)?;
                        insn.else_();
                        insn.local_get(temp);
                    }
                    LogicalOp::Or => {
                        insn.local_get(temp);
                        insn.else_();
                        self.compile_expr(right, insn, ctx)?;
                    }
                }
                insn.end();
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.compile_condition(test, insn, ctx)?;
                insn.if_(BlockType::Result(ValType::F64));
                self.compile_expr(consequent, insn, ctx)?;
                insn.else_();
                self.compile_expr(alternate, insn, ctx)?;
                insn.end();
            }
            Expr::Assign {
                op,
                target,
                value,
                span,
            } => {
                if let AssignOp::Compound(bin_op) = op {
                    self.emit_load(target, span, insn, ctx)?;
                    self.compile_expr(value, insn, ctx)?;
                    self.emit_binary_op(*bin_op, insn, ctx)?;
                } else {
                    self.compile_expr(value, insn, ctx)?;
                }
                self.emit_store(target, span, true, insn, ctx)?;
            }
            Expr::Update {
                op,
                prefix,
                target,
                span,
            } => {
                self.emit_load(target, span, insn, ctx)?;
                insn.f64_const(1.0);
                insn.f64_mul();
                let old = if *prefix {
                    None
                } else {
                    let old = ctx.alloc_anonymous_local(ValType::F64);
                    insn.local_tee(old);
                    Some(old)
                };
                insn.f64_const(1.0);
                match op {
                    UpdateOp::Increment => insn.f64_add(),
                    UpdateOp::Decrement => insn.f64_sub(),
                };
                match old {
                    None => self.emit_store(target, span, true, insn, ctx)?,
                    Some(old) => {
                        self.emit_store(target, span, false, insn, ctx)?;
                        insn.local_get(old);
                    }
                }
            }
            Expr::Call { callee, args, .. } => self.compile_call(callee, args, insn, ctx)?,
            Expr::Member { span, .. } => {
                return Err(unsupported("property access", span));
            }
            Expr::Function(func) => self.emit_function_value(func.id, true, insn, ctx),
        }
        Ok(())
    }

    /// Compile an expression used as a condition, leaving an i32 on the stack.
    pub(super) fn compile_condition(
        &self,
        expr: &Expr,
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        self.compile_expr(expr, insn, ctx)?;
        self.emit_truthy(insn);
        Ok(())
    }

    /// f64 -> i32 truthiness: `|x| > 0`, false for 0, -0, NaN and undefined.
    pub(super) fn emit_truthy(&self, insn: &mut InstructionSink<'_>) {
        insn.f64_abs();
        insn.f64_const(0.0);
        insn.f64_gt();
    }

    /// Apply `op` to the two f64 operands on the stack.
    fn emit_binary_op(
        &self,
        op: BinaryOp,
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        match op {
            BinaryOp::Add => {
                insn.f64_add();
            }
            BinaryOp::Sub => {
                insn.f64_sub();
            }
            BinaryOp::Mul => {
                insn.f64_mul();
            }
            BinaryOp::Div => {
                insn.f64_div();
            }
            BinaryOp::Rem => {
                // wasm has no f64 remainder
                let fmod = self
                    .import_index(abi::FMOD)
                    .ok_or_else(|| internal("fmod is not imported"))?;
                insn.call(fmod);
            }
            BinaryOp::Lt => {
                insn.f64_lt();
                insn.f64_convert_i32_u();
            }
            BinaryOp::Gt => {
                insn.f64_gt();
                insn.f64_convert_i32_u();
            }
            BinaryOp::LtEq => {
                insn.f64_le();
                insn.f64_convert_i32_u();
            }
            BinaryOp::GtEq => {
                insn.f64_ge();
                insn.f64_convert_i32_u();
            }
            BinaryOp::Eq => {
                self.emit_equality(insn, ctx);
                insn.f64_convert_i32_u();
            }
            BinaryOp::NotEq => {
                self.emit_equality(insn, ctx);
                insn.i32_eqz();
                insn.f64_convert_i32_u();
            }
        }
        Ok(())
    }

    /// Numeric equality, except that `undefined` equals itself.
    fn emit_equality(&self, insn: &mut InstructionSink<'_>, ctx: &mut FuncCtx) {
        let b = ctx.alloc_anonymous_local(ValType::F64);
        let a = ctx.alloc_anonymous_local(ValType::F64);
        insn.local_set(b);
        insn.local_tee(a);
        insn.local_get(b);
        insn.f64_eq();

        insn.local_get(a);
        insn.i64_reinterpret_f64();
        insn.local_get(b);
        insn.i64_reinterpret_f64();
        insn.i64_eq();
        insn.local_get(a);
        insn.i64_reinterpret_f64();
        insn.i64_const(abi::UNDEFINED_BITS as i64);
        insn.i64_eq();
        insn.i32_and();

        insn.i32_or();
    }

    fn compile_call(
        &self,
        callee: &Expr,
        args: &[Expr],
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        // console.log(...)
        if let Expr::Member { object, property, span: member_span } = callee {
            return match (&**object, property.as_str()) {
                (Expr::Ident(name, _), "log")
                    if name == "console"
                        && ctx.analysis.resolve(ctx.func_id(), name) == Some(Resolution::Builtin) =>
                {
                    self.compile_console_log(args, insn, ctx)
                }
                _ => Err(unsupported("property access", member_span)),
            };
        }

        // Direct call to a top-level function
        if let Expr::Ident(name, ident_span) = callee {
            if let Binding::Function(id) = self.binding(name, ident_span, ctx)? {
                insn.i32_const(0);
                self.emit_call_args(args, insn, ctx)?;
                insn.call(self.func_index(id));
                return Ok(());
            }
        }

        self.compile_indirect_call(callee, args, insn, ctx)
    }

    /// Push exactly as many arguments as the shared function type takes.
    /// Missing arguments are undefined, surplus arguments are evaluated and
    /// dropped. Callees ignore the slots past their own parameters.
    fn emit_call_args(
        &self,
        args: &[Expr],
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        for (i, arg) in args.iter().enumerate() {
            self.compile_expr(arg, insn, ctx)?;
            if i >= self.max_arity {
                insn.drop();
            }
        }
        for _ in args.len()..self.max_arity {
            insn.f64_const(abi::undefined());
        }
        Ok(())
    }

    /// Call through a function value: unpack `(slot, env)` and `call_indirect`.
    fn compile_indirect_call(
        &self,
        callee: &Expr,
        args: &[Expr],
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        let packed = ctx.alloc_anonymous_local(ValType::I64);
        self.compile_expr(callee, insn, ctx)?;
        insn.i64_reinterpret_f64();
        insn.local_tee(packed);
        insn.i32_wrap_i64();

        self.emit_call_args(args, insn, ctx)?;

        insn.local_get(packed);
        insn.i64_const(i64::from(abi::SLOT_SHIFT));
        insn.i64_shr_u();
        insn.i32_wrap_i64();
        insn.call_indirect(0, self.closure_type);
        Ok(())
    }

    /// Every argument is evaluated before anything is written. String
    /// literals go to `console_write`, everything else to `write_number`.
    fn compile_console_log(
        &self,
        args: &[Expr],
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        let console_write = self
            .import_index(abi::CONSOLE_WRITE)
            .ok_or_else(|| internal("console_write is not imported"))?;
        let write_number = self
            .import_index(abi::WRITE_NUMBER)
            .ok_or_else(|| internal("write_number is not imported"))?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = match arg {
                Expr::Str(..) => None,
                _ => {
                    let temp = ctx.alloc_anonymous_local(ValType::F64);
                    self.compile_expr(arg, insn, ctx)?;
                    insn.local_set(temp);
                    Some(temp)
                }
            };
            values.push(value);
        }

        for (i, (arg, value)) in args.iter().zip(values).enumerate() {
            if i > 0 {
                self.emit_console_write(" ", console_write, insn)?;
            }
            match (arg, value) {
                (_, Some(temp)) => {
                    insn.local_get(temp);
                    insn.call(write_number);
                }
                (Expr::Str(s, _), None) => self.emit_console_write(s, console_write, insn)?,
                (_, None) => return Err(internal("console.log argument was not evaluated")),
            }
        }
        self.emit_console_write("\n", console_write, insn)?;

        insn.f64_const(abi::undefined());
        Ok(())
    }

    fn emit_console_write(&self, s: &str, console_write: u32, insn: &mut InstructionSink<'_>) -> Result<(), CodegenError> {
        let (ptr, len) = self.string_entry(s)?;
        insn.i32_const(ptr as i32);
        insn.i32_const(len as i32);
        insn.call(console_write);
        Ok(())
    }
}
