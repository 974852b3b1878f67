use super::*;

impl WasmCodegen {
    pub(super) fn compile_stmts(
        &self,
        stmts: &[Stmt],
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        for stmt in stmts {
            self.compile_stmt(stmt, insn, ctx)?;
        }
        Ok(())
    }

    pub(super) fn compile_stmt(
        &self,
        stmt: &Stmt,
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        match stmt {
            // Hoisted on function entry; top-level functions are called directly
            Stmt::FunctionDecl(_) => Ok(()),
            Stmt::VarDecl(decl) => {
                for declarator in &decl.declarators {
                    match &declarator.init {
                        Some(init) => self.compile_expr(init, insn, ctx)?,
                        // `var x;` keeps the current value, `let x;` resets it
                        None if decl.kind == VarKind::Var => continue,
                        None => {
                            insn.f64_const(abi::undefined());
                        }
                    }
                    self.emit_store(&declarator.name, &declarator.span, false, insn, ctx)?;
                }
                Ok(())
            }
            Stmt::Expr(stmt) => {
                self.compile_expr(&stmt.expr, insn, ctx)?;
                insn.drop();
                Ok(())
            }
            Stmt::Return(ret) => {
                if ctx.scope.is_none() {
                    return Err(unsupported("'return' outside of a function", &ret.span));
                }
                match &ret.value {
                    Some(value) => self.compile_expr(value, insn, ctx)?,
                    None => {
                        insn.f64_const(abi::undefined());
                    }
                }
                self.emit_exit_marker(insn, ctx)?;
                insn.return_();
                Ok(())
            }
            Stmt::If(stmt) => {
                self.compile_condition(&stmt.test, insn, ctx)?;
                insn.if_(BlockType::Empty);
                ctx.block_depth += 1;
                self.compile_stmt(&stmt.consequent, insn, ctx)?;
                if let Some(alternate) = &stmt.alternate {
                    insn.else_();
                    self.compile_stmt(alternate, insn, ctx)?;
                }
                ctx.block_depth -= 1;
                insn.end();
                Ok(())
            }
            Stmt::While(stmt) => {
                // block $break
                //   loop $continue
                //     br_if $break (!test)
                //     body
                //     br $continue
                //   end
                // end
                insn.block(BlockType::Empty);
                ctx.block_depth += 1;
                let break_depth = ctx.block_depth;

                insn.loop_(BlockType::Empty);
                ctx.block_depth += 1;
                let continue_depth = ctx.block_depth;

                self.compile_condition(&stmt.test, insn, ctx)?;
                insn.i32_eqz();
                insn.br_if(ctx.block_depth - break_depth);

                ctx.loop_depth_stack.push(LoopInfo {
                    break_depth,
                    continue_depth,
                });
                self.compile_stmt(&stmt.body, insn, ctx)?;
                ctx.loop_depth_stack.pop();

                insn.br(ctx.block_depth - continue_depth);
                ctx.block_depth -= 1;
                insn.end();
                ctx.block_depth -= 1;
                insn.end();
                Ok(())
            }
            Stmt::For(stmt) => self.compile_for(stmt, insn, ctx),
            Stmt::Block(block) => self.compile_stmts(&block.body, insn, ctx),
            Stmt::Break(span) => {
                let info = ctx
                    .loop_depth_stack
                    .last()
                    .copied()
                    .ok_or_else(|| unsupported("'break' outside of a loop", span))?;
                insn.br(ctx.block_depth - info.break_depth);
                Ok(())
            }
            Stmt::Continue(span) => {
                let info = ctx
                    .loop_depth_stack
                    .last()
                    .copied()
                    .ok_or_else(|| unsupported("'continue' outside of a loop", span))?;
                insn.br(ctx.block_depth - info.continue_depth);
                Ok(())
            }
            Stmt::Empty(_) => Ok(()),
            Stmt::Marker(marker) => self.compile_marker(marker, insn),
        }
    }

    fn compile_for(
        &self,
        stmt: &jsaot_parser::ForStmt,
        insn: &mut InstructionSink<'_>,
        ctx: &mut FuncCtx,
    ) -> Result<(), CodegenError> {
        // init
        // block $break
        //   loop $top
        //     br_if $break (!test)
        //     block $continue
        //       body
        //     end
        //     update
        //     br $top
        //   end
        // end
        if let Some(init) = &stmt.init {
            self.compile_stmt(init, insn, ctx)?;
        }

        insn.block(BlockType::Empty);
        ctx.block_depth += 1;
        let break_depth = ctx.block_depth;

        insn.loop_(BlockType::Empty);
        ctx.block_depth += 1;
        let loop_depth = ctx.block_depth;

        if let Some(test) = &stmt.test {
            self.compile_condition(test, insn, ctx)?;
            insn.i32_eqz();
            insn.br_if(ctx.block_depth - break_depth);
        }

        insn.block(BlockType::Empty);
        ctx.block_depth += 1;
        let continue_depth = ctx.block_depth;
        ctx.loop_depth_stack.push(LoopInfo {
            break_depth,
            continue_depth,
        });
        self.compile_stmt(&stmt.body, insn, ctx)?;
        ctx.loop_depth_stack.pop();
        ctx.block_depth -= 1;
        insn.end();

        if let Some(update) = &stmt.update {
            self.compile_expr(update, insn, ctx)?;
            insn.drop();
        }
        insn.br(ctx.block_depth - loop_depth);

        ctx.block_depth -= 1;
        insn.end();
        ctx.block_depth -= 1;
        insn.end();
        Ok(())
    }

    fn compile_marker(&self, marker: &Marker, insn: &mut InstructionSink<'_>) -> Result<(), CodegenError> {
        let (import, arg) = match marker {
            Marker::Line { line, .. } => (abi::LINE_MARKER, *line),
            Marker::Call { debug_id, .. } => (abi::CALL_MARKER, *debug_id),
        };
        let func_idx = self
            .import_index(import)
            .ok_or_else(|| internal(format!("{import} used in a build without debug imports")))?;
        insn.i32_const(arg as i32);
        insn.call(func_idx);
        Ok(())
    }
}
