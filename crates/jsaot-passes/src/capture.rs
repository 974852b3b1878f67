//! Capture analysis.
//!
//! Works out, for every function, which of its variables are referenced by
//! nested functions. Those variables live in a heap-allocated closure context
//! instead of Wasm locals. Resolution follows lexical nesting; every binding
//! is function-scoped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use jsaot_lexer::Span;
use jsaot_parser::{FuncId, Function, Program, VarKind};

mod visit;

use visit::{visit_body, visit_stmts, Event};

/// Names that resolve without a declaration.
pub const BUILTINS: &[&str] = &["console", "undefined", "NaN", "Infinity"];

/// Where a name lives, seen from a particular scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Plain local (parameter or declaration) of the scope itself.
    Local,
    /// Cell in the closure context of `owner`, which may be the scope itself.
    Captured { owner: FuncId },
    /// Top-level `let`/`const`/`var`.
    Global,
    /// Top-level function declaration.
    GlobalFunction,
    Builtin,
}

/// Per-function result of the analysis.
#[derive(Debug, Clone)]
pub struct FunctionScope {
    pub id: FuncId,
    pub name: String,
    pub parent: Option<FuncId>,
    pub params: Vec<String>,
    /// Parameters, declarations and nested function declaration names.
    pub declared: BTreeSet<String>,
    pub consts: BTreeSet<String>,
    /// Nested function declarations, created on entry.
    pub hoisted: Vec<(String, FuncId)>,
    /// Captured variable -> functions that reference it.
    pub captured: BTreeMap<String, BTreeSet<FuncId>>,
}

impl FunctionScope {
    fn new(func: &Function, parent: Option<FuncId>) -> Self {
        Self {
            id: func.id,
            name: func.display_name(),
            parent,
            params: func.params.iter().map(|p| p.name.clone()).collect(),
            declared: BTreeSet::new(),
            consts: BTreeSet::new(),
            hoisted: Vec::new(),
            captured: BTreeMap::new(),
        }
    }

    /// Whether this function allocates a closure context on entry.
    pub fn owns_context(&self) -> bool {
        !self.captured.is_empty()
    }

    /// Declared names that are not parameters.
    pub fn body_locals(&self) -> impl Iterator<Item = &str> {
        self.declared
            .iter()
            .filter(|name| !self.params.contains(name))
            .map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Analysis error at line {line}, column {column}: unresolved reference '{name}'")]
    UnresolvedReference {
        name: String,
        line: usize,
        column: usize,
    },
    #[error("Analysis error at line {line}, column {column}: duplicate parameter '{name}'")]
    DuplicateParameter {
        name: String,
        line: usize,
        column: usize,
    },
    #[error("Analysis error at line {line}, column {column}: cannot assign to {what} '{name}'")]
    InvalidAssignment {
        name: String,
        what: &'static str,
        line: usize,
        column: usize,
    },
    #[error(
        "Analysis error at line {line}, column {column}: '{name}' is declared both as a variable and a function"
    )]
    ConflictingDeclaration {
        name: String,
        line: usize,
        column: usize,
    },
}

/// Result of [`analyze`]: scopes indexed by function id plus the top-level bindings.
#[derive(Debug, Default)]
pub struct CaptureAnalysis {
    functions: Vec<FunctionScope>,
    globals: BTreeSet<String>,
    global_consts: BTreeSet<String>,
    global_functions: BTreeMap<String, FuncId>,
}

/// Run capture analysis over a whole program.
pub fn analyze(program: &Program) -> Result<CaptureAnalysis, AnalyzeError> {
    let mut analysis = CaptureAnalysis::default();

    // Pass 1: declarations and the function tree
    let mut nested = Vec::new();
    let mut conflict = None;
    visit_stmts(&program.body, &mut |event| match event {
        Event::Declare { name, kind, span } => {
            analysis.globals.insert(name.to_string());
            if kind == VarKind::Const {
                analysis.global_consts.insert(name.to_string());
            }
            if conflict.is_none() && analysis.global_functions.contains_key(name) {
                conflict = Some((name.to_string(), span));
            }
        }
        Event::FunctionDecl(func) => {
            if let Some(name) = &func.name {
                if conflict.is_none() && analysis.globals.contains(name) {
                    conflict = Some((name.clone(), func.span));
                }
                analysis.global_functions.insert(name.clone(), func.id);
            }
            nested.push(func);
        }
        Event::FunctionExpr(func) => nested.push(func),
        Event::Read { .. } | Event::Write { .. } => {}
    });
    if let Some((name, span)) = conflict {
        return Err(AnalyzeError::ConflictingDeclaration {
            name,
            line: span.line,
            column: span.column,
        });
    }
    for func in nested {
        analysis.declare_function(func, None)?;
    }
    analysis.functions.sort_by_key(|scope| scope.id);

    // Pass 2: references
    let mut refs = Vec::new();
    let mut pending: Vec<&Function> = Vec::new();
    visit_stmts(&program.body, &mut |event| collect_event(event, &mut refs, &mut pending));
    for (name, span, write) in refs {
        analysis.reference(None, name, span, write)?;
    }
    while let Some(func) = pending.pop() {
        let mut refs = Vec::new();
        visit_body(&func.body, &mut |event| collect_event(event, &mut refs, &mut pending));
        for (name, span, write) in refs {
            analysis.reference(Some(func.id), name, span, write)?;
        }
    }

    tracing::debug!(
        functions = analysis.functions.len(),
        contexts = analysis.functions.iter().filter(|f| f.owns_context()).count(),
        "capture analysis complete"
    );
    Ok(analysis)
}

fn collect_event<'a>(
    event: Event<'a>,
    refs: &mut Vec<(&'a str, Span, bool)>,
    functions: &mut Vec<&'a Function>,
) {
    match event {
        Event::Read { name, span } => refs.push((name, span, false)),
        Event::Write { name, span } => refs.push((name, span, true)),
        Event::FunctionDecl(func) | Event::FunctionExpr(func) => functions.push(func),
        Event::Declare { .. } => {}
    }
}

impl CaptureAnalysis {
    fn declare_function(
        &mut self,
        func: &Function,
        parent: Option<FuncId>,
    ) -> Result<(), AnalyzeError> {
        let mut scope = FunctionScope::new(func, parent);
        for param in &func.params {
            if !scope.declared.insert(param.name.clone()) {
                return Err(AnalyzeError::DuplicateParameter {
                    name: param.name.clone(),
                    line: param.span.line,
                    column: param.span.column,
                });
            }
        }

        let mut nested = Vec::new();
        visit_body(&func.body, &mut |event| match event {
            Event::Declare { name, kind, .. } => {
                scope.declared.insert(name.to_string());
                if kind == VarKind::Const {
                    scope.consts.insert(name.to_string());
                }
            }
            Event::FunctionDecl(inner) => {
                if let Some(name) = &inner.name {
                    scope.declared.insert(name.clone());
                    scope.hoisted.push((name.clone(), inner.id));
                }
                nested.push(inner);
            }
            Event::FunctionExpr(inner) => nested.push(inner),
            Event::Read { .. } | Event::Write { .. } => {}
        });

        self.functions.push(scope);
        for inner in nested {
            self.declare_function(inner, Some(func.id))?;
        }
        Ok(())
    }

    /// Resolve ignoring capture marks: the declaring scope is reported as `Local`.
    fn lookup(&self, scope: Option<FuncId>, name: &str) -> Option<(Resolution, bool)> {
        let mut current = scope;
        while let Some(id) = current {
            let func = self.function(id)?;
            if func.declared.contains(name) {
                let resolution = if Some(id) == scope {
                    Resolution::Local
                } else {
                    Resolution::Captured { owner: id }
                };
                return Some((resolution, func.consts.contains(name)));
            }
            current = func.parent;
        }
        if self.globals.contains(name) {
            Some((Resolution::Global, self.global_consts.contains(name)))
        } else if self.global_functions.contains_key(name) {
            Some((Resolution::GlobalFunction, false))
        } else if BUILTINS.contains(&name) {
            Some((Resolution::Builtin, false))
        } else {
            None
        }
    }

    fn reference(
        &mut self,
        scope: Option<FuncId>,
        name: &str,
        span: Span,
        write: bool,
    ) -> Result<(), AnalyzeError> {
        let Some((resolution, is_const)) = self.lookup(scope, name) else {
            return Err(AnalyzeError::UnresolvedReference {
                name: name.to_string(),
                line: span.line,
                column: span.column,
            });
        };

        if write {
            let what = match resolution {
                Resolution::GlobalFunction => Some("function"),
                Resolution::Builtin => Some("builtin"),
                _ if is_const => Some("constant"),
                _ => None,
            };
            if let Some(what) = what {
                return Err(AnalyzeError::InvalidAssignment {
                    name: name.to_string(),
                    what,
                    line: span.line,
                    column: span.column,
                });
            }
        }

        if let (Resolution::Captured { owner }, Some(user)) = (resolution, scope) {
            if let Some(func) = self.functions.get_mut(owner.0 as usize) {
                func.captured.entry(name.to_string()).or_default().insert(user);
            }
        }
        Ok(())
    }

    /// How `name` is reached from `scope` (`None` is the top level).
    pub fn resolve(&self, scope: Option<FuncId>, name: &str) -> Option<Resolution> {
        let (resolution, _) = self.lookup(scope, name)?;
        match (resolution, scope) {
            (Resolution::Local, Some(id))
                if self.function(id).is_some_and(|f| f.captured.contains_key(name)) =>
            {
                Some(Resolution::Captured { owner: id })
            }
            _ => Some(resolution),
        }
    }

    pub fn function(&self, id: FuncId) -> Option<&FunctionScope> {
        self.functions.get(id.0 as usize).filter(|f| f.id == id)
    }

    pub fn functions(&self) -> &[FunctionScope] {
        &self.functions
    }

    /// Captured variables of `id` in context slot order.
    pub fn captured_in(&self, id: FuncId) -> Vec<&str> {
        self.function(id)
            .map(|f| f.captured.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Context slot of a captured variable owned by `id`.
    pub fn slot_of(&self, id: FuncId, name: &str) -> Option<u32> {
        let func = self.function(id)?;
        func.captured.keys().position(|k| k == name).map(|pos| pos as u32)
    }

    /// Top-level variables, in a stable order.
    pub fn globals(&self) -> impl Iterator<Item = &str> {
        self.globals.iter().map(String::as_str)
    }

    pub fn global_function(&self, name: &str) -> Option<FuncId> {
        self.global_functions.get(name).copied()
    }

    /// Deterministic text rendering, one line per captured variable:
    /// `owner: name <- [user, ...]`.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for func in &self.functions {
            for (name, users) in &func.captured {
                let users: Vec<&str> = users
                    .iter()
                    .filter_map(|id| self.function(*id))
                    .map(|f| f.name.as_str())
                    .collect();
                let _ = writeln!(out, "{}: {} <- [{}]", func.name, name, users.join(", "));
            }
        }
        if out.is_empty() {
            out.push_str("(no captured variables)\n");
        }
        out
    }
}

#[cfg(test)]
mod tests;
