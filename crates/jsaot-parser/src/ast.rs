use std::fmt;

use jsaot_lexer::Span;

/// Identity of a function node, assigned by the parser in pre-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub u32);

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Top-level program: a list of statements
#[derive(Debug)]
pub struct Program {
    pub body: Vec<Stmt>,
    /// Number of function nodes in the tree (ids are `0..function_count`)
    pub function_count: u32,
}

/// Statement types
#[derive(Debug)]
pub enum Stmt {
    FunctionDecl(Function),
    VarDecl(VarDecl),
    Expr(ExprStmt),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Block(Block),
    Break(Span),
    Continue(Span),
    Empty(Span),
    /// Synthetic instrumentation call, never produced by the parser
    Marker(Marker),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::FunctionDecl(f) => f.span,
            Stmt::VarDecl(v) => v.span,
            Stmt::Expr(e) => e.span,
            Stmt::Return(r) => r.span,
            Stmt::If(i) => i.span,
            Stmt::While(w) => w.span,
            Stmt::For(f) => f.span,
            Stmt::Block(b) => b.span,
            Stmt::Break(span) | Stmt::Continue(span) | Stmt::Empty(span) => *span,
            Stmt::Marker(m) => m.span(),
        }
    }
}

/// Debug hook inserted by the instrumentation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `line_marker(line)` with the 0-based original source line
    Line { line: u32, span: Span },
    /// `call_marker(id)` as the first statement of a function body
    Call { debug_id: u32, span: Span },
}

impl Marker {
    pub fn span(&self) -> Span {
        match self {
            Marker::Line { span, .. } | Marker::Call { span, .. } => *span,
        }
    }
}

/// Function declaration, function expression or arrow function
#[derive(Debug)]
pub struct Function {
    pub id: FuncId,
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub span: Span,
    /// Assigned by the instrumentation pass in debug builds
    pub debug_id: Option<u32>,
}

impl Function {
    /// Name for diagnostics and reports: `name` or `anonymous@line`
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("anonymous@{}", self.span.line),
        }
    }
}

#[derive(Debug)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

/// Arrow functions may have an expression body
#[derive(Debug)]
pub enum FunctionBody {
    Block(Block),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Let,
    Const,
    Var,
}

/// `let a = 1, b;`
#[derive(Debug)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug)]
pub struct IfStmt {
    pub test: Expr,
    pub consequent: Box<Stmt>,
    pub alternate: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// `for (init; test; update) body`
#[derive(Debug)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub test: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// Block: { statements }
#[derive(Debug)]
pub struct Block {
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Expressions
#[derive(Debug)]
pub enum Expr {
    Number(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    Ident(String, Span),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: String,
        value: Box<Expr>,
        span: Span,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: String,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: String,
        span: Span,
    },
    Function(Box<Function>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, span) | Expr::Str(_, span) | Expr::Bool(_, span) | Expr::Ident(_, span) => {
                *span
            }
            Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Update { span, .. }
            | Expr::Call { span, .. }
            | Expr::Member { span, .. } => *span,
            Expr::Function(func) => func.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp { Neg, Plus, Not }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp { Add, Sub, Mul, Div, Rem, Lt, Gt, LtEq, GtEq, Eq, NotEq }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp { And, Or }

/// `=` or a compound assignment carrying its arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp { Increment, Decrement }
