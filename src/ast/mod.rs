use std::rc::Rc;

use crate::span::{Position, Spanned};

pub type SpannedStmt = Spanned<Stmt>;
pub type SpannedExpr = Spanned<Expr>;

/// Root of a parsed source unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<SpannedStmt>,
}

impl Program {
    pub fn new(body: Vec<SpannedStmt>) -> Self {
        Program { body }
    }
}

/// `{ statements }`. Function bodies are reference-counted so that function
/// values can outlive the program they were declared in (REPL inputs).
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<SpannedStmt>,
    pub pos: Position,
}

/// Statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var name = value`; the initializer is optional.
    VarDecl {
        name: String,
        initializer: Option<SpannedExpr>,
    },
    /// `function name(params) { body }`
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Rc<Block>,
    },
    /// `if cond { ... } else { ... }`. An `else if` chain is stored as an
    /// alternate block holding a single nested `If`.
    If {
        condition: SpannedExpr,
        consequent: Block,
        alternate: Option<Block>,
    },
    /// `for variable in iterable { body }`
    For {
        variable: String,
        iterable: SpannedExpr,
        body: Block,
    },
    /// `while cond { body }`
    While { condition: SpannedExpr, body: Block },
    /// `return value`
    Return(Option<SpannedExpr>),
    Block(Block),
    Expr(SpannedExpr),
    /// `listen "event" (param) { body }`
    Listen {
        event: String,
        param: String,
        body: Rc<Block>,
    },
    /// `use "module" as alias`
    Use { module: String, alias: String },
    /// `import "path/to/file"`
    Import { path: String },
    /// `send target message`
    Send {
        target: SpannedExpr,
        message: SpannedExpr,
    },
    /// `reply target message`
    Reply {
        target: SpannedExpr,
        message: SpannedExpr,
    },
    /// `react target emoji`
    React {
        target: SpannedExpr,
        emoji: SpannedExpr,
    },
}

/// Expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary {
        op: BinOp,
        lhs: Box<SpannedExpr>,
        rhs: Box<SpannedExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<SpannedExpr>,
    },
    Call {
        callee: Box<SpannedExpr>,
        args: Vec<SpannedExpr>,
    },
    /// `object.name` or, when `computed`, `object[property]`. For the plain
    /// form the property is always an `Ident`.
    Member {
        object: Box<SpannedExpr>,
        property: Box<SpannedExpr>,
        computed: bool,
    },
    Ident(String),
    Literal(Literal),
    Array(Vec<SpannedExpr>),
    Object(Vec<(String, SpannedExpr)>),
    /// Target is guaranteed by the parser to be `Ident` or `Member`.
    Assign {
        target: Box<SpannedExpr>,
        value: Box<SpannedExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}
