//! Abstract syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Every node owns its children and the tree is never mutated after parsing.
//! Nodes that can fail at runtime carry the 1‑based source line so evaluator
//! errors point back at the code.  Unlike tokens, the AST does not borrow
//! from the source buffer, so a parsed program may outlive the text it came
//! from (REPL lines, imported modules).

use serde::Serialize;
use std::rc::Rc;

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),

    /// String literal without surrounding quotes; `${name}` markers are kept
    /// verbatim and only expanded when the value is stringified.
    Str(String),

    Bool(bool),
    Null,
}

/// Binary operators, in the order of the precedence ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// `-x`
    Negate,

    /// `not x` / `!x`
    Not,
}

/// Shared declaration of a named function, method or lambda.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    /// Declared name; lambdas are called `<lambda>`.
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

/// One `case` arm of a `switch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `null`.
    Literal(LiteralValue),

    /// Variable access; also produced for the `this` keyword.
    Variable { name: String, line: usize },

    /// `target = value` where the target is a variable, property or index.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        line: usize,
    },

    /// Infix operator expression, including the short‑circuiting `and`/`or`.
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        line: usize,
    },

    /// Prefix operator expression.
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        line: usize,
    },

    /// Function‑, method‑ or class‑call expression.
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        line: usize,
    },

    /// `[a, b, c]`
    List(Vec<Expr>),

    /// `{key: value, ...}`; entries keep their source order.
    Dict(Vec<(String, Expr)>),

    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },

    /// `object.name`
    Property {
        object: Box<Expr>,
        name: String,
        line: usize,
    },

    /// `(params) => expr` or `(params) => { ... }`
    Lambda(Rc<FunctionDecl>),
}

/// **Abstract‑Syntax‑Tree node** for *statements*.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Stand‑alone expression; its value is the program result when last.
    Expression(Expr),

    /// `print expr`
    Print(Expr),

    /// `let name (= initializer)?`
    Let {
        name: String,
        initializer: Option<Expr>,
    },

    /// `fn name(params) { body }`
    Function(Rc<FunctionDecl>),

    /// `class Name { fn method(...) { ... } ... }`
    Class {
        name: String,
        methods: Vec<Rc<FunctionDecl>>,
    },

    /// `return expr?`
    Return { value: Option<Expr>, line: usize },

    /// `if cond { } elif cond { } ... else { }`; `branches` holds the `if`
    /// arm followed by every `elif` arm in source order.
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
    },

    While {
        condition: Expr,
        body: Vec<Stmt>,
    },

    /// `for variable in start..end { body }` over the half‑open range.
    For {
        variable: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
        line: usize,
    },

    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },

    /// `with resource as name { body }`
    With {
        resource: Expr,
        name: String,
        body: Vec<Stmt>,
    },

    Break,
    Continue,

    /// `try { body } catch (name) { handler }`
    Try {
        body: Vec<Stmt>,
        catch_name: String,
        handler: Vec<Stmt>,
    },

    /// `import name`
    Import { module: String, line: usize },
}

/// A parsed compilation unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
