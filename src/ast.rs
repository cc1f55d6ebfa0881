use crate::error::TranspileError;
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Represents expressions in the host language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Numeric literal holding its evaluated value (e.g., 42, 0x10, 2.5)
    Number(Literal),
    /// Identifier (e.g., a, key, local)
    Name(String),
    /// Binary operation (e.g., a + b, a // b, a < b)
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// Unary operation (e.g., -a, not a)
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    /// Subscript access (e.g., b[0], b[i + 1])
    Subscript {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// Attribute access (e.g., np.float32)
    Attribute {
        value: Box<Expression>,
        attr: String,
    },
    /// Function call (e.g., abs(a))
    Call {
        func: Box<Expression>,
        args: Vec<Expression>,
    },
    /// String literal, only meaningful as a docstring
    Str(String),
    /// `True` or `False`
    Bool(bool),
    /// `None`
    NoneLiteral,
}

/// Numeric literal value. The source spelling is not kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(u64),
    Float(f64),
}

// The lexer rejects non-finite floats, so equality is reflexive for parsed input.
impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Literal::Int(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            Literal::Float(f) => {
                1u8.hash(state);
                f.to_bits().hash(state);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,       // +
    Sub,       // -
    Mul,       // *
    Div,       // /
    FloorDiv,  // //
    Mod,       // %
    Pow,       // **
    MatMul,    // @
    BitXor,    // ^
    BitAnd,    // &
    BitOr,     // |
    LShift,    // <<
    RShift,    // >>
    Equal,     // ==
    NotEqual,  // !=
    Less,      // <
    Greater,   // >
    LessEq,    // <=
    GreaterEq, // >=
    And,       // and
    Or,        // or
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Neg,    // -
    Pos,    // +
    Invert, // ~
    Not,    // not
}

/// Represents statements in the host language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    /// Assignment (e.g., x = a + 1)
    Assign {
        target: Expression,
        value: Expression,
    },
    /// Augmented assignment (e.g., x += a)
    AugAssign {
        target: Expression,
        op: BinaryOperator,
        value: Expression,
    },
    /// Return statement; `None` for a bare `return`
    Return(Option<Expression>),
    /// Expression statement (docstrings, bare expressions)
    Expr(Expression),
    /// `pass`
    Pass,
    /// If/elif/else; `elif` chains nest in `orelse`
    If {
        condition: Expression,
        body: Vec<Statement>,
        orelse: Vec<Statement>,
    },
    /// While loop
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    /// For loop
    For {
        target: Expression,
        iter: Expression,
        body: Vec<Statement>,
    },
}

/// Function parameter with an optional type annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<Expression>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            annotation: None,
        }
    }

    pub fn annotated(name: impl Into<String>, annotation: Expression) -> Self {
        Parameter {
            name: name.into(),
            annotation: Some(annotation),
        }
    }
}

/// A host function to be translated into one kernel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSpec {
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Vec<Statement>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, params: Vec<Parameter>, body: Vec<Statement>) -> Self {
        FunctionSpec {
            name: name.into(),
            params,
            body,
        }
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Structural rules the parser enforces on source text, checked again
    /// for specs built directly. Failures have no source position (line 0).
    pub fn validate(&self) -> Result<(), TranspileError> {
        let mut seen = FxHashSet::default();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(TranspileError::parse_error(
                    format!("Duplicate parameter '{}'", param.name),
                    0,
                    0,
                ));
            }
        }
        validate_targets(&self.body)
    }
}

/// The root of the AST - every function defined in a source file, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub functions: Vec<FunctionSpec>,
}

impl Module {
    pub fn new() -> Self {
        Module {
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl Expression {
    pub fn name(name: impl Into<String>) -> Self {
        Expression::Name(name.into())
    }

    pub fn int(value: u64) -> Self {
        Expression::Number(Literal::Int(value))
    }

    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn subscript(base: Expression, index: Expression) -> Self {
        Expression::Subscript {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Only names and subscripts may appear on the left of `=` or `OP=`
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expression::Name(_) | Expression::Subscript { .. })
    }

    /// Short description of the node kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Number(_) => "number",
            Expression::Name(_) => "name",
            Expression::BinaryOp { .. } => "binary operation",
            Expression::UnaryOp { .. } => "unary operation",
            Expression::Subscript { .. } => "subscript",
            Expression::Attribute { .. } => "attribute access",
            Expression::Call { .. } => "function call",
            Expression::Str(_) => "string literal",
            Expression::Bool(_) => "boolean literal",
            Expression::NoneLiteral => "None literal",
        }
    }
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Assign { .. } => "assignment",
            Statement::AugAssign { .. } => "augmented assignment",
            Statement::Return(_) => "return statement",
            Statement::Expr(_) => "expression statement",
            Statement::Pass => "pass statement",
            Statement::If { .. } => "if statement",
            Statement::While { .. } => "while loop",
            Statement::For { .. } => "for loop",
        }
    }
}

fn validate_targets(body: &[Statement]) -> Result<(), TranspileError> {
    for stmt in body {
        match stmt {
            Statement::Assign { target, .. }
            | Statement::AugAssign { target, .. }
            | Statement::For { target, .. }
                if !target.is_assignable() =>
            {
                return Err(TranspileError::parse_error(
                    format!("Cannot assign to {}", target.kind()),
                    0,
                    0,
                ));
            }
            Statement::If { body, orelse, .. } => {
                validate_targets(body)?;
                validate_targets(orelse)?;
            }
            Statement::While { body, .. } | Statement::For { body, .. } => validate_targets(body)?,
            _ => {}
        }
    }
    Ok(())
}

impl fmt::Display for Literal {
    /// Decimal text of the value: integers as-is, floats as the shortest
    /// round-trip form that still reads as a float (`1.0`, `2.5`, `1e-5`).
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{:?}", n),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::Name(name) => write!(f, "{}", name),
            Expression::BinaryOp { left, op, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => write!(f, "(not {})", expr),
                _ => write!(f, "({}{})", op, expr),
            },
            Expression::Subscript { base, index } => write!(f, "{}[{}]", base, index),
            Expression::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Expression::Call { func, args } => {
                let args_str = args.iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({})", func, args_str)
            }
            Expression::Str(s) => write!(f, "{:?}", s),
            Expression::Bool(true) => write!(f, "True"),
            Expression::Bool(false) => write!(f, "False"),
            Expression::NoneLiteral => write!(f, "None"),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Sub => write!(f, "-"),
            BinaryOperator::Mul => write!(f, "*"),
            BinaryOperator::Div => write!(f, "/"),
            BinaryOperator::FloorDiv => write!(f, "//"),
            BinaryOperator::Mod => write!(f, "%"),
            BinaryOperator::Pow => write!(f, "**"),
            BinaryOperator::MatMul => write!(f, "@"),
            BinaryOperator::BitXor => write!(f, "^"),
            BinaryOperator::BitAnd => write!(f, "&"),
            BinaryOperator::BitOr => write!(f, "|"),
            BinaryOperator::LShift => write!(f, "<<"),
            BinaryOperator::RShift => write!(f, ">>"),
            BinaryOperator::Equal => write!(f, "=="),
            BinaryOperator::NotEqual => write!(f, "!="),
            BinaryOperator::Less => write!(f, "<"),
            BinaryOperator::Greater => write!(f, ">"),
            BinaryOperator::LessEq => write!(f, "<="),
            BinaryOperator::GreaterEq => write!(f, ">="),
            BinaryOperator::And => write!(f, "and"),
            BinaryOperator::Or => write!(f, "or"),
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnaryOperator::Neg => write!(f, "-"),
            UnaryOperator::Pos => write!(f, "+"),
            UnaryOperator::Invert => write!(f, "~"),
            UnaryOperator::Not => write!(f, "not"),
        }
    }
}
