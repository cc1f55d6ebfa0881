use std::fmt;

/// Token types recognized by the kernelize lexer
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Keywords
    Def,         // def
    Return,      // return
    Pass,        // pass
    If,          // if
    Elif,        // elif
    Else,        // else
    While,       // while
    For,         // for
    In,          // in
    And,         // and
    Or,          // or
    Not,         // not
    True,        // True
    False,       // False
    None,        // None

    // Identifiers and Literals
    Identifier(String),
    Integer(u64),
    Float(f64),
    Str(String),

    // Operators
    Plus,        // +
    Minus,       // -
    Star,        // *
    DoubleStar,  // **
    Slash,       // /
    DoubleSlash, // //
    Percent,     // %
    At,          // @
    Caret,       // ^
    Amp,         // &
    Pipe,        // |
    Tilde,       // ~
    LShift,      // <<
    RShift,      // >>
    Lt,          // <
    Gt,          // >
    LtEq,        // <=
    GtEq,        // >=
    Equal,       // ==
    NotEq,       // !=
    Assign,      // =
    /// Augmented assignment, carrying the operator token it applies (`+=` holds `Plus`)
    AugAssign(Box<TokenType>),

    // Delimiters
    LParen,      // (
    RParen,      // )
    LBracket,    // [
    RBracket,    // ]
    Comma,       // ,
    Colon,       // :
    Dot,         // .
    Arrow,       // ->

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// A token with its type and position information
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, line: usize, column: usize) -> Self {
        Self {
            token_type,
            line,
            column,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenType::Def => write!(f, "def"),
            TokenType::Return => write!(f, "return"),
            TokenType::Pass => write!(f, "pass"),
            TokenType::If => write!(f, "if"),
            TokenType::Elif => write!(f, "elif"),
            TokenType::Else => write!(f, "else"),
            TokenType::While => write!(f, "while"),
            TokenType::For => write!(f, "for"),
            TokenType::In => write!(f, "in"),
            TokenType::And => write!(f, "and"),
            TokenType::Or => write!(f, "or"),
            TokenType::Not => write!(f, "not"),
            TokenType::True => write!(f, "True"),
            TokenType::False => write!(f, "False"),
            TokenType::None => write!(f, "None"),
            TokenType::Identifier(name) => write!(f, "identifier({})", name),
            TokenType::Integer(n) => write!(f, "integer({})", n),
            TokenType::Float(n) => write!(f, "float({})", n),
            TokenType::Str(_) => write!(f, "string"),
            TokenType::AugAssign(op) => write!(f, "augmented assignment ({:?}=)", op),
            TokenType::Newline => write!(f, "newline"),
            TokenType::Indent => write!(f, "indent"),
            TokenType::Dedent => write!(f, "dedent"),
            TokenType::Eof => write!(f, "end of input"),
            _ => write!(f, "{:?}", self),
        }
    }
}
