use thiserror::Error;

/// Errors that abort a translation request. No partial kernel is ever
/// produced alongside one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranspileError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Unsupported operator '{op}'")]
    UnsupportedOperator { op: String },

    #[error("Unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String },

    #[error("Invalid annotation '{annotation}' on parameter '{param}': expected a bare type name")]
    AnnotationError { param: String, annotation: String },
}

impl TranspileError {
    pub fn parse_error(message: impl Into<String>, line: usize, column: usize) -> Self {
        TranspileError::ParseError {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn unexpected_char(ch: char, line: usize, column: usize) -> Self {
        Self::parse_error(format!("Unexpected character '{}'", ch), line, column)
    }

    pub fn unsupported_operator(op: impl ToString) -> Self {
        TranspileError::UnsupportedOperator { op: op.to_string() }
    }

    pub fn unsupported_construct(construct: impl Into<String>) -> Self {
        TranspileError::UnsupportedConstruct {
            construct: construct.into(),
        }
    }
}

/// Errors raised while driving the external compile and device collaborators.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compiling kernel '{name}' failed ({status}): {stderr}")]
    Compile {
        name: String,
        status: String,
        stderr: String,
    },

    #[error("Device error: {0}")]
    Device(String),

    #[error("Argument mismatch for kernel '{name}': {message}")]
    ArgumentMismatch { name: String, message: String },
}
