use serde::Serialize;
use std::fmt;

pub type Result<T, E = AsmError> = std::result::Result<T, E>;

/// Failures raised by the instruction catalog while parsing a single line.
/// These carry no source position; callers wrap them into an [`AsmError`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IsaError {
    #[error("Unrecognized register: {0}")]
    UnknownRegister(String),
    #[error("Invalid arguments. Expected: {expected}. Got: {got}")]
    Arity { expected: String, got: String },
    #[error("Immediate value cannot be less than: {min} ({min:b} in binary)")]
    ImmediateBelow { value: i32, min: i32 },
    #[error("Immediate value cannot be greater than: {max} ({max:b} in binary)")]
    ImmediateAbove { value: i32, max: i32 },
    #[error("Could not parse number: {0}")]
    BadNumber(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Malformed define or label declarations, duplicates.
    Preprocess,
    /// Undefined labels and illegal label usage.
    Reference,
    /// Operand count/kind, register names, immediate ranges.
    Grammar,
    /// A label whose target line does not exist.
    Layout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Preprocess => "preprocess",
            ErrorKind::Reference => "reference",
            ErrorKind::Grammar => "grammar",
            ErrorKind::Layout => "layout",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error{}: {message}", on_line(.line))]
pub struct AsmError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
    #[source]
    pub cause: Option<IsaError>,
}

fn on_line(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" on line {n}"),
        None => String::new(),
    }
}

impl AsmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line: Some(line),
            cause: None,
        }
    }

    pub fn preprocess(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::Preprocess, message, line)
    }

    pub fn reference(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::Reference, message, line)
    }

    pub fn layout(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::Layout, message, line)
    }

    /// Wraps a catalog error raised while handling source line `line`.
    pub fn grammar(cause: IsaError, line: usize) -> Self {
        Self {
            kind: ErrorKind::Grammar,
            message: cause.to_string(),
            line: Some(line),
            cause: Some(cause),
        }
    }
}

/// Non-fatal findings returned alongside a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "Warning{}: {}", on_line(&self.line), self.message),
        }
    }
}
