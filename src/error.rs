use thiserror::Error;

use crate::span::Position;

/// Broad classification of an [`EzError`], used by embedders to pick exit
/// codes and by the REPL to decide how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Runtime,
    Type,
    Import,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EzError {
    // Lexer errors
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, pos: Position },
    #[error("unterminated string")]
    UnterminatedString { pos: Position },

    // Parser errors
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        pos: Position,
    },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget { pos: Position },

    // Runtime errors
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, pos: Position },
    #[error("function '{name}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        pos: Position,
    },
    #[error("array index out of bounds: {index} (length {length})")]
    IndexOutOfBounds {
        index: i64,
        length: usize,
        pos: Position,
    },
    #[error("'{callee}' is not a function")]
    NotCallable { callee: String, pos: Position },
    #[error("{message}")]
    RuntimeError { message: String, pos: Position },

    // Type errors
    #[error("{message}")]
    TypeMismatch { message: String, pos: Position },

    // Import errors
    #[error("file not found: {path}")]
    FileNotFound { path: String, pos: Position },
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}

impl EzError {
    pub fn runtime(message: impl Into<String>, pos: Position) -> Self {
        EzError::RuntimeError {
            message: message.into(),
            pos,
        }
    }

    pub fn type_mismatch(message: impl Into<String>, pos: Position) -> Self {
        EzError::TypeMismatch {
            message: message.into(),
            pos,
        }
    }

    pub fn pos(&self) -> Option<Position> {
        match self {
            EzError::UnexpectedChar { pos, .. }
            | EzError::UnterminatedString { pos }
            | EzError::UnexpectedToken { pos, .. }
            | EzError::InvalidAssignmentTarget { pos }
            | EzError::UndefinedVariable { pos, .. }
            | EzError::ArityMismatch { pos, .. }
            | EzError::IndexOutOfBounds { pos, .. }
            | EzError::NotCallable { pos, .. }
            | EzError::RuntimeError { pos, .. }
            | EzError::TypeMismatch { pos, .. }
            | EzError::FileNotFound { pos, .. } => Some(*pos),
            EzError::Io { .. } => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EzError::UnexpectedChar { .. } | EzError::UnterminatedString { .. } => ErrorKind::Lex,
            EzError::UnexpectedToken { .. } | EzError::InvalidAssignmentTarget { .. } => {
                ErrorKind::Parse
            }
            EzError::UndefinedVariable { .. }
            | EzError::ArityMismatch { .. }
            | EzError::IndexOutOfBounds { .. }
            | EzError::NotCallable { .. }
            | EzError::RuntimeError { .. } => ErrorKind::Runtime,
            EzError::TypeMismatch { .. } => ErrorKind::Type,
            EzError::FileNotFound { .. } | EzError::Io { .. } => ErrorKind::Import,
        }
    }

    /// Type errors are a subtype of runtime errors: both abort `execute()`.
    pub fn is_runtime(&self) -> bool {
        matches!(self.kind(), ErrorKind::Runtime | ErrorKind::Type)
    }

    pub fn is_type_error(&self) -> bool {
        self.kind() == ErrorKind::Type
    }

    fn kind_str(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Lex => "lex error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Runtime => "runtime error",
            ErrorKind::Type => "type error",
            ErrorKind::Import => "import error",
        }
    }

    /// One-line form used in logs: `parse error at 3:7: expected '}', found end of input`.
    pub fn summary(&self) -> String {
        match self.pos() {
            Some(pos) => format!("{} at {}: {}", self.kind_str(), pos, self),
            None => format!("{}: {}", self.kind_str(), self),
        }
    }

    /// Render error with source snippet and caret pointing at the position.
    pub fn render(&self, source: &str, filename: &str) -> String {
        let kind = self.kind_str();

        let pos = match self.pos() {
            Some(p) if p.line > 0 => p,
            _ => return format!("\x1b[1;31m{}\x1b[0m: {}", kind, self),
        };

        let line_text = source.lines().nth(pos.line - 1).unwrap_or("");
        let width = pos.line.to_string().len();

        format!(
            "\x1b[1;31m{kind}\x1b[0m: {msg}\n \x1b[1;34m-->\x1b[0m {file}:{line}:{col}\n{pad} \x1b[1;34m|\x1b[0m\n\x1b[1;34m{line:>width$}\x1b[0m \x1b[1;34m|\x1b[0m {line_text}\n{pad} \x1b[1;34m|\x1b[0m {spaces}\x1b[1;31m^\x1b[0m",
            kind = kind,
            msg = self,
            file = filename,
            line = pos.line,
            col = pos.column,
            pad = " ".repeat(width),
            width = width,
            line_text = line_text,
            spaces = " ".repeat(pos.column.saturating_sub(1)),
        )
    }
}
