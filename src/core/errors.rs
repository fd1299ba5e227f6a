use crate::lexer::{Token, TokenType};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TlpsError {
    /// Lexical, syntactic and resolution errors, all reported before evaluation starts.
    #[error("[line {line}] Error{location}: {message}")]
    Syntax {
        line: usize,
        location: String,
        message: String,
    },

    #[error("{message}\n[line {line}]")]
    Runtime { line: usize, message: String },

    #[error("{}Could not include '{path}'.\n[line {line}]", render_nested(.errors))]
    Include {
        line: usize,
        path: String,
        errors: Vec<TlpsError>,
    },

    #[error("{message}")]
    Io { message: String },
}

fn render_nested(errors: &[TlpsError]) -> String {
    errors.iter().map(|e| format!("{}\n", e)).collect()
}

impl TlpsError {
    pub fn is_compile_time(&self) -> bool {
        matches!(self, TlpsError::Syntax { .. })
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            TlpsError::Syntax { line, .. }
            | TlpsError::Runtime { line, .. }
            | TlpsError::Include { line, .. } => Some(*line),
            TlpsError::Io { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TlpsError::Syntax { message, .. }
            | TlpsError::Runtime { message, .. }
            | TlpsError::Io { message } => message,
            TlpsError::Include { .. } => "Could not include file.",
        }
    }

    /// Natives raise errors without knowing where they were called from.
    pub(crate) fn with_line_if_missing(self, at: usize) -> Self {
        match self {
            TlpsError::Runtime { line: 0, message } => TlpsError::Runtime { line: at, message },
            other => other,
        }
    }
}

pub fn lexical<S: Into<String>>(line: usize, message: S) -> TlpsError {
    TlpsError::Syntax {
        line,
        location: String::new(),
        message: message.into(),
    }
}

pub fn syntax<S: Into<String>>(token: &Token, message: S) -> TlpsError {
    let location = if token.is(TokenType::Eof) {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme())
    };

    TlpsError::Syntax {
        line: token.line(),
        location,
        message: message.into(),
    }
}

pub fn runtime<S: Into<String>>(token: &Token, message: S) -> TlpsError {
    TlpsError::Runtime {
        line: token.line(),
        message: message.into(),
    }
}

pub fn native<S: Into<String>>(message: S) -> TlpsError {
    TlpsError::Runtime {
        line: 0,
        message: message.into(),
    }
}

pub fn include<S: Into<String>>(token: &Token, path: S, errors: Vec<TlpsError>) -> TlpsError {
    TlpsError::Include {
        line: token.line(),
        path: path.into(),
        errors,
    }
}

impl From<std::io::Error> for TlpsError {
    fn from(e: std::io::Error) -> Self {
        let message = match e.kind() {
            std::io::ErrorKind::NotFound => format!("We could not find the file you provided ({}).", e),
            std::io::ErrorKind::PermissionDenied => {
                format!("You do not have permissions to access the file you provided ({}).", e)
            }
            std::io::ErrorKind::InvalidData => format!("The file you provided is not a valid UTF-8 file ({}).", e),
            kind => format!("We were unable to read the file you provided due to a {} error ({}).", kind, e),
        };

        TlpsError::Io { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_format() {
        let token = Token::new(TokenType::Identifier, "foo", None, 3);
        assert_eq!(syntax(&token, "Expect ';' after value.").to_string(), "[line 3] Error at 'foo': Expect ';' after value.");

        let eof = Token::new(TokenType::Eof, "", None, 7);
        assert_eq!(syntax(&eof, "Expect expression.").to_string(), "[line 7] Error at end: Expect expression.");

        assert_eq!(lexical(2, "Unexpected character.").to_string(), "[line 2] Error: Unexpected character.");
    }

    #[test]
    fn runtime_error_format() {
        let token = Token::new(TokenType::Minus, "-", None, 12);
        let err = runtime(&token, "Operand must be a number.");
        assert_eq!(err.to_string(), "Operand must be a number.\n[line 12]");
        assert!(!err.is_compile_time());
    }

    #[test]
    fn native_errors_take_the_call_line() {
        let err = native("Exit code must be a number.").with_line_if_missing(4);
        assert_eq!(err.line(), Some(4));

        let err = runtime(&Token::new(TokenType::Minus, "-", None, 2), "x").with_line_if_missing(4);
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn include_error_lists_nested_diagnostics() {
        let token = Token::new(TokenType::String, "\"lib.lox\"", None, 1);
        let err = include(&token, "lib.lox", vec![lexical(2, "Unexpected character.")]);
        assert_eq!(
            err.to_string(),
            "[line 2] Error: Unexpected character.\nCould not include 'lib.lox'.\n[line 1]"
        );
    }
}
