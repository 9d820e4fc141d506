//! Errors in lexing and parsing STG source
use crate::syntax::span::HasSpan;
use codespan::{ByteIndex, Span};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use std::io;
use thiserror::Error;

#[derive(Eq, PartialEq, Debug, Clone, Error)]
pub enum SyntaxError {
    #[error("unexpected character {1} found in input")]
    UnexpectedCharacter(usize, char, ByteIndex),
    #[error("unexpected end of input")]
    UnexpectedEndOfInput(usize, Span),
    #[error("unexpected {1}, expected {}", .2.join(" or "))]
    UnrecognisedToken(usize, String, Vec<String>, Span),
    #[error("update flag must be \\u or \\n")]
    InvalidUpdateFlag(usize, ByteIndex),
    #[error("integer literal {1} does not fit a primitive int")]
    UnableToMkPrimInt(usize, String, Span),
}

impl HasSpan for SyntaxError {
    fn span(&self) -> Span {
        use self::SyntaxError::*;

        match self {
            UnexpectedCharacter(_f, _c, i) => Span::new(*i, *i),
            UnexpectedEndOfInput(_f, s) => *s,
            UnrecognisedToken(_f, _t, _e, s) => *s,
            InvalidUpdateFlag(_f, i) => Span::new(*i, *i),
            UnableToMkPrimInt(_f, _text, s) => *s,
        }
    }
}

impl SyntaxError {
    pub fn file_id(&self) -> usize {
        use self::SyntaxError::*;

        match *self {
            UnexpectedCharacter(f, _, _) => f,
            UnexpectedEndOfInput(f, _) => f,
            UnrecognisedToken(f, _, _, _) => f,
            InvalidUpdateFlag(f, _) => f,
            UnableToMkPrimInt(f, _, _) => f,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_message(format!("{}", self))
            .with_labels(vec![Label::primary(self.file_id(), self.span())])
    }
}

/// A canonicalised error for all parse related errors, free of token
/// references
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(transparent)]
    Io(io::Error),
    #[error(transparent)]
    Syntax(SyntaxError),
}

impl From<io::Error> for ParserError {
    fn from(e: io::Error) -> Self {
        ParserError::Io(e)
    }
}

impl From<SyntaxError> for ParserError {
    fn from(e: SyntaxError) -> Self {
        ParserError::Syntax(e)
    }
}

impl ParserError {
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        match self {
            ParserError::Syntax(e) => e.to_diagnostic(),
            ParserError::Io(e) => Diagnostic::error().with_message(format!("{}", e)),
        }
    }
}
