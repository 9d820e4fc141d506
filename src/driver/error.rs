//! Overall high-level error type for the interpreter
use crate::eval::error::ExecutionError;
use crate::syntax::error::ParserError;
use crate::syntax::error::SyntaxError;
use codespan_reporting::diagnostic::Diagnostic;
use std::fmt::Display;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StgError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("path {0} could not be read")]
    FileCouldNotBeRead(String),
    #[error("no input: supply a file or an expression to evaluate")]
    NoInput,
}

fn default_diagnostic<E>(e: &E) -> Diagnostic<usize>
where
    E: Display,
{
    Diagnostic::error().with_message(format!("{}", e))
}

impl StgError {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        match self {
            StgError::Parser(e) => e.to_diagnostic(),
            StgError::Syntax(e) => e.to_diagnostic(),
            StgError::Execution(e) => e.to_diagnostic(),
            e => default_diagnostic(e),
        }
    }
}
