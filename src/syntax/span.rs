//! Span support for source locations
use codespan::Span;

/// Implemented by syntax items which know their source extent
pub trait HasSpan {
    fn span(&self) -> Span;
}
