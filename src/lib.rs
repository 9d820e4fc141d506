#[macro_use]
extern crate lazy_static;

pub mod common;
pub mod driver;
pub mod eval;
pub mod syntax;
