//! Functionality common to all phases
pub mod prettify;
