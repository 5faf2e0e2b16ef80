//! Prompt compilation and variable substitution

pub mod compiler;
pub mod variables;

pub use compiler::compile;
pub use variables::resolve_variables;
