// Session script parser module

pub mod ast;
pub mod command;
pub mod lexer;
pub mod pipeline;

// Public API re-exports
pub use ast::{Command, Script};
pub use pipeline::parse_script;
