// Fz AST Library
// The parsed-tree contract between the parser and the type checker

pub mod ast;
pub mod builder;

pub use ast::*;

#[cfg(test)]
mod tests;

// Version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
