//! The compiler half of the pipeline.
//! Each step turns one datatype into the next, starting from a `Source`:
//!
//! 1. Tokens:   `lex.rs`
//! 2. Syntax tree: `parse.rs`
//! 3. Bytecode: `gen.rs`
//!
//! Every step short-circuits on its first `Syntax` error.

pub mod ast;
pub mod gen;
pub mod lex;
pub mod parse;
pub mod syntax;
pub mod token;

pub use gen::gen;
pub use lex::lex;
pub use parse::parse;
