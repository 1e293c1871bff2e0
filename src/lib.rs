//! # Torino
//! A small dynamically-typed scripting language.
//!
//! The implementation is a strict pipeline: source text is lexed into
//! tokens, parsed into a syntax tree, compiled into flat bytecode, and
//! executed on a stack VM against a chained symbol environment. Each
//! stage consumes only the previous stage's output, and each stage
//! aborts on its first diagnostic.
//!
//! Embedding the whole pipeline takes three lines:
//!
//! ```
//! use torino::{eval, vm::{prelude, VM}};
//!
//! let mut vm = VM::stdout();
//! let env = prelude();
//! let result = eval("1 + 41", &mut vm, &env).unwrap();
//! assert_eq!(format!("{}", result), "42");
//! ```
//!
//! The environment outlives `eval`, so a repl can feed inputs one at a
//! time and keep its bindings.

pub mod common;
pub mod compiler;
pub mod vm;

use std::rc::Rc;

use crate::common::data::Data;
use crate::common::lambda::Lambda;
use crate::common::source::Source;
use crate::compiler::syntax::Syntax;
use crate::vm::trace::Trace;
use crate::vm::{Env, VM};

/// Any diagnostic the pipeline can produce:
/// a compile-time `Syntax` error or a runtime `Trace`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] Syntax),
    #[error(transparent)]
    Trace(#[from] Trace),
}

/// Runs the compiler half of the pipeline:
/// lexes, parses, and generates bytecode for a source.
pub fn compile(source: Rc<Source>) -> Result<Lambda, Syntax> {
    let tokens = compiler::lex(source)?;
    let block = compiler::parse(tokens)?;
    compiler::gen(&block)
}

/// Compiles and runs a string in an existing environment.
/// Bindings the program makes stay in `env`.
pub fn eval(text: &str, vm: &mut VM, env: &Env) -> Result<Data, Error> {
    let program = compile(Source::source(text))?;
    Ok(vm.run(&program, env)?)
}
