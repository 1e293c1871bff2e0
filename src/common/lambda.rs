use std::fmt;

use crate::common::data::Data;
use crate::common::opcode::Opcode;
use crate::common::span::Span;

/// Represents a single executable chunk of bytecode - think a function.
/// The whole program compiles to one parameterless `Lambda`;
/// each `fn` body compiles to its own, embedded as a constant.
/// `spans` runs parallel to `code`, tying every instruction back to the
/// source that produced it, for runtime tracebacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<String>,
    pub code: Vec<Opcode>,
    pub spans: Vec<Span>,
}

impl Lambda {
    /// Creates a new empty `Lambda` to be filled.
    pub fn empty(params: Vec<String>) -> Lambda {
        Lambda { params, code: vec![], spans: vec![] }
    }

    /// Emits an instruction tied to a span, returning its index
    /// so branch placeholders can be patched later.
    pub fn emit(&mut self, op: Opcode, span: &Span) -> usize {
        self.code.push(op);
        self.spans.push(span.clone());
        self.code.len() - 1
    }
}

impl fmt::Display for Lambda {
    /// Dumps the bytecode, one indexed line per instruction.
    /// Function constants are dumped beneath their parent.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- fn({})", self.params.join(", "))?;

        let width = self.code.len().saturating_sub(1).to_string().len().max(1);
        let mut nested = vec![];

        for (index, op) in self.code.iter().enumerate() {
            writeln!(f, "{:>width$} | {}", index, op, width = width)?;
            if let Opcode::PushConst(Data::Lambda(lambda)) = op {
                nested.push(lambda);
            }
        }

        for lambda in nested {
            write!(f, "{}", lambda)?;
        }

        Ok(())
    }
}
