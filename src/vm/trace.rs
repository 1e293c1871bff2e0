use std::error;
use std::fmt;

use crate::common::span::Span;

/// The kinds of runtime error the VM can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Name,
    Type,
    Arity,
    Index,
    Arithmetic,
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceKind::Name => write!(f, "NameError"),
            TraceKind::Type => write!(f, "TypeError"),
            TraceKind::Arity => write!(f, "ArityError"),
            TraceKind::Index => write!(f, "IndexError"),
            TraceKind::Arithmetic => write!(f, "ArithmeticError"),
        }
    }
}

/// Represents a runtime error, i.e. a traceback.
/// The first span points at the instruction that failed; as the error
/// propagates out of nested calls, each call site's span is appended.
#[derive(Debug, PartialEq, Eq)]
pub struct Trace {
    pub kind: TraceKind,
    pub message: String,
    pub spans: Vec<Span>,
}

impl Trace {
    pub fn error(kind: TraceKind, message: &str, spans: Vec<Span>) -> Trace {
        Trace { kind, message: message.to_string(), spans }
    }

    /// Appends a call-site span while the error propagates outwards.
    pub fn add_span(mut self, span: Span) -> Trace {
        self.spans.push(span);
        self
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spans.len() > 1 {
            writeln!(f, "Traceback, most recent call last:")?;
            // print outermost call first, innermost failure last
            for span in self.spans.iter().rev() {
                write!(f, "{}", span)?;
            }
        } else if let Some(span) = self.spans.first() {
            write!(f, "{}", span)?;
        }

        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl error::Error for Trace {}
