use std::error;
use std::fmt;

use crate::common::span::Span;

/// Which stage of the pipeline rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    Lexical,
    Parse,
    Compile,
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxKind::Lexical => write!(f, "LexicalError"),
            SyntaxKind::Parse => write!(f, "ParseError"),
            SyntaxKind::Compile => write!(f, "CompileError"),
        }
    }
}

/// Represents a static error found at compile time.
/// Each stage short-circuits on the first `Syntax` it produces.
#[derive(Debug, PartialEq, Eq)]
pub struct Syntax {
    pub kind: SyntaxKind,
    pub message: String,
    pub span: Span,
}

impl Syntax {
    pub fn lexical(message: &str, span: Span) -> Syntax {
        Syntax { kind: SyntaxKind::Lexical, message: message.to_string(), span }
    }

    pub fn parse(message: &str, span: Span) -> Syntax {
        Syntax { kind: SyntaxKind::Parse, message: message.to_string(), span }
    }

    pub fn compile(message: &str, span: Span) -> Syntax {
        Syntax { kind: SyntaxKind::Compile, message: message.to_string(), span }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.span)?;
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl error::Error for Syntax {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;

    #[test]
    fn renders_kind_and_underline() {
        let source = Source::source("let let = 1");
        let error = Syntax::parse(
            "expected a symbol after `let`",
            Span::new(&source, 4, 3),
        );

        let target = "\
Line 1:5
  |
1 | let let = 1
  |     ^^^
ParseError: expected a symbol after `let`";

        assert_eq!(format!("{}", error), target);
    }
}
