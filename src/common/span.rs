use std::fmt;
use std::rc::Rc;

use crate::common::source::Source;

/// A `Span` refers to a section of a source,
/// much like a `&str`, but with a reference to a `Source` rather than a `String`.
/// Spans are paired with tokens, AST nodes, and emitted instructions,
/// and are what diagnostics point at.
#[derive(Clone, Eq, PartialEq)]
pub struct Span {
    pub source: Rc<Source>,
    pub offset: usize,
    pub length: usize,
}

impl Span {
    /// Create a new `Span` from an offset with a length.
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span { source: Rc::clone(source), offset, length }
    }

    /// A `Span` that points at a single position, e.g. an unexpected end of source.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span { source: Rc::clone(source), offset, length: 1 }
    }

    /// Creates a new `Span` which spans the space of the previous two.
    /// ```plain
    /// hello this is cool
    /// ^^^^^              | Span a
    ///            ^^      | Span b
    /// ^^^^^^^^^^^^^      | combined
    /// ```
    pub fn combine(a: &Span, b: &Span) -> Span {
        let offset = a.offset.min(b.offset);
        let end = (a.offset + a.length).max(b.offset + b.length);
        Span::new(&a.source, offset, end - offset)
    }

    /// Folds a set of `Span`s into one spanning all of them.
    pub fn join(spans: &[Span]) -> Option<Span> {
        let (first, rest) = spans.split_first()?;
        Some(rest.iter().fold(first.clone(), |acc, span| Span::combine(&acc, span)))
    }

    /// The slice of source this `Span` covers.
    /// For most tokens this is the lexeme itself.
    pub fn contents(&self) -> &str {
        let end = (self.offset + self.length).min(self.source.contents.len());
        &self.source.contents[self.offset.min(end)..end]
    }

    /// 1-based line number of the start of the span.
    pub fn line(&self) -> usize {
        let upto = self.offset.min(self.source.contents.len());
        self.source.contents[..upto].bytes().filter(|b| *b == b'\n').count() + 1
    }

    /// 1-based column number of the start of the span.
    pub fn column(&self) -> usize {
        let upto = self.offset.min(self.source.contents.len());
        match self.source.contents[..upto].rfind('\n') {
            Some(newline) => upto - newline,
            None => upto + 1,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}:{} {:?})", self.line(), self.column(), self.contents())
    }
}

impl fmt::Display for Span {
    /// Prints where the `Span` occurs in its source, underlining it:
    /// ```plain
    /// Line 12:5
    ///    |
    /// 12 | x = blatant error
    ///    |     ^^^^^^^^^^^^^
    /// ```
    /// A span covering several lines prints each of them with a `>` gutter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start_line = self.line();
        let start_col = self.column();
        let end = Span::point(&self.source, self.offset + self.length.max(1) - 1);
        let end_line = end.line();

        let lines: Vec<&str> = self.source.contents.lines().collect();
        let padding = end_line.to_string().len();

        writeln!(f, "Line {}:{}", start_line, start_col)?;
        writeln!(f, "{} |", " ".repeat(padding))?;

        if start_line == end_line {
            // lines() yields nothing for an empty source, so fall back to ""
            let text = lines.get(start_line - 1).copied().unwrap_or("");
            writeln!(f, "{} | {}", start_line, text)?;
            writeln!(
                f,
                "{} | {}{}",
                " ".repeat(padding),
                " ".repeat(start_col - 1),
                "^".repeat(self.length.max(1)),
            )
        } else {
            for (index, text) in lines[start_line - 1..end_line].iter().enumerate() {
                let number = (start_line + index).to_string();
                writeln!(f, "{}{} > {}", " ".repeat(padding - number.len()), number, text)?;
            }
            writeln!(f, "{} |", " ".repeat(padding))
        }
    }
}

/// A wrapper that pairs an item with the `Span` it was built from.
/// Tokens, AST nodes, and instructions are all `Spanned`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }
}
