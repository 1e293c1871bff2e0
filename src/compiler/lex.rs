use std::rc::Rc;

use crate::common::source::Source;
use crate::common::span::{Span, Spanned};
use crate::compiler::syntax::Syntax;
use crate::compiler::token::Token;

/// Lexes a source into a stream of tokens.
/// Whitespace and block comments are stripped; newlines are kept, since
/// they terminate statements. The first `Unknown` token aborts the lex.
pub fn lex(source: Rc<Source>) -> Result<Vec<Spanned<Token>>, Syntax> {
    let mut lexer = Lexer { source, offset: 0, tokens: vec![] };
    lexer.all()?;
    Ok(lexer.tokens)
}

struct Lexer {
    source: Rc<Source>,
    offset: usize,
    tokens: Vec<Spanned<Token>>,
}

impl Lexer {
    fn all(&mut self) -> Result<(), Syntax> {
        loop {
            self.strip()?;
            if self.offset >= self.bytes().len() {
                return Ok(());
            }

            let (token, length) = self.next_token();
            let span = Span::new(&self.source, self.offset, length);
            self.offset += length;

            match token {
                Token::Unknown(_) => return Err(self.fail(token, span)),
                token => self.tokens.push(Spanned::new(token, span)),
            }
        }
    }

    fn bytes(&self) -> &[u8] {
        self.source.contents.as_bytes()
    }

    fn remaining(&self) -> &str {
        &self.source.contents[self.offset..]
    }

    /// Strips whitespace and block comments.
    /// Newlines are tokens, so they are not whitespace here.
    fn strip(&mut self) -> Result<(), Syntax> {
        loop {
            while self.offset < self.source.contents.len() {
                match self.source.contents.as_bytes()[self.offset] {
                    b' ' | b'\t' | b'\x0b' | b'\x0c' => self.offset += 1,
                    _ => break,
                }
            }

            if !self.remaining().starts_with("/*") {
                return Ok(());
            }

            match self.remaining()[2..].find("*/") {
                Some(end) => self.offset += 2 + end + 2,
                None => {
                    let text = self.remaining().to_string();
                    let span = Span::new(&self.source, self.offset, text.len());
                    return Err(self.fail(Token::Unknown(text), span));
                }
            }
        }
    }

    /// Identifies the token starting at the current offset and its length
    /// in bytes. Total: anything unrecognisable comes back as `Unknown`.
    fn next_token(&self) -> (Token, usize) {
        let bytes = &self.bytes()[self.offset..];

        let token = match bytes[0] {
            b'\n' => Token::Newline,
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' if bytes.get(1) == Some(&b'/') => Token::DoubleSlash,
            b'/' => Token::Slash,
            b'=' if bytes.get(1) == Some(&b'=') => Token::Eq,
            b'=' => Token::Assign,
            b'>' if bytes.get(1) == Some(&b'=') => Token::Ge,
            b'>' => Token::Gt,
            b'<' if bytes.get(1) == Some(&b'=') => Token::Le,
            b'<' => Token::Lt,
            b',' => Token::Comma,
            b':' => Token::Colon,
            b'(' => Token::OpenParen,
            b')' => Token::CloseParen,
            b'{' => Token::OpenBrace,
            b'}' => Token::CloseBrace,
            b'[' => Token::OpenBracket,
            b']' => Token::CloseBracket,
            b'"' => return self.string(),
            byte if can_start_identifier(byte) => return self.identifier(),
            byte if byte.is_ascii_digit() => return self.integer(),
            _ => {
                // whole characters, so the span stays on a boundary
                let Some(c) = self.remaining().chars().next() else {
                    unreachable!("next_token is never called at the end of source");
                };
                return (Token::Unknown(c.to_string()), c.len_utf8());
            }
        };

        let length = match token {
            Token::DoubleSlash | Token::Eq | Token::Ge | Token::Le => 2,
            _ => 1,
        };
        (token, length)
    }

    fn identifier(&self) -> (Token, usize) {
        let bytes = &self.bytes()[self.offset..];
        let mut length = 1;
        while length < bytes.len() && is_identifier_byte(bytes[length]) {
            length += 1;
        }

        let word = &self.remaining()[..length];
        match Token::keyword(word) {
            Some(keyword) => (keyword, length),
            None => (Token::Symbol(word.to_string()), length),
        }
    }

    fn integer(&self) -> (Token, usize) {
        let bytes = &self.bytes()[self.offset..];
        let mut length = 1;
        while length < bytes.len() && bytes[length].is_ascii_digit() {
            length += 1;
        }
        (Token::Int(self.remaining()[..length].to_string()), length)
    }

    /// Reads a string literal, decoding escape sequences as it goes.
    /// The same escapes as Go rune literals are recognised; any other
    /// escaped character X is preserved literally as `\X`.
    /// A raw newline or the end of source before the closing quote
    /// terminates the literal and yields `Unknown`.
    fn string(&self) -> (Token, usize) {
        let mut value = String::new();
        let mut length = 1; // the opening quote
        let mut chars = self.remaining()[1..].chars();

        loop {
            match chars.next() {
                // a raw newline or the end of source terminates the literal
                None | Some('\n') => {
                    let text = self.remaining()[..length].to_string();
                    return (Token::Unknown(text), length);
                }
                Some('"') => return (Token::Str(value), length + 1),
                Some('\\') => {
                    length += 1;
                    let Some(escaped) = chars.next() else {
                        let text = self.remaining()[..length].to_string();
                        return (Token::Unknown(text), length);
                    };
                    match escaped {
                        'a' => value.push('\x07'),
                        'b' => value.push('\x08'),
                        'f' => value.push('\x0c'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'v' => value.push('\x0b'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                    length += escaped.len_utf8();
                }
                Some(c) => {
                    value.push(c);
                    length += c.len_utf8();
                }
            }
        }
    }

    fn fail(&self, token: Token, span: Span) -> Syntax {
        let message = match &token {
            Token::Unknown(text) if text.starts_with("/*") => {
                "unterminated block comment".to_string()
            }
            Token::Unknown(text) if text.starts_with('"') => {
                "unterminated string literal".to_string()
            }
            Token::Unknown(text) => format!("unrecognized character `{}`", text),
            _ => unreachable!("only unknown tokens fail the lex"),
        };
        Syntax::lexical(&message, span)
    }
}

fn can_start_identifier(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_identifier_byte(byte: u8) -> bool {
    can_start_identifier(byte) || byte.is_ascii_digit()
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::compiler::syntax::SyntaxKind;

    fn kinds(source: &str) -> Vec<Token> {
        lex(Source::source(source))
            .unwrap()
            .into_iter()
            .map(|token| token.item)
            .collect()
    }

    #[test]
    fn lex_empty() {
        assert_eq!(lex(Source::source("")), Ok(vec![]));
    }

    #[test]
    fn full_token_inventory() {
        let source = "
fn f(x, y) {
	return y / 3 + 7 * -2 // 4
}

let x = f(1, 10)
let s = \"\\n\\c\\\\\\\"\"

/* not valid Torino but the lexer doesn't care */
== > < >= <= or and if for while in \"\" true false elif else : [ ] break continue

/*
comment with tricky delimiters: * /* * /
*/";

        use Token::*;
        assert_eq!(
            kinds(source),
            vec![
                Newline,
                Fn, Symbol("f".into()), OpenParen, Symbol("x".into()), Comma,
                Symbol("y".into()), CloseParen, OpenBrace, Newline,
                Return, Symbol("y".into()), Slash, Int("3".into()), Plus,
                Int("7".into()), Star, Minus, Int("2".into()), DoubleSlash,
                Int("4".into()), Newline,
                CloseBrace, Newline, Newline,
                Let, Symbol("x".into()), Assign, Symbol("f".into()), OpenParen,
                Int("1".into()), Comma, Int("10".into()), CloseParen, Newline,
                Let, Symbol("s".into()), Assign, Str("\n\\c\\\"".into()), Newline,
                Newline, Newline,
                Eq, Gt, Lt, Ge, Le, Or, And, If, For, While, In, Str("".into()),
                True, False, Elif, Else, Colon, OpenBracket, CloseBracket,
                Break, Continue, Newline, Newline,
            ],
        );
    }

    #[test]
    fn locations_start_at_one_one() {
        let tokens = lex(Source::source("let x = 1\nx")).unwrap();
        assert_eq!((tokens[0].span.line(), tokens[0].span.column()), (1, 1));
        assert_eq!((tokens[1].span.line(), tokens[1].span.column()), (1, 5));
        // the symbol on the second line
        let last = tokens.last().unwrap();
        assert_eq!((last.span.line(), last.span.column()), (2, 1));
    }

    #[test]
    fn unclosed_string_literals() {
        for source in ["\"", "\"\\"] {
            let error = lex(Source::source(source)).unwrap_err();
            assert_eq!(error.kind, SyntaxKind::Lexical);
        }
    }

    #[test]
    fn newline_terminates_string() {
        let error = lex(Source::source("\"\n\"")).unwrap_err();
        assert_eq!(error.kind, SyntaxKind::Lexical);
        assert_eq!(error.span.contents(), "\"");
    }

    #[test]
    fn unterminated_block_comment() {
        let error = lex(Source::source("1 + /* no end")).unwrap_err();
        assert_eq!(error.kind, SyntaxKind::Lexical);
        assert!(error.message.contains("block comment"));
    }

    #[test]
    fn unrecognized_byte() {
        let error = lex(Source::source("let $ = 1")).unwrap_err();
        assert_eq!(error.kind, SyntaxKind::Lexical);
        assert_eq!(error.span.contents(), "$");
    }

    #[test]
    fn preserved_unknown_escape() {
        let tokens = lex(Source::source("\"\\q\"")).unwrap();
        assert_eq!(tokens[0].item, Token::Str("\\q".to_string()));
    }

    proptest! {
        /// The lexer is total: every ascii input either lexes or fails
        /// with a lexical error, without panicking.
        #[test]
        fn totality(source in "[ -~\\n\\t]*") {
            let _ = lex(Source::source(&source));
        }

        /// Lexeme concatenation: each token's span reproduces the exact
        /// slice of source it was lexed from.
        #[test]
        fn spans_match_source(source in "[a-z0-9+*/=<>,:(){}\\[\\] \\n]*") {
            if let Ok(tokens) = lex(Source::source(&source)) {
                for token in tokens {
                    let slice = token.span.contents();
                    prop_assert!(!slice.is_empty());
                    prop_assert!(source.contains(slice));
                }
            }
        }
    }
}
