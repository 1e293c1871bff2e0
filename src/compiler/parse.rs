use crate::common::span::{Span, Spanned};
use crate::compiler::ast::{Block, Expr, IfClause, Infix, Prefix, Stmt};
use crate::compiler::syntax::Syntax;
use crate::compiler::token::Token;

/// Binding strength of expression operators, weakest first.
/// The Pratt loop consumes an infix operator only while its precedence
/// is strictly greater than the caller's minimum, and parses the right
/// operand at the operator's own level, so everything associates left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Or,
    And,
    Cmp,
    AddSub,
    MulDiv,
    Prefix,
    Call,
}

fn infix_precedence(token: &Token) -> Option<Prec> {
    let prec = match token {
        Token::Or => Prec::Or,
        Token::And => Prec::And,
        Token::Eq | Token::Gt | Token::Lt | Token::Ge | Token::Le => Prec::Cmp,
        Token::Plus | Token::Minus => Prec::AddSub,
        Token::Star | Token::Slash | Token::DoubleSlash => Prec::MulDiv,
        Token::OpenParen | Token::OpenBracket => Prec::Call,
        _ => return None,
    };
    Some(prec)
}

fn infix_op(token: &Token) -> Infix {
    match token {
        Token::Or => Infix::Or,
        Token::And => Infix::And,
        Token::Eq => Infix::Eq,
        Token::Gt => Infix::Gt,
        Token::Lt => Infix::Lt,
        Token::Ge => Infix::Ge,
        Token::Le => Infix::Le,
        Token::Plus => Infix::Add,
        Token::Minus => Infix::Sub,
        Token::Star => Infix::Mul,
        Token::Slash => Infix::Div,
        Token::DoubleSlash => Infix::FloorDiv,
        _ => unreachable!("token has no infix operator"),
    }
}

/// Parses a token stream into the `Block` for the whole program.
/// The first failure aborts the parse.
pub fn parse(tokens: Vec<Spanned<Token>>) -> Result<Block, Syntax> {
    let mut parser = Parser { tokens, position: 0 };

    parser.skip_newlines();
    let block = parser.block(true)?;

    match parser.peek_spanned() {
        None => Ok(block),
        Some(found) => Err(Syntax::parse(
            &format!("unexpected {} at top level", found.item),
            found.span.clone(),
        )),
    }
}

struct Parser {
    tokens: Vec<Spanned<Token>>,
    position: usize,
}

impl Parser {
    // cursor plumbing

    fn peek_spanned(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.position)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_spanned().map(|token| &token.item)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn next(&mut self) -> Option<Spanned<Token>> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn skip_newlines(&mut self) {
        while self.check(&Token::Newline) {
            self.position += 1;
        }
    }

    /// The span errors point at when the source ends too early:
    /// just past the last token.
    fn eof_span(&self) -> Span {
        match self.tokens.last() {
            Some(last) => Span::point(&last.span.source, last.span.offset + last.span.length),
            None => unreachable!("a parser is never built from zero tokens"),
        }
    }

    fn unexpected(&self, expected: &str) -> Syntax {
        match self.peek_spanned() {
            Some(found) => Syntax::parse(
                &format!("expected {}, found {}", expected, found.item),
                found.span.clone(),
            ),
            None => Syntax::parse(
                &format!("expected {}, found end of source", expected),
                self.eof_span(),
            ),
        }
    }

    fn consume(&mut self, token: Token) -> Result<Spanned<Token>, Syntax> {
        if self.check(&token) {
            Ok(self.next().unwrap())
        } else {
            Err(self.unexpected(&format!("{}", token)))
        }
    }

    fn consume_symbol(&mut self, context: &str) -> Result<Spanned<String>, Syntax> {
        match self.peek() {
            Some(Token::Symbol(_)) => {
                let token = self.next().unwrap();
                match token.item {
                    Token::Symbol(name) => Ok(Spanned::new(name, token.span)),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.unexpected(&format!("a symbol {}", context))),
        }
    }

    // statements

    /// A sequence of statements separated by one or more newlines,
    /// ending at `}` or at the end of the tokens.
    fn block(&mut self, top_level: bool) -> Result<Block, Syntax> {
        let mut statements = vec![];

        loop {
            if self.at_end() || self.check(&Token::CloseBrace) {
                break;
            }

            statements.push(self.statement(top_level)?);

            if self.check(&Token::Newline) {
                self.skip_newlines();
            } else if self.at_end() || self.check(&Token::CloseBrace) {
                break;
            } else {
                return Err(self.unexpected("a newline after the statement"));
            }
        }

        Ok(statements)
    }

    /// `{ NEWLINE* block? }`, returning the block and the span of the braces.
    fn braced_block(&mut self) -> Result<(Block, Span), Syntax> {
        let open = self.consume(Token::OpenBrace)?;
        self.skip_newlines();
        let block = self.block(false)?;
        let close = self.consume(Token::CloseBrace)?;
        Ok((block, Span::combine(&open.span, &close.span)))
    }

    fn statement(&mut self, top_level: bool) -> Result<Spanned<Stmt>, Syntax> {
        match self.peek() {
            Some(Token::Let) => self.let_statement(),
            Some(Token::Fn) => self.fn_statement(top_level),
            Some(Token::For) => self.for_statement(),
            Some(Token::While) => self.while_statement(),
            Some(Token::If) => self.if_statement(),
            Some(Token::Return) => self.return_statement(),
            Some(Token::Break) => {
                let token = self.next().unwrap();
                Ok(Spanned::new(Stmt::Break, token.span))
            }
            Some(Token::Continue) => {
                let token = self.next().unwrap();
                Ok(Spanned::new(Stmt::Continue, token.span))
            }
            _ => self.expression_statement(),
        }
    }

    fn let_statement(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let keyword = self.consume(Token::Let)?;
        let name = self.consume_symbol("after `let`")?;
        self.consume(Token::Assign)?;
        let value = self.expression(Prec::Lowest)?;

        let span = Span::combine(&keyword.span, &value.span);
        Ok(Spanned::new(Stmt::Let { name, value }, span))
    }

    fn fn_statement(&mut self, top_level: bool) -> Result<Spanned<Stmt>, Syntax> {
        let keyword = self.consume(Token::Fn)?;
        if !top_level {
            return Err(Syntax::parse(
                "function declarations must be at top level",
                keyword.span,
            ));
        }

        let name = self.consume_symbol("after `fn`")?;
        self.consume(Token::OpenParen)?;
        let params = self.param_list()?;
        let (body, body_span) = self.braced_block()?;

        let span = Span::combine(&keyword.span, &body_span);
        Ok(Spanned::new(Stmt::Fn { name, params, body }, span))
    }

    fn for_statement(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let keyword = self.consume(Token::For)?;
        let binding = self.consume_symbol("after `for`")?;
        self.consume(Token::In)?;
        let iter = self.expression(Prec::Lowest)?;
        let (body, body_span) = self.braced_block()?;

        let span = Span::combine(&keyword.span, &body_span);
        Ok(Spanned::new(Stmt::For { binding, iter, body }, span))
    }

    fn while_statement(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let keyword = self.consume(Token::While)?;
        let cond = self.expression(Prec::Lowest)?;
        let (body, body_span) = self.braced_block()?;

        let span = Span::combine(&keyword.span, &body_span);
        Ok(Spanned::new(Stmt::While { cond, body }, span))
    }

    fn if_statement(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let keyword = self.consume(Token::If)?;

        let cond = self.expression(Prec::Lowest)?;
        let (body, mut end_span) = self.braced_block()?;
        let mut clauses = vec![IfClause { cond, body }];

        while self.check(&Token::Elif) {
            self.next();
            let cond = self.expression(Prec::Lowest)?;
            let (body, span) = self.braced_block()?;
            clauses.push(IfClause { cond, body });
            end_span = span;
        }

        let mut otherwise = None;
        if self.check(&Token::Else) {
            self.next();
            let (body, span) = self.braced_block()?;
            otherwise = Some(body);
            end_span = span;
        }

        let span = Span::combine(&keyword.span, &end_span);
        Ok(Spanned::new(Stmt::If { clauses, otherwise }, span))
    }

    fn return_statement(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let keyword = self.consume(Token::Return)?;

        if self.at_end() || self.check(&Token::Newline) || self.check(&Token::CloseBrace) {
            return Ok(Spanned::new(Stmt::Return(None), keyword.span));
        }

        let value = self.expression(Prec::Lowest)?;
        let span = Span::combine(&keyword.span, &value.span);
        Ok(Spanned::new(Stmt::Return(Some(value)), span))
    }

    /// An expression statement, or an assignment when the expression
    /// turns out to be a bare symbol followed by `=`.
    fn expression_statement(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let expr = self.expression(Prec::Lowest)?;

        if !self.check(&Token::Assign) {
            let span = expr.span.clone();
            return Ok(Spanned::new(Stmt::Expression(expr), span));
        }

        let name = match expr.item {
            Expr::Symbol(name) => Spanned::new(name, expr.span),
            _ => {
                return Err(Syntax::parse("cannot assign to a non-symbol", expr.span));
            }
        };

        self.next();
        let value = self.expression(Prec::Lowest)?;
        let span = Span::combine(&name.span, &value.span);
        Ok(Spanned::new(Stmt::Assign { name, value }, span))
    }

    // expressions

    fn expression(&mut self, min: Prec) -> Result<Spanned<Expr>, Syntax> {
        let mut left = self.prefix()?;

        // keep consuming infix operators while they bind tighter
        // than the level we were called at
        while let Some(prec) = self.peek().and_then(infix_precedence) {
            if prec <= min {
                break;
            }

            let operator = self.next().unwrap();
            left = match operator.item {
                Token::OpenParen => {
                    let args = self.expression_list(Token::CloseParen)?;
                    let span = Span::combine(&left.span, &self.previous_span());
                    Spanned::new(Expr::call(left, args), span)
                }
                Token::OpenBracket => {
                    let index = self.expression(Prec::Lowest)?;
                    self.consume(Token::CloseBracket)?;
                    let span = Span::combine(&left.span, &self.previous_span());
                    Spanned::new(Expr::index(left, index), span)
                }
                token => {
                    let right = self.expression(prec)?;
                    let span = Span::combine(&left.span, &right.span);
                    Spanned::new(Expr::infix(infix_op(&token), left, right), span)
                }
            };
        }

        Ok(left)
    }

    /// The span of the most recently consumed token.
    fn previous_span(&self) -> Span {
        self.tokens[self.position - 1].span.clone()
    }

    fn prefix(&mut self) -> Result<Spanned<Expr>, Syntax> {
        let Some(token) = self.next() else {
            return Err(Syntax::parse(
                "unexpected end of source while parsing an expression",
                self.eof_span(),
            ));
        };

        match token.item {
            Token::Int(lexeme) => {
                let value: i64 = lexeme.parse().map_err(|_| {
                    Syntax::parse(
                        "integer literal too large for a signed 64-bit integer",
                        token.span.clone(),
                    )
                })?;
                Ok(Spanned::new(Expr::Integer(value), token.span))
            }
            Token::Str(value) => Ok(Spanned::new(Expr::Str(value), token.span)),
            Token::True => Ok(Spanned::new(Expr::Boolean(true), token.span)),
            Token::False => Ok(Spanned::new(Expr::Boolean(false), token.span)),
            Token::Symbol(name) => Ok(Spanned::new(Expr::Symbol(name), token.span)),
            Token::Minus => {
                let operand = self.expression(Prec::Prefix)?;
                let span = Span::combine(&token.span, &operand.span);
                Ok(Spanned::new(Expr::prefix(Prefix::Negate, operand), span))
            }
            Token::OpenParen => {
                let inner = self.expression(Prec::Lowest)?;
                self.consume(Token::CloseParen)?;
                Ok(inner)
            }
            Token::OpenBracket => {
                let items = self.expression_list(Token::CloseBracket)?;
                let span = Span::combine(&token.span, &self.previous_span());
                Ok(Spanned::new(Expr::List(items), span))
            }
            Token::OpenBrace => {
                let pairs = self.pair_list()?;
                let span = Span::combine(&token.span, &self.previous_span());
                Ok(Spanned::new(Expr::Map(pairs), span))
            }
            item => Err(Syntax::parse(
                &format!("unexpected {} while parsing an expression", item),
                token.span,
            )),
        }
    }

    /// Zero or more comma-separated expressions up to `terminator`.
    /// Trailing commas are not permitted.
    fn expression_list(&mut self, terminator: Token) -> Result<Vec<Spanned<Expr>>, Syntax> {
        let mut items = vec![];

        if self.check(&terminator) {
            self.next();
            return Ok(items);
        }

        loop {
            items.push(self.expression(Prec::Lowest)?);

            if self.check(&Token::Comma) {
                self.next();
            } else if self.check(&terminator) {
                self.next();
                return Ok(items);
            } else {
                return Err(self.unexpected(&format!("`,` or {}", terminator)));
            }
        }
    }

    /// Zero or more comma-separated `key: value` pairs up to `}`.
    fn pair_list(&mut self) -> Result<Vec<(Spanned<Expr>, Spanned<Expr>)>, Syntax> {
        let mut pairs = vec![];

        if self.check(&Token::CloseBrace) {
            self.next();
            return Ok(pairs);
        }

        loop {
            let key = self.expression(Prec::Lowest)?;
            self.consume(Token::Colon)?;
            let value = self.expression(Prec::Lowest)?;
            pairs.push((key, value));

            if self.check(&Token::Comma) {
                self.next();
            } else if self.check(&Token::CloseBrace) {
                self.next();
                return Ok(pairs);
            } else {
                return Err(self.unexpected("`,` or `}` in the map literal"));
            }
        }
    }

    fn param_list(&mut self) -> Result<Vec<Spanned<String>>, Syntax> {
        let mut params = vec![];

        if self.check(&Token::CloseParen) {
            self.next();
            return Ok(params);
        }

        loop {
            params.push(self.consume_symbol("in the parameter list")?);

            if self.check(&Token::Comma) {
                self.next();
            } else if self.check(&Token::CloseParen) {
                self.next();
                return Ok(params);
            } else {
                return Err(self.unexpected("`,` or `)` in the parameter list"));
            }
        }
    }
}
