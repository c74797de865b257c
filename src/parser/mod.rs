pub mod expr;
pub mod stmt;

use crate::ast::*;
use crate::error::EzError;
use crate::lexer::token::{Keyword, Token, TokenKind};
use crate::span::Position;

/// Result of a best-effort parse: every statement that parsed cleanly plus
/// one diagnostic per statement that had to be skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub program: Program,
    pub errors: Vec<EzError>,
}

impl Parsed {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Treat any recovered error as fatal, returning the first one.
    pub fn into_result(self) -> Result<Program, EzError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.program),
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Parser { tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> Parsed {
        let mut body = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    tracing::error!("{}", err.summary());
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        tracing::debug!(
            statements = body.len(),
            errors = errors.len(),
            "parser produced program"
        );
        Parsed {
            program: Program::new(body),
            errors,
        }
    }

    // ── Token navigation ──

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    pub(crate) fn peek_pos(&self) -> Position {
        self.tokens[self.pos].pos()
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn check_keyword(&self, kw: Keyword) -> bool {
        self.peek().is_keyword(kw)
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, EzError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(what))
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: Keyword) -> Result<Token, EzError> {
        if self.check_keyword(kw) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("'{}'", kw.as_str())))
        }
    }

    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<String, EzError> {
        Ok(self.expect(TokenKind::Identifier, what)?.text)
    }

    pub(crate) fn error_here(&self, expected: &str) -> EzError {
        let tok = self.peek();
        EzError::UnexpectedToken {
            expected: expected.to_string(),
            found: describe_found(tok),
            pos: tok.pos(),
        }
    }

    /// Skip ahead to the next token that can begin a statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenKind::Keyword(kw) = self.peek_kind() {
                if kw.starts_statement() {
                    return;
                }
            }
            self.advance();
        }
    }
}

pub(crate) fn describe_found(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::String => format!("string \"{}\"", tok.text),
        _ => format!("'{}'", tok.text),
    }
}

/// Binding strength of infix and postfix operators, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Member,
}

impl Precedence {
    pub(crate) fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Member => Precedence::Member,
        }
    }
}

pub(crate) fn infix_precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Assign => Precedence::Assignment,
        TokenKind::Or => Precedence::Or,
        TokenKind::And => Precedence::And,
        TokenKind::EqEq | TokenKind::NotEq => Precedence::Equality,
        TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => Precedence::Comparison,
        TokenKind::Plus | TokenKind::Minus => Precedence::Term,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Factor,
        TokenKind::LParen | TokenKind::LBracket => Precedence::Call,
        TokenKind::Dot => Precedence::Member,
        _ => Precedence::None,
    }
}

pub(crate) fn token_to_binop(kind: TokenKind) -> Option<BinOp> {
    let op = match kind {
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Mod,
        TokenKind::EqEq => BinOp::Eq,
        TokenKind::NotEq => BinOp::NotEq,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::Le => BinOp::Le,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::Ge => BinOp::Ge,
        TokenKind::And => BinOp::And,
        TokenKind::Or => BinOp::Or,
        _ => return None,
    };
    Some(op)
}

pub fn parse(tokens: Vec<Token>) -> Parsed {
    Parser::new(tokens).parse_program()
}
