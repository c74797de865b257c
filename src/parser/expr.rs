use crate::ast::*;
use crate::error::EzError;
use crate::lexer::token::{Keyword, TokenKind};
use crate::span::{Position, Spanned};
use crate::stack::ensure_sufficient_stack;

use super::{describe_found, infix_precedence, token_to_binop, Parser, Precedence};

impl Parser {
    /// Parse a full expression, assignment included.
    pub fn parse_expr(&mut self) -> Result<SpannedExpr, EzError> {
        self.parse_expr_prec(Precedence::Assignment)
    }

    pub(crate) fn parse_expr_prec(&mut self, min: Precedence) -> Result<SpannedExpr, EzError> {
        ensure_sufficient_stack(|| self.parse_expr_prec_inner(min))
    }

    fn parse_expr_prec_inner(&mut self, min: Precedence) -> Result<SpannedExpr, EzError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op_tok = self.peek().clone();
            let prec = infix_precedence(op_tok.kind);
            if prec == Precedence::None || prec < min {
                break;
            }

            lhs = match op_tok.kind {
                TokenKind::LParen => self.parse_call(lhs)?,
                TokenKind::LBracket => self.parse_index(lhs)?,
                TokenKind::Dot => self.parse_field(lhs)?,
                TokenKind::Assign => {
                    self.advance();
                    if !matches!(lhs.node, Expr::Ident(_) | Expr::Member { .. }) {
                        return Err(EzError::InvalidAssignmentTarget { pos: op_tok.pos() });
                    }
                    // Right-associative: `a = b = c` groups as `a = (b = c)`.
                    let value = self.parse_expr_prec(prec)?;
                    Spanned::new(
                        Expr::Assign {
                            target: Box::new(lhs),
                            value: Box::new(value),
                        },
                        op_tok.pos(),
                    )
                }
                kind => {
                    let op = match token_to_binop(kind) {
                        Some(op) => op,
                        None => break,
                    };
                    self.advance();
                    let rhs = self.parse_expr_prec(prec.next())?;
                    Spanned::new(
                        Expr::Binary {
                            op,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        op_tok.pos(),
                    )
                }
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<SpannedExpr, EzError> {
        let tok = self.peek().clone();
        let pos = tok.pos();

        match tok.kind {
            TokenKind::Number => {
                self.advance();
                let n = tok.text.parse::<f64>().map_err(|_| EzError::UnexpectedToken {
                    expected: "number".to_string(),
                    found: describe_found(&tok),
                    pos,
                })?;
                Ok(Spanned::new(Expr::Literal(Literal::Number(n)), pos))
            }
            TokenKind::String => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::String(tok.text)), pos))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Bool(true)), pos))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Bool(false)), pos))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Null), pos))
            }
            // `not x` is accepted as a spelling of `!x`.
            TokenKind::Identifier if tok.text == "not" => {
                self.advance();
                self.parse_unary(UnaryOp::Not, pos)
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Spanned::new(Expr::Ident(tok.text), pos))
            }
            TokenKind::Not => {
                self.advance();
                self.parse_unary(UnaryOp::Not, pos)
            }
            TokenKind::Minus => {
                self.advance();
                self.parse_unary(UnaryOp::Neg, pos)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            _ => Err(self.error_here("expression")),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, pos: Position) -> Result<SpannedExpr, EzError> {
        let operand = self.parse_expr_prec(Precedence::Unary)?;
        Ok(Spanned::new(
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            pos,
        ))
    }

    fn parse_call(&mut self, callee: SpannedExpr) -> Result<SpannedExpr, EzError> {
        let pos = self.advance().pos(); // '('
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' after arguments")?;
        Ok(Spanned::new(
            Expr::Call {
                callee: Box::new(callee),
                args,
            },
            pos,
        ))
    }

    fn parse_index(&mut self, object: SpannedExpr) -> Result<SpannedExpr, EzError> {
        let pos = self.advance().pos(); // '['
        let property = self.parse_expr()?;
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Spanned::new(
            Expr::Member {
                object: Box::new(object),
                property: Box::new(property),
                computed: true,
            },
            pos,
        ))
    }

    fn parse_field(&mut self, object: SpannedExpr) -> Result<SpannedExpr, EzError> {
        self.advance(); // '.'
        let field_tok = self.peek().clone();
        let name = self.expect_ident("property name after '.'")?;
        Ok(Spanned::new(
            Expr::Member {
                object: Box::new(object),
                property: Box::new(Spanned::new(Expr::Ident(name), field_tok.pos())),
                computed: false,
            },
            field_tok.pos(),
        ))
    }

    fn parse_array_literal(&mut self) -> Result<SpannedExpr, EzError> {
        let pos = self.advance().pos(); // '['
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expr()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "']' after array elements")?;
        Ok(Spanned::new(Expr::Array(elements), pos))
    }

    fn parse_object_literal(&mut self) -> Result<SpannedExpr, EzError> {
        let pos = self.advance().pos(); // '{'
        let mut entries = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let key_tok = self.peek().clone();
                let key = match key_tok.kind {
                    TokenKind::Identifier | TokenKind::String => {
                        self.advance();
                        key_tok.text
                    }
                    _ => return Err(self.error_here("property name")),
                };
                self.expect(TokenKind::Colon, "':' after property name")?;
                let value = self.parse_expr()?;
                entries.push((key, value));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}' after object properties")?;
        Ok(Spanned::new(Expr::Object(entries), pos))
    }
}
