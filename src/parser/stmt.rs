use std::rc::Rc;

use crate::ast::*;
use crate::error::EzError;
use crate::lexer::token::{Keyword, TokenKind};
use crate::span::Spanned;
use crate::stack::ensure_sufficient_stack;

use super::{Parser, Precedence};

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<SpannedStmt, EzError> {
        ensure_sufficient_stack(|| self.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<SpannedStmt, EzError> {
        let pos = self.peek_pos();
        let stmt = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Var) => self.parse_var_decl()?,
            TokenKind::Keyword(Keyword::Function) => self.parse_function_decl()?,
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::Return) => self.parse_return()?,
            TokenKind::Keyword(Keyword::Listen) => self.parse_listen()?,
            TokenKind::Keyword(Keyword::Use) => self.parse_use()?,
            TokenKind::Keyword(Keyword::Import) => self.parse_import()?,
            TokenKind::Keyword(Keyword::Send) => {
                self.advance();
                let (target, message) = self.parse_target_and_payload()?;
                Stmt::Send { target, message }
            }
            TokenKind::Keyword(Keyword::Reply) => {
                self.advance();
                let (target, message) = self.parse_target_and_payload()?;
                Stmt::Reply { target, message }
            }
            TokenKind::Keyword(Keyword::React) => {
                self.advance();
                let (target, emoji) = self.parse_target_and_payload()?;
                Stmt::React { target, emoji }
            }
            TokenKind::LBrace => Stmt::Block(self.parse_block()?),
            _ => Stmt::Expr(self.parse_expr()?),
        };
        Ok(Spanned::new(stmt, pos))
    }

    pub(crate) fn parse_block(&mut self) -> Result<Block, EzError> {
        let pos = self.expect(TokenKind::LBrace, "'{'")?.pos();
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "'}' to close block")?;
        Ok(Block { statements, pos })
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'var'
        let name = self.expect_ident("variable name")?;
        let initializer = if self.match_token(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::VarDecl { name, initializer })
    }

    fn parse_function_decl(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'function'
        let name = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen, "'(' after function name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' after parameters")?;

        let body = Rc::new(self.parse_block()?);
        Ok(Stmt::FunctionDecl { name, params, body })
    }

    fn parse_if(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'if'
        let condition = self.parse_expr()?;
        let consequent = self.parse_block()?;

        let alternate = if self.check_keyword(Keyword::Else) {
            self.advance();
            if self.check_keyword(Keyword::If) {
                // `else if` becomes a block wrapping the nested conditional.
                let pos = self.peek_pos();
                let nested = self.parse_if()?;
                Some(Block {
                    statements: vec![Spanned::new(nested, pos)],
                    pos,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'for'
        let variable = self.expect_ident("loop variable")?;
        self.expect_keyword(Keyword::In)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            variable,
            iterable,
            body,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'while'
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'return'
        let bare = match self.peek_kind() {
            TokenKind::RBrace | TokenKind::Eof => true,
            TokenKind::Keyword(kw) => kw.starts_statement(),
            _ => false,
        };
        if bare {
            Ok(Stmt::Return(None))
        } else {
            Ok(Stmt::Return(Some(self.parse_expr()?)))
        }
    }

    fn parse_listen(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'listen'
        let event = self.expect(TokenKind::String, "event name string")?.text;
        self.expect(TokenKind::LParen, "'(' before listener parameter")?;
        let param = self.expect_ident("listener parameter")?;
        self.expect(TokenKind::RParen, "')' after listener parameter")?;
        let body = Rc::new(self.parse_block()?);
        Ok(Stmt::Listen { event, param, body })
    }

    fn parse_use(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'use'
        let module = self.expect(TokenKind::String, "module name string")?.text;
        self.expect_keyword(Keyword::As)?;
        let alias = self.expect_ident("module alias")?;
        Ok(Stmt::Use { module, alias })
    }

    fn parse_import(&mut self) -> Result<Stmt, EzError> {
        self.advance(); // consume 'import'
        let path = self.expect(TokenKind::String, "import path string")?.text;
        Ok(Stmt::Import { path })
    }

    /// `send`/`reply`/`react` take a target (an identifier optionally
    /// followed by `.field` accesses) and then a full payload expression.
    fn parse_target_and_payload(&mut self) -> Result<(SpannedExpr, SpannedExpr), EzError> {
        let target = self.parse_expr_prec(Precedence::Member)?;
        let payload = self.parse_expr()?;
        Ok((target, payload))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn stmts(source: &str) -> Vec<Stmt> {
        let parsed = parse(tokenize(source).unwrap());
        assert!(parsed.is_clean(), "unexpected errors: {:?}", parsed.errors);
        parsed.program.body.into_iter().map(|s| s.node).collect()
    }

    #[test]
    fn else_if_nests_inside_alternate_block() {
        let body = stmts("if a { 1 } else if b { 2 } else { 3 }");
        match &body[0] {
            Stmt::If {
                alternate: Some(alt),
                ..
            } => {
                assert_eq!(alt.statements.len(), 1);
                assert!(matches!(
                    alt.statements[0].node,
                    Stmt::If { alternate: Some(_), .. }
                ));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn bare_return_before_closing_brace() {
        let body = stmts("function f() { return }");
        match &body[0] {
            Stmt::FunctionDecl { body, .. } => {
                assert_eq!(body.statements[0].node, Stmt::Return(None));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn send_target_stops_at_member_access() {
        let body = stmts("send message.channel \"hi\" + name");
        match &body[0] {
            Stmt::Send { target, message } => {
                assert!(matches!(target.node, Expr::Member { computed: false, .. }));
                assert!(matches!(message.node, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected send, got {:?}", other),
        }
    }
}
