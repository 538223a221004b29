//! Statement parsing.

use crate::parser::Parser;
use semviz_lexer::token::TokenKind;
use semviz_types::ast::*;

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        self.skip_separators();
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            } else {
                self.synchronize();
            }
            self.skip_separators();
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        self.skip_separators();
        if self.at_end() || self.check_exact(&TokenKind::RBrace) {
            return None;
        }
        match self.peek_kind() {
            TokenKind::Let => self.parse_let_binding().map(Stmt::Let),
            TokenKind::If => {
                let stmt = self.parse_if_expr_node().map(Stmt::If)?;
                self.expect_separator();
                Some(stmt)
            }
            TokenKind::For => {
                let stmt = self.parse_for_expr_node().map(Stmt::For)?;
                self.expect_separator();
                Some(stmt)
            }
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Assert => self.parse_assert_stmt(),
            TokenKind::Throw => self.parse_throw_stmt(),
            _ => {
                let expr = self.parse_expression()?;
                let span = expr.span;
                self.expect_separator();
                Some(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    /// `let name = expr`
    pub(crate) fn parse_let_binding(&mut self) -> Option<LetBinding> {
        let start = self.current_span();
        self.advance(); // eat `let`
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        self.skip_newlines();
        let value = self.parse_expression()?;
        let span = start.merge(self.previous_span());
        self.expect_separator();
        Some(LetBinding { name, value, span })
    }

    /// `return [expr]`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `return`
        let value = if self.peek_kind().is_separator()
            || self.at_end()
            || self.check_exact(&TokenKind::RBrace)
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = start.merge(self.previous_span());
        self.expect_separator();
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `assert expr [, "message"]`
    fn parse_assert_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `assert`
        let condition = self.parse_expression()?;
        let message = if self.eat(&TokenKind::Comma) {
            Some(self.expect_string_literal()?)
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        self.expect_separator();
        Some(Stmt::Assert(AssertStmt {
            condition,
            message,
            span,
        }))
    }

    /// `throw expr`
    fn parse_throw_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `throw`
        let value = self.parse_expression()?;
        let span = start.merge(self.previous_span());
        self.expect_separator();
        Some(Stmt::Throw(ThrowStmt { value, span }))
    }
}
