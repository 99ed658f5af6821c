//! Statement parsing.

use std::rc::Rc;

use crate::parser::Parser;
use jsplay_lexer::token::TokenKind;
use jsplay_types::ast::*;
use jsplay_types::ErrorCode;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Program & Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// `Program = { Statement }`
    ///
    /// The program is a function body, so a top-level `return` is legal.
    pub(crate) fn parse_program(&mut self) -> Program {
        let start = self.current_span();
        let mut body = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            let before = self.position();
            if let Some(stmt) = self.parse_statement() {
                body.push(stmt);
            } else {
                self.synchronize();
                if self.position() == before {
                    // Stray `}` at top level.
                    self.advance();
                }
            }
        }
        let span = start.merge(self.previous_span());
        Program { body, span }
    }

    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let stmts = self.parse_statement_list(|k| matches!(k, TokenKind::RBrace))?;
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Statements up to (not including) a token accepted by `stop` or end of input.
    fn parse_statement_list(&mut self, stop: impl Fn(&TokenKind) -> bool) -> Option<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !stop(self.peek_kind()) && !self.at_end() {
            if self.too_many_errors() {
                return None;
            }
            let before = self.position();
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            } else {
                self.synchronize();
                if self.position() == before {
                    break;
                }
            }
        }
        Some(stmts)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Some(Stmt::Var(decl))
            }
            TokenKind::Function => {
                let function = self.parse_function(true)?;
                Some(Stmt::Function(Rc::new(function)))
            }
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Semicolon => {
                let span = self.advance().span;
                Some(Stmt::Empty(span))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_stmt(),
            TokenKind::Throw => self.parse_throw_stmt(),
            TokenKind::Try => self.parse_try_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Class => {
                let error = self
                    .make_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "Unexpected token 'class'",
                        self.current_span(),
                    )
                    .with_suggestion("classes are not supported; use functions and object literals");
                self.push_error(error);
                None
            }
            _ => {
                // Expression statement
                let expr = self.parse_expression()?;
                let span = expr.span;
                self.consume_semicolon()?;
                Some(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    /// `("var" | "let" | "const") Declarator { "," Declarator }` without the terminator.
    pub(crate) fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let start = self.current_span();
        let kind = match self.advance().kind {
            TokenKind::Let => VarKind::Let,
            TokenKind::Const => VarKind::Const,
            _ => VarKind::Var,
        };
        let first = self.expect_identifier()?;
        self.parse_declarators(kind, first, start)
    }

    /// Declarators after the first binding name has been consumed.
    fn parse_declarators(
        &mut self,
        kind: VarKind,
        first: Ident,
        start: jsplay_types::Span,
    ) -> Option<VarDecl> {
        let mut declarators = Vec::new();
        let mut name = first;
        loop {
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if kind == VarKind::Const && init.is_none() {
                self.error_at(
                    ErrorCode::MISSING_INITIALIZER,
                    "Missing initializer in const declaration",
                    name.span,
                );
            }
            let span = name.span.merge(self.previous_span());
            declarators.push(Declarator { name, init, span });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            name = self.expect_identifier()?;
        }
        let span = start.merge(self.previous_span());
        Some(VarDecl {
            kind,
            declarators,
            span,
        })
    }

    /// `if (cond) stmt [else stmt]`
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `if`
        let condition = self.parse_paren_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    fn parse_paren_condition(&mut self) -> Option<Expr> {
        self.expect(&TokenKind::LParen)?;
        let condition = self.with_in(true, |p| p.parse_expression())?;
        self.expect(&TokenKind::RParen)?;
        Some(condition)
    }

    /// Loop bodies accept `break` and `continue`.
    fn parse_loop_body(&mut self) -> Option<Stmt> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    /// `for (init; test; update) body`, `for (x of xs) body` or `for (k in obj) body`
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `for`
        self.expect(&TokenKind::LParen)?;

        let init = match self.peek_kind() {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl_start = self.current_span();
                let kind = match self.advance().kind {
                    TokenKind::Let => VarKind::Let,
                    TokenKind::Const => VarKind::Const,
                    _ => VarKind::Var,
                };
                let binding = self.expect_identifier()?;
                if let Some(each) = self.for_each_kind() {
                    return self.parse_for_each_rest(start, each, Some(kind), binding);
                }
                let decl =
                    self.with_in(false, |p| p.parse_declarators(kind, binding, decl_start))?;
                Some(ForInit::Var(decl))
            }
            _ => {
                let expr = self.with_in(false, |p| p.parse_expression())?;
                if let Some(each) = self.for_each_kind() {
                    let ExprKind::Identifier(name) = &expr.kind else {
                        let message = match each {
                            ForEachKind::Of => "Invalid left-hand side in for-of loop",
                            ForEachKind::In => "Invalid left-hand side in for-in loop",
                        };
                        self.error_at(ErrorCode::INVALID_ASSIGNMENT_TARGET, message, expr.span);
                        return None;
                    };
                    let binding = Ident::new(name.clone(), expr.span);
                    return self.parse_for_each_rest(start, each, None, binding);
                }
                Some(ForInit::Expr(expr))
            }
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(self.previous_span());
        Some(Stmt::For(ForStmt {
            init,
            test,
            update,
            body,
            span,
        }))
    }

    fn for_each_kind(&self) -> Option<ForEachKind> {
        if self.check_of() {
            Some(ForEachKind::Of)
        } else if self.check(&TokenKind::In) {
            Some(ForEachKind::In)
        } else {
            None
        }
    }

    /// The part of a `for…of` / `for…in` after the binding.
    fn parse_for_each_rest(
        &mut self,
        start: jsplay_types::Span,
        kind: ForEachKind,
        declaration: Option<VarKind>,
        binding: Ident,
    ) -> Option<Stmt> {
        self.advance(); // eat `of` / `in`
        let iterable = match kind {
            ForEachKind::Of => self.parse_assignment()?,
            ForEachKind::In => self.parse_expression()?,
        };
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(self.previous_span());
        Some(Stmt::ForEach(ForEachStmt {
            kind,
            declaration,
            binding,
            iterable,
            body,
            span,
        }))
    }

    /// `while (cond) body`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `while`
        let condition = self.parse_paren_condition()?;
        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(self.previous_span());
        Some(Stmt::While(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    /// `do body while (cond)`; the trailing `;` is always optional.
    fn parse_do_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `do`
        let body = Box::new(self.parse_loop_body()?);
        self.expect(&TokenKind::While)?;
        let condition = self.parse_paren_condition()?;
        self.eat(&TokenKind::Semicolon);
        let span = start.merge(self.previous_span());
        Some(Stmt::DoWhile(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    /// `return [expr]`; a line break after `return` ends the statement.
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `return`
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = start.merge(self.previous_span());
        self.consume_semicolon()?;
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `break` / `continue`
    fn parse_jump_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance();
        let stmt = if token.kind == TokenKind::Break {
            if self.loop_depth == 0 && self.switch_depth == 0 {
                self.error_at(ErrorCode::ILLEGAL_BREAK, "Illegal break statement", token.span);
            }
            Stmt::Break(token.span)
        } else {
            if self.loop_depth == 0 {
                self.error_at(
                    ErrorCode::ILLEGAL_CONTINUE,
                    "Illegal continue statement: no surrounding iteration statement",
                    token.span,
                );
            }
            Stmt::Continue(token.span)
        };
        self.consume_semicolon()?;
        Some(stmt)
    }

    /// `throw expr`; the expression must start on the same line.
    fn parse_throw_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `throw`
        if self.peek().newline_before {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Illegal newline after throw");
            return None;
        }
        let value = self.parse_expression()?;
        let span = start.merge(self.previous_span());
        self.consume_semicolon()?;
        Some(Stmt::Throw(ThrowStmt { value, span }))
    }

    /// `try block [catch [(name)] block] [finally block]`
    fn parse_try_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `try`
        let block = self.parse_block()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.advance().span;
            let param = if self.eat(&TokenKind::LParen) {
                let name = self.expect_identifier()?;
                self.expect(&TokenKind::RParen)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            let span = catch_start.merge(self.previous_span());
            Some(CatchClause { param, body, span })
        } else {
            None
        };

        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "Missing catch or finally after try",
            );
            return None;
        }

        let span = start.merge(self.previous_span());
        Some(Stmt::Try(TryStmt {
            block,
            handler,
            finalizer,
            span,
        }))
    }

    /// `switch (expr) { case e: stmts… default: stmts… }`
    fn parse_switch_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `switch`
        let discriminant = self.parse_paren_condition()?;
        self.expect(&TokenKind::LBrace)?;

        self.switch_depth += 1;
        let cases = self.parse_switch_cases();
        self.switch_depth -= 1;
        let cases = cases?;

        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Stmt::Switch(SwitchStmt {
            discriminant,
            cases,
            span,
        }))
    }

    fn parse_switch_cases(&mut self) -> Option<Vec<SwitchCase>> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let case_start = self.current_span();
            let test = match self.peek_kind() {
                TokenKind::Case => {
                    self.advance();
                    Some(self.parse_expression()?)
                }
                TokenKind::Default => {
                    self.advance();
                    if seen_default {
                        self.error_at(
                            ErrorCode::DUPLICATE_DEFAULT,
                            "More than one default clause in switch statement",
                            case_start,
                        );
                    }
                    seen_default = true;
                    None
                }
                _ => {
                    self.unexpected_token();
                    return None;
                }
            };
            self.expect(&TokenKind::Colon)?;
            let body = self.parse_statement_list(|k| {
                matches!(k, TokenKind::Case | TokenKind::Default | TokenKind::RBrace)
            })?;
            let span = case_start.merge(self.previous_span());
            cases.push(SwitchCase { test, body, span });
        }
        Some(cases)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// `function [name] (params) { body }`. Declarations require the name.
    pub(crate) fn parse_function(&mut self, is_declaration: bool) -> Option<Function> {
        let start = self.advance().span; // eat `function`
        let name = if is_declaration || matches!(self.peek_kind(), TokenKind::Identifier(_)) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_function_body()?;
        let span = start.merge(self.previous_span());
        Some(Function {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            span,
        })
    }

    /// `(a, b = 1, ...rest)`
    pub(crate) fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let rest = self.eat(&TokenKind::DotDotDot);
            let name = self.expect_identifier()?;
            let default = if !rest && self.eat(&TokenKind::Eq) {
                Some(self.with_in(true, |p| p.parse_assignment())?)
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                rest,
            });
            if rest && !self.check(&TokenKind::RParen) {
                self.error_at_current(
                    ErrorCode::INVALID_REST_PARAMETER,
                    "Rest parameter must be last formal parameter",
                );
                return None;
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(params)
    }

    /// A function body block: loop and switch context does not leak in.
    pub(crate) fn parse_function_body(&mut self) -> Option<Block> {
        let saved = (self.loop_depth, self.switch_depth);
        self.loop_depth = 0;
        self.switch_depth = 0;
        let body = self.with_in(true, |p| p.parse_block());
        (self.loop_depth, self.switch_depth) = saved;
        body
    }
}
