//! Expression parsing with JavaScript operator precedence.
//!
//! Precedence (lowest → highest):
//! 1. `,` (sequence)
//! 2. `=` and compound assignment, arrow functions (right-assoc)
//! 3. `? :` (conditional)
//! 4. binary operators by binding power, see [`infix_operator`]
//! 5. unary `! - + ~ typeof void delete`, prefix `++`/`--`
//! 6. postfix `++`/`--`
//! 7. `new`, calls, member access `.` `[]` `?.`
//! 8. primary: literals, identifiers, `( … )`, function expressions

use std::rc::Rc;

use jsplay_lexer::token::TokenKind;
use jsplay_types::ast::*;
use jsplay_types::{ErrorCode, Span};

use crate::parser::Parser;

/// A binary operator as it appears between two operands.
#[derive(Debug, Clone, Copy)]
enum InfixOp {
    Binary(BinOp),
    Logical(LogicalOp),
}

/// Binding power of each infix operator; higher binds tighter.
fn infix_operator(kind: &TokenKind, allow_in: bool) -> Option<(InfixOp, u8)> {
    use InfixOp::{Binary, Logical};
    Some(match kind {
        TokenKind::QuestionQuestion => (Logical(LogicalOp::Nullish), 1),
        TokenKind::PipePipe => (Logical(LogicalOp::Or), 2),
        TokenKind::AmpAmp => (Logical(LogicalOp::And), 3),
        TokenKind::Pipe => (Binary(BinOp::BitOr), 4),
        TokenKind::Caret => (Binary(BinOp::BitXor), 5),
        TokenKind::Amp => (Binary(BinOp::BitAnd), 6),
        TokenKind::EqEq => (Binary(BinOp::Eq), 7),
        TokenKind::BangEq => (Binary(BinOp::NotEq), 7),
        TokenKind::EqEqEq => (Binary(BinOp::StrictEq), 7),
        TokenKind::BangEqEq => (Binary(BinOp::StrictNotEq), 7),
        TokenKind::Less => (Binary(BinOp::Less), 8),
        TokenKind::Greater => (Binary(BinOp::Greater), 8),
        TokenKind::LessEq => (Binary(BinOp::LessEq), 8),
        TokenKind::GreaterEq => (Binary(BinOp::GreaterEq), 8),
        TokenKind::InstanceOf => (Binary(BinOp::InstanceOf), 8),
        TokenKind::In if allow_in => (Binary(BinOp::In), 8),
        TokenKind::Shl => (Binary(BinOp::Shl), 9),
        TokenKind::Shr => (Binary(BinOp::Shr), 9),
        TokenKind::UShr => (Binary(BinOp::UShr), 9),
        TokenKind::Plus => (Binary(BinOp::Add), 10),
        TokenKind::Minus => (Binary(BinOp::Sub), 10),
        TokenKind::Star => (Binary(BinOp::Mul), 11),
        TokenKind::Slash => (Binary(BinOp::Div), 11),
        TokenKind::Percent => (Binary(BinOp::Mod), 11),
        TokenKind::StarStar => (Binary(BinOp::Exp), 12),
        _ => return None,
    })
}

fn assignment_operator(kind: &TokenKind) -> Option<AssignOp> {
    Some(match kind {
        TokenKind::Eq => AssignOp::Assign,
        TokenKind::PlusEq => AssignOp::Compound(BinOp::Add),
        TokenKind::MinusEq => AssignOp::Compound(BinOp::Sub),
        TokenKind::StarEq => AssignOp::Compound(BinOp::Mul),
        TokenKind::StarStarEq => AssignOp::Compound(BinOp::Exp),
        TokenKind::SlashEq => AssignOp::Compound(BinOp::Div),
        TokenKind::PercentEq => AssignOp::Compound(BinOp::Mod),
        TokenKind::AmpEq => AssignOp::Compound(BinOp::BitAnd),
        TokenKind::PipeEq => AssignOp::Compound(BinOp::BitOr),
        TokenKind::CaretEq => AssignOp::Compound(BinOp::BitXor),
        TokenKind::ShlEq => AssignOp::Compound(BinOp::Shl),
        TokenKind::ShrEq => AssignOp::Compound(BinOp::Shr),
        TokenKind::UShrEq => AssignOp::Compound(BinOp::UShr),
        TokenKind::AmpAmpEq => AssignOp::Logical(LogicalOp::And),
        TokenKind::PipePipeEq => AssignOp::Logical(LogicalOp::Or),
        TokenKind::QuestionQuestionEq => AssignOp::Logical(LogicalOp::Nullish),
        _ => return None,
    })
}

/// Property key text for a numeric literal key: `{ 1: "a" }` names `"1"`.
fn number_key(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Points
    // ══════════════════════════════════════════════════════════════════════════

    /// `Expression = AssignExpr { "," AssignExpr }`
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Some(first);
        }
        let mut exprs = vec![first];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_assignment()?);
        }
        let span = exprs[0].span.merge(self.previous_span());
        Some(Expr::new(ExprKind::Sequence(exprs), span))
    }

    /// `AssignExpr = ArrowFunction | ConditionalExpr [ AssignOp AssignExpr ]`
    pub(crate) fn parse_assignment(&mut self) -> Option<Expr> {
        self.nested(|p| p.parse_assignment_inner())
    }

    fn parse_assignment_inner(&mut self) -> Option<Expr> {
        if self.is_arrow_start() {
            return self.parse_arrow();
        }
        let target = self.parse_conditional()?;
        let Some(op) = assignment_operator(self.peek_kind()) else {
            return Some(target);
        };
        if !target.is_assignment_target() {
            self.error_at(
                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                "Invalid left-hand side in assignment",
                target.span,
            );
        }
        self.advance(); // consume operator
        let value = self.parse_assignment()?;
        let span = target.span.merge(value.span);
        Some(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    /// `ConditionalExpr = BinaryExpr [ "?" AssignExpr ":" AssignExpr ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let test = self.parse_binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Some(test);
        }
        let consequent = self.with_in(true, |p| p.parse_assignment())?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;
        let span = test.span.merge(alternate.span);
        Some(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Binary Operators
    // ══════════════════════════════════════════════════════════════════════════

    /// Precedence climbing over [`infix_operator`]; `**` is right-associative.
    fn parse_binary(&mut self, min_power: u8) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        while let Some((op, power)) = infix_operator(self.peek_kind(), self.allow_in) {
            if power < min_power {
                break;
            }
            self.advance(); // consume operator
            let right = match op {
                InfixOp::Binary(BinOp::Exp) => self.nested(|p| p.parse_binary(power))?,
                _ => self.parse_binary(power + 1)?,
            };
            let span = left.span.merge(right.span);
            let kind = match op {
                InfixOp::Binary(op) => ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                InfixOp::Logical(op) => ExprKind::Logical {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            };
            left = Expr::new(kind, span);
        }
        Some(left)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Unary & Update
    // ══════════════════════════════════════════════════════════════════════════

    /// `UnaryExpr = UnaryOp UnaryExpr | ("++" | "--") UnaryExpr | PostfixExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::TypeOf => UnaryOp::TypeOf,
            TokenKind::Void => UnaryOp::Void,
            TokenKind::Delete => UnaryOp::Delete,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                let target = self.nested(|p| p.parse_unary())?;
                if !target.is_assignment_target() {
                    self.error_at(
                        ErrorCode::INVALID_ASSIGNMENT_TARGET,
                        "Invalid left-hand side expression in prefix operation",
                        target.span,
                    );
                }
                let span = start.merge(target.span);
                return Some(Expr::new(
                    ExprKind::Update {
                        op,
                        prefix: true,
                        target: Box::new(target),
                    },
                    span,
                ));
            }
            _ => return self.parse_postfix(),
        };
        self.advance(); // consume operator
        let operand = self.nested(|p| p.parse_unary())?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `PostfixExpr = CallExpr [ no-line-break ("++" | "--") ]`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let expr = self.parse_call_member()?;
        let op = match self.peek_kind() {
            TokenKind::PlusPlus if !self.peek().newline_before => UpdateOp::Increment,
            TokenKind::MinusMinus if !self.peek().newline_before => UpdateOp::Decrement,
            _ => return Some(expr),
        };
        if !expr.is_assignment_target() {
            self.error_at(
                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                "Invalid left-hand side expression in postfix operation",
                expr.span,
            );
        }
        let end = self.advance().span;
        let span = expr.span.merge(end);
        Some(Expr::new(
            ExprKind::Update {
                op,
                prefix: false,
                target: Box::new(expr),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Calls, Members, `new`
    // ══════════════════════════════════════════════════════════════════════════

    /// `CallExpr = (NewExpr | PrimaryExpr) { "." name | "?." … | "[" expr "]" | Arguments }`
    fn parse_call_member(&mut self) -> Option<Expr> {
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let mut optional_chain = false;

        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_property_name()?;
                    expr = self.member(expr, MemberProperty::Named(name), false);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.with_in(true, |p| p.parse_expression())?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = self.member(expr, MemberProperty::Computed(Box::new(property)), false);
                }
                TokenKind::LParen => {
                    let args = self.parse_arguments()?;
                    expr = self.call(expr, args, false);
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    optional_chain = true;
                    match self.peek_kind() {
                        TokenKind::LParen => {
                            let args = self.parse_arguments()?;
                            expr = self.call(expr, args, true);
                        }
                        TokenKind::LBracket => {
                            self.advance();
                            let property = self.with_in(true, |p| p.parse_expression())?;
                            self.expect(&TokenKind::RBracket)?;
                            expr = self.member(
                                expr,
                                MemberProperty::Computed(Box::new(property)),
                                true,
                            );
                        }
                        _ => {
                            let name = self.expect_property_name()?;
                            expr = self.member(expr, MemberProperty::Named(name), true);
                        }
                    }
                }
                TokenKind::TemplateString(_) | TokenKind::TemplateHead(_)
                    if !self.peek().newline_before =>
                {
                    let error = self
                        .make_error(
                            ErrorCode::UNEXPECTED_TOKEN,
                            "Unexpected template string",
                            self.current_span(),
                        )
                        .with_suggestion("tagged templates are not supported");
                    self.push_error(error);
                    return None;
                }
                _ => break,
            }
        }

        if optional_chain {
            let span = expr.span;
            expr = Expr::new(ExprKind::OptionalChain(Box::new(expr)), span);
        }
        Some(expr)
    }

    /// `NewExpr = "new" (NewExpr | MemberExpr) [ Arguments ]`
    fn parse_new(&mut self) -> Option<Expr> {
        self.nested(|p| {
            let start = p.advance().span; // eat `new`
            let mut callee = if p.check(&TokenKind::New) {
                p.parse_new()?
            } else {
                p.parse_primary()?
            };
            loop {
                match p.peek_kind() {
                    TokenKind::Dot => {
                        p.advance();
                        let name = p.expect_property_name()?;
                        callee = p.member(callee, MemberProperty::Named(name), false);
                    }
                    TokenKind::LBracket => {
                        p.advance();
                        let property = p.with_in(true, |p| p.parse_expression())?;
                        p.expect(&TokenKind::RBracket)?;
                        callee =
                            p.member(callee, MemberProperty::Computed(Box::new(property)), false);
                    }
                    _ => break,
                }
            }
            let args = if p.check(&TokenKind::LParen) {
                p.parse_arguments()?
            } else {
                Vec::new()
            };
            let span = start.merge(p.previous_span());
            Some(Expr::new(
                ExprKind::New {
                    callee: Box::new(callee),
                    args,
                },
                span,
            ))
        })
    }

    /// `Arguments = "(" [ Element { "," Element } [","] ] ")"`
    fn parse_arguments(&mut self) -> Option<Vec<Element>> {
        self.expect(&TokenKind::LParen)?;
        let args = self.with_in(true, |p| p.parse_elements(&TokenKind::RParen, false))?;
        self.expect(&TokenKind::RParen)?;
        Some(args)
    }

    /// Comma-separated elements up to `close`. Array literals allow holes.
    fn parse_elements(&mut self, close: &TokenKind, allow_holes: bool) -> Option<Vec<Element>> {
        let mut elements = Vec::new();
        while !self.check(close) {
            if allow_holes && self.check(&TokenKind::Comma) {
                // `[1, , 3]`: a hole reads as `undefined`.
                let span = self.advance().span;
                elements.push(Element::Expr(void_zero(span)));
                continue;
            }
            let element = if self.eat(&TokenKind::DotDotDot) {
                Element::Spread(self.parse_assignment()?)
            } else {
                Element::Expr(self.parse_assignment()?)
            };
            elements.push(element);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(elements)
    }

    fn member(&self, object: Expr, property: MemberProperty, optional: bool) -> Expr {
        let span = object.span.merge(self.previous_span());
        Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
                optional,
            },
            span,
        )
    }

    fn call(&self, callee: Expr, args: Vec<Element>, optional: bool) -> Expr {
        let span = callee.span.merge(self.previous_span());
        Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
                optional,
            },
            span,
        )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::NumberLit(n) => {
                self.advance();
                ExprKind::NumberLit(n)
            }
            TokenKind::StringLit(s) | TokenKind::TemplateString(s) => {
                self.advance();
                ExprKind::StringLit(s)
            }
            TokenKind::TemplateHead(_) => return self.parse_template(),
            TokenKind::True => {
                self.advance();
                ExprKind::BoolLit(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::BoolLit(false)
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::NullLit
            }
            TokenKind::This => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Identifier(name) => {
                self.advance();
                ExprKind::Identifier(name)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.with_in(true, |p| p.parse_expression())?;
                self.expect(&TokenKind::RParen)?;
                // Parentheses only group; keep the inner node with a widened span.
                return Some(Expr::new(inner.kind, span.merge(self.previous_span())));
            }
            TokenKind::LBracket => {
                self.advance();
                let elements =
                    self.with_in(true, |p| p.parse_elements(&TokenKind::RBracket, true))?;
                self.expect(&TokenKind::RBracket)?;
                ExprKind::ArrayLit(elements)
            }
            TokenKind::LBrace => return self.parse_object_literal(),
            TokenKind::Function => {
                let function = self.parse_function(false)?;
                let span = function.span;
                return Some(Expr::new(ExprKind::Function(Rc::new(function)), span));
            }
            _ => {
                self.unexpected_token();
                return None;
            }
        };
        Some(Expr::new(kind, span.merge(self.previous_span())))
    }

    /// `` `head ${expr} middle ${expr} tail` ``
    fn parse_template(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut parts = Vec::new();
        let TokenKind::TemplateHead(head) = self.advance().kind else {
            return None;
        };
        if !head.is_empty() {
            parts.push(TemplatePart::Literal(head));
        }
        loop {
            let expr = self.with_in(true, |p| p.parse_expression())?;
            parts.push(TemplatePart::Expr(expr));
            match self.peek_kind().clone() {
                TokenKind::TemplateMiddle(text) => {
                    self.advance();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Literal(text));
                    }
                }
                TokenKind::TemplateTail(text) => {
                    self.advance();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Literal(text));
                    }
                    break;
                }
                _ => {
                    self.unexpected_token();
                    return None;
                }
            }
        }
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Template(parts), span))
    }

    /// `{ a: 1, b, [k]: v, m() {}, ...rest, "quoted": 2, 3: "three" }`
    fn parse_object_literal(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `{`
        let mut properties = Vec::new();
        self.with_in(true, |p| {
            while !p.check(&TokenKind::RBrace) {
                properties.push(p.parse_property()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Some(())
        })?;
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::ObjectLit(properties), span))
    }

    fn parse_property(&mut self) -> Option<PropertyDef> {
        if self.eat(&TokenKind::DotDotDot) {
            return Some(PropertyDef::Spread(self.parse_assignment()?));
        }

        let key_span = self.current_span();
        let kind = self.peek_kind().clone();
        let (key, shorthand) = match &kind {
            TokenKind::Identifier(name) => {
                self.advance();
                (PropertyKey::Named(name.clone()), Some(name.clone()))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                (PropertyKey::Named(s.clone()), None)
            }
            TokenKind::NumberLit(n) => {
                self.advance();
                (PropertyKey::Named(number_key(*n)), None)
            }
            TokenKind::LBracket => {
                self.advance();
                let key = self.parse_assignment()?;
                self.expect(&TokenKind::RBracket)?;
                (PropertyKey::Computed(Box::new(key)), None)
            }
            _ if kind.is_keyword() => {
                self.advance();
                (PropertyKey::Named(kind.to_string()), None)
            }
            _ => {
                self.unexpected_token();
                return None;
            }
        };

        match self.peek_kind() {
            TokenKind::Colon => {
                self.advance();
                let value = self.parse_assignment()?;
                Some(PropertyDef::Init { key, value })
            }
            TokenKind::LParen => {
                // Method shorthand: `name() { … }`
                let name = match &key {
                    PropertyKey::Named(name) => Some(Ident::new(name.clone(), key_span)),
                    PropertyKey::Computed(_) => None,
                };
                let params = self.parse_params()?;
                let body = self.parse_function_body()?;
                let span = key_span.merge(self.previous_span());
                let function = Function {
                    name,
                    params,
                    body: FunctionBody::Block(body),
                    is_arrow: false,
                    span,
                };
                let value = Expr::new(ExprKind::Function(Rc::new(function)), span);
                Some(PropertyDef::Init { key, value })
            }
            _ => match shorthand {
                Some(name) => {
                    let value = Expr::new(ExprKind::Identifier(name), key_span);
                    Some(PropertyDef::Init { key, value })
                }
                None => {
                    self.unexpected_token();
                    None
                }
            },
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Arrow Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// `x =>` or a parenthesised parameter list followed by `=>`.
    fn is_arrow_start(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Identifier(_) => matches!(self.look_ahead(1), TokenKind::Arrow),
            TokenKind::LParen => {
                let mut depth = 0usize;
                let mut n = 0;
                loop {
                    match self.look_ahead(n) {
                        TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(self.look_ahead(n + 1), TokenKind::Arrow);
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    n += 1;
                }
            }
            _ => false,
        }
    }

    /// `Params "=>" (Block | AssignExpr)`
    fn parse_arrow(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let params = if let TokenKind::Identifier(name) = self.peek_kind().clone() {
            let span = self.advance().span;
            vec![Param {
                name: Ident::new(name, span),
                default: None,
                rest: false,
            }]
        } else {
            self.parse_params()?
        };
        let arrow = self.expect(&TokenKind::Arrow)?;
        if arrow.newline_before {
            self.error_at(ErrorCode::UNEXPECTED_TOKEN, "Unexpected token '=>'", arrow.span);
            return None;
        }
        let body = if self.check(&TokenKind::LBrace) {
            FunctionBody::Block(self.parse_function_body()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_assignment()?))
        };
        let span = start.merge(self.previous_span());
        let function = Function {
            name: None,
            params,
            body,
            is_arrow: true,
            span,
        };
        Some(Expr::new(ExprKind::Function(Rc::new(function)), span))
    }
}

/// `void 0`, the hole value in `[a, , b]`.
fn void_zero(span: Span) -> Expr {
    Expr::new(
        ExprKind::Unary {
            op: UnaryOp::Void,
            operand: Box::new(Expr::new(ExprKind::NumberLit(0.0), span)),
        },
        span,
    )
}
