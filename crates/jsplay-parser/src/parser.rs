//! Core parser infrastructure: token cursor, error reporting, helpers.

use jsplay_lexer::token::{Token, TokenKind};
use jsplay_types::ast::{Ident, Program};
use jsplay_types::{CompileErrors, ErrorCode, ScriptError, SourceFile, Span};

/// Maximum syntactic nesting (statements, expressions, functions combined).
pub const MAX_NESTING_DEPTH: u32 = 64;

/// The jsplay parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// Collects errors and attempts recovery when possible.
pub struct Parser<'src> {
    /// The token stream (always ends with `Eof`).
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// File name for error messages.
    file_name: String,
    /// Collected errors.
    errors: CompileErrors,
    /// Current nesting depth (max [`MAX_NESTING_DEPTH`]).
    pub(crate) depth: u32,
    /// Enclosing loops in the current function (`break` and `continue` legal).
    pub(crate) loop_depth: u32,
    /// Enclosing `switch` statements in the current function (`break` legal).
    pub(crate) switch_depth: u32,
    /// Cleared while parsing a `for` head so `in` ends the left-hand side.
    pub(crate) allow_in: bool,
}

/// Result of parsing.
pub struct ParseResult {
    pub program: Program,
    pub errors: CompileErrors,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(mut tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self {
            tokens,
            pos: 0,
            file_name: source_file.name.clone(),
            source_file,
            errors: CompileErrors::empty(),
            depth: 0,
            loop_depth: 0,
            switch_depth: 0,
            allow_in: true,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// `true` if the current token is the contextual word `of`.
    pub(crate) fn check_of(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(name) if name == "of")
    }

    // ── Semicolons ────────────────────────────────────────────────────────────

    /// Consume a statement terminator, inserting one where the grammar allows:
    /// before `}`, at end of input, or when a line break precedes the token.
    pub(crate) fn consume_semicolon(&mut self) -> Option<()> {
        if self.eat(&TokenKind::Semicolon) {
            return Some(());
        }
        if self.check(&TokenKind::RBrace) || self.at_end() || self.peek().newline_before {
            return Some(());
        }
        self.unexpected_token();
        None
    }

    /// `true` where a restricted production (`return`, `break`, …) ends.
    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) || self.peek().newline_before
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.unexpected_token();
            None
        }
    }

    /// Expect an identifier token.
    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.unexpected_token();
                None
            }
        }
    }

    /// Expect a property name after `.`: identifiers and reserved words alike
    /// (`obj.default`, `promise.catch`).
    pub(crate) fn expect_property_name(&mut self) -> Option<Ident> {
        let kind = self.peek_kind().clone();
        match &kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ if kind.is_keyword() => {
                let span = self.advance().span;
                Some(Ident::new(kind.to_string(), span))
            }
            _ => {
                self.unexpected_token();
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report the current token as unexpected, worded like a browser's SyntaxError.
    pub(crate) fn unexpected_token(&mut self) {
        let (code, message) = match self.peek_kind() {
            TokenKind::Eof => (ErrorCode::UNEXPECTED_END, "Unexpected end of input".to_string()),
            TokenKind::Identifier(name) => (
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Unexpected identifier '{name}'"),
            ),
            TokenKind::NumberLit(_) => (ErrorCode::UNEXPECTED_TOKEN, "Unexpected number".into()),
            TokenKind::StringLit(_) => (ErrorCode::UNEXPECTED_TOKEN, "Unexpected string".into()),
            TokenKind::TemplateString(_)
            | TokenKind::TemplateHead(_)
            | TokenKind::TemplateMiddle(_)
            | TokenKind::TemplateTail(_) => (
                ErrorCode::UNEXPECTED_TOKEN,
                "Unexpected template string".into(),
            ),
            other => (ErrorCode::UNEXPECTED_TOKEN, format!("Unexpected token '{other}'")),
        };
        self.error_at_current(code, message);
    }

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let error = self.make_error(code, message, span);
        self.errors.push_error(error);
    }

    pub(crate) fn make_error(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> ScriptError {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        ScriptError::new(&self.file_name, code, message, span, source_line)
    }

    pub(crate) fn push_error(&mut self, error: ScriptError) {
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= jsplay_types::MAX_ERRORS
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Run `f` one nesting level deeper, failing with E607 past the limit.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.error_at_current(
                ErrorCode::STRUCTURAL_LIMIT_EXCEEDED,
                format!("Maximum nesting depth of {MAX_NESTING_DEPTH} exceeded"),
            );
            return None;
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run `f` with `in` treated as an operator (or not).
    pub(crate) fn with_in<T>(
        &mut self,
        allow: bool,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        let saved = std::mem::replace(&mut self.allow_in, allow);
        let result = f(self);
        self.allow_in = saved;
        result
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until we reach a synchronization point.
    /// Used after an error to resume at a known-good position.
    pub(crate) fn synchronize(&mut self) {
        let start = self.pos;
        while !self.at_end() {
            let moved = self.pos > start;
            if moved && self.peek().newline_before {
                return;
            }
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Return
                | TokenKind::Switch
                | TokenKind::Throw
                | TokenKind::Try
                    if moved =>
                {
                    return
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a `Program` AST.
    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        ParseResult {
            program,
            errors: self.errors,
        }
    }
}
