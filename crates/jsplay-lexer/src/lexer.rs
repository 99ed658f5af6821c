//! Core lexer: converts script source text to a token stream.
//!
//! Features:
//! - Numbers (decimal, fraction, exponent, `0x`/`0o`/`0b`), both string quote
//!   styles with escapes, identifiers with `$`/`_`/Unicode letters
//! - Template literals with `${expr}` substitutions via a mode stack
//! - `//` and `/* */` comments skipped
//! - Line terminators are not tokens; each token records whether one
//!   preceded it so the parser can insert semicolons
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use jsplay_types::{CompileErrors, ErrorCode, ScriptError, SourceFile, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// Lexer mode: scanning code, or continuing a template literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Inside a `${…}` substitution. `brace_depth` counts nested `{` so the
    /// `}` that closes the substitution can be told apart.
    Substitution { brace_depth: u32 },
}

/// The jsplay lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    source: &'src str,
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, in characters).
    col: u32,
    errors: CompileErrors,
    mode_stack: Vec<Mode>,
    /// Set when a line terminator is skipped; consumed by the next token.
    saw_newline: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: &source_file.source,
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
            mode_stack: vec![Mode::Normal],
            saw_newline: false,
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.too_many_errors() {
                break;
            }

            let mut token = self.scan_token();
            token.newline_before = std::mem::take(&mut self.saw_newline);

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume `expected` if it is the next character.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = ScriptError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments, remembering whether a line break was crossed.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_COMMENT,
                        "Invalid or unexpected token",
                        span,
                    );
                    return;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                Some(ch) => {
                    if ch == '\n' {
                        self.saw_newline = true;
                    }
                    self.advance();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Token {
        self.skip_trivia();

        if self.at_end() || self.too_many_errors() {
            if self.mode_stack.len() > 1 {
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Unterminated template literal",
                    self.current_span(),
                );
                self.mode_stack.truncate(1);
            }
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start_line = self.line;
        let start_col = self.col;
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, self.current_span());
        };

        let kind = match ch {
            '"' | '\'' => return self.scan_string(ch, start_line, start_col),
            '`' => return self.scan_template(true, start_line, start_col),
            '0'..='9' => return self.scan_number(ch, start, start_line, start_col),
            '.' if matches!(self.peek(), Some('0'..='9')) => {
                return self.scan_number(ch, start, start_line, start_col)
            }
            c if is_identifier_start(c) => return self.scan_identifier(start, start_line, start_col),

            '{' => {
                if let Some(Mode::Substitution { brace_depth }) = self.mode_stack.last_mut() {
                    *brace_depth += 1;
                }
                TokenKind::LBrace
            }
            '}' => {
                if let Mode::Substitution { brace_depth } = self.current_mode() {
                    if brace_depth == 0 {
                        self.mode_stack.pop();
                        return self.scan_template(false, start_line, start_col);
                    }
                    if let Some(Mode::Substitution { brace_depth }) = self.mode_stack.last_mut() {
                        *brace_depth -= 1;
                    }
                }
                TokenKind::RBrace
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,

            '.' => {
                if self.peek() == Some('.') && self.peek_at(1) == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::DotDotDot
                } else {
                    TokenKind::Dot
                }
            }
            '?' => {
                if self.eat('?') {
                    if self.eat('=') {
                        TokenKind::QuestionQuestionEq
                    } else {
                        TokenKind::QuestionQuestion
                    }
                } else if self.peek() == Some('.') && !matches!(self.peek_at(1), Some('0'..='9')) {
                    // `a?.5:b` is a conditional, not optional chaining
                    self.advance();
                    TokenKind::QuestionDot
                } else {
                    TokenKind::Question
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        TokenKind::StarStarEq
                    } else {
                        TokenKind::StarStar
                    }
                } else if self.eat('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::ShlEq
                    } else {
                        TokenKind::Shl
                    }
                } else if self.eat('=') {
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            TokenKind::UShrEq
                        } else {
                            TokenKind::UShr
                        }
                    } else if self.eat('=') {
                        TokenKind::ShrEq
                    } else {
                        TokenKind::Shr
                    }
                } else if self.eat('=') {
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            '&' => {
                if self.eat('&') {
                    if self.eat('=') {
                        TokenKind::AmpAmpEq
                    } else {
                        TokenKind::AmpAmp
                    }
                } else if self.eat('=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    if self.eat('=') {
                        TokenKind::PipePipeEq
                    } else {
                        TokenKind::PipePipe
                    }
                } else if self.eat('=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => {
                if self.eat('=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }

            _ => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_CHARACTER,
                    "Invalid or unexpected token",
                    span,
                );
                // Skip the character and keep going.
                return self.scan_token();
            }
        };

        Token::new(kind, self.span_from(start_line, start_col))
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, first: char, start: usize, start_line: u32, start_col: u32) -> Token {
        let radix = match (first, self.peek()) {
            ('0', Some('x' | 'X')) => Some(16),
            ('0', Some('o' | 'O')) => Some(8),
            ('0', Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let value = if let Some(radix) = radix {
            self.advance();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_digit(radix)) {
                self.advance();
            }
            let digits = &self.source[digits_start..self.pos];
            if digits.is_empty() {
                None
            } else {
                // Accumulate in f64 so literals beyond u64 degrade like JS instead of failing.
                Some(digits.chars().fold(0.0, |acc, c| {
                    acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64
                }))
            }
        } else {
            if first != '.' {
                while let Some('0'..='9') = self.peek() {
                    self.advance();
                }
                // `5.` is a complete literal, so `5..toString()` is a member access.
                if self.peek() == Some('.') {
                    self.advance();
                }
            }
            while let Some('0'..='9') = self.peek() {
                self.advance();
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let has_digits = match self.peek_at(1) {
                    Some('0'..='9') => true,
                    Some('+' | '-') => matches!(self.peek_at(2), Some('0'..='9')),
                    _ => false,
                };
                if has_digits {
                    self.advance();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.advance();
                    }
                    while let Some('0'..='9') = self.peek() {
                        self.advance();
                    }
                }
            }
            self.source[start..self.pos].parse::<f64>().ok()
        };

        // `3in` or `1abc` is not a number followed by a name.
        let glued = self.peek().is_some_and(is_identifier_part);
        let span = self.span_from(start_line, start_col);
        match value {
            Some(n) if !glued => Token::new(TokenKind::NumberLit(n), span),
            _ => {
                while self.peek().is_some_and(is_identifier_part) {
                    self.advance();
                }
                let span = self.span_from(start_line, start_col);
                self.emit_error(ErrorCode::INVALID_NUMBER, "Invalid or unexpected token", span);
                Token::new(TokenKind::NumberLit(value.unwrap_or(f64::NAN)), span)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while self.peek().is_some_and(is_identifier_part) {
            self.advance();
        }
        let text = &self.source[start..self.pos];
        let kind =
            TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Token::new(kind, self.span_from(start_line, start_col))
    }

    // ─────────────────────────────────────────────────────────────
    // String & template literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a quoted string after its opening quote.
    fn scan_string(&mut self, quote: char, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "Invalid or unexpected token",
                        span,
                    );
                    return Token::new(TokenKind::StringLit(buf), span);
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Token::new(
                        TokenKind::StringLit(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(c) => {
                    self.advance();
                    buf.push(c);
                }
            }
        }
    }

    /// Scan template text up to the closing backtick or the next `${`.
    ///
    /// `opening` is true right after the opening backtick, false when resuming
    /// after a substitution's closing `}`.
    fn scan_template(&mut self, opening: bool, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated template literal",
                        span,
                    );
                    let kind = if opening {
                        TokenKind::TemplateString(buf)
                    } else {
                        TokenKind::TemplateTail(buf)
                    };
                    return Token::new(kind, span);
                }
                Some('`') => {
                    self.advance();
                    let kind = if opening {
                        TokenKind::TemplateString(buf)
                    } else {
                        TokenKind::TemplateTail(buf)
                    };
                    return Token::new(kind, self.span_from(start_line, start_col));
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.advance();
                    self.advance();
                    self.mode_stack.push(Mode::Substitution { brace_depth: 0 });
                    let kind = if opening {
                        TokenKind::TemplateHead(buf)
                    } else {
                        TokenKind::TemplateMiddle(buf)
                    };
                    return Token::new(kind, self.span_from(start_line, start_col));
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some('\r') => {
                    // Template text normalises CRLF to LF.
                    self.advance();
                    if self.peek() != Some('\n') {
                        buf.push('\n');
                    }
                }
                Some(c) => {
                    self.advance();
                    buf.push(c);
                }
            }
        }
    }

    /// Decode one escape sequence starting at the `\`.
    /// Returns `None` for line continuations and invalid escapes (error emitted).
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        match self.advance() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('b') => Some('\u{8}'),
            Some('f') => Some('\u{c}'),
            Some('v') => Some('\u{b}'),
            Some('0') if !matches!(self.peek(), Some('0'..='9')) => Some('\0'),
            Some('x') => {
                let code = self.scan_hex_digits(2);
                self.decode_escape(code, "Invalid hexadecimal escape sequence", start_line, start_col)
            }
            Some('u') => {
                let code = if self.eat('{') {
                    let code = self.scan_hex_run();
                    if self.eat('}') {
                        code
                    } else {
                        None
                    }
                } else {
                    self.scan_hex_digits(4).map(|high| self.pair_low_surrogate(high))
                };
                self.decode_escape(code, "Invalid Unicode escape sequence", start_line, start_col)
            }
            Some('\r') => {
                self.eat('\n');
                None
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => None,
            // Any other character escapes to itself: `\'`, `\"`, `\\`, `` \` ``, `\$`.
            Some(ch) => Some(ch),
            None => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Invalid or unexpected token",
                    span,
                );
                None
            }
        }
    }

    fn scan_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            let digit = self.peek()?.to_digit(16)?;
            self.advance();
            value = value * 16 + digit;
        }
        Some(value)
    }

    fn scan_hex_run(&mut self) -> Option<u32> {
        let mut value = 0u32;
        let mut seen = false;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(16)) {
            self.advance();
            seen = true;
            value = value.checked_mul(16)?.checked_add(digit)?;
        }
        seen.then_some(value)
    }

    /// Combine `\uD83D\uDE00` into one code point; any other `high` is returned as is.
    fn pair_low_surrogate(&mut self, high: u32) -> u32 {
        if !(0xD800..0xDC00).contains(&high)
            || self.peek() != Some('\\')
            || self.peek_at(1) != Some('u')
        {
            return high;
        }
        let mut low = 0u32;
        for i in 2..6 {
            match self.peek_at(i).and_then(|c| c.to_digit(16)) {
                Some(digit) => low = low * 16 + digit,
                None => return high,
            }
        }
        if !(0xDC00..0xE000).contains(&low) {
            return high;
        }
        for _ in 0..6 {
            self.advance();
        }
        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
    }

    fn decode_escape(
        &mut self,
        code: Option<u32>,
        message: &str,
        start_line: u32,
        start_col: u32,
    ) -> Option<char> {
        // Lone surrogates have no `char`; they decode to U+FFFD.
        match code {
            Some(code) if code <= 0x10FFFF => Some(char::from_u32(code).unwrap_or('\u{fffd}')),
            _ => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(ErrorCode::INVALID_ESCAPE, message, span);
                None
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}
