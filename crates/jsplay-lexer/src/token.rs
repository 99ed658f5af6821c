//! Token types for the jsplay lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the supported JavaScript
//! subset and [`Token`], which pairs a kind with a source [`Span`].

use jsplay_types::Span;
use std::fmt;

/// Reserved words recognised by the lexer.
///
/// `of`, `undefined`, `NaN` and `Infinity` are deliberately absent: they are
/// ordinary identifiers that only gain meaning from context or the realm.
pub const ALL_KEYWORDS: &[&str] = &[
    // Declarations (4)
    "var", "let", "const", "function",
    // Control flow (16)
    "if", "else", "for", "while", "do", "break", "continue", "return", "switch", "case",
    "default", "throw", "try", "catch", "finally", "in",
    // Expressions (10)
    "new", "typeof", "instanceof", "void", "delete", "this", "null", "true", "false",
    "class",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    /// Drives automatic semicolon insertion in the parser.
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    NumberLit(f64),
    /// `"…"` or `'…'` with escapes already decoded
    StringLit(String),
    /// Template literal without substitutions: `` `text` ``
    TemplateString(String),
    /// Text from the opening backtick up to the first `${`
    TemplateHead(String),
    /// Text between a substitution's `}` and the next `${`
    TemplateMiddle(String),
    /// Text between the last substitution's `}` and the closing backtick
    TemplateTail(String),

    Identifier(String),

    // ── Declaration keywords ─────────────────────────────────
    Var,
    Let,
    Const,
    Function,

    // ── Control-flow keywords ────────────────────────────────
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Return,
    Switch,
    Case,
    Default,
    Throw,
    Try,
    Catch,
    Finally,
    In,

    // ── Expression keywords ──────────────────────────────────
    New,
    TypeOf,
    InstanceOf,
    Void,
    Delete,
    This,
    Null,
    True,
    False,
    /// Reserved; classes are not supported.
    Class,

    // ── Arithmetic ───────────────────────────────────────────
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    // ── Comparison ───────────────────────────────────────────
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,

    // ── Logical & bitwise ────────────────────────────────────
    Bang,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    UShr,

    // ── Assignment ───────────────────────────────────────────
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    UShrEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    Dot,
    DotDotDot,
    Question,
    /// `?.`
    QuestionDot,
    /// `=>`
    Arrow,

    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for ordinary identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "throw" => TokenKind::Throw,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "in" => TokenKind::In,
            "new" => TokenKind::New,
            "typeof" => TokenKind::TypeOf,
            "instanceof" => TokenKind::InstanceOf,
            "void" => TokenKind::Void,
            "delete" => TokenKind::Delete,
            "this" => TokenKind::This,
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "class" => TokenKind::Class,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Throw
                | TokenKind::Try
                | TokenKind::Catch
                | TokenKind::Finally
                | TokenKind::In
                | TokenKind::New
                | TokenKind::TypeOf
                | TokenKind::InstanceOf
                | TokenKind::Void
                | TokenKind::Delete
                | TokenKind::This
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Class
        )
    }

    /// `=` or one of the compound/logical assignment operators.
    pub fn is_assignment_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::StarStarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
                | TokenKind::UShrEq
                | TokenKind::AmpAmpEq
                | TokenKind::PipePipeEq
                | TokenKind::QuestionQuestionEq
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::NumberLit(n) => return write!(f, "{n}"),
            TokenKind::StringLit(s) => return write!(f, "\"{s}\""),
            TokenKind::TemplateString(_)
            | TokenKind::TemplateHead(_)
            | TokenKind::TemplateMiddle(_)
            | TokenKind::TemplateTail(_) => "template string",
            TokenKind::Identifier(name) => return write!(f, "{name}"),
            TokenKind::Var => "var",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Throw => "throw",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::In => "in",
            TokenKind::New => "new",
            TokenKind::TypeOf => "typeof",
            TokenKind::InstanceOf => "instanceof",
            TokenKind::Void => "void",
            TokenKind::Delete => "delete",
            TokenKind::This => "this",
            TokenKind::Null => "null",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Class => "class",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::BangEq => "!=",
            TokenKind::BangEqEq => "!==",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::Bang => "!",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::QuestionQuestion => "??",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::UShr => ">>>",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::StarStarEq => "**=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::AmpEq => "&=",
            TokenKind::PipeEq => "|=",
            TokenKind::CaretEq => "^=",
            TokenKind::ShlEq => "<<=",
            TokenKind::ShrEq => ">>=",
            TokenKind::UShrEq => ">>>=",
            TokenKind::AmpAmpEq => "&&=",
            TokenKind::PipePipeEq => "||=",
            TokenKind::QuestionQuestionEq => "??=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::DotDotDot => "...",
            TokenKind::Question => "?",
            TokenKind::QuestionDot => "?.",
            TokenKind::Arrow => "=>",
            TokenKind::Eof => "end of input",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_round_trips_through_display() {
        for kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw).expect("listed keyword must resolve");
            assert!(kind.is_keyword(), "{kw} should be a keyword");
            assert_eq!(kind.to_string(), *kw);
        }
    }

    #[test]
    fn test_contextual_words_are_identifiers() {
        for word in ["of", "undefined", "NaN", "Infinity", "console", "async"] {
            assert_eq!(TokenKind::from_keyword(word), None, "{word}");
        }
    }

    #[test]
    fn test_assignment_operators() {
        assert!(TokenKind::PlusEq.is_assignment_operator());
        assert!(TokenKind::QuestionQuestionEq.is_assignment_operator());
        assert!(!TokenKind::EqEq.is_assignment_operator());
        assert!(!TokenKind::Arrow.is_assignment_operator());
    }
}
