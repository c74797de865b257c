use std::fmt;

use crate::span::Position;

/// Reserved words. Any identifier spelled like one of these lexes as
/// [`TokenKind::Keyword`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Declarations
    Var,
    Function,
    Return,

    // Control flow
    If,
    Else,
    For,
    While,
    In,

    // Message bus
    Listen,
    Send,
    Reply,
    React,

    // Interop
    Use,
    As,

    // Modules
    Import,

    // Literals
    True,
    False,
    Null,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Keyword> {
        let kw = match word {
            "var" => Keyword::Var,
            "function" => Keyword::Function,
            "return" => Keyword::Return,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "for" => Keyword::For,
            "while" => Keyword::While,
            "in" => Keyword::In,
            "listen" => Keyword::Listen,
            "send" => Keyword::Send,
            "reply" => Keyword::Reply,
            "react" => Keyword::React,
            "use" => Keyword::Use,
            "as" => Keyword::As,
            "import" => Keyword::Import,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Var => "var",
            Keyword::Function => "function",
            Keyword::Return => "return",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::In => "in",
            Keyword::Listen => "listen",
            Keyword::Send => "send",
            Keyword::Reply => "reply",
            Keyword::React => "react",
            Keyword::Use => "use",
            Keyword::As => "as",
            Keyword::Import => "import",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }

    /// Keywords that may begin a statement; the parser resynchronizes on these.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            Keyword::Var
                | Keyword::Function
                | Keyword::Return
                | Keyword::If
                | Keyword::For
                | Keyword::While
                | Keyword::Listen
                | Keyword::Send
                | Keyword::Reply
                | Keyword::React
                | Keyword::Use
                | Keyword::Import
        )
    }
}

pub const KEYWORDS: &[&str] = &[
    "var", "function", "return", "if", "else", "for", "while", "in", "listen", "send", "reply",
    "react", "use", "as", "import", "true", "false", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Number,
    String,
    Identifier,
    Keyword(Keyword),

    // Operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    Assign,    // =
    EqEq,      // ==
    NotEq,     // !=
    Lt,        // <
    Le,        // <=
    Gt,        // >
    Ge,        // >=
    And,       // &&
    Or,        // ||
    Not,       // !

    // Delimiters
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Dot,      // .
    Colon,    // :

    // Trivia, filtered before parsing
    Newline,
    Comment,

    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword(kw) => kw.as_str(),
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Assign => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::And => "'&&'",
            TokenKind::Or => "'||'",
            TokenKind::Not => "'!'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Colon => "':'",
            TokenKind::Newline => "newline",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of input",
        }
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Comment)
    }
}

/// A lexeme with its literal text and 1-based start position. String tokens
/// carry the unescaped contents, comment tokens the text after `//`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({:?}, '{}', {}:{})",
            self.kind, self.text, self.line, self.column
        )
    }
}
