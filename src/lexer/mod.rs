pub mod token;

use crate::error::EzError;
use crate::span::Position;
use token::{Keyword, Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    // Start of the token currently being scanned.
    start_line: usize,
    start_column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, EzError> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.start_line = self.line;
            self.start_column = self.column;

            match self.advance() {
                ' ' | '\t' | '\r' => {}
                '\n' => tokens.push(self.make_token(TokenKind::Newline, "\\n")),

                '/' if self.peek() == '/' => tokens.push(self.scan_comment()),

                q @ ('"' | '\'') => tokens.push(self.scan_string(q)?),

                c if c.is_ascii_digit() => tokens.push(self.scan_number(c)),

                c if c.is_ascii_alphabetic() || c == '_' => tokens.push(self.scan_identifier(c)),

                '+' => tokens.push(self.make_token(TokenKind::Plus, "+")),
                '-' => tokens.push(self.make_token(TokenKind::Minus, "-")),
                '*' => tokens.push(self.make_token(TokenKind::Star, "*")),
                '/' => tokens.push(self.make_token(TokenKind::Slash, "/")),
                '%' => tokens.push(self.make_token(TokenKind::Percent, "%")),
                '(' => tokens.push(self.make_token(TokenKind::LParen, "(")),
                ')' => tokens.push(self.make_token(TokenKind::RParen, ")")),
                '{' => tokens.push(self.make_token(TokenKind::LBrace, "{")),
                '}' => tokens.push(self.make_token(TokenKind::RBrace, "}")),
                '[' => tokens.push(self.make_token(TokenKind::LBracket, "[")),
                ']' => tokens.push(self.make_token(TokenKind::RBracket, "]")),
                ',' => tokens.push(self.make_token(TokenKind::Comma, ",")),
                '.' => tokens.push(self.make_token(TokenKind::Dot, ".")),
                ':' => tokens.push(self.make_token(TokenKind::Colon, ":")),

                '=' => {
                    if self.match_char('=') {
                        tokens.push(self.make_token(TokenKind::EqEq, "=="));
                    } else {
                        tokens.push(self.make_token(TokenKind::Assign, "="));
                    }
                }

                '!' => {
                    if self.match_char('=') {
                        tokens.push(self.make_token(TokenKind::NotEq, "!="));
                    } else {
                        tokens.push(self.make_token(TokenKind::Not, "!"));
                    }
                }

                '<' => {
                    if self.match_char('=') {
                        tokens.push(self.make_token(TokenKind::Le, "<="));
                    } else {
                        tokens.push(self.make_token(TokenKind::Lt, "<"));
                    }
                }

                '>' => {
                    if self.match_char('=') {
                        tokens.push(self.make_token(TokenKind::Ge, ">="));
                    } else {
                        tokens.push(self.make_token(TokenKind::Gt, ">"));
                    }
                }

                '&' => {
                    if self.match_char('&') {
                        tokens.push(self.make_token(TokenKind::And, "&&"));
                    } else {
                        return Err(self.unexpected('&'));
                    }
                }

                '|' => {
                    if self.match_char('|') {
                        tokens.push(self.make_token(TokenKind::Or, "||"));
                    } else {
                        return Err(self.unexpected('|'));
                    }
                }

                c => return Err(self.unexpected(c)),
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        tracing::debug!(count = tokens.len(), "lexer produced tokens");
        Ok(tokens)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.pos]
        }
    }

    fn peek_next(&self) -> char {
        if self.pos + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.pos + 1]
        }
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.chars[self.pos] == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn start_pos(&self) -> Position {
        Position::new(self.start_line, self.start_column)
    }

    fn make_token(&self, kind: TokenKind, text: impl Into<String>) -> Token {
        Token::new(kind, text, self.start_line, self.start_column)
    }

    fn unexpected(&self, ch: char) -> EzError {
        EzError::UnexpectedChar {
            ch,
            pos: self.start_pos(),
        }
    }

    fn scan_comment(&mut self) -> Token {
        self.advance(); // second '/'
        let mut text = String::new();
        while !self.is_at_end() && self.peek() != '\n' {
            text.push(self.advance());
        }
        self.make_token(TokenKind::Comment, text)
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, EzError> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote {
            let ch = self.advance();
            if ch != '\\' {
                value.push(ch);
                continue;
            }
            if self.is_at_end() {
                break;
            }
            match self.advance() {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                // Covers `\\`, the escaped delimiter, and any other character
                // which is taken literally.
                other => value.push(other),
            }
        }

        if self.is_at_end() {
            return Err(EzError::UnterminatedString {
                pos: self.start_pos(),
            });
        }

        self.advance(); // closing quote
        Ok(self.make_token(TokenKind::String, value))
    }

    fn scan_number(&mut self, first: char) -> Token {
        let mut text = String::from(first);

        while self.peek().is_ascii_digit() {
            text.push(self.advance());
        }

        // A trailing '.' without a digit after it is left for the parser.
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            text.push(self.advance());
            while self.peek().is_ascii_digit() {
                text.push(self.advance());
            }
        }

        self.make_token(TokenKind::Number, text)
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut ident = String::from(first);
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            ident.push(self.advance());
        }

        let kind = match Keyword::from_word(&ident) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier,
        };
        self.make_token(kind, ident)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, EzError> {
    Lexer::new(source).tokenize()
}
