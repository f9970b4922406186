//! Tokenizer for the literal mapping syntax
//!
//! Single pass over the characters, tracking line and column. Comments
//! are kept as tokens because section headings live in them.

use crate::errors::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Equals,
    /// A `.` that does not start a number
    Dot,
    Str(String),
    Int(i64),
    Float(f64),
    Ident(String),
    /// Comment text without the leading `#`; `own_line` is true when
    /// nothing but whitespace precedes it on its line
    Comment { text: String, own_line: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    line_has_content: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            line_has_content: false,
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_has_content = false;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> ConfigError {
        ConfigError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }

        let (line, column) = (self.line, self.column);
        let ch = match self.chars.peek() {
            Some(&ch) => ch,
            None => return Ok(None),
        };

        let own_line = !self.line_has_content;
        self.line_has_content = true;

        let kind = match ch {
            '#' => {
                self.bump();
                let mut text = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
                TokenKind::Comment {
                    text: text.trim().to_string(),
                    own_line,
                }
            }
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            '=' => self.single(TokenKind::Equals),
            '\'' | '"' => self.string(line, column)?,
            '.' if !self.digit_after_current() => self.single(TokenKind::Dot),
            c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => {
                self.number(line, column)?
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                TokenKind::Ident(ident)
            }
            other => {
                return Err(self.error(line, column, format!("unexpected character '{}'", other)))
            }
        };

        Ok(Some(Token { kind, line, column }))
    }

    fn digit_after_current(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        matches!(ahead.peek(), Some(c) if c.is_ascii_digit())
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn string(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let quote = self.bump().unwrap_or('\'');
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error(line, column, "unterminated string literal"))
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.error(line, column, "unterminated string literal")),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(TokenKind::Str(out))
    }

    fn number(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let mut raw = String::new();
        if let Some(&sign) = self.chars.peek() {
            if sign == '-' || sign == '+' {
                raw.push(sign);
                self.bump();
            }
        }

        let mut is_float = false;
        let mut prev = ' ';
        while let Some(&c) = self.chars.peek() {
            let accept = c.is_ascii_digit()
                || c == '_'
                || c == '.'
                || c == 'e'
                || c == 'E'
                || ((c == '-' || c == '+') && (prev == 'e' || prev == 'E'));
            if !accept {
                break;
            }
            if c == '.' || c == 'e' || c == 'E' {
                is_float = true;
            }
            if c != '_' {
                raw.push(c);
            }
            prev = c;
            self.bump();
        }

        let digits = raw.trim_start_matches(['-', '+']);
        if digits.is_empty() || digits == "." {
            return Err(self.error(line, column, format!("invalid number '{}'", raw)));
        }

        if is_float {
            raw.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.error(line, column, format!("invalid float '{}'", raw)))
        } else {
            raw.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.error(line, column, format!("invalid integer '{}'", raw)))
        }
    }
}
