//! Lexer (tokenizer) for the circuit definition language.

use std::fmt;
use std::str::{Chars, FromStr};

use log::trace;

use crate::error::{LogsimError, Result};
use crate::names::{NameId, Names};

/// The four section keywords, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Devices,
    Connect,
    Monitor,
    End,
}

impl Keyword {
    pub const ALL: [Keyword; 4] = [Self::Devices, Self::Connect, Self::Monitor, Self::End];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Devices => "DEVICES",
            Self::Connect => "CONNECT",
            Self::Monitor => "MONITOR",
            Self::End => "END",
        }
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token types in the definition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// ','
    Comma,
    /// ';'
    Semicolon,
    /// '.'
    Dot,
    /// '->'
    Arrow,
    /// '='
    Equals,
    /// A section keyword, still carrying its interned id
    Keyword(Keyword, NameId),
    /// A decimal integer literal
    Number(u64),
    /// An identifier
    Name(NameId),
    /// End of input
    Eof,
}

/// A token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// Line of the token's first character (0-indexed)
    pub line: usize,
    /// Column of the token's first character (0-indexed)
    pub column: usize,
}

impl Token {
    /// Interned id of a name or keyword token.
    pub fn name_id(&self) -> Option<NameId> {
        match self.kind {
            TokenKind::Name(id) | TokenKind::Keyword(_, id) => Some(id),
            _ => None,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(keyword, _) => Some(keyword),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self.kind, TokenKind::Keyword(..))
    }

    pub fn location(&self) -> (usize, usize) {
        (self.line, self.column)
    }
}

/// Lexer for tokenizing definition-file input.
///
/// `current` is the character about to be consumed; `line` and `column`
/// always give its position.
pub struct Lexer<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    started: bool,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `input`, interning the section keywords.
    pub fn new(input: &'a str, names: &mut Names) -> Self {
        for keyword in Keyword::ALL {
            names.lookup_one(keyword.as_str());
        }
        Self {
            chars: input.chars(),
            current: None,
            started: false,
            line: 0,
            column: 0,
        }
    }

    /// Current position (0-indexed line, column).
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// Get the next token.
    pub fn next_token(&mut self, names: &mut Names) -> Result<Token> {
        if !self.started {
            self.start();
        }
        self.skip_whitespace_and_comments();

        let (line, column) = self.position();
        let token = |kind| Token { kind, line, column };

        let Some(ch) = self.current else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match ch {
            c if c.is_alphabetic() => {
                let text = self.read_name();
                let id = names.lookup_one(&text);
                match text.parse() {
                    Ok(keyword) => TokenKind::Keyword(keyword, id),
                    Err(()) => TokenKind::Name(id),
                }
            }
            c if c.is_ascii_digit() => {
                let text = self.read_number();
                let value: u64 = text.parse().map_err(|_| LogsimError::NumberTooLarge {
                    text,
                    line,
                    column,
                })?;
                TokenKind::Number(value)
            }
            '=' => {
                self.advance();
                TokenKind::Equals
            }
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            ';' => {
                self.advance();
                TokenKind::Semicolon
            }
            '-' => {
                self.advance();
                if self.current != Some('>') {
                    let (line, column) = self.position();
                    return Err(LogsimError::ExpectedArrow { line, column });
                }
                self.advance();
                TokenKind::Arrow
            }
            _ => {
                return Err(LogsimError::UnknownSymbol {
                    symbol: ch,
                    line,
                    column,
                });
            }
        };

        trace!("token {:?} at {}:{}", kind, line, column);
        Ok(token(kind))
    }

    /// Load the first character.
    fn start(&mut self) {
        self.started = true;
        self.current = self.chars.next();
    }

    fn advance(&mut self) -> Option<char> {
        let consumed = self.current?;
        if consumed == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        self.current = self.chars.next();
        self.current
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if self.current == Some('/') && self.chars.clone().next() == Some('/') {
                self.skip_comment();
            } else {
                return;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current.map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    /// Skip a `//...//` comment and any whitespace after it. An unclosed
    /// comment runs to end of input.
    fn skip_comment(&mut self) {
        if !(self.current == Some('/') && self.chars.clone().next() == Some('/')) {
            return;
        }
        self.advance();
        self.advance();
        while let Some(ch) = self.current {
            self.advance();
            if ch == '/' && self.current == Some('/') {
                self.advance();
                self.skip_whitespace();
                return;
            }
        }
    }

    fn read_name(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current.filter(|c| c.is_alphanumeric()) {
            text.push(ch);
            self.advance();
        }
        text
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current.filter(char::is_ascii_digit) {
            text.push(ch);
            self.advance();
        }
        text
    }
}
