use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::LexError;
use crate::span::{Span, Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Structural keywords
    Policy, Rule, Import, Priority, When, Then, To,
    // Actions
    Deny, Allow, Escalate, Route,
    // Categories
    Safety, Privacy, Operational, Routing, Custom,
    // Logic and booleans
    And, Or, Not, True, False,
    // Literals
    Ident,
    Number,
    String,
    // Punctuation
    Colon,     // :
    Comma,     // ,
    Dot,       // .
    LBrace,    // {
    RBrace,    // }
    LParen,    // (
    RParen,    // )
    // Comparisons
    Eq,        // ==
    Ne,        // !=
    Lt,        // <
    Gt,        // >
    Le,        // <=
    Ge,        // >=
    Eof,
}

impl TokenType {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Policy | Self::Rule | Self::Import | Self::Priority | Self::When
                | Self::Then | Self::To | Self::Deny | Self::Allow | Self::Escalate
                | Self::Route | Self::Safety | Self::Privacy | Self::Operational
                | Self::Routing | Self::Custom | Self::And | Self::Or | Self::Not
                | Self::True | Self::False
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge)
    }

    pub fn is_action(self) -> bool {
        matches!(self, Self::Deny | Self::Allow | Self::Escalate | Self::Route)
    }

    /// Keyword spelling or punctuation symbol; a description for literal kinds.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Rule => "rule",
            Self::Import => "import",
            Self::Priority => "priority",
            Self::When => "when",
            Self::Then => "then",
            Self::To => "to",
            Self::Deny => "deny",
            Self::Allow => "allow",
            Self::Escalate => "escalate",
            Self::Route => "route",
            Self::Safety => "safety",
            Self::Privacy => "privacy",
            Self::Operational => "operational",
            Self::Routing => "routing",
            Self::Custom => "custom",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::True => "true",
            Self::False => "false",
            Self::Ident => "identifier",
            Self::Number => "number",
            Self::String => "string",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenType,
    /// Raw lexeme; for strings, the decoded contents without quotes.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenType, text: impl Into<String>, span: Span) -> Self {
        Self { kind, text: text.into(), span }
    }
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span
    }
}

/// Resolves an identifier run against the keyword table.
///
/// Category names match case-insensitively, everything else is lowercase only.
pub fn keyword(ident: &str) -> Option<TokenType> {
    let kind = match ident {
        "policy" => TokenType::Policy,
        "rule" => TokenType::Rule,
        "import" => TokenType::Import,
        "priority" => TokenType::Priority,
        "when" => TokenType::When,
        "then" => TokenType::Then,
        "to" => TokenType::To,
        "deny" => TokenType::Deny,
        "allow" => TokenType::Allow,
        "escalate" => TokenType::Escalate,
        "route" => TokenType::Route,
        "and" => TokenType::And,
        "or" => TokenType::Or,
        "not" => TokenType::Not,
        "true" => TokenType::True,
        "false" => TokenType::False,
        _ => return category_keyword(ident),
    };
    Some(kind)
}

fn category_keyword(ident: &str) -> Option<TokenType> {
    const CATEGORIES: [(&str, TokenType); 5] = [
        ("safety", TokenType::Safety),
        ("privacy", TokenType::Privacy),
        ("operational", TokenType::Operational),
        ("routing", TokenType::Routing),
        ("custom", TokenType::Custom),
    ];
    CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(ident))
        .map(|(_, kind)| *kind)
}

/// Splits PLang source into tokens, terminated by a single `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(&(offset, ch)) = self.chars.peek() {
            let (line, column) = (self.line, self.column);
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '#' => {
                    // Comment runs to end of line
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                'a'..='z' | 'A'..='Z' | '_' => {
                    let end = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                    let text = &self.source[offset..end];
                    let kind = keyword(text).unwrap_or(TokenType::Ident);
                    self.push(kind, text.to_string(), line, column, offset, end);
                }
                '0'..='9' => {
                    let end = self.lex_number();
                    let text = self.source[offset..end].to_string();
                    self.push(TokenType::Number, text, line, column, offset, end);
                }
                '"' | '\'' => {
                    let (text, end) = self.lex_string(ch, line, column)?;
                    self.push(TokenType::String, text, line, column, offset, end);
                }
                '=' | '!' | '<' | '>' => {
                    self.bump();
                    let kind = if self.eat('=') {
                        match ch {
                            '=' => TokenType::Eq,
                            '!' => TokenType::Ne,
                            '<' => TokenType::Le,
                            _ => TokenType::Ge,
                        }
                    } else {
                        match ch {
                            '<' => TokenType::Lt,
                            '>' => TokenType::Gt,
                            // a lone '=' or '!' is not an operator
                            _ => return Err(LexError::UnexpectedCharacter { ch, line, column }),
                        }
                    };
                    let end = self.offset();
                    let text = self.source[offset..end].to_string();
                    self.push(kind, text, line, column, offset, end);
                }
                _ => {
                    let kind = match ch {
                        ':' => TokenType::Colon,
                        ',' => TokenType::Comma,
                        '.' => TokenType::Dot,
                        '{' => TokenType::LBrace,
                        '}' => TokenType::RBrace,
                        '(' => TokenType::LParen,
                        ')' => TokenType::RParen,
                        _ => return Err(LexError::UnexpectedCharacter { ch, line, column }),
                    };
                    self.bump();
                    let end = self.offset();
                    self.push(kind, ch.to_string(), line, column, offset, end);
                }
            }
        }

        let eof = self.source.len();
        let (line, column) = (self.line, self.column);
        self.push(TokenType::Eof, String::new(), line, column, eof, eof);
        Ok(self.tokens)
    }

    fn push(
        &mut self,
        kind: TokenType,
        text: String,
        line: usize,
        column: usize,
        start: usize,
        end: usize,
    ) {
        self.tokens.push(Token::new(kind, text, Span::new(line, column, start, end)));
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Byte offset of the next unread character.
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |&(i, _)| i)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(_, c)) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        self.offset()
    }

    fn lex_number(&mut self) -> usize {
        let end = self.take_while(|c| c.is_ascii_digit());
        // The dot belongs to the number only when a digit follows it
        let rest = &self.source[end..];
        let mut ahead = rest.chars();
        if ahead.next() == Some('.') && ahead.next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            return self.take_while(|c| c.is_ascii_digit());
        }
        end
    }

    fn lex_string(
        &mut self,
        quote: char,
        line: usize,
        column: usize,
    ) -> Result<(String, usize), LexError> {
        self.bump(); // opening quote
        let mut value = String::new();

        loop {
            let (esc_line, esc_column) = (self.line, self.column);
            match self.bump() {
                None | Some('\n') => return Err(LexError::UnterminatedString { line, column }),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = match self.bump() {
                        None | Some('\n') => {
                            return Err(LexError::UnterminatedString { line, column });
                        }
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                escape: other,
                                line: esc_line,
                                column: esc_column,
                            });
                        }
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }

        Ok((value, self.offset()))
    }
}
