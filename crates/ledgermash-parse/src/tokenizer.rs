use std::error::Error;
use std::fmt::{self, Display};

/// Represents operator associativity.
#[derive(Debug, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// A custom error type for the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenizerError: {} at byte {}", self.message, self.pos)
    }
}

impl Error for TokenizerError {}

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Operand,
    Paren,
    OpPrefix,
    OpInfix,
    Whitespace,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The subtype of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSubType {
    None,
    Number,
    Reference,
    Open,
    Close,
}

impl Display for TokenSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A token in a formula, with its byte span.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct Token {
    pub value: String,
    pub token_type: TokenType,
    pub subtype: TokenSubType,
    pub start: usize,
    pub end: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} subtype: {:?} value: {}>",
            self.token_type, self.subtype, self.value
        )
    }
}

impl Token {
    fn from_slice(
        source: &str,
        token_type: TokenType,
        subtype: TokenSubType,
        start: usize,
        end: usize,
    ) -> Self {
        Token {
            value: source[start..end].to_string(),
            token_type,
            subtype,
            start,
            end,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.token_type, TokenType::OpPrefix | TokenType::OpInfix)
    }

    pub fn get_precedence(&self) -> Option<(u8, Associativity)> {
        // For a prefix operator, use the 'u' key.
        let op = if self.token_type == TokenType::OpPrefix {
            "u"
        } else {
            self.value.as_str()
        };

        match op {
            "u" => Some((7, Associativity::Right)),
            "*" | "/" => Some((4, Associativity::Left)),
            "+" | "-" => Some((3, Associativity::Left)),
            _ => None,
        }
    }

    /// Split a reference token into its `(source, field)` halves.
    pub fn reference_parts(&self) -> Option<(&str, &str)> {
        if self.subtype != TokenSubType::Reference {
            return None;
        }
        self.value.split_once('.')
    }
}

#[inline]
fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// A tokenizer for `source.field` arithmetic formulas.
pub struct Tokenizer {
    formula: String,
    pub items: Vec<Token>,
    offset: usize,
}

impl Tokenizer {
    /// Create a new tokenizer and immediately scan the formula.
    pub fn new(formula: &str) -> Result<Self, TokenizerError> {
        let mut tokenizer = Tokenizer {
            formula: formula.to_string(),
            items: Vec::with_capacity(formula.len() / 2),
            offset: 0,
        };
        tokenizer.parse()?;
        Ok(tokenizer)
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Tokens with whitespace filtered out.
    pub fn significant(&self) -> impl Iterator<Item = &Token> {
        self.items
            .iter()
            .filter(|t| t.token_type != TokenType::Whitespace)
    }

    #[inline]
    fn current_byte(&self) -> Option<u8> {
        self.formula.as_bytes().get(self.offset).copied()
    }

    #[inline]
    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.formula.as_bytes().get(pos).copied()
    }

    fn error<S: Into<String>>(&self, message: S, pos: usize) -> TokenizerError {
        TokenizerError {
            message: message.into(),
            pos,
        }
    }

    /// Whether a `+`/`-` at the current position acts as a prefix operator.
    fn expects_operand(&self) -> bool {
        match self
            .items
            .iter()
            .rev()
            .find(|t| t.token_type != TokenType::Whitespace)
        {
            None => true,
            Some(t) => {
                t.is_operator()
                    || (t.token_type == TokenType::Paren && t.subtype == TokenSubType::Open)
            }
        }
    }

    fn push(&mut self, token_type: TokenType, subtype: TokenSubType, start: usize) {
        let tok = Token::from_slice(&self.formula, token_type, subtype, start, self.offset);
        self.items.push(tok);
    }

    fn parse(&mut self) -> Result<(), TokenizerError> {
        while let Some(c) = self.current_byte() {
            let start = self.offset;
            match c {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    while matches!(self.current_byte(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
                        self.offset += 1;
                    }
                    self.push(TokenType::Whitespace, TokenSubType::None, start);
                }
                b'0'..=b'9' | b'.' => self.parse_number()?,
                b'+' | b'-' => {
                    let token_type = if self.expects_operand() {
                        TokenType::OpPrefix
                    } else {
                        TokenType::OpInfix
                    };
                    self.offset += 1;
                    self.push(token_type, TokenSubType::None, start);
                }
                b'*' | b'/' => {
                    self.offset += 1;
                    self.push(TokenType::OpInfix, TokenSubType::None, start);
                }
                b'(' => {
                    self.offset += 1;
                    self.push(TokenType::Paren, TokenSubType::Open, start);
                }
                b')' => {
                    self.offset += 1;
                    self.push(TokenType::Paren, TokenSubType::Close, start);
                }
                c if c.is_ascii_alphabetic() || c == b'_' => self.parse_reference()?,
                _ => {
                    let ch = self.formula[start..].chars().next().unwrap_or('?');
                    return Err(self.error(format!("Unexpected character '{ch}'"), start));
                }
            }
        }
        Ok(())
    }

    fn consume_digits(&mut self) -> usize {
        let from = self.offset;
        while matches!(self.current_byte(), Some(b'0'..=b'9')) {
            self.offset += 1;
        }
        self.offset - from
    }

    /// Scan `digits [. digits] [e|E [+|-] digits]`.
    fn parse_number(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        let mut digits = self.consume_digits();
        if self.current_byte() == Some(b'.') {
            self.offset += 1;
            digits += self.consume_digits();
        }
        if digits == 0 {
            return Err(self.error("Expected digits in number", start));
        }
        if matches!(self.current_byte(), Some(b'e' | b'E')) {
            let mut pos = self.offset + 1;
            if matches!(self.byte_at(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            if matches!(self.byte_at(pos), Some(b'0'..=b'9')) {
                self.offset = pos;
                self.consume_digits();
            }
        }
        if let Some(c) = self.current_byte() {
            if is_word_byte(c) || c == b'.' {
                return Err(self.error("Invalid number literal", start));
            }
        }
        self.push(TokenType::Operand, TokenSubType::Number, start);
        Ok(())
    }

    /// Scan `identifier . word`.
    fn parse_reference(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        while matches!(self.current_byte(), Some(c) if is_word_byte(c)) {
            self.offset += 1;
        }
        if self.current_byte() != Some(b'.') {
            return Err(self.error(
                format!(
                    "Expected '.' after source name '{}'",
                    &self.formula[start..self.offset]
                ),
                self.offset,
            ));
        }
        self.offset += 1;
        let field_start = self.offset;
        while matches!(self.current_byte(), Some(c) if is_word_byte(c)) {
            self.offset += 1;
        }
        if self.offset == field_start {
            return Err(self.error("Expected field name after '.'", field_start));
        }
        if self.current_byte() == Some(b'.') {
            return Err(self.error("References take the form source.field", self.offset));
        }
        self.push(TokenType::Operand, TokenSubType::Reference, start);
        Ok(())
    }
}
