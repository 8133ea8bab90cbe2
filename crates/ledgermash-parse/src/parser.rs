use crate::tokenizer::{Associativity, Token, TokenSubType, TokenType, Tokenizer, TokenizerError};
use std::error::Error;
use std::fmt::{self, Display};

/// A custom error type for the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    pub message: String,
    pub position: Option<usize>,
}

impl Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "ParserError at byte {}: {}", pos, self.message)
        } else {
            write!(f, "ParserError: {}", self.message)
        }
    }
}

impl Error for ParserError {}

impl From<TokenizerError> for ParserError {
    fn from(err: TokenizerError) -> Self {
        ParserError {
            message: err.message,
            position: Some(err.pos),
        }
    }
}

/// A `source.field` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub source: String,
    pub field: String,
}

impl FieldRef {
    pub fn new<S: Into<String>, F: Into<String>>(source: S, field: F) -> Self {
        Self {
            source: source.into(),
            field: field.into(),
        }
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.field)
    }
}

/// The type of AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum ASTNodeType {
    Literal(f64),
    Reference(FieldRef),
    UnaryOp {
        op: String,
        expr: Box<ASTNode>,
    },
    BinaryOp {
        op: String,
        left: Box<ASTNode>,
        right: Box<ASTNode>,
    },
}

/// An AST node carrying the token it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ASTNode {
    pub node_type: ASTNodeType,
    pub source_token: Option<Token>,
}

impl ASTNode {
    pub fn new(node_type: ASTNodeType, source_token: Option<Token>) -> Self {
        ASTNode {
            node_type,
            source_token,
        }
    }

    /// Every reference in left-to-right order, duplicates included.
    pub fn walk_refs<'a>(&'a self, out: &mut Vec<&'a FieldRef>) {
        match &self.node_type {
            ASTNodeType::Literal(_) => {}
            ASTNodeType::Reference(r) => out.push(r),
            ASTNodeType::UnaryOp { expr, .. } => expr.walk_refs(out),
            ASTNodeType::BinaryOp { left, right, .. } => {
                left.walk_refs(out);
                right.walk_refs(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match &self.node_type {
            ASTNodeType::BinaryOp { op, .. } => match op.as_str() {
                "*" | "/" => 4,
                _ => 3,
            },
            ASTNodeType::UnaryOp { .. } => 7,
            _ => u8::MAX,
        }
    }
}

impl Display for ASTNode {
    /// Canonical rendering with only the parentheses precedence requires.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_type {
            ASTNodeType::Literal(n) => write!(f, "{n}"),
            ASTNodeType::Reference(r) => write!(f, "{r}"),
            ASTNodeType::UnaryOp { op, expr } => {
                if expr.precedence() < self.precedence() {
                    write!(f, "{op}({expr})")
                } else {
                    write!(f, "{op}{expr}")
                }
            }
            ASTNodeType::BinaryOp { op, left, right } => {
                let p = self.precedence();
                if left.precedence() < p {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                write!(f, " {op} ")?;
                if right.precedence() <= p {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
        }
    }
}

/// Precedence-climbing parser over the significant tokens of a formula.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| t.token_type != TokenType::Whitespace)
            .collect();
        Parser {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<ASTNode, ParserError> {
        if self.tokens.is_empty() {
            return Err(ParserError {
                message: "Empty formula".to_string(),
                position: None,
            });
        }
        let ast = self.parse_expression()?;
        if let Some(tok) = self.tokens.get(self.position) {
            return Err(ParserError {
                message: format!("Unexpected token '{}'", tok.value),
                position: Some(tok.start),
            });
        }
        Ok(ast)
    }

    fn parse_expression(&mut self) -> Result<ASTNode, ParserError> {
        self.parse_binary_op(0)
    }

    fn parse_binary_op(&mut self, min_precedence: u8) -> Result<ASTNode, ParserError> {
        let mut left = self.parse_unary_op()?;

        while let Some(token) = self.tokens.get(self.position) {
            if token.token_type != TokenType::OpInfix {
                break;
            }
            let Some((precedence, associativity)) = token.get_precedence() else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            let op_token = token.clone();
            self.position += 1;

            let next_min = if associativity == Associativity::Left {
                precedence + 1
            } else {
                precedence
            };
            let right = self.parse_binary_op(next_min)?;
            left = ASTNode::new(
                ASTNodeType::BinaryOp {
                    op: op_token.value.clone(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Some(op_token),
            );
        }

        Ok(left)
    }

    fn parse_unary_op(&mut self) -> Result<ASTNode, ParserError> {
        if let Some(token) = self.tokens.get(self.position) {
            if token.token_type == TokenType::OpPrefix {
                let op_token = token.clone();
                self.position += 1;
                let expr = self.parse_unary_op()?;
                return Ok(ASTNode::new(
                    ASTNodeType::UnaryOp {
                        op: op_token.value.clone(),
                        expr: Box::new(expr),
                    },
                    Some(op_token),
                ));
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ASTNode, ParserError> {
        let Some(token) = self.tokens.get(self.position).cloned() else {
            return Err(ParserError {
                message: "Unexpected end of formula".to_string(),
                position: self.tokens.last().map(|t| t.end),
            });
        };
        self.position += 1;

        match (token.token_type, token.subtype) {
            (TokenType::Operand, TokenSubType::Number) => {
                let value = token.value.parse::<f64>().map_err(|_| ParserError {
                    message: format!("Invalid number '{}'", token.value),
                    position: Some(token.start),
                })?;
                Ok(ASTNode::new(ASTNodeType::Literal(value), Some(token)))
            }
            (TokenType::Operand, TokenSubType::Reference) => {
                let (source, field) = token.reference_parts().ok_or_else(|| ParserError {
                    message: format!("Invalid reference '{}'", token.value),
                    position: Some(token.start),
                })?;
                let reference = FieldRef::new(source, field);
                Ok(ASTNode::new(ASTNodeType::Reference(reference), Some(token)))
            }
            (TokenType::Paren, TokenSubType::Open) => {
                let expr = self.parse_expression()?;
                match self.tokens.get(self.position) {
                    Some(t) if t.token_type == TokenType::Paren && t.subtype == TokenSubType::Close => {
                        self.position += 1;
                        Ok(expr)
                    }
                    other => Err(ParserError {
                        message: "Expected ')'".to_string(),
                        position: other.map(|t| t.start).or(Some(token.start)),
                    }),
                }
            }
            _ => Err(ParserError {
                message: format!("Unexpected token '{}'", token.value),
                position: Some(token.start),
            }),
        }
    }
}

/// Tokenize and parse `formula` in one step.
pub fn parse(formula: &str) -> Result<ASTNode, ParserError> {
    let tokenizer = Tokenizer::new(formula)?;
    let mut parser = Parser::new(tokenizer.items);
    parser.parse()
}
