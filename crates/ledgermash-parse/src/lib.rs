pub mod formula;
pub mod parser;
pub mod tokenizer;

pub use formula::{Formula, extract_sources};
pub use parser::{ASTNode, ASTNodeType, FieldRef, Parser, ParserError, parse};
pub use tokenizer::{Token, TokenSubType, TokenType, Tokenizer, TokenizerError};
