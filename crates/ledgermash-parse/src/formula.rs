//! A parsed formula plus the reference metadata the engine needs up front.

use std::fmt;

use crate::parser::{ASTNode, FieldRef, ParserError, parse};

/// A formula parsed once, ahead of any record evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    text: String,
    ast: ASTNode,
    references: Vec<FieldRef>,
    sources: Vec<String>,
}

impl Formula {
    pub fn parse(text: &str) -> Result<Self, ParserError> {
        let ast = parse(text)?;

        let mut all = Vec::new();
        ast.walk_refs(&mut all);

        let mut references: Vec<FieldRef> = Vec::with_capacity(all.len());
        let mut sources: Vec<String> = Vec::new();
        for r in all {
            if !references.contains(r) {
                references.push(r.clone());
            }
            if !sources.iter().any(|s| s == &r.source) {
                sources.push(r.source.clone());
            }
        }

        Ok(Self {
            text: text.to_string(),
            ast,
            references,
            sources,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> &ASTNode {
        &self.ast
    }

    /// Distinct references in first-appearance order.
    pub fn references(&self) -> &[FieldRef] {
        &self.references
    }

    /// Distinct source names in first-appearance order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ast)
    }
}

/// Distinct source names referenced by `formula`, in first-appearance order.
pub fn extract_sources(formula: &str) -> Result<Vec<String>, ParserError> {
    Ok(Formula::parse(formula)?.sources)
}
