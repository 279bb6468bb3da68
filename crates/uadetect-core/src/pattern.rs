//! Nested allow/deny pattern trees
//!
//! A node matches when its own pattern matches **and** either it has no
//! children or at least one child matches. This lets a dataset express rules
//! such as "contains `Android` and (contains `Mobile` or contains `Tablet`)".

use regex::Regex;

use crate::error::FormatError;

/// Compiled pattern plus ordered children
#[derive(Debug, Clone)]
pub struct PatternNode {
    regex: Regex,
    children: Vec<PatternNode>,
}

impl PatternNode {
    pub fn new(pattern: &str) -> Result<Self, FormatError> {
        let regex = Regex::new(pattern).map_err(|source| FormatError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex,
            children: Vec::new(),
        })
    }

    pub fn with_children(mut self, children: Vec<PatternNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
            && (self.children.is_empty() || self.children.iter().any(|c| c.is_match(value)))
    }

    /// Source text the node was compiled from
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn children(&self) -> &[PatternNode] {
        &self.children
    }
}

/// Whether any tree in the list matches
pub fn any_match(nodes: &[PatternNode], value: &str) -> bool {
    nodes.iter().any(|n| n.is_match(value))
}
