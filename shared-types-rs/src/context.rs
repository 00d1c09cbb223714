// shared-types-rs/src/context.rs
// Snippets returned by vector search

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Snippet {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
            score: None,
        }
    }
}

/// Code and documentation snippets related to a failure. Both lists are
/// always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub code: Vec<Snippet>,
    pub docs: Vec<Snippet>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.docs.is_empty()
    }
}
