//! Statements segmented out of document text.

use serde::{Deserialize, Serialize};

/// One SQL statement as emitted by the segmenter.
///
/// `index` is 0-based and contiguous in emission order. It says nothing about
/// which page the statement came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedStatement {
    pub index: usize,
    pub text: String,
}

impl ExtractedStatement {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}
