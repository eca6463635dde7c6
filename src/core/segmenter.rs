//! Statement segmentation.
//!
//! Walks page-ordered document text line by line and cuts it into SQL
//! statements. The accumulator is carried across page boundaries, so a
//! statement split over two pages comes out whole.
//!
//! Rules, per trimmed line:
//! - blank lines are ignored
//! - a line ending with `;` (other than a comment) closes the statement
//! - comment lines (`--`) and lines containing a SQL keyword start or extend
//!   a statement
//! - any other line extends a statement already being collected, and is
//!   discarded as prose otherwise
//!
//! Whatever is still accumulated at the end of the document is emitted as a
//! final statement even without a terminator.

use crate::domain::ExtractedStatement;

/// Keywords marking a line as SQL (matched as substrings, case-insensitive)
pub const SEGMENT_KEYWORDS: [&str; 7] = [
    "SELECT", "FROM", "WHERE", "GROUP BY", "ORDER BY", "JOIN", "HAVING",
];

/// Segmenter state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmenterState {
    /// No statement accumulating
    Idle,
    /// Lines of the statement accumulated so far (never empty)
    Collecting(Vec<String>),
}

/// Line-driven statement segmenter
#[derive(Debug, Clone)]
pub struct StatementSegmenter {
    state: SegmenterState,
    emitted: Vec<ExtractedStatement>,
}

impl Default for StatementSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementSegmenter {
    pub fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            emitted: Vec::new(),
        }
    }

    /// Segment page-ordered text into statements
    pub fn segment<S: AsRef<str>>(pages: &[S]) -> Vec<ExtractedStatement> {
        let mut segmenter = Self::new();
        for page in pages {
            for line in page.as_ref().lines() {
                segmenter.feed_line(line);
            }
        }
        segmenter.finish()
    }

    pub fn state(&self) -> &SegmenterState {
        &self.state
    }

    /// Process one raw line
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let comment = is_comment(line);
        let sql = comment || contains_keyword(line);
        let terminates = !comment && line.ends_with(';');
        let collecting = matches!(self.state, SegmenterState::Collecting(_));

        if !(sql || terminates || collecting) {
            // Prose between statements
            return;
        }

        self.append(line);
        if terminates {
            self.emit();
        }
    }

    /// Flush any unterminated statement and return everything emitted
    pub fn finish(mut self) -> Vec<ExtractedStatement> {
        self.emit();
        self.emitted
    }

    fn append(&mut self, line: &str) {
        match &mut self.state {
            SegmenterState::Idle => {
                self.state = SegmenterState::Collecting(vec![line.to_string()]);
            }
            SegmenterState::Collecting(lines) => lines.push(line.to_string()),
        }
    }

    fn emit(&mut self) {
        if let SegmenterState::Collecting(lines) =
            std::mem::replace(&mut self.state, SegmenterState::Idle)
        {
            let index = self.emitted.len();
            self.emitted
                .push(ExtractedStatement::new(index, lines.join("\n")));
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("--")
}

fn contains_keyword(line: &str) -> bool {
    let upper = line.to_uppercase();
    SEGMENT_KEYWORDS.iter().any(|keyword| upper.contains(keyword))
}
