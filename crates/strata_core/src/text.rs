//! Text span and source position types.
//!
//! Spans are byte ranges into one manifest file. Diagnostics and scope
//! errors report 1-based line/column positions, derived through a
//! [`LineMap`].

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// A position in source text, measured as a byte offset from the start.
pub type TextPos = u32;

/// A span in source text, defined by a start position and a length.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TextSpan {
    pub start: TextPos,
    pub length: TextPos,
}

impl TextSpan {
    #[inline]
    pub fn new(start: TextPos, length: TextPos) -> Self {
        Self { start, length }
    }

    #[inline]
    pub fn from_bounds(start: TextPos, end: TextPos) -> Self {
        debug_assert!(end >= start);
        Self {
            start,
            length: end - start,
        }
    }

    #[inline]
    pub fn empty(pos: TextPos) -> Self {
        Self { start: pos, length: 0 }
    }

    /// The end position of this span (exclusive).
    #[inline]
    pub fn end(&self) -> TextPos {
        self.start + self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn contains(&self, pos: TextPos) -> bool {
        pos >= self.start && pos < self.end()
    }

    #[inline]
    pub fn to_range(&self) -> Range<usize> {
        self.start as usize..self.end() as usize
    }

    /// Return a new span covering both this span and the other.
    pub fn union(&self, other: &TextSpan) -> TextSpan {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        TextSpan::from_bounds(start, end)
    }
}

impl fmt::Debug for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// A 1-based source position attached to bindings and errors.
///
/// `Display` renders the `line L:C` form used in error messages; the file
/// is kept separately so messages stay stable across file names.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SourcePosition {
    pub file: Option<Arc<str>>,
    pub line: u32,
    pub column: Option<u32>,
    /// Byte span of the construct, for snippet rendering.
    pub span: Option<TextSpan>,
}

impl SourcePosition {
    pub fn new(line: u32, column: Option<u32>) -> Self {
        Self {
            file: None,
            line,
            column,
            span: None,
        }
    }

    pub fn with_file(mut self, file: Arc<str>) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_span(mut self, span: TextSpan) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "line {}:{}", self.line, column),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// A map from byte offsets to line numbers, built from source text.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Byte offsets of the start of each line.
    line_starts: Vec<TextPos>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Get the line number (0-based) for a byte offset.
    pub fn line_of(&self, pos: TextPos) -> u32 {
        match self.line_starts.binary_search(&pos) {
            Ok(line) => line as u32,
            Err(line) => (line - 1) as u32,
        }
    }

    /// 1-based line and column for a byte offset.
    pub fn position_of(&self, pos: TextPos) -> (u32, u32) {
        let line = self.line_of(pos);
        let line_start = self.line_starts[line as usize];
        (line + 1, pos - line_start + 1)
    }

    /// Build a full [`SourcePosition`] for a span in the file this map
    /// was built from.
    pub fn source_position(&self, file: &Arc<str>, span: TextSpan) -> SourcePosition {
        let (line, column) = self.position_of(span.start);
        SourcePosition::new(line, Some(column))
            .with_file(Arc::clone(file))
            .with_span(span)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
