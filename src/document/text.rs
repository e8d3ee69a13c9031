//! Byte offset <-> editor position conversion.
//!
//! Offsets exchanged with the compiler service are byte offsets into the
//! masked script view, which lines up byte-for-byte with the original
//! document. Editor positions are line/UTF-16 column pairs, so every result
//! is converted through an index of the *original* text.

use std::ops::Range;
use std::sync::Arc;

use tower_lsp::lsp_types::Position;

/// Line start table over a shared document text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
    text: Arc<str>,
}

impl LineIndex {
    pub fn new(text: Arc<str>) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1));
        Self { line_starts, text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to a position. Offsets past the end clamp to the
    /// end of the text; offsets inside a multi-byte character resolve to the
    /// character's start.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        };
        let line_start = self.line_starts[line];

        let col: usize = self.text[line_start..]
            .char_indices()
            .take_while(|(i, c)| line_start + i + c.len_utf8() <= offset)
            .map(|(_, c)| c.len_utf16())
            .sum();

        Position::new(line as u32, col as u32)
    }

    /// Convert a position to a byte offset. Columns past the end of a line
    /// clamp to the line end; lines past the end of the text are `None`.
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let line = position.line as usize;
        let line_start = *self.line_starts.get(line)?;
        let mut line_end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        if line_end > line_start && self.text.as_bytes()[line_end - 1] == b'\r' {
            line_end -= 1;
        }

        let mut utf16_col = 0u32;
        for (i, c) in self.text[line_start..line_end].char_indices() {
            if utf16_col >= position.character {
                return Some(line_start + i);
            }
            utf16_col += c.len_utf16() as u32;
        }
        Some(line_end)
    }

    pub fn span_to_range(&self, span: Range<usize>) -> tower_lsp::lsp_types::Range {
        tower_lsp::lsp_types::Range::new(
            self.offset_to_position(span.start),
            self.offset_to_position(span.end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(text: &str) -> LineIndex {
        LineIndex::new(Arc::from(text))
    }

    #[test]
    fn offsets_across_lines() {
        let idx = index("<template>\n</template>\n<script>");
        assert_eq!(idx.line_count(), 3);
        assert_eq!(idx.offset_to_position(0), Position::new(0, 0));
        assert_eq!(idx.offset_to_position(10), Position::new(0, 10));
        assert_eq!(idx.offset_to_position(11), Position::new(1, 0));
        assert_eq!(idx.offset_to_position(23), Position::new(2, 0));
    }

    #[test]
    fn past_the_end_clamps() {
        let idx = index("abc\nde");
        assert_eq!(idx.offset_to_position(100), Position::new(1, 2));
        assert_eq!(idx.position_to_offset(Position::new(0, 99)), Some(3));
        assert_eq!(idx.position_to_offset(Position::new(5, 0)), None);
    }

    #[test]
    fn utf16_columns() {
        // 'é' is 2 bytes / 1 UTF-16 unit, '😀' is 4 bytes / 2 units.
        let idx = index("é😀x");
        assert_eq!(idx.offset_to_position(2), Position::new(0, 1));
        assert_eq!(idx.offset_to_position(6), Position::new(0, 3));
        assert_eq!(idx.position_to_offset(Position::new(0, 3)), Some(6));
        // Offset inside the emoji resolves to its start column.
        assert_eq!(idx.offset_to_position(4), Position::new(0, 1));
    }

    #[test]
    fn crlf_lines() {
        let idx = index("a\r\nb");
        assert_eq!(idx.offset_to_position(3), Position::new(1, 0));
        assert_eq!(idx.position_to_offset(Position::new(1, 1)), Some(4));
        // Past the end of a CRLF line lands before the `\r`.
        assert_eq!(idx.position_to_offset(Position::new(0, 9)), Some(1));
        assert_eq!(idx.position_to_offset(Position::new(0, 1)), Some(1));
    }

    #[test]
    fn span_conversion() {
        let idx = index("<script>\nexport default {}\n</script>");
        let range = idx.span_to_range(9..23);
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(1, 14));
    }
}
