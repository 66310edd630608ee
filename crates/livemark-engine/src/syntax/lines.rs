use super::span::Span;

/// A single line of the document with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    /// Zero-based line number.
    pub number: usize,
    /// Offset of the first byte of the line.
    pub start: usize,
    /// Offset just past the last content byte (excludes `\n` / `\r\n`).
    pub end: usize,
}

impl LineSpan {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Offset-to-line lookup over one version of the document text.
///
/// Built once per decoration pass; lookups are binary searches over the
/// recorded line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    ends: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        let mut ends = Vec::new();
        let bytes = text.as_bytes();

        for (i, &byte) in bytes.iter().enumerate() {
            if byte == b'\n' {
                let end = if i > 0 && bytes[i - 1] == b'\r' { i - 1 } else { i };
                ends.push(end);
                starts.push(i + 1);
            }
        }
        ends.push(text.len());

        Self { starts, ends }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// The line at `number`, if it exists.
    pub fn line(&self, number: usize) -> Option<LineSpan> {
        Some(LineSpan {
            number,
            start: *self.starts.get(number)?,
            end: *self.ends.get(number)?,
        })
    }

    /// The line containing `offset`. Offsets past the end clamp to the last line.
    pub fn line_at(&self, offset: usize) -> LineSpan {
        let number = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        LineSpan {
            number,
            start: self.starts[number],
            end: self.ends[number],
        }
    }

    /// All lines touched by `span`. A span ending exactly at a line start
    /// (for example a block range that includes its trailing newline) does
    /// not pull in that following line.
    pub fn lines_in(&self, span: Span) -> impl Iterator<Item = LineSpan> + '_ {
        let first = self.line_at(span.start).number;
        let last_offset = if span.end > span.start { span.end - 1 } else { span.start };
        let last = self.line_at(last_offset).number.max(first);
        (first..=last).filter_map(move |n| self.line(n))
    }

    /// Span from the start of the first line to the end of the last line
    /// touched by `span`.
    pub fn covering(&self, span: Span) -> Span {
        let mut lines = self.lines_in(span);
        let first = lines.next().unwrap_or_else(|| self.line_at(span.start));
        let last = lines.last().unwrap_or(first);
        Span::new(first.start, last.end)
    }
}
