use crate::syntax::span::Span;

/// Walks one text region of the document, reporting document offsets.
///
/// Text regions are the leaves of the syntax tree, so `base` is where the
/// region starts in the full document. The delimiters we look for are all
/// ASCII, which lets the cursor step a byte at a time without ever stopping
/// inside a multibyte character that matters.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    text: &'a [u8],
    base: usize,
    at: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str, base: usize) -> Self {
        Self {
            text: text.as_bytes(),
            base,
            at: 0,
        }
    }

    /// Document offset of the next unread byte.
    pub fn pos(&self) -> usize {
        self.base + self.at
    }

    pub fn eof(&self) -> bool {
        self.at >= self.text.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.text.get(self.at).copied()
    }

    /// Whether the unread text starts with `pat`.
    pub fn at(&self, pat: &[u8]) -> bool {
        self.text
            .get(self.at..)
            .is_some_and(|rest| rest.starts_with(pat))
    }

    /// Consumes `pat` if the unread text starts with it.
    pub fn eat(&mut self, pat: &[u8]) -> bool {
        if !self.at(pat) {
            return false;
        }
        self.at += pat.len();
        true
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.at += 1;
        Some(b)
    }

    /// Advances until `stop` holds and returns the span walked over.
    ///
    /// Hitting a byte from `reject`, or the end of the region, fails and
    /// leaves the cursor where it was.
    pub fn run_until(&mut self, stop: impl Fn(&Self) -> bool, reject: &[u8]) -> Option<Span> {
        let start = *self;
        while !stop(self) {
            match self.peek() {
                Some(b) if !reject.contains(&b) => self.at += 1,
                _ => {
                    *self = start;
                    return None;
                }
            }
        }
        Some(self.span_from(start.pos()))
    }

    /// From document offset `start` up to the current position.
    pub fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.pos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn positions_are_document_offsets() {
        let mut cur = Cursor::new("hello", 10);
        assert_eq!(cur.pos(), 10);
        assert_eq!(cur.bump(), Some(b'h'));
        assert_eq!(cur.pos(), 11);
        assert_eq!(cur.span_from(10), Span::new(10, 11));
    }

    #[test]
    fn eat_consumes_only_on_match() {
        let mut cur = Cursor::new("[[link]]", 0);
        assert!(!cur.eat(b"]]"));
        assert_eq!(cur.pos(), 0);
        assert!(cur.eat(b"[["));
        assert_eq!(cur.peek(), Some(b'l'));
    }

    #[test]
    fn at_past_end_is_false() {
        let mut cur = Cursor::new("x", 0);
        assert_eq!(cur.bump(), Some(b'x'));
        assert_eq!(cur.bump(), None);
        assert!(cur.eof());
        assert!(!cur.at(b"x"));
    }

    #[test]
    fn run_until_returns_walked_span() {
        let mut cur = Cursor::new("page|alias", 4);
        let span = cur.run_until(|c| c.peek() == Some(b'|'), b"\n");
        assert_eq!(span, Some(Span::new(4, 8)));
        assert_eq!(cur.peek(), Some(b'|'));
    }

    #[test]
    fn run_until_rejected_byte_restores_position() {
        let mut cur = Cursor::new("ab\ncd]]", 0);
        assert_eq!(cur.run_until(|c| c.at(b"]]"), b"\n"), None);
        assert_eq!(cur.pos(), 0);
        // Running off the end fails the same way
        assert_eq!(cur.run_until(|c| c.at(b"}}"), b""), None);
        assert_eq!(cur.pos(), 0);
    }
}
