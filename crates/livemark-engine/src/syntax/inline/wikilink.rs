use crate::syntax::span::Span;

use super::cursor::Cursor;

/// A wiki-style link `[[target]]` or `[[target|alias]]` found in raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WikiLink {
    /// Full span including `[[` and `]]`.
    pub full: Span,
    /// Span of the target (page name plus optional `#fragment`).
    pub target: Span,
    /// Span of the alias if present (after `|`).
    pub alias: Option<Span>,
}

impl WikiLink {
    pub const OPEN: &'static [u8; 2] = b"[[";
    pub const CLOSE: &'static [u8; 2] = b"]]";
    pub const ALIAS: u8 = b'|';
    pub const FRAGMENT: char = '#';
    pub const BLOCK_REF: char = '^';
}

/// Scan `s` (which starts at document offset `base`) for closed wiki-links.
///
/// Unclosed `[[`, links spanning a line break and links whose target contains
/// another bracket are skipped, leaving the text undecorated.
pub fn scan_wikilinks(base: usize, s: &str) -> Vec<WikiLink> {
    let mut cur = Cursor::new(s, base);
    let mut out = Vec::new();

    while !cur.eof() {
        if let Some(link) = try_scan_wikilink(&mut cur) {
            out.push(link);
            continue;
        }
        cur.bump();
    }

    out
}

/// A wiki-link starting at the cursor. The cursor only moves on success.
fn try_scan_wikilink(cur: &mut Cursor<'_>) -> Option<WikiLink> {
    let saved = *cur;
    let link = scan_link_body(cur);
    if link.is_none() {
        *cur = saved;
    }
    link
}

fn scan_link_body(cur: &mut Cursor<'_>) -> Option<WikiLink> {
    let start = cur.pos();
    if !cur.eat(WikiLink::OPEN) {
        return None;
    }

    // Target stops at `|` or `]]`; a stray bracket means this is not a link
    let target = cur.run_until(
        |c| c.peek() == Some(WikiLink::ALIAS) || c.at(WikiLink::CLOSE),
        b"[]\n",
    )?;
    if target.is_empty() {
        return None;
    }

    let alias = if cur.eat(&[WikiLink::ALIAS]) {
        Some(cur.run_until(|c| c.at(WikiLink::CLOSE), b"[\n")?)
    } else {
        None
    };

    if !cur.eat(WikiLink::CLOSE) {
        return None;
    }
    Some(WikiLink {
        full: cur.span_from(start),
        target,
        alias,
    })
}

/// A wiki-link target split into page and fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiTarget {
    /// Page name; empty when the link points into the current page (`[[#^id]]`).
    pub page: String,
    pub fragment: Option<Fragment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// `#^blockId`
    Block(String),
    /// `#Some heading`
    Heading(String),
}

impl WikiTarget {
    pub fn parse(target: &str) -> Self {
        match target.split_once(WikiLink::FRAGMENT) {
            None => Self {
                page: target.trim().to_string(),
                fragment: None,
            },
            Some((page, fragment)) => {
                let fragment = match fragment.strip_prefix(WikiLink::BLOCK_REF) {
                    Some(id) if is_block_id(id) => Fragment::Block(id.to_string()),
                    _ => Fragment::Heading(fragment.trim().to_string()),
                };
                Self {
                    page: page.trim().to_string(),
                    fragment: Some(fragment),
                }
            }
        }
    }

    pub fn block_id(&self) -> Option<&str> {
        match &self.fragment {
            Some(Fragment::Block(id)) => Some(id),
            _ => None,
        }
    }
}

/// Characters accepted in an existing block id. Generated ids are plain
/// alphanumerics; hand-written ones may also use `-` and `_`.
pub fn is_block_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
