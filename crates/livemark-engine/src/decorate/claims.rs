use crate::syntax::{NodeKind, Span, SyntaxTree};

/// Ranges already owned by a construct, consulted by the regex pass.
///
/// Exclusive claims (inline code, links, images, wiki-links, math, bare
/// URLs) admit nothing else overlapping them. Nesting claims (highlight) admit
/// other matches that sit fully inside or fully outside, never across.
/// Boundaries are the tree's emphasis-family nodes: no claim may cross one,
/// or the node would lose one delimiter and keep the other.
#[derive(Debug, Clone, Default)]
pub struct ClaimedRanges {
    exclusive: Vec<Span>,
    nesting: Vec<Span>,
    boundaries: Vec<Span>,
}

impl ClaimedRanges {
    /// Claims made by the syntax tree: inline code, links, images and raw
    /// HTML are exclusive; emphasis-family nodes are boundaries.
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let mut claims = Self::default();
        for node in tree.walk() {
            match node.kind {
                NodeKind::InlineCode
                | NodeKind::Link { .. }
                | NodeKind::Image { .. }
                | NodeKind::CodeBlock
                | NodeKind::Html => claims.exclusive.push(node.span),
                NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Strikethrough
                | NodeKind::Superscript
                | NodeKind::Subscript => claims.boundaries.push(node.span),
                _ => {}
            }
        }
        claims
    }

    fn crosses_boundary(&self, span: Span) -> bool {
        self.boundaries.iter().any(|b| crosses(*b, span))
    }

    /// True if nothing exclusive overlaps `span`.
    pub fn is_free(&self, span: Span) -> bool {
        !self.exclusive.iter().any(|claimed| claimed.overlaps(span))
    }

    /// Claim `span` exclusively if it is free and crosses neither a nesting
    /// claim nor a boundary.
    pub fn claim_exclusive(&mut self, span: Span) -> bool {
        if !self.is_free(span)
            || self.crosses_boundary(span)
            || self.nesting.iter().any(|n| crosses(*n, span))
        {
            return false;
        }
        self.exclusive.push(span);
        true
    }

    /// Claim `span` as a nesting range.
    ///
    /// Exclusive claims fully inside it are fine; one that contains or
    /// crosses it, or any other nesting claim overlapping it, is not.
    pub fn claim_nesting(&mut self, span: Span) -> bool {
        let blocked_by_exclusive = self
            .exclusive
            .iter()
            .any(|claimed| claimed.overlaps(span) && !span.contains_span(*claimed));
        let blocked_by_nesting = self.nesting.iter().any(|n| n.overlaps(span));
        if blocked_by_exclusive || blocked_by_nesting || self.crosses_boundary(span) {
            return false;
        }
        self.nesting.push(span);
        true
    }
}

/// Overlapping with neither containing the other.
pub(crate) fn crosses(a: Span, b: Span) -> bool {
    a.overlaps(b) && !a.contains_span(b) && !b.contains_span(a)
}
