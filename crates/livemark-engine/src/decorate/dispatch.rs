use crate::decorate::constructs::{block, image, inline, link, list};
use crate::decorate::context::Pass;
use crate::decorate::filter::Candidate;
use crate::syntax::{NodeKind, SyntaxNode};

/// A node together with the path from the root to it.
pub struct Visit<'t> {
    pub node: &'t SyntaxNode,
    /// Outermost first; does not include `node`.
    pub ancestors: &'t [&'t SyntaxNode],
}

impl Visit<'_> {
    pub fn parent(&self) -> Option<&SyntaxNode> {
        self.ancestors.last().copied()
    }

    /// Number of ancestors matching `pred`.
    pub fn count_ancestors(&self, pred: impl Fn(&NodeKind) -> bool) -> usize {
        self.ancestors.iter().filter(|a| pred(&a.kind)).count()
    }
}

pub type Handler = fn(&Pass<'_, '_>, &Visit<'_>, &mut Vec<Candidate>);

/// Construct handler for a node kind.
///
/// The match is exhaustive: a new `NodeKind` does not compile until it is
/// given a handler or explicitly none.
pub fn handler_for(kind: &NodeKind) -> Option<Handler> {
    match kind {
        NodeKind::Heading { .. } => Some(block::heading),
        NodeKind::BlockQuote => Some(block::block_quote),
        NodeKind::CodeBlock => Some(block::code_block),
        NodeKind::Rule => Some(block::rule),
        NodeKind::Item => Some(list::item),
        NodeKind::TaskMarker { .. } => Some(list::task_marker),
        NodeKind::Emphasis
        | NodeKind::Strong
        | NodeKind::Strikethrough
        | NodeKind::Superscript
        | NodeKind::Subscript => Some(inline::delimited),
        NodeKind::InlineCode => Some(inline::inline_code),
        NodeKind::Link { .. } => Some(link::link),
        NodeKind::Image { .. } => Some(image::image),
        NodeKind::Document
        | NodeKind::Paragraph
        | NodeKind::List { .. }
        | NodeKind::Html
        | NodeKind::Other => None,
    }
}

/// Walk the tree and collect every handler's candidates.
pub fn walk(pass: &Pass<'_, '_>, out: &mut Vec<Candidate>) {
    let mut ancestors = Vec::new();
    visit(pass, &pass.tree.root, &mut ancestors, out);
}

fn visit<'t>(
    pass: &Pass<'_, '_>,
    node: &'t SyntaxNode,
    ancestors: &mut Vec<&'t SyntaxNode>,
    out: &mut Vec<Candidate>,
) {
    if let Some(handler) = handler_for(&node.kind) {
        let visit = Visit {
            node,
            ancestors: ancestors.as_slice(),
        };
        handler(pass, &visit, out);
    }

    ancestors.push(node);
    for child in &node.children {
        visit(pass, child, ancestors, out);
    }
    ancestors.pop();
}
