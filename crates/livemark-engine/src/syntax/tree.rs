use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};

use super::span::Span;

/// Construct type of a syntax node.
///
/// Only the constructs the live preview acts on get their own variant;
/// everything else the markdown parser reports collapses into `Other` so the
/// tree stays complete (spans still nest) without widening the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading { level: u8 },
    BlockQuote,
    CodeBlock,
    List { ordered: bool },
    Item,
    TaskMarker { checked: bool },
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link { kind: LinkKind, dest: String },
    Image { dest: String },
    InlineCode,
    Rule,
    Html,
    Other,
}

/// How a link was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `[label](url)`
    Inline,
    /// `[label][ref]`, `[label][]`, `[label]`
    Reference,
    /// `<https://...>` or `<mail@example.com>`
    Autolink,
}

impl NodeKind {
    /// Stable construct name, as reported to the presentation layer.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "Document",
            NodeKind::Paragraph => "Paragraph",
            NodeKind::Heading { .. } => "Heading",
            NodeKind::BlockQuote => "BlockQuote",
            NodeKind::CodeBlock => "CodeBlock",
            NodeKind::List { .. } => "List",
            NodeKind::Item => "ListItem",
            NodeKind::TaskMarker { .. } => "TaskMarker",
            NodeKind::Emphasis => "Emphasis",
            NodeKind::Strong => "StrongEmphasis",
            NodeKind::Strikethrough => "Strikethrough",
            NodeKind::Superscript => "Superscript",
            NodeKind::Subscript => "Subscript",
            NodeKind::Link { .. } => "Link",
            NodeKind::Image { .. } => "Image",
            NodeKind::InlineCode => "InlineCode",
            NodeKind::Rule => "HorizontalRule",
            NodeKind::Html => "Html",
            NodeKind::Other => "Other",
        }
    }

    /// Block-level kinds that interrupt a list item's own text.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::BlockQuote
                | NodeKind::CodeBlock
                | NodeKind::List { .. }
                | NodeKind::Rule
                | NodeKind::Html
        )
    }
}

/// Read-only syntax node. Derived fresh from the text for every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            children: Vec::new(),
        }
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &SyntaxNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Parsed document tree rooted at a `Document` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
}

impl SyntaxTree {
    pub fn walk(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.root.walk()
    }
}

/// Parser options: CommonMark plus the extensions the live preview renders.
pub fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SUPERSCRIPT);
    options.insert(Options::ENABLE_SUBSCRIPT);
    options
}

/// Parse `text` into an owned syntax tree.
///
/// Node spans come straight from the markdown parser's offset iterator and
/// include delimiters (`**`, backticks, brackets). Text events are not kept:
/// the resolver reads raw text through spans instead.
pub fn parse(text: &str) -> SyntaxTree {
    let mut stack = vec![SyntaxNode::new(NodeKind::Document, Span::new(0, text.len()))];

    for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
        let span = Span::from(range);
        match event {
            Event::Start(tag) => stack.push(SyntaxNode::new(kind_for_tag(tag), span)),
            Event::End(_) => {
                // Unbalanced ends cannot happen with pulldown-cmark, but never pop the root.
                if stack.len() > 1
                    && let Some(node) = stack.pop()
                    && let Some(parent) = stack.last_mut()
                {
                    parent.children.push(node);
                }
            }
            Event::Code(_) => push_leaf(&mut stack, NodeKind::InlineCode, span),
            Event::Rule => push_leaf(&mut stack, NodeKind::Rule, span),
            Event::TaskListMarker(checked) => {
                push_leaf(&mut stack, NodeKind::TaskMarker { checked }, span)
            }
            Event::Html(_) | Event::InlineHtml(_) => push_leaf(&mut stack, NodeKind::Html, span),
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(node) = stack.pop()
            && let Some(parent) = stack.last_mut()
        {
            parent.children.push(node);
        }
    }

    let root = stack
        .pop()
        .unwrap_or_else(|| SyntaxNode::new(NodeKind::Document, Span::new(0, text.len())));
    log::trace!("parsed syntax tree with {} top-level nodes", root.children.len());
    SyntaxTree { root }
}

fn push_leaf(stack: &mut [SyntaxNode], kind: NodeKind, span: Span) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(SyntaxNode::new(kind, span));
    }
}

fn kind_for_tag(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading { level: level as u8 },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(_) => NodeKind::CodeBlock,
        Tag::HtmlBlock => NodeKind::Html,
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
        },
        Tag::Item => NodeKind::Item,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Superscript => NodeKind::Superscript,
        Tag::Subscript => NodeKind::Subscript,
        Tag::Link {
            link_type,
            dest_url,
            ..
        } => NodeKind::Link {
            kind: link_kind(link_type),
            dest: dest_url.to_string(),
        },
        Tag::Image { dest_url, .. } => NodeKind::Image {
            dest: dest_url.to_string(),
        },
        _ => NodeKind::Other,
    }
}

fn link_kind(link_type: LinkType) -> LinkKind {
    match link_type {
        LinkType::Inline => LinkKind::Inline,
        LinkType::Autolink | LinkType::Email => LinkKind::Autolink,
        _ => LinkKind::Reference,
    }
}
