use livemark_config::PreviewSettings;

use crate::decorate::claims::ClaimedRanges;
use crate::decorate::{BlockLabels, NoLabels};
use crate::editing::{IndentStyle, Selection};
use crate::syntax::{LineIndex, Span, SyntaxTree, parse};

/// Inputs to one decoration pass.
pub struct DecorationContext<'a> {
    pub text: &'a str,
    pub selection: &'a Selection,
    pub settings: &'a PreviewSettings,
    pub labels: &'a dyn BlockLabels,
    pub indent: IndentStyle,
    /// Name of the page being decorated, used for `[[#^id]]` references.
    pub page: Option<&'a str>,
    /// Restrict output to decorations touching this range.
    pub viewport: Option<Span>,
}

impl<'a> DecorationContext<'a> {
    pub fn new(text: &'a str, selection: &'a Selection, settings: &'a PreviewSettings) -> Self {
        Self {
            text,
            selection,
            settings,
            labels: &NoLabels,
            indent: IndentStyle::default(),
            page: None,
            viewport: None,
        }
    }

    pub fn with_labels(mut self, labels: &'a dyn BlockLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_indent(mut self, indent: IndentStyle) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_page(mut self, page: &'a str) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_viewport(mut self, viewport: Span) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

/// Per-pass state shared by every construct handler.
pub struct Pass<'c, 'a> {
    pub ctx: &'c DecorationContext<'a>,
    pub text: &'a str,
    pub tree: SyntaxTree,
    pub lines: LineIndex,
    pub claims: ClaimedRanges,
}

impl<'c, 'a> Pass<'c, 'a> {
    pub fn new(ctx: &'c DecorationContext<'a>) -> Self {
        let tree = parse(ctx.text);
        let lines = LineIndex::new(ctx.text);
        let claims = ClaimedRanges::from_tree(&tree);
        Self {
            ctx,
            text: ctx.text,
            tree,
            lines,
            claims,
        }
    }

    pub fn settings(&self) -> &PreviewSettings {
        self.ctx.settings
    }

    /// Raw text under `span`, or `None` if the span is not a valid slice.
    pub fn slice(&self, span: Span) -> Option<&'a str> {
        self.text.get(span.as_range())
    }
}
