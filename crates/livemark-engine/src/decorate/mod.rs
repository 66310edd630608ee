//! # Decoration Resolver
//!
//! Turns `(text, selection)` into the set of visual transformations the
//! presentation layer applies: hide a range, replace it with a widget, mark
//! it with a style, or attribute a whole line.
//!
//! A pass runs in four steps:
//!
//! 1. parse the text ([`crate::syntax::parse`]) and claim the ranges owned by
//!    code, links and images ([`claims`]);
//! 2. walk the tree and hand each node to its construct handler through the
//!    exhaustive [`dispatch::handler_for`] table;
//! 3. scan the leaf text regions for the constructs the parser does not know
//!    (wiki-links, math, highlight, bare URLs, tags), honouring the claims;
//! 4. run the selection-awareness [`filter`] over the candidates.
//!
//! Decoration is best-effort. A construct whose raw text does not look the
//! way its node says it should is left undecorated; nothing here returns an
//! error.

pub mod claims;
pub mod constructs;
pub mod context;
pub mod dispatch;
pub mod filter;

use std::fmt::Write as _;

use crate::assets::ImageWidget;
use crate::syntax::Span;

pub use context::{DecorationContext, Pass};
pub use filter::Focus;

/// A single decoration over a half-open byte range.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    pub span: Span,
    pub kind: DecorationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecorationKind {
    /// Render nothing for the range.
    Hide,
    /// Render a widget in place of the range (zero-width: after `span.start`).
    Replace(Widget),
    /// Style the range without hiding it.
    Mark(MarkStyle),
    /// Style the whole line; `span` is the line's content span.
    LineAttribute(LineStyle),
}

impl Decoration {
    pub fn hide(span: Span) -> Self {
        Self {
            span,
            kind: DecorationKind::Hide,
        }
    }

    pub fn replace(span: Span, widget: Widget) -> Self {
        Self {
            span,
            kind: DecorationKind::Replace(widget),
        }
    }

    pub fn mark(span: Span, style: MarkStyle) -> Self {
        Self {
            span,
            kind: DecorationKind::Mark(style),
        }
    }

    pub fn line(span: Span, style: LineStyle) -> Self {
        Self {
            span,
            kind: DecorationKind::LineAttribute(style),
        }
    }

    /// Hide and Replace take text off screen; these must never overlap.
    pub fn is_concealing(&self) -> bool {
        matches!(self.kind, DecorationKind::Hide | DecorationKind::Replace(_))
    }

    pub fn widget(&self) -> Option<&Widget> {
        match &self.kind {
            DecorationKind::Replace(widget) => Some(widget),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self.kind {
            DecorationKind::LineAttribute(_) => 0,
            DecorationKind::Mark(_) => 1,
            DecorationKind::Replace(_) => 2,
            DecorationKind::Hide => 3,
        }
    }
}

/// Renderable substitute for a replaced range.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    /// List bullet at the given nesting depth.
    Bullet { depth: usize },
    /// Interactive checkbox; toggling rewrites the 3-byte marker at `at`.
    Checkbox { checked: bool, at: usize },
    HorizontalRule,
    Math { source: String, display: bool },
    Image(ImageWidget),
    /// Spinner shown while an asset upload is still being saved.
    UploadSpinner,
    /// `[[Page#^id]]` shown as the referenced block's current text.
    BlockReference {
        page: String,
        id: String,
        label: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkStyle {
    Strong,
    Emphasis,
    Underline,
    Strikethrough,
    Superscript,
    Subscript,
    Highlight,
    Code,
    Link,
    WikiLink,
    Url,
    Tag,
    ListNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineStyle {
    Heading { level: u8 },
    Quote { depth: usize },
    ListItem { depth: usize },
    Task { checked: bool },
    CodeBlock,
}

/// Display labels for block references, looked up at decoration time.
pub trait BlockLabels {
    fn label(&self, page: &str, id: &str) -> Option<String>;
}

/// No labels known: block references fall back to their id.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabels;

impl BlockLabels for NoLabels {
    fn label(&self, _page: &str, _id: &str) -> Option<String> {
        None
    }
}

/// Result of one decoration pass, sorted by position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub(crate) fn from_sorted(decorations: Vec<Decoration>) -> Self {
        Self { decorations }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decoration> {
        self.decorations.iter()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn as_slice(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn hidden(&self) -> impl Iterator<Item = Span> + '_ {
        self.decorations
            .iter()
            .filter(|d| d.kind == DecorationKind::Hide)
            .map(|d| d.span)
    }

    pub fn widgets(&self) -> impl Iterator<Item = (Span, &Widget)> + '_ {
        self.decorations
            .iter()
            .filter_map(|d| d.widget().map(|w| (d.span, w)))
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageWidget> + '_ {
        self.widgets().filter_map(|(_, widget)| match widget {
            Widget::Image(image) => Some(image),
            _ => None,
        })
    }

    pub fn marks(&self) -> impl Iterator<Item = (Span, MarkStyle)> + '_ {
        self.decorations.iter().filter_map(|d| match d.kind {
            DecorationKind::Mark(style) => Some((d.span, style)),
            _ => None,
        })
    }

    pub fn line_attributes(&self) -> impl Iterator<Item = (Span, LineStyle)> + '_ {
        self.decorations.iter().filter_map(|d| match d.kind {
            DecorationKind::LineAttribute(style) => Some((d.span, style)),
            _ => None,
        })
    }

    /// One line per decoration, with the covered source text.
    pub fn describe(&self, text: &str) -> String {
        let mut out = String::new();
        for decoration in &self.decorations {
            let source = text
                .get(decoration.span.as_range())
                .unwrap_or_default()
                .replace('\n', "\\n");
            let what = match &decoration.kind {
                DecorationKind::Hide => "hide".to_string(),
                DecorationKind::Replace(widget) => format!("replace {widget:?}"),
                DecorationKind::Mark(style) => format!("mark {style:?}"),
                DecorationKind::LineAttribute(style) => format!("line {style:?}"),
            };
            let _ = writeln!(
                out,
                "{}..{} {what} {source:?}",
                decoration.span.start, decoration.span.end
            );
        }
        out
    }
}

impl<'a> IntoIterator for &'a DecorationSet {
    type Item = &'a Decoration;
    type IntoIter = std::slice::Iter<'a, Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.decorations.iter()
    }
}

/// Run a full decoration pass.
pub fn resolve(ctx: &DecorationContext<'_>) -> DecorationSet {
    let pass = Pass::new(ctx);
    let mut candidates = Vec::new();

    dispatch::walk(&pass, &mut candidates);
    constructs::scan::scan_regions(&pass, &mut candidates);

    let set = filter::apply(&pass, candidates);
    log::debug!(
        "decoration pass: {} decorations for {} bytes",
        set.len(),
        ctx.text.len()
    );
    set
}

/// Decorate a document at its current selection.
pub fn resolve_document(
    doc: &crate::editing::Document,
    settings: &livemark_config::PreviewSettings,
    labels: &dyn BlockLabels,
) -> DecorationSet {
    let text = doc.text();
    let ctx = DecorationContext::new(&text, doc.selection(), settings)
        .with_labels(labels)
        .with_indent(doc.indent_style().clone());
    resolve(&ctx)
}

pub(crate) fn sort_decorations(decorations: &mut [Decoration]) {
    decorations.sort_by_key(|d| (d.span.start, std::cmp::Reverse(d.span.end), d.rank()));
}
