//! Selection-awareness filter.
//!
//! Handlers do not look at the selection. They say which decoration they
//! want, when the construct counts as focused, and what (if anything) to show
//! instead while it is. This module makes that call for every candidate and
//! then enforces the pass-wide invariants.

use crate::decorate::claims::crosses;
use crate::decorate::context::Pass;
use crate::decorate::{Decoration, DecorationSet, sort_decorations};
use crate::editing::Selection;
use crate::syntax::{LineIndex, Span};

/// When a construct counts as being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Primary selection touches the node's closed interval.
    Node(Span),
    /// Primary selection touches any line the span covers.
    Lines(Span),
}

impl Focus {
    pub fn is_focused(&self, selection: &Selection, lines: &LineIndex) -> bool {
        let primary = selection.primary();
        match *self {
            Focus::Node(span) => primary.touches(span),
            Focus::Lines(span) => primary.touches(lines.covering(span)),
        }
    }
}

/// A decoration proposed by a construct handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub decoration: Decoration,
    /// `None`: applied regardless of the selection.
    pub focus: Option<Focus>,
    /// Shown instead of `decoration` while focused.
    pub fallback: Option<Decoration>,
}

impl Candidate {
    pub fn always(decoration: Decoration) -> Self {
        Self {
            decoration,
            focus: None,
            fallback: None,
        }
    }

    pub fn unless(focus: Focus, decoration: Decoration) -> Self {
        Self {
            decoration,
            focus: Some(focus),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Decoration) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

/// Resolve candidates against the selection and settings.
///
/// After this step no two concealing decorations overlap, no mark crosses a
/// concealing decoration, and the output is sorted by position.
pub fn apply(pass: &Pass<'_, '_>, candidates: Vec<Candidate>) -> DecorationSet {
    let selection = pass.ctx.selection;
    let live = pass.settings().live_preview;

    let mut chosen: Vec<Decoration> = candidates
        .into_iter()
        .filter_map(|candidate| match candidate.focus {
            Some(focus) if focus.is_focused(selection, &pass.lines) => candidate.fallback,
            _ => Some(candidate.decoration),
        })
        .filter(|decoration| live || !decoration.is_concealing())
        .filter(|decoration| decoration.span.end <= pass.text.len())
        .collect();

    sort_decorations(&mut chosen);
    chosen.dedup();

    let mut concealed: Vec<Span> = Vec::new();
    let mut kept = Vec::with_capacity(chosen.len());
    for decoration in chosen {
        if decoration.is_concealing() {
            if concealed.iter().any(|c| c.overlaps(decoration.span)) {
                log::trace!("dropping overlapping {:?}", decoration);
                continue;
            }
            concealed.push(decoration.span);
        }
        kept.push(decoration);
    }

    kept.retain(|decoration| {
        decoration.is_concealing()
            || matches!(decoration.kind, crate::decorate::DecorationKind::LineAttribute(_))
            || !concealed.iter().any(|c| crosses(*c, decoration.span))
    });

    if let Some(viewport) = pass.ctx.viewport {
        kept.retain(|d| d.span.start <= viewport.end && d.span.end >= viewport.start);
    }

    DecorationSet::from_sorted(kept)
}
