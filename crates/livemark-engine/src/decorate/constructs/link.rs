use crate::decorate::context::Pass;
use crate::decorate::dispatch::Visit;
use crate::decorate::filter::{Candidate, Focus};
use crate::decorate::{Decoration, MarkStyle};
use crate::syntax::{LinkKind, NodeKind, Span};

/// Markdown links. Always marked; with the caret off the line only the label
/// stays visible.
pub fn link(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let NodeKind::Link { kind, .. } = &visit.node.kind else {
        return;
    };
    let span = visit.node.span;
    let Some(raw) = pass.slice(span) else {
        return;
    };

    out.push(Candidate::always(Decoration::mark(span, MarkStyle::Link)));

    let Some((open, close)) = delimiters(*kind, raw) else {
        log::trace!("link at {span:?} has an unexpected shape");
        return;
    };
    let focus = Focus::Lines(span);
    for hidden in [open, close] {
        out.push(Candidate::unless(
            focus,
            Decoration::hide(hidden.offset(span.start)),
        ));
    }
}

/// Opening and closing delimiter spans relative to the start of `raw`.
fn delimiters(kind: LinkKind, raw: &str) -> Option<(Span, Span)> {
    let len = raw.len();
    let (open, label_end) = match kind {
        LinkKind::Inline => {
            if !raw.starts_with('[') || !raw.ends_with(')') {
                return None;
            }
            (1, raw.rfind("](")?)
        }
        LinkKind::Reference => {
            if !raw.starts_with('[') || !raw.ends_with(']') {
                return None;
            }
            (1, raw.rfind("][").unwrap_or(len - 1))
        }
        LinkKind::Autolink => {
            if !raw.starts_with('<') || !raw.ends_with('>') {
                return None;
            }
            (1, len - 1)
        }
    };
    // Nothing would be left to show
    if label_end <= open {
        return None;
    }
    Some((Span::new(0, open), Span::new(label_end, len)))
}
