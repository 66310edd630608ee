use crate::decorate::context::Pass;
use crate::decorate::dispatch::Visit;
use crate::decorate::filter::Candidate;
use crate::decorate::{Decoration, LineStyle, MarkStyle, Widget};
use crate::syntax::{NodeKind, Span, SyntaxNode};

/// List items: bullets are always swapped for a widget (or dropped in favour
/// of the checkbox on task items), ordered numbers are marked, leading
/// indentation is hidden and the depth goes on the line.
pub fn item(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let span = visit.node.span;
    let ordered = matches!(
        visit.parent().map(|p| &p.kind),
        Some(NodeKind::List { ordered: true })
    );
    let line = pass.lines.line_at(span.start);
    let indent = pass.slice(Span::new(line.start, span.start)).unwrap_or_default();

    let depth = if indent.chars().all(|c| c == ' ' || c == '\t') {
        if !indent.is_empty() {
            out.push(Candidate::always(Decoration::hide(Span::new(
                line.start, span.start,
            ))));
        }
        pass.ctx.indent.calculate_depth(indent)
    } else {
        // Nested inside a quote or similar: fall back to structural depth
        visit
            .count_ancestors(|kind| matches!(kind, NodeKind::List { .. }))
            .saturating_sub(1)
    };

    out.push(Candidate::always(Decoration::line(
        line.span(),
        LineStyle::ListItem { depth },
    )));

    let task = task_state(visit.node);
    if let Some(checked) = task {
        out.push(Candidate::always(Decoration::line(
            line.span(),
            LineStyle::Task { checked },
        )));
    }

    let bytes = pass.text.as_bytes();
    if ordered {
        let digits = bytes[span.start..line.end]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let delim = span.start + digits;
        if digits > 0 && delim < line.end && matches!(bytes[delim], b'.' | b')') {
            out.push(Candidate::always(Decoration::mark(
                Span::new(span.start, delim + 1),
                MarkStyle::ListNumber,
            )));
        }
        return;
    }

    if span.start >= line.end || !matches!(bytes[span.start], b'-' | b'*' | b'+') {
        return;
    }
    let mut marker_end = span.start + 1;
    if marker_end < line.end && matches!(bytes[marker_end], b' ' | b'\t') {
        marker_end += 1;
    }
    let marker = Span::new(span.start, marker_end);

    if task.is_some() {
        out.push(Candidate::always(Decoration::hide(marker)));
    } else {
        out.push(Candidate::always(Decoration::replace(
            marker,
            Widget::Bullet { depth },
        )));
    }
}

/// `[ ]` / `[x]`: always an interactive checkbox.
pub fn task_marker(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let NodeKind::TaskMarker { checked } = visit.node.kind else {
        return;
    };
    let at = visit.node.span.start;
    let marker = Span::new(at, at + 3);
    if !matches!(pass.slice(marker), Some("[ ]" | "[x]" | "[X]")) {
        return;
    }
    out.push(Candidate::always(Decoration::replace(
        marker,
        Widget::Checkbox { checked, at },
    )));
}

/// Checked state of the item's own task marker, if it has one.
///
/// Tight items carry the marker directly; loose items wrap it in their first
/// paragraph. Markers of nested items are not considered.
fn task_state(item: &SyntaxNode) -> Option<bool> {
    let first = item.children.first()?;
    let marker = match first.kind {
        NodeKind::Paragraph => first.children.first()?,
        _ => first,
    };
    match marker.kind {
        NodeKind::TaskMarker { checked } => Some(checked),
        _ => None,
    }
}
