use crate::decorate::context::Pass;
use crate::decorate::dispatch::Visit;
use crate::decorate::filter::{Candidate, Focus};
use crate::decorate::{Decoration, LineStyle, Widget};
use crate::syntax::{NodeKind, Span};

/// Headings: a line attribute per level, and the `### ` prefix hidden while
/// the caret is off the line.
pub fn heading(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let NodeKind::Heading { level } = visit.node.kind else {
        return;
    };
    let span = visit.node.span;

    for line in pass.lines.lines_in(span) {
        out.push(Candidate::always(Decoration::line(
            line.span(),
            LineStyle::Heading { level },
        )));
    }

    // Setext headings have no prefix to hide
    let line = pass.lines.line_at(span.start);
    let Some(prefix) = atx_prefix(pass.text, span.start, line.end) else {
        return;
    };
    out.push(Candidate::unless(
        Focus::Lines(line.span()),
        Decoration::hide(prefix),
    ));
}

/// `#`-run plus following blanks, starting at or just after `start`.
fn atx_prefix(text: &str, start: usize, line_end: usize) -> Option<Span> {
    let bytes = text.as_bytes();
    let mut pos = start;
    while pos < line_end && bytes[pos] == b' ' {
        pos += 1;
    }
    let hashes_start = pos;
    while pos < line_end && bytes[pos] == b'#' {
        pos += 1;
    }
    let hashes = pos - hashes_start;
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let blanks_start = pos;
    while pos < line_end && matches!(bytes[pos], b' ' | b'\t') {
        pos += 1;
    }
    // `#` with no blank after is not a heading marker we can hide cleanly
    if pos == blanks_start || pos == line_end {
        return None;
    }
    Some(Span::new(hashes_start, pos))
}

/// Block quotes: each line gets the quote attribute of its innermost quote,
/// and each line's own `>` (plus one space) is hidden while the caret is
/// elsewhere.
pub fn block_quote(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let span = visit.node.span;
    let outer = visit.count_ancestors(|kind| *kind == NodeKind::BlockQuote);
    let depth = outer + 1;
    let nested: Vec<Span> = visit
        .node
        .walk()
        .skip(1)
        .filter(|node| node.kind == NodeKind::BlockQuote)
        .map(|node| node.span)
        .collect();

    for (i, line) in pass.lines.lines_in(span).enumerate() {
        if !nested.iter().any(|inner| inner.overlaps(line.span())) {
            out.push(Candidate::always(Decoration::line(
                line.span(),
                LineStyle::Quote { depth },
            )));
        }

        // The first line starts at our own marker; later lines repeat the outer ones
        let marker = if i == 0 {
            quote_marker(pass.text, span.start.max(line.start), line.end, 0)
        } else {
            quote_marker(pass.text, line.start, line.end, outer)
        };
        if let Some(marker) = marker {
            out.push(Candidate::unless(
                Focus::Lines(line.span()),
                Decoration::hide(marker),
            ));
        }
    }
}

/// The `>` after skipping `skip` earlier markers, with one following space.
/// `None` for lazy continuation lines that have no marker of their own.
fn quote_marker(text: &str, start: usize, end: usize, skip: usize) -> Option<Span> {
    let bytes = text.as_bytes();
    let mut pos = start;
    let mut seen = 0;
    while pos < end {
        match bytes[pos] {
            b' ' | b'\t' => pos += 1,
            b'>' if seen < skip => {
                seen += 1;
                pos += 1;
            }
            b'>' => {
                let mut marker_end = pos + 1;
                if marker_end < end && bytes[marker_end] == b' ' {
                    marker_end += 1;
                }
                return Some(Span::new(pos, marker_end));
            }
            _ => return None,
        }
    }
    None
}

/// Fenced and indented code: a code line attribute on every line, nothing hidden.
pub fn code_block(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    for line in pass.lines.lines_in(visit.node.span) {
        out.push(Candidate::always(Decoration::line(
            line.span(),
            LineStyle::CodeBlock,
        )));
    }
}

/// Thematic break: replaced by a rule widget while the caret is off the line.
pub fn rule(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let span = visit.node.span;
    let line = pass.lines.line_at(span.start);
    let target = Span::new(span.start, line.end);
    if target.is_empty() {
        return;
    }
    out.push(Candidate::unless(
        Focus::Lines(line.span()),
        Decoration::replace(target, Widget::HorizontalRule),
    ));
}
