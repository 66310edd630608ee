use crate::decorate::context::Pass;
use crate::decorate::dispatch::Visit;
use crate::decorate::filter::{Candidate, Focus};
use crate::decorate::{Decoration, MarkStyle};
use crate::syntax::{NodeKind, Span};

/// Emphasis family: `**strong**`, `*em*`, `_em_`/underline, `~~strike~~`,
/// `^sup^`, `~sub~`.
///
/// The style mark stays on while the caret is in the node; only the
/// delimiter hides are dropped so the raw markers can be edited.
pub fn delimited(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let span = visit.node.span;
    let Some(raw) = pass.slice(span) else {
        return;
    };
    let Some(first) = raw.chars().next() else {
        return;
    };

    let (width, allowed, style): (usize, &[char], MarkStyle) = match visit.node.kind {
        NodeKind::Strong => (2, &['*', '_'][..], MarkStyle::Strong),
        NodeKind::Emphasis => {
            let style = if first == '_' && pass.settings().underscore_underline {
                MarkStyle::Underline
            } else {
                MarkStyle::Emphasis
            };
            (1, &['*', '_'][..], style)
        }
        NodeKind::Strikethrough => (2, &['~'][..], MarkStyle::Strikethrough),
        NodeKind::Superscript => (1, &['^'][..], MarkStyle::Superscript),
        NodeKind::Subscript => (1, &['~'][..], MarkStyle::Subscript),
        _ => return,
    };

    if !allowed.contains(&first) || !wrapped_in(raw, first, width) {
        log::trace!("{} at {span:?} has unexpected delimiters", visit.node.kind.name());
        return;
    }

    out.push(Candidate::always(Decoration::mark(span, style)));
    push_delimiter_hides(span, width, width, out);
}

/// Inline code with backtick runs of any (possibly unequal) length.
pub fn inline_code(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let span = visit.node.span;
    let Some(raw) = pass.slice(span) else {
        return;
    };
    let open = raw.bytes().take_while(|&b| b == b'`').count();
    let close = raw.bytes().rev().take_while(|&b| b == b'`').count();
    if open == 0 || close == 0 || open + close >= raw.len() {
        return;
    }

    out.push(Candidate::always(Decoration::mark(span, MarkStyle::Code)));
    push_delimiter_hides(span, open, close, out);
}

fn push_delimiter_hides(span: Span, open: usize, close: usize, out: &mut Vec<Candidate>) {
    let focus = Focus::Node(span);
    out.push(Candidate::unless(
        focus,
        Decoration::hide(Span::new(span.start, span.start + open)),
    ));
    out.push(Candidate::unless(
        focus,
        Decoration::hide(Span::new(span.end - close, span.end)),
    ));
}

/// `raw` starts and ends with `width` copies of `delim` and has content between.
fn wrapped_in(raw: &str, delim: char, width: usize) -> bool {
    let run: String = std::iter::repeat_n(delim, width).collect();
    raw.len() > width * 2 && raw.starts_with(&run) && raw.ends_with(&run)
}
