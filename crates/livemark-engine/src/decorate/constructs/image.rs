use crate::assets::{ImagePlacement, ImageWidget};
use crate::decorate::context::Pass;
use crate::decorate::dispatch::Visit;
use crate::decorate::filter::{Candidate, Focus};
use crate::decorate::{Decoration, Widget};
use crate::syntax::{NodeKind, Span};

/// Images. A line holding nothing but the image becomes a block widget after
/// the hidden source; anything else is replaced inline. Both only while the
/// caret is off the line.
pub fn image(pass: &Pass<'_, '_>, visit: &Visit<'_>, out: &mut Vec<Candidate>) {
    let NodeKind::Image { dest } = &visit.node.kind else {
        return;
    };
    let span = visit.node.span;
    let Some(raw) = pass.slice(span) else {
        return;
    };
    let Some(alt) = alt_text(raw) else {
        return;
    };

    let line = pass.lines.line_at(span.start);
    let placement = if line.text(pass.text).trim() == raw {
        ImagePlacement::Block
    } else {
        ImagePlacement::Inline
    };

    let widget = if *dest == pass.settings().upload_placeholder {
        Widget::UploadSpinner
    } else {
        Widget::Image(ImageWidget::new(dest.clone(), alt.to_string(), placement))
    };

    let focus = Focus::Lines(span);
    match placement {
        ImagePlacement::Block => {
            out.push(Candidate::unless(focus, Decoration::hide(span)));
            out.push(Candidate::unless(
                focus,
                Decoration::replace(Span::point(span.end), widget),
            ));
        }
        ImagePlacement::Inline => {
            out.push(Candidate::unless(focus, Decoration::replace(span, widget)));
        }
    }
}

/// Text between `![` and the closing bracket.
fn alt_text(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("![")?;
    let close = rest
        .rfind("](")
        .or_else(|| rest.rfind("]["))
        .or_else(|| rest.rfind(']'))?;
    Some(&rest[..close])
}
