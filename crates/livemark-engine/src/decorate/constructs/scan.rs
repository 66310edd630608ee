//! Raw-text pass over the leaf text regions.
//!
//! Picks up what the markdown parser has no node for: wiki-links, math,
//! bare URLs, `==highlight==` and `#tags`. Matches are claimed in that order
//! against [`ClaimedRanges`], so math inside inline code or a URL inside a
//! wiki-link is never decorated twice.

use std::sync::OnceLock;

use regex::Regex;

use crate::decorate::claims::ClaimedRanges;
use crate::decorate::context::Pass;
use crate::decorate::filter::{Candidate, Focus};
use crate::decorate::{Decoration, MarkStyle, Widget};
use crate::syntax::inline::{WikiLink, WikiTarget, scan_wikilinks};
use crate::syntax::{Span, text_regions};

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s<>\[\]]+").expect("Invalid URL regex"))
}

fn math_regex() -> &'static Regex {
    static MATH_REGEX: OnceLock<Regex> = OnceLock::new();
    MATH_REGEX.get_or_init(|| {
        Regex::new(r"\$\$([\s\S]+?)\$\$|\$([^\s$](?:[^$\n]*[^\s$])?)\$").expect("Invalid math regex")
    })
}

fn highlight_regex() -> &'static Regex {
    static HIGHLIGHT_REGEX: OnceLock<Regex> = OnceLock::new();
    HIGHLIGHT_REGEX.get_or_init(|| Regex::new(r"==[^=\n]+==").expect("Invalid highlight regex"))
}

fn hashtag_regex() -> &'static Regex {
    static HASHTAG_REGEX: OnceLock<Regex> = OnceLock::new();
    HASHTAG_REGEX.get_or_init(|| {
        Regex::new(r"(?:^|\s)(#[\p{L}\p{N}_][\p{L}\p{N}_/-]*)").expect("Invalid hashtag regex")
    })
}

/// Scan every text region and push candidates for the regex constructs.
pub fn scan_regions(pass: &Pass<'_, '_>, out: &mut Vec<Candidate>) {
    let mut claims = pass.claims.clone();
    let settings = pass.settings();

    for region in text_regions(&pass.tree) {
        let Some(text) = pass.slice(region) else {
            continue;
        };

        for link in scan_wikilinks(region.start, text) {
            if claims.claim_exclusive(link.full) {
                wikilink(pass, &link, out);
            }
        }
        if settings.math {
            math(region.start, text, &mut claims, out);
        }
        if settings.bare_urls {
            for span in bare_urls(region.start, text) {
                if claims.claim_exclusive(span) {
                    out.push(Candidate::always(Decoration::mark(span, MarkStyle::Url)));
                }
            }
        }
        if settings.highlight {
            highlight(region.start, text, &mut claims, out);
        }
        if settings.hashtags {
            hashtags(region.start, text, &claims, out);
        }
    }
}

/// `[[Page]]`, `[[Page|Alias]]` and `[[Page#^id]]`.
fn wikilink(pass: &Pass<'_, '_>, link: &WikiLink, out: &mut Vec<Candidate>) {
    let Some(target_text) = pass.slice(link.target) else {
        return;
    };
    let target = WikiTarget::parse(target_text);
    let full = link.full;
    let focus = Focus::Lines(full);

    out.push(Candidate::always(Decoration::mark(full, MarkStyle::WikiLink)));

    if let (Some(id), None) = (target.block_id(), link.alias) {
        let page = if target.page.is_empty() {
            pass.ctx.page.unwrap_or_default().to_string()
        } else {
            target.page.clone()
        };
        let label = pass.ctx.labels.label(&page, id);
        out.push(Candidate::unless(
            focus,
            Decoration::replace(
                full,
                Widget::BlockReference {
                    page,
                    id: id.to_string(),
                    label,
                },
            ),
        ));
        return;
    }

    let open_end = match link.alias {
        // Hide `[[target|` and leave the alias
        Some(alias) => alias.start,
        None => full.start + WikiLink::OPEN.len(),
    };
    out.push(Candidate::unless(
        focus,
        Decoration::hide(Span::new(full.start, open_end)),
    ));
    out.push(Candidate::unless(
        focus,
        Decoration::hide(Span::new(full.end - WikiLink::CLOSE.len(), full.end)),
    ));
}

fn math(base: usize, text: &str, claims: &mut ClaimedRanges, out: &mut Vec<Candidate>) {
    for caps in math_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let span = Span::new(base + whole.start(), base + whole.end());
        if !claims.claim_exclusive(span) {
            continue;
        }
        let (source, display) = match (caps.get(1), caps.get(2)) {
            (Some(block), _) => (block.as_str().trim(), true),
            (None, Some(inline)) => (inline.as_str(), false),
            (None, None) => continue,
        };
        out.push(
            Candidate::unless(
                Focus::Node(span),
                Decoration::replace(
                    span,
                    Widget::Math {
                        source: source.to_string(),
                        display,
                    },
                ),
            )
            .with_fallback(Decoration::mark(span, MarkStyle::Code)),
        );
    }
}

/// URL matches with trailing sentence punctuation trimmed off.
fn bare_urls(base: usize, text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    for url_match in url_regex().find_iter(text) {
        let start = url_match.start();
        let mut end = url_match.end();

        // Remove trailing punctuation that's typically not part of URLs
        while let Some(last_char) = text[start..end].chars().last() {
            if matches!(
                last_char,
                '.' | ',' | ':' | ';' | '!' | '?' | ')' | ']' | '}'
            ) {
                end -= last_char.len_utf8();
            } else {
                break;
            }
        }

        if end > start {
            spans.push(Span::new(base + start, base + end));
        }
    }
    spans
}

fn highlight(base: usize, text: &str, claims: &mut ClaimedRanges, out: &mut Vec<Candidate>) {
    for found in highlight_regex().find_iter(text) {
        let span = Span::new(base + found.start(), base + found.end());
        if !claims.claim_nesting(span) {
            continue;
        }
        let focus = Focus::Node(span);
        out.push(Candidate::always(Decoration::mark(span, MarkStyle::Highlight)));
        out.push(Candidate::unless(
            focus,
            Decoration::hide(Span::new(span.start, span.start + 2)),
        ));
        out.push(Candidate::unless(
            focus,
            Decoration::hide(Span::new(span.end - 2, span.end)),
        ));
    }
}

fn hashtags(base: usize, text: &str, claims: &ClaimedRanges, out: &mut Vec<Candidate>) {
    for caps in hashtag_regex().captures_iter(text) {
        let Some(tag) = caps.get(1) else {
            continue;
        };
        let span = Span::new(base + tag.start(), base + tag.end());
        if claims.is_free(span) {
            out.push(Candidate::always(Decoration::mark(span, MarkStyle::Tag)));
        }
    }
}
