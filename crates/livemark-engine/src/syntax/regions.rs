use super::span::Span;
use super::tree::{NodeKind, SyntaxNode, SyntaxTree};

/// Leaf text-bearing regions of the document.
///
/// These are the only places the secondary regex pass (wiki-links, math,
/// highlight, bare URLs, tags) looks at: paragraphs, headings, and the
/// inline text of tight list items with their nested blocks cut out.
/// Regions never overlap, so a match is found at most once.
pub fn text_regions(tree: &SyntaxTree) -> Vec<Span> {
    let mut regions = Vec::new();
    collect(&tree.root, &mut regions);
    regions.sort();
    regions
}

fn collect(node: &SyntaxNode, out: &mut Vec<Span>) {
    match node.kind {
        NodeKind::Paragraph | NodeKind::Heading { .. } => out.push(node.span),
        NodeKind::CodeBlock | NodeKind::Html => {}
        NodeKind::Item => {
            let blocks: Vec<Span> = node
                .children
                .iter()
                .filter(|child| child.kind.is_block())
                .map(|child| child.span)
                .collect();
            out.extend(subtract(node.span, &blocks));
            for child in &node.children {
                collect(child, out);
            }
        }
        _ => {
            for child in &node.children {
                collect(child, out);
            }
        }
    }
}

/// `whole` minus every span in `holes` (holes assumed sorted and disjoint).
fn subtract(whole: Span, holes: &[Span]) -> Vec<Span> {
    let mut pieces = Vec::new();
    let mut cursor = whole.start;
    for hole in holes {
        if hole.start > cursor {
            pieces.push(Span::new(cursor, hole.start.min(whole.end)));
        }
        cursor = cursor.max(hole.end);
    }
    if cursor < whole.end {
        pieces.push(Span::new(cursor, whole.end));
    }
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use pretty_assertions::assert_eq;

    fn region_texts(text: &str) -> Vec<String> {
        text_regions(&parse(text))
            .into_iter()
            .map(|span| text[span.as_range()].trim_end().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    #[test]
    fn paragraphs_and_headings_are_regions() {
        assert_eq!(
            region_texts("# Title\n\nBody text\n"),
            vec!["# Title".to_string(), "Body text".to_string()]
        );
    }

    #[test]
    fn fenced_code_is_never_a_region() {
        assert_eq!(region_texts("```\n#notatag\n```\n"), Vec::<String>::new());
    }

    #[test]
    fn nested_list_items_do_not_share_text() {
        let regions = region_texts("- parent\n  - child\n");
        assert_eq!(regions.len(), 2);
        assert!(regions[0].contains("parent"));
        assert!(!regions[0].contains("child"));
        assert!(regions[1].contains("child"));
    }

    #[test]
    fn subtract_cuts_holes() {
        assert_eq!(
            subtract(Span::new(0, 10), &[Span::new(2, 4), Span::new(6, 8)]),
            vec![Span::new(0, 2), Span::new(4, 6), Span::new(8, 10)]
        );
        assert_eq!(subtract(Span::new(0, 4), &[Span::new(0, 4)]), vec![]);
    }
}
