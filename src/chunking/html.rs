//! Plain-text extraction for HTML filings (EDGAR `.htm` documents)

use scraper::{Html, Node};
use std::path::Path;

/// Elements that start a new paragraph in the extracted text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "tr", "li", "table", "section", "blockquote", "h1", "h2", "h3", "h4", "h5",
    "h6",
];

/// Elements whose text never reaches the output
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "head", "title"];

pub fn is_html_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("htm") || ext.eq_ignore_ascii_case("html"))
}

/// Visible text of an HTML document.
///
/// Block elements become blank-line paragraph breaks so section headers such
/// as `ITEM 1A` open their own paragraph. Inline runs inside a block are
/// joined with single spaces. Entities are decoded by the parser.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut text = String::new();
    let mut pending_break = false;

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Text(fragment) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|elem| SKIPPED_ELEMENTS.contains(&elem.name()))
                });
                if hidden {
                    continue;
                }

                let words = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
                if words.is_empty() {
                    continue;
                }

                if !text.is_empty() {
                    text.push_str(if pending_break { "\n\n" } else { " " });
                }
                text.push_str(&words);
                pending_break = false;
            }
            Node::Element(elem) if BLOCK_ELEMENTS.contains(&elem.name()) => {
                pending_break = true;
            }
            _ => {}
        }
    }

    text
}
