//! Visible-text extraction from HTML.

use scraper::{ElementRef, Html, Node};

/// Elements whose contents never render as page text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];

/// Collect the human-visible text of `html`, whitespace-collapsed into single
/// spaces.
pub(crate) fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut words: Vec<&str> = Vec::new();
    collect(document.root_element(), &mut words);
    words.join(" ")
}

fn collect<'a>(element: ElementRef<'a>, words: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => words.extend(text.split_whitespace()),
            Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect(child_el, words);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_collapses_whitespace() {
        let html = "<html><body><h1>Search   Engine</h1>\n<p>Optimization <b>tips</b></p></body></html>";
        assert_eq!(visible_text(html), "Search Engine Optimization tips");
    }

    #[test]
    fn skips_hidden_elements() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script>var tracking = "analytics";</script></head>
            <body><noscript>Enable javascript</noscript>
            <p>Readable content</p>
            <svg><text>chart label</text></svg>
            <template><p>later</p></template></body></html>"#;
        assert_eq!(visible_text(html), "Readable content");
    }

    #[test]
    fn keeps_title_text() {
        let html = "<html><head><title>Keyword Research</title></head><body>Body words</body></html>";
        assert_eq!(visible_text(html), "Keyword Research Body words");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(visible_text("just some words"), "just some words");
    }

    #[test]
    fn empty_document_is_empty() {
        assert_eq!(visible_text(""), "");
    }
}
