//! HTML page parsing shared by every extraction strategy.
//!
//! Non-content chrome (scripts, styles, navigation, frames) is ignored: any
//! node inside one of [`STRIPPED_TAGS`] is treated as absent. The body is then
//! located by a cascade of progressively weaker heuristics.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use factcheck_shared::{ExtractedArticle, char_len, normalize_text};

use crate::rules::{DOMAIN_RULES, rule_for};

/// Tags whose whole subtree is excluded from extraction.
pub const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "iframe", "noscript", "nav", "footer", "header",
];

/// Minimum normalized content length for an extraction to count as evidence.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Paragraphs this short or shorter are boilerplate (captions, bylines).
const MIN_PARAGRAPH_CHARS: usize = 30;

/// A content block is accepted once it exceeds this length.
const MIN_BLOCK_CHARS: usize = 200;

/// Page-wide fallback uses at most this many paragraphs.
const FALLBACK_PARAGRAPHS: usize = 50;

static CONTENT_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(content|article|body|detail|story|entry|post)").expect("valid regex")
});

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static H1_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));
static ARTICLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("valid selector"));
static DIV_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("valid selector"));
static OG_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector"));
static DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static OG_DESCRIPTION_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:description"]"#).expect("valid selector")
});

/// Raw (un-normalized) fields pulled from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub title: String,
    pub description: String,
    pub content: String,
}

impl ParsedPage {
    /// Normalize every field and keep the page only if its content is long
    /// enough to serve as evidence.
    pub fn into_article(self, url: &str, domain: &str, strategy: &str) -> Option<ExtractedArticle> {
        let content = normalize_text(&self.content);
        if char_len(&content) <= MIN_CONTENT_CHARS {
            debug!(url, strategy, chars = char_len(&content), "content too short");
            return None;
        }

        Some(ExtractedArticle {
            url: url.to_string(),
            domain: domain.to_string(),
            title: normalize_text(&self.title),
            description: normalize_text(&self.description),
            content,
            strategy: strategy.to_string(),
        })
    }
}

/// Parse an HTML document fetched from a page on `host`.
///
/// `host` selects the per-domain rule; for archived copies pass the original
/// article's host, not the archive's.
pub fn parse_page(html: &str, host: &str) -> ParsedPage {
    let doc = Html::parse_document(html);
    ParsedPage {
        title: extract_title(&doc),
        description: extract_description(&doc),
        content: extract_content(&doc, host),
    }
}

// ---------------------------------------------------------------------------
// Visibility helpers
// ---------------------------------------------------------------------------

fn is_stripped_element(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|el| STRIPPED_TAGS.contains(&el.name()))
}

/// `false` if `el` is, or sits inside, a stripped tag.
pub(crate) fn is_visible(el: ElementRef<'_>) -> bool {
    !STRIPPED_TAGS.contains(&el.value().name())
        && !el.ancestors().any(|a| is_stripped_element(a.value()))
}

/// Concatenated text of all visible descendant text nodes.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        if let Node::Text(text) = node.value() {
            if !node.ancestors().any(|a| is_stripped_element(a.value())) {
                out.push_str(text);
            }
        }
    }
    out
}

/// Visible text with whitespace runs collapsed and the ends trimmed.
fn clean_text(el: ElementRef<'_>) -> String {
    visible_text(el).split_whitespace().collect::<Vec<_>>().join(" ")
}

fn select_visible<'a>(root: ElementRef<'a>, sel: &Selector) -> Vec<ElementRef<'a>> {
    root.select(sel).filter(|el| is_visible(*el)).collect()
}

fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// First non-empty of `<title>`, the first `<h1>`, `og:title`.
fn extract_title(doc: &Html) -> String {
    let root = doc.root_element();

    if let Some(title) = select_visible(root, &TITLE_SEL).first().map(|el| clean_text(*el)) {
        if !title.is_empty() {
            return title;
        }
    }

    if let Some(h1) = select_visible(root, &H1_SEL).first().map(|el| clean_text(*el)) {
        if !h1.is_empty() {
            return h1;
        }
    }

    meta_content(doc, &OG_TITLE_SEL).unwrap_or_default()
}

/// `description` meta, else `og:description`.
fn extract_description(doc: &Html) -> String {
    meta_content(doc, &DESCRIPTION_SEL)
        .or_else(|| meta_content(doc, &OG_DESCRIPTION_SEL))
        .unwrap_or_default()
}

/// Substantive paragraphs under `el`, joined with a space.
fn paragraph_text(el: ElementRef<'_>) -> String {
    paragraphs(el).join(" ")
}

fn paragraphs(el: ElementRef<'_>) -> Vec<String> {
    select_visible(el, &PARAGRAPH_SEL)
        .into_iter()
        .map(clean_text)
        .filter(|t| char_len(t) > MIN_PARAGRAPH_CHARS)
        .collect()
}

fn extract_content(doc: &Html, host: &str) -> String {
    let root = doc.root_element();

    // 1. <article>
    if let Some(article) = select_visible(root, &ARTICLE_SEL).first() {
        let content = paragraph_text(*article);
        if char_len(&content) > MIN_BLOCK_CHARS {
            debug!(chars = char_len(&content), "content found in <article>");
            return content;
        }
    }

    // 2. Longest block among content-looking divs
    let mut content = select_visible(root, &DIV_SEL)
        .into_iter()
        .filter(|div| div.value().classes().any(|c| CONTENT_CLASS_RE.is_match(c)))
        .map(paragraph_text)
        .fold(String::new(), |best, candidate| {
            if char_len(&candidate) > char_len(&best) {
                candidate
            } else {
                best
            }
        });
    if char_len(&content) > MIN_BLOCK_CHARS {
        debug!(chars = char_len(&content), "content found in content-class div");
        return content;
    }

    // 3. Per-domain rule
    if let Some(rule) = rule_for(DOMAIN_RULES, host) {
        if let Some(el) = rule.locate(doc) {
            let domain_content = paragraph_text(el);
            debug!(host, chars = char_len(&domain_content), "domain rule matched");
            if char_len(&domain_content) > char_len(&content) {
                content = domain_content;
                if char_len(&content) > MIN_BLOCK_CHARS {
                    return content;
                }
            }
        }
    }

    // 4. First paragraphs page-wide
    let fallback: Vec<String> = paragraphs(root).into_iter().take(FALLBACK_PARAGRAPHS).collect();
    let content = fallback.join(" ");
    debug!(chars = char_len(&content), "fallback paragraph extraction");
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn para(n: usize, text: &str) -> String {
        format!("<p>{} paragraph number {n} with enough words to count.</p>", text)
    }

    #[test]
    fn title_prefers_title_tag_then_h1_then_og() {
        let page = parse_page(
            r#"<html><head><title> Page Title </title></head><body><h1>Heading</h1></body></html>"#,
            "example.com",
        );
        assert_eq!(page.title, "Page Title");

        let page = parse_page(r#"<html><body><h1>Heading</h1></body></html>"#, "example.com");
        assert_eq!(page.title, "Heading");

        let page = parse_page(
            r#"<html><head><meta property="og:title" content="OG Title"></head><body></body></html>"#,
            "example.com",
        );
        assert_eq!(page.title, "OG Title");
    }

    #[test]
    fn description_falls_back_to_og() {
        let page = parse_page(
            r#"<html><head><meta property="og:description" content="og desc"></head></html>"#,
            "example.com",
        );
        assert_eq!(page.description, "og desc");

        let page = parse_page(
            r#"<html><head><meta name="description" content="plain"><meta property="og:description" content="og"></head></html>"#,
            "example.com",
        );
        assert_eq!(page.description, "plain");
    }

    #[test]
    fn page_selectors_compile() {
        for sel in [
            &TITLE_SEL,
            &H1_SEL,
            &PARAGRAPH_SEL,
            &ARTICLE_SEL,
            &DIV_SEL,
            &OG_TITLE_SEL,
            &DESCRIPTION_SEL,
            &OG_DESCRIPTION_SEL,
        ] {
            LazyLock::force(sel);
        }
    }

    #[test]
    fn article_element_wins_when_long_enough() {
        let body: String = (0..6).map(|i| para(i, "Article")).collect();
        let html = format!(
            r#"<html><body><div class="content">{}</div><article>{body}</article></body></html>"#,
            para(99, "Div")
        );
        let page = parse_page(&html, "example.com");
        assert!(page.content.starts_with("Article paragraph number 0"));
        assert!(!page.content.contains("Div paragraph"));
    }

    #[test]
    fn short_paragraphs_are_dropped() {
        let html = format!(
            "<html><body><article><p>Photo: AP</p>{}{}{}{}{}</article></body></html>",
            para(1, "Body"),
            para(2, "Body"),
            para(3, "Body"),
            para(4, "Body"),
            para(5, "Body")
        );
        let page = parse_page(&html, "example.com");
        assert!(!page.content.contains("Photo: AP"));
    }

    #[test]
    fn longest_content_div_is_chosen() {
        let short: String = (0..2).map(|i| para(i, "Short")).collect();
        let long: String = (0..6).map(|i| para(i, "Long")).collect();
        let html = format!(
            r#"<html><body><div class="post-body">{short}</div><div class="story">{long}</div></body></html>"#
        );
        let page = parse_page(&html, "example.com");
        assert!(page.content.starts_with("Long paragraph number 0"));
    }

    #[test]
    fn stripped_chrome_is_ignored() {
        let body: String = (0..6).map(|i| para(i, "Real")).collect();
        let html = format!(
            r#"<html><body><nav>{}</nav><article>{body}<script>var tracking = "analytics tracking snippet here";</script></article><footer>{}</footer></body></html>"#,
            para(0, "Nav"),
            para(0, "Footer")
        );
        let page = parse_page(&html, "example.com");
        assert!(!page.content.contains("Nav paragraph"));
        assert!(!page.content.contains("Footer paragraph"));
        assert!(!page.content.contains("analytics"));
    }

    #[test]
    fn fallback_caps_paragraph_count() {
        let body: String = (0..60).map(|i| para(i, "Loose")).collect();
        let html = format!("<html><body><section>{body}</section></body></html>");
        let page = parse_page(&html, "example.com");
        assert!(page.content.contains("number 49 "));
        assert!(!page.content.contains("number 50 "));
    }

    #[test]
    fn domain_rule_applies_to_known_outlet() {
        let doc = load_fixture("tuoitre_article.html");
        let page = parse_page(&doc, "tuoitre.vn");
        assert!(page.content.contains("Bộ Y tế"));
        assert!(!page.content.contains("Tin liên quan"));

        // The same page from an unknown host falls through to page-wide paragraphs.
        let generic = parse_page(&doc, "example.com");
        assert!(generic.content.contains("Tin liên quan"));
    }

    #[test]
    fn vnexpress_fixture_extracts_article() {
        let doc = load_fixture("vnexpress_article.html");
        let page = parse_page(&doc, "vnexpress.net");
        assert_eq!(page.title, "Bộ Y tế bác bỏ tin đồn về vaccine - VnExpress");
        assert!(page.description.contains("Bộ Y tế"));
        assert!(char_len(&page.content) > MIN_BLOCK_CHARS);
        assert!(!page.content.contains("Đăng nhập"));
    }

    #[test]
    fn reparsing_fixture_is_idempotent() {
        let doc = load_fixture("vnexpress_article.html");
        let url = "https://vnexpress.net/bo-y-te-bac-bo-tin-don-ve-vaccine-4712345.html";
        let first = parse_page(&doc, "vnexpress.net")
            .into_article(url, "vnexpress.net", "direct")
            .expect("article");
        let second = parse_page(&doc, "vnexpress.net")
            .into_article(url, "vnexpress.net", "direct")
            .expect("article");
        assert_eq!(first.content.as_bytes(), second.content.as_bytes());
        assert_eq!(first, second);
        assert_eq!(normalize_text(&first.content), first.content);
    }

    #[test]
    fn short_content_is_not_evidence() {
        let page = ParsedPage {
            title: "t".into(),
            description: String::new(),
            content: "a".repeat(MIN_CONTENT_CHARS),
        };
        assert!(page.into_article("https://x.vn/a", "x.vn", "direct").is_none());

        let page = ParsedPage {
            title: "T".into(),
            description: String::new(),
            content: "a".repeat(MIN_CONTENT_CHARS + 1),
        };
        let article = page.into_article("https://x.vn/a", "x.vn", "direct").unwrap();
        assert_eq!(article.title, "t");
    }
}
