//! Hand-tuned content locators for known outlets.
//!
//! Each rule maps a domain suffix to a locator descriptor. The table is data,
//! so a new outlet is one more entry rather than another branch.

use regex::RegexBuilder;
use scraper::{ElementRef, Html, Selector};

use crate::page::is_visible;

/// How to find the article body on a given outlet's pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// A CSS selector; the first visible match wins.
    Css(&'static str),
    /// First visible `tag` element having a class that matches `pattern`
    /// (case-insensitive, unanchored).
    ClassPattern {
        tag: &'static str,
        pattern: &'static str,
    },
}

/// A per-domain content rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainRule {
    /// Host suffix, e.g. `tuoitre.vn` matches `tuoitre.vn` and `www.tuoitre.vn`.
    pub suffix: &'static str,
    pub locator: Locator,
}

/// Built-in rules, checked in order.
pub const DOMAIN_RULES: &[DomainRule] = &[
    DomainRule {
        suffix: "vnexpress.net",
        locator: Locator::Css("article.fck_detail, div.fck_detail"),
    },
    DomainRule {
        suffix: "tuoitre.vn",
        locator: Locator::Css("div#main-detail-content"),
    },
    DomainRule {
        suffix: "thanhnien.vn",
        locator: Locator::ClassPattern {
            tag: "div",
            pattern: "content|detail|body",
        },
    },
    DomainRule {
        suffix: "dantri.com.vn",
        locator: Locator::ClassPattern {
            tag: "div",
            pattern: "detail|content",
        },
    },
    DomainRule {
        suffix: "vietnamnet.vn",
        locator: Locator::ClassPattern {
            tag: "div",
            pattern: "main-content|article-content",
        },
    },
];

impl DomainRule {
    /// Whether `host` is the rule's domain or one of its subdomains.
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == self.suffix
            || host
                .strip_suffix(self.suffix)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// Find the element holding the article body, if present.
    pub fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        match self.locator {
            Locator::Css(css) => {
                let sel = Selector::parse(css).ok()?;
                doc.select(&sel).find(|el| is_visible(*el))
            }
            Locator::ClassPattern { tag, pattern } => {
                let sel = Selector::parse(tag).ok()?;
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()?;
                doc.select(&sel)
                    .filter(|el| is_visible(*el))
                    .find(|el| el.value().classes().any(|c| re.is_match(c)))
            }
        }
    }
}

/// Find the rule for `host` in `rules`.
pub fn rule_for<'r>(rules: &'r [DomainRule], host: &str) -> Option<&'r DomainRule> {
    rules.iter().find(|rule| rule.matches(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_matching_respects_label_boundaries() {
        let rule = rule_for(DOMAIN_RULES, "vnexpress.net").unwrap();
        assert!(rule.matches("vnexpress.net"));
        assert!(rule.matches("e.VnExpress.net"));
        assert!(!rule.matches("notvnexpress.net"));
        assert!(!rule.matches("vnexpress.net.evil.com"));
    }

    #[test]
    fn unknown_domain_has_no_rule() {
        assert!(rule_for(DOMAIN_RULES, "example.com").is_none());
    }

    #[test]
    fn every_rule_selector_compiles() {
        for rule in DOMAIN_RULES {
            match rule.locator {
                Locator::Css(css) => assert!(Selector::parse(css).is_ok(), "{css}"),
                Locator::ClassPattern { tag, pattern } => {
                    assert!(Selector::parse(tag).is_ok(), "{tag}");
                    assert!(regex::Regex::new(pattern).is_ok(), "{pattern}");
                }
            }
        }
    }

    #[test]
    fn css_locator_finds_element() {
        let doc = Html::parse_document(
            r#"<html><body><div class="sidebar"></div><div id="main-detail-content"><p>x</p></div></body></html>"#,
        );
        let rule = rule_for(DOMAIN_RULES, "tuoitre.vn").unwrap();
        let el = rule.locate(&doc).expect("locate");
        assert_eq!(el.value().id(), Some("main-detail-content"));
    }

    #[test]
    fn class_pattern_is_case_insensitive() {
        let doc = Html::parse_document(
            r#"<html><body><div class="wrap"></div><div class="singular-CONTENT"><p>x</p></div></body></html>"#,
        );
        let rule = rule_for(DOMAIN_RULES, "dantri.com.vn").unwrap();
        let el = rule.locate(&doc).expect("locate");
        assert!(el.value().classes().any(|c| c == "singular-CONTENT"));
    }

    #[test]
    fn locator_skips_elements_inside_stripped_chrome() {
        let doc = Html::parse_document(
            r#"<html><body><header><div class="fck_detail">menu</div></header><article class="fck_detail"><p>body</p></article></body></html>"#,
        );
        let rule = rule_for(DOMAIN_RULES, "vnexpress.net").unwrap();
        let el = rule.locate(&doc).expect("locate");
        assert_eq!(el.value().name(), "article");
    }
}
