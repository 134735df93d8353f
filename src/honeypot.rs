//! Decoy stripping for scraped markup.
//!
//! Some listings inject invisible elements into a field to poison naive
//! scrapers. The decoys are hidden either with an inline style or with a class
//! that a small embedded stylesheet declares `display: none`. Class names are
//! generated per page, so the stylesheet is parsed afresh for every fragment.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

static HIDDEN_CLASS_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(-?[_a-z]+[_a-z0-9-]*)\s*\{\s*display\s*:\s*none\s*;?\s*\}")
        .expect("hardcoded regex pattern is valid")
});

static HIDDEN_INLINE_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)")
        .expect("hardcoded regex pattern is valid")
});

/// Recovers the genuinely visible text of a markup fragment.
#[derive(Debug, Default, Clone, Copy)]
pub struct HoneypotFilter;

impl HoneypotFilter {
    pub fn new() -> Self {
        Self
    }

    /// Returns the class names an embedded stylesheet hides.
    pub fn hidden_classes(stylesheet: &str) -> HashSet<String> {
        HIDDEN_CLASS_RULE
            .captures_iter(stylesheet)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Returns the visible text of `fragment`, whitespace-normalised.
    ///
    /// Every element inside the fragment that is hidden inline or carries a
    /// hidden class is dropped along with its subtree. Stylesheet and script
    /// contents never count as text.
    pub fn visible_text(&self, fragment: ElementRef<'_>) -> String {
        let stylesheet: String = fragment
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "style")
            .flat_map(|el| el.text())
            .collect();
        let hidden = Self::hidden_classes(&stylesheet);

        let mut parts = Vec::new();
        collect_visible(fragment, &hidden, &mut parts);
        normalize_whitespace(&parts.concat())
    }

    /// Parses `html` as a fragment and returns its visible text.
    pub fn filter_html(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        self.visible_text(fragment.root_element())
    }
}

fn is_decoy(element: ElementRef<'_>, hidden: &HashSet<String>) -> bool {
    let value = element.value();
    if matches!(value.name(), "style" | "script") {
        return true;
    }
    if value
        .attr("style")
        .is_some_and(|style| HIDDEN_INLINE_STYLE.is_match(style))
    {
        return true;
    }
    value.classes().any(|class| hidden.contains(class))
}

fn collect_visible<'a>(element: ElementRef<'a>, hidden: &HashSet<String>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !is_decoy(child, hidden) {
                        collect_visible(child, hidden, parts);
                    }
                }
            }
            _ => {}
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
