use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::Heuristics;

/// An anchor judged likely to point at a job posting.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Anchor text, or the default title when the anchor has none.
    pub title: String,
    /// The href exactly as it appeared in the page. Used for deduplication.
    pub href: String,
    /// `href` resolved against the base URL.
    pub link: Url,
}

#[derive(Debug, Default)]
pub struct Detection {
    pub candidates: Vec<Candidate>,
    /// True when no anchor matched a keyword and the container heuristic was used.
    pub fallback: bool,
}

pub fn detect_candidates(html: &str, base: &Url, heuristics: &Heuristics) -> Detection {
    let document = Html::parse_document(html);

    let candidates = keyword_candidates(&document, base, heuristics);
    if !candidates.is_empty() {
        return Detection {
            candidates,
            fallback: false,
        };
    }

    debug!("No keyword matches, trying news/latest containers");
    Detection {
        candidates: container_candidates(&document, base, heuristics),
        fallback: true,
    }
}

fn keyword_candidates(document: &Html, base: &Url, heuristics: &Heuristics) -> Vec<Candidate> {
    let anchors = selector("a[href]");
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = anchor_text(&anchor);
        let text_lower = text.to_lowercase();
        let href_lower = href.to_lowercase();

        let matched = heuristics
            .keywords
            .iter()
            .any(|k| text_lower.contains(k.as_str()) || href_lower.contains(k.as_str()));
        if !matched {
            continue;
        }

        push_unique(&mut candidates, &mut seen, text, href, base, heuristics);
    }

    candidates
}

fn container_candidates(document: &Html, base: &Url, heuristics: &Heuristics) -> Vec<Candidate> {
    let containers = selector("div, section, ul");
    let anchors = selector("a[href]");
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for container in document.select(&containers) {
        let classes = container
            .value()
            .classes()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if !heuristics
            .container_markers
            .iter()
            .any(|m| classes.contains(m.as_str()))
        {
            continue;
        }

        for anchor in container.select(&anchors) {
            if let Some(href) = anchor.value().attr("href") {
                let text = anchor_text(&anchor);
                push_unique(&mut candidates, &mut seen, text, href, base, heuristics);
            }
        }
    }

    candidates
}

fn push_unique(
    candidates: &mut Vec<Candidate>,
    seen: &mut HashSet<String>,
    text: String,
    href: &str,
    base: &Url,
    heuristics: &Heuristics,
) {
    if !seen.insert(href.to_string()) {
        return;
    }

    let link = match base.join(href) {
        Ok(link) => link,
        Err(e) => {
            debug!("Skipping unresolvable href '{}': {}", href, e);
            return;
        }
    };

    let title = if text.is_empty() {
        heuristics.default_title.clone()
    } else {
        text
    };

    candidates.push(Candidate {
        title,
        href: href.to_string(),
        link,
    });
}

/// Anchor text with runs of whitespace collapsed to a single space.
fn anchor_text(anchor: &ElementRef) -> String {
    anchor
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}
