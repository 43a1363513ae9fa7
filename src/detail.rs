use scraper::{Html, Selector};
use url::Url;

use crate::config::Heuristics;
use crate::error::FetchError;
use crate::fetch::Fetch;

/// Fields pulled from a candidate's detail page. Both are best-effort.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostingDetails {
    pub post_date: Option<String>,
    pub location: Option<String>,
}

/// Fetch a detail page and extract from it. Fetch failures are returned so the
/// caller can count them; extraction misses are just `None` fields.
pub fn fetch_details(
    fetcher: &dyn Fetch,
    link: &Url,
    heuristics: &Heuristics,
) -> Result<PostingDetails, FetchError> {
    let body = fetcher.fetch_detail(link)?;
    Ok(extract_details(&body, heuristics))
}

pub fn extract_details(html: &str, heuristics: &Heuristics) -> PostingDetails {
    let document = Html::parse_document(html);

    PostingDetails {
        post_date: extract_date(&document, heuristics),
        location: extract_location(&document, heuristics),
    }
}

fn extract_date(document: &Html, heuristics: &Heuristics) -> Option<String> {
    let meta = Selector::parse("meta[name]").expect("static selector is valid");
    let from_meta = document
        .select(&meta)
        .find(|m| m.value().attr("name") == Some(heuristics.date_meta_name.as_str()))
        .and_then(|m| m.value().attr("content"))
        .filter(|content| !content.is_empty());
    if let Some(content) = from_meta {
        return Some(content.to_string());
    }

    let text = visible_text(document);
    heuristics
        .date_pattern
        .find(&text)
        .map(|m| m.as_str().to_string())
}

fn extract_location(document: &Html, heuristics: &Heuristics) -> Option<String> {
    // Only the first string carrying the label is considered, wherever it sits.
    let node = all_strings(document).find(|t| t.contains(heuristics.location_label.as_str()))?;
    let caps = heuristics.location_pattern.captures(node)?;
    let location = caps.get(1)?.as_str().trim();

    if location.is_empty() {
        None
    } else {
        Some(location.to_string())
    }
}

/// Page text with each text node trimmed and joined by single spaces.
fn visible_text(document: &Html) -> String {
    text_nodes(document)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every text and comment string in document order, script bodies included.
fn all_strings(document: &Html) -> impl Iterator<Item = &str> + '_ {
    document.tree.root().descendants().filter_map(|node| {
        let value = node.value();
        value
            .as_text()
            .map(|t| &**t)
            .or_else(|| value.as_comment().map(|c| &**c))
    })
}

/// Text nodes in document order, skipping script, style and template bodies.
fn text_nodes(document: &Html) -> impl Iterator<Item = &str> + '_ {
    document.root_element().descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "template"))
        });
        if hidden {
            None
        } else {
            Some(&**text)
        }
    })
}
