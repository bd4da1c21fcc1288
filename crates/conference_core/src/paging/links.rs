//! `Link` / `X-Total-Count` header construction.
//!
//! Each link is the incoming request URI with only the `page` parameter
//! rewritten; every other query parameter is kept in order. Commas and
//! semicolons in a target are percent-encoded so they cannot be taken for
//! `Link` entry or parameter separators.

use super::Page;

pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";
pub const LINK_HEADER: &str = "Link";

/// Header values describing one page of a list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationHeaders {
    /// Value for `X-Total-Count`.
    pub total_count: String,
    /// Value for `Link`, entries ordered next, prev, last, first.
    pub link: String,
}

/// Builds pagination headers for `page`.
///
/// `base_uri` is the absolute request URI without its query string
/// (`http://host:port/api/talks`); `query` is the raw query string, if any.
pub fn pagination_headers<T>(base_uri: &str, query: Option<&str>, page: &Page<T>) -> PaginationHeaders {
    let total_pages = page.total_pages();
    let last_page = total_pages.saturating_sub(1);
    let mut links = Vec::with_capacity(4);

    if page.has_next() {
        links.push(link_entry(base_uri, query, u64::from(page.number) + 1, "next"));
    }
    if page.has_previous() {
        links.push(link_entry(base_uri, query, u64::from(page.number) - 1, "prev"));
    }
    links.push(link_entry(base_uri, query, last_page, "last"));
    links.push(link_entry(base_uri, query, 0, "first"));

    PaginationHeaders {
        total_count: page.total_elements.to_string(),
        link: links.join(","),
    }
}

fn link_entry(base_uri: &str, query: Option<&str>, page_number: u64, rel: &str) -> String {
    let target = format!("{base_uri}?{}", rewrite_page_param(query, page_number));
    format!("<{}>; rel=\"{rel}\"", escape_separators(&target))
}

fn escape_separators(target: &str) -> String {
    let mut escaped = String::with_capacity(target.len());
    for ch in target.chars() {
        match ch {
            ',' => escaped.push_str("%2C"),
            ';' => escaped.push_str("%3B"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn rewrite_page_param(query: Option<&str>, page_number: u64) -> String {
    let replacement = format!("page={page_number}");
    let mut replaced = false;
    let mut segments = Vec::new();

    for segment in query.unwrap_or("").split('&').filter(|s| !s.is_empty()) {
        let key = segment.split_once('=').map_or(segment, |(key, _)| key);
        if key == "page" {
            if !replaced {
                segments.push(replacement.clone());
                replaced = true;
            }
            continue;
        }
        segments.push(segment.to_string());
    }

    if !replaced {
        segments.push(replacement);
    }
    segments.join("&")
}
