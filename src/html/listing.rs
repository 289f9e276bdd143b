//! Collection listing page parsing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::html::selector;
use crate::model::Handle;

static LISTING_TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table.listing"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static CHILD_IN_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[/=])((?:Collection|Document)-[0-9]+)(?:$|([/?#]))").unwrap()
});

/// Parse a listing page (`dsweb/View/<Collection>`).
///
/// Returns the immediate children in presentation order. Rows usually link
/// the same child several times (icon, title, properties); the first
/// occurrence decides the position. Sort and paging links back to the
/// collection itself carry a query or fragment and are ignored; a plain link
/// to the collection is a real child entry. An empty listing table is a
/// valid, empty collection.
pub fn parse_listing_page(html_text: &str, collection: &Handle) -> Result<Vec<Handle>> {
    let page = Html::parse_document(html_text);

    let table = page
        .select(&LISTING_TABLE)
        .next()
        .ok_or_else(|| Error::parse(format!("listing page of {}", collection), html_text))?;

    let mut seen = HashSet::new();
    let mut children = Vec::new();

    for href in table.select(&LINK).filter_map(|a| a.value().attr("href")) {
        let Some(caps) = CHILD_IN_HREF.captures(href) else {
            continue;
        };
        let Ok(handle) = caps[1].parse::<Handle>() else {
            continue;
        };

        let view_option = matches!(caps.get(2).map(|m| m.as_str()), Some("?" | "#"));
        if view_option && &handle == collection {
            continue;
        }
        if seen.insert(handle.clone()) {
            children.push(handle);
        }
    }

    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> Handle {
        "Collection-10000".parse().unwrap()
    }

    #[test]
    fn test_children_in_order() {
        let html = r#"
            <div class="breadcrumbs"><a href="/docushare/dsweb/View/Collection-1">Home</a></div>
            <table class="listing">
              <tr><td><a href="/docushare/dsweb/Get/Document-1/a.pdf"><img></a></td>
                  <td><a href="/docushare/dsweb/Services/Document-1">a</a></td></tr>
              <tr><td><a href="/docushare/dsweb/View/Collection-2">Sub</a></td>
                  <td><a href="/docushare/dsweb/Services/Collection-2">props</a></td></tr>
              <tr><td><a href="/docushare/dsweb/View/Collection-10000?sort=title">Sort</a></td></tr>
              <tr><td><a href="mailto:owner@example.com">owner</a></td></tr>
            </table>"#;

        let children = parse_listing_page(html, &collection()).unwrap();
        let ids: Vec<String> = children.iter().map(ToString::to_string).collect();
        assert_eq!(ids, ["Document-1", "Collection-2"]);
    }

    #[test]
    fn test_collection_listed_inside_itself() {
        let html = r#"
            <table class="listing">
              <tr><td><a href="/docushare/dsweb/View/Collection-10000?page=2">Next</a></td></tr>
              <tr><td><a href="/docushare/dsweb/View/Collection-10000#top">Top</a></td></tr>
              <tr><td><a href="/docushare/dsweb/View/Collection-10000">Loop</a></td>
                  <td><a href="/docushare/dsweb/Services/Collection-10000">props</a></td></tr>
              <tr><td><a href="/docushare/dsweb/Get/Document-5/b.txt">b</a></td></tr>
            </table>"#;

        let children = parse_listing_page(html, &collection()).unwrap();
        assert_eq!(children, vec![collection(), "Document-5".parse().unwrap()]);
    }

    #[test]
    fn test_versions_are_not_children() {
        let html = r#"<table class="listing">
            <tr><td><a href="/dsweb/Get/Version-000001/a.pdf">v1</a></td></tr></table>"#;
        assert!(parse_listing_page(html, &collection()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_collection() {
        let html = r#"<table class="listing"></table>"#;
        assert!(parse_listing_page(html, &collection()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_listing_is_parse_error() {
        assert!(matches!(
            parse_listing_page("<html><body></body></html>", &collection()),
            Err(Error::Parse { .. })
        ));
    }
}
