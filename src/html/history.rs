//! Version history page parsing.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::html::{element_text, selector};
use crate::model::Handle;

/// Header of the column linking each version.
const VERSION_COLUMN: &str = "#";

static HISTORY_TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table.table_properties"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| selector("thead th"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static VERSION_IN_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(Version-[0-9]+)(?:/|$)").unwrap());

/// Parse a history page (`dsweb/ServicesLib/<Document>/History`).
///
/// Returns version handles in rendered order (most recent first). A document
/// with a single version may be rendered with a `v_Document` link instead of
/// a Version handle; such rows are skipped, so the result can be empty.
pub fn parse_history_page(html_text: &str, document: &Handle) -> Result<Vec<Handle>> {
    let page = Html::parse_document(html_text);
    let context = || format!("history page of {}", document);

    let table = page
        .select(&HISTORY_TABLE)
        .next()
        .ok_or_else(|| Error::parse(context(), html_text))?;

    let column = table
        .select(&HEADER_CELL)
        .position(|th| element_text(th) == VERSION_COLUMN)
        .ok_or_else(|| Error::parse(format!("{} ('#' column missing)", context()), html_text))?;

    let mut versions: Vec<Handle> = Vec::new();
    for row in table.select(&ROW) {
        let Some(cell) = row.select(&CELL).nth(column) else {
            continue;
        };
        let Some(href) = cell.select(&LINK).next().and_then(|a| a.value().attr("href")) else {
            continue;
        };

        match VERSION_IN_HREF
            .captures(href)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<Handle>().ok())
        {
            Some(handle) if !versions.contains(&handle) => versions.push(handle),
            Some(_) => {}
            None => tracing::debug!("Skipping history link without version handle: {}", href),
        }
    }

    Ok(versions)
}
