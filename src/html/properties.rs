//! Properties page parsing.
//!
//! Extraction is schema-tolerant: every label/value row of the property table
//! is kept verbatim. A second, strict step promotes the well-known labels to
//! typed fields and fails when a label the object kind requires is missing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::html::{element_text, selector};
use crate::model::{Handle, HandleType};

pub const LABEL_TITLE: &str = "Title";
pub const LABEL_HANDLE: &str = "Handle";
pub const LABEL_VERSION_NUMBER: &str = "Version Number";
pub const LABEL_DOCUMENT_CONTROL_NUMBER: &str = "Document Control Number";

static PROPSTABLE: LazyLock<Selector> = LazyLock::new(|| selector("table.propstable"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static DOCUMENT_IN_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[/=])(Document-[0-9]+)(?:$|[/?#])").unwrap());

/// Properties of one object, after typed-field promotion.
#[derive(Debug, Clone, Default)]
pub struct PropertyPage {
    /// All rows of the property table, label to value.
    pub properties: HashMap<String, String>,

    pub title: String,

    /// File name taken from the Title link (Documents and Versions).
    pub filename: Option<String>,

    /// Version number (Versions only).
    pub version_number: Option<u32>,

    pub document_control_number: Option<String>,

    /// Document linked from a Version's property table.
    pub document_handle: Option<Handle>,
}

/// Parse a properties page (`dsweb/Services/<handle>`) for `handle`.
pub fn parse_property_page(html_text: &str, handle: &Handle) -> Result<PropertyPage> {
    let document = Html::parse_document(html_text);
    let context = || format!("properties page of {}", handle);

    let table = document
        .select(&PROPSTABLE)
        .next()
        .ok_or_else(|| Error::parse(context(), html_text))?;

    let mut properties = HashMap::new();
    let mut title_href = None;
    let mut document_handle = None;

    for row in table.select(&ROW) {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        if cells.len() < 2 {
            continue;
        }

        let label = element_text(cells[0]);
        let label = label.strip_suffix(':').unwrap_or(&label).trim().to_string();
        if label.is_empty() {
            continue;
        }

        let value_cell = cells[1];
        if label == LABEL_TITLE {
            title_href = value_cell
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);
        }

        if document_handle.is_none() {
            document_handle = value_cell
                .select(&LINK)
                .filter_map(|a| a.value().attr("href"))
                .find_map(document_from_href);
        }

        properties.insert(label, element_text(value_cell));
    }

    if properties.is_empty() {
        return Err(Error::parse(context(), html_text));
    }

    promote(properties, title_href, document_handle, handle, html_text)
}

/// Promote well-known labels to typed fields.
fn promote(
    properties: HashMap<String, String>,
    title_href: Option<String>,
    document_handle: Option<Handle>,
    handle: &Handle,
    html_text: &str,
) -> Result<PropertyPage> {
    let title = properties
        .get(LABEL_TITLE)
        .cloned()
        .ok_or_else(|| Error::parse(format!("{} (no Title property)", handle), html_text))?;

    if let Some(listed) = properties.get(LABEL_HANDLE) {
        if listed != &handle.to_string() {
            tracing::warn!("Properties page of {} reports handle {}", handle, listed);
        }
    }

    let filename = match handle.kind() {
        HandleType::Document | HandleType::Version => {
            let href = title_href.ok_or_else(|| {
                Error::parse(format!("{} (Title has no file link)", handle), html_text)
            })?;
            Some(filename_from_href(&href).ok_or_else(|| {
                Error::parse(format!("{} (file link has no file name)", handle), html_text)
            })?)
        }
        HandleType::Collection => None,
    };

    let version_number = match handle.kind() {
        HandleType::Version => {
            let raw = properties.get(LABEL_VERSION_NUMBER).ok_or_else(|| {
                Error::parse(format!("{} (no Version Number property)", handle), html_text)
            })?;
            let number = raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::parse(format!("{} (invalid Version Number '{}')", handle, raw), html_text)
                })?;
            Some(number)
        }
        _ => None,
    };

    let document_control_number = properties
        .get(LABEL_DOCUMENT_CONTROL_NUMBER)
        .filter(|v| !v.is_empty())
        .cloned();

    let document_handle = match handle.kind() {
        HandleType::Version => document_handle,
        _ => None,
    };

    Ok(PropertyPage {
        properties,
        title,
        filename,
        version_number,
        document_control_number,
        document_handle,
    })
}

/// Last path segment of a link, percent-decoded.
pub fn filename_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path.rsplit('/').next()?.trim();
    if segment.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

fn document_from_href(href: &str) -> Option<Handle> {
    DOCUMENT_IN_HREF
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
