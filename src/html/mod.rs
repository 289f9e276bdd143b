//! Parsers for the server-rendered DocuShare pages.
//!
//! This module provides:
//! - Login page parsing (challenge nonce and script)
//! - Property table extraction with typed-field promotion
//! - Version history and collection listing extraction
//! - Classification of error, login and content pages

pub mod classify;
pub mod history;
pub mod listing;
pub mod login;
pub mod properties;

use scraper::{ElementRef, Selector};

pub use classify::{DefaultClassifier, PageClassifier, PageKind, PageView};
pub use history::parse_history_page;
pub use listing::parse_listing_page;
pub use login::{has_login_form, parse_login_page, LoginPage};
pub use properties::{parse_property_page, PropertyPage};

/// Compile a selector literal.
///
/// Only used with static CSS strings, so a failure is a programming error.
pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Text content of an element with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
