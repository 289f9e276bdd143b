//! Login page parsing.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::html::selector;

static LOGIN_TOKEN: LazyLock<Selector> = LazyLock::new(|| selector("input[name=\"login_token\"]"));
static SCRIPTS: LazyLock<Selector> = LazyLock::new(|| selector("script[src]"));

/// Pieces of the login page needed for the challenge-response handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPage {
    /// Nonce issued by the server (e.g. `1cwe4irxdwe7yl4v6ggow`).
    pub login_token: String,

    /// `src` of the challenge script, relative to the login page.
    pub challenge_src: String,
}

/// Parse the DocuShare login page.
pub fn parse_login_page(html_text: &str) -> Result<LoginPage> {
    let document = Html::parse_document(html_text);

    let token_input = document
        .select(&LOGIN_TOKEN)
        .next()
        .ok_or_else(|| Error::parse("login page (login_token input missing)", html_text))?;

    let login_token = token_input
        .value()
        .attr("value")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::parse("login page (login_token is empty)", html_text))?
        .to_string();

    let challenge_src = document
        .select(&SCRIPTS)
        .filter_map(|script| script.value().attr("src"))
        .find(|src| src.contains("challenge.js"))
        .ok_or_else(|| Error::parse("login page (challenge.js reference missing)", html_text))?
        .to_string();

    Ok(LoginPage {
        login_token,
        challenge_src,
    })
}

/// Whether the page renders the login form.
pub fn has_login_form(html_text: &str) -> bool {
    let document = Html::parse_document(html_text);
    document.select(&LOGIN_TOKEN).next().is_some()
}
