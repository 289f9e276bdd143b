//! A fake DocuShare site for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use docushare_dl::api::RetryPolicy;
use docushare_dl::{DocuShare, Error, Result};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const NONCE: &str = "1cwe4irxdwe7yl4v6ggow";

const CHALLENGE_JS: &str = "function obscure_string(p, t) { return p + t; }";

pub fn login_html() -> String {
    format!(
        r#"<html><head>
             <script type="text/javascript" src="/docushare/javascript/challenge.js"></script>
           </head><body>
             <form method="post" action="ApplyLogin">
               <input type="hidden" name="login_token" value="{NONCE}">
               <input type="text" name="username">
             </form>
           </body></html>"#
    )
}

pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html;charset=UTF-8")
}

pub fn properties_html(rows: &str) -> String {
    format!(r#"<html><body><table class="propstable">{rows}</table></body></html>"#)
}

pub fn document_properties(handle: &str, title: &str, filename: &str) -> String {
    properties_html(&format!(
        r#"<tr><td>Handle:</td><td>{handle}</td></tr>
           <tr><td>Title:</td><td><a href="/docushare/dsweb/Get/{handle}/{filename}">{title}</a></td></tr>"#
    ))
}

pub fn collection_properties(handle: &str, title: &str) -> String {
    properties_html(&format!(
        r#"<tr><td>Handle:</td><td>{handle}</td></tr>
           <tr><td>Title:</td><td>{title}</td></tr>"#
    ))
}

pub fn history_html(versions: &[&str]) -> String {
    let rows: String = versions
        .iter()
        .enumerate()
        .map(|(i, v)| {
            format!(
                r#"<tr><td><input type="radio"></td><td><a href="/docushare/dsweb/Get/{v}/f.pdf">{}</a></td></tr>"#,
                versions.len() - i
            )
        })
        .collect();
    format!(
        r#"<table class="table_properties">
             <thead><tr><th>Preferred</th><th>#</th></tr></thead>
             <tbody>{rows}</tbody>
           </table>"#
    )
}

pub fn listing_html(children: &[&str]) -> String {
    let rows: String = children
        .iter()
        .map(|c| {
            let view = if c.starts_with("Collection") { "View" } else { "Get" };
            format!(
                r#"<tr><td><a href="/docushare/dsweb/{view}/{c}">{c}</a></td>
                       <td><a href="/docushare/dsweb/Services/{c}">props</a></td></tr>"#
            )
        })
        .collect();
    format!(r#"<html><body><table class="listing">{rows}</table></body></html>"#)
}

/// Evaluates the composed challenge the way the site's `obscure_string` does.
pub fn concat_evaluator(script: &str, nonce: &str) -> Result<String> {
    let call = script.rsplit("obscure_string(").next().unwrap_or_default();
    let password = serde_json::Deserializer::from_str(call)
        .into_iter::<String>()
        .next()
        .ok_or_else(|| Error::Authentication("no obscure_string call".into()))??;
    Ok(format!("{password}{nonce}"))
}

/// Mount the login page and the challenge script.
pub async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/docushare/dsweb/Login"))
        .respond_with(html(login_html()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docushare/javascript/challenge.js"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(CHALLENGE_JS, "application/javascript"),
        )
        .mount(server)
        .await;
}

/// Mount the login flow with an ApplyLogin that accepts `PASSWORD` and
/// expects `logins` successful handshakes.
pub async fn mount_login(server: &MockServer, logins: u64) {
    mount_login_page(server).await;

    Mock::given(method("POST"))
        .and(path("/docushare/dsweb/ApplyLogin"))
        .and(body_string_contains(format!("response={PASSWORD}{NONCE}")))
        .respond_with(
            html("<html><body>Welcome</body></html>")
                .insert_header("Set-Cookie", "AmberUser=64.alice.x; Path=/"),
        )
        .expect(logins)
        .mount(server)
        .await;
}

/// Any other login attempt is answered with the login form.
pub async fn mount_login_rejection(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/docushare/dsweb/ApplyLogin"))
        .respond_with(html(login_html()))
        .mount(server)
        .await;
}

pub async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/docushare/dsweb/{page_path}")))
        .respond_with(html(body))
        .mount(server)
        .await;
}

pub async fn mount_document(server: &MockServer, handle: &str, title: &str, filename: &str) {
    mount_page(
        server,
        &format!("Services/{handle}"),
        document_properties(handle, title, filename),
    )
    .await;
    mount_page(
        server,
        &format!("ServicesLib/{handle}/History"),
        history_html(&[]),
    )
    .await;
}

pub async fn mount_collection(server: &MockServer, handle: &str, title: &str, children: &[&str]) {
    mount_page(
        server,
        &format!("Services/{handle}"),
        collection_properties(handle, title),
    )
    .await;
    mount_page(server, &format!("View/{handle}"), listing_html(children)).await;
}

pub async fn mount_content(server: &MockServer, handle: &str, bytes: &'static [u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/docushare/dsweb/Get/{handle}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(bytes, "application/pdf"))
        .mount(server)
        .await;
}

pub fn site_url(uri: &str) -> String {
    format!("{uri}/docushare/")
}

/// A client for `uri` using the concatenating evaluator and fast retries.
pub fn client(uri: &str) -> DocuShare {
    DocuShare::builder(site_url(uri))
        .evaluator(Arc::new(concat_evaluator))
        .retry_policy(RetryPolicy::new(2, Duration::from_millis(1)))
        .build()
        .expect("client")
}

pub async fn logged_in_client(uri: &str) -> DocuShare {
    let ds = client(uri);
    ds.login_with_password(USERNAME, PASSWORD)
        .await
        .expect("login");
    ds
}
