//! Tests for the login module

use super::*;
use crate::config::{LoginFormConfig, WebAuthConfig};
use crate::credentials::CredentialStore;
use crate::error::Error;
use crate::http::Session;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBAUTH_PAGE: &str = r#"
<html><body>
  <form method="get" action="/search"><input type="text" name="q"></form>
  <form method="post" action="/ucinetid/webauth" name="login_form">
    <input type="hidden" name="referer" value="">
    <input type="hidden" name="return_url" value="https://eee.uci.edu/myeee">
    <input type="hidden" name="csrf" value="abc&amp;123">
    <input type="text" name="ucinetid" size="20">
    <input type="password" name="password">
    <input type="checkbox" name="remember">
    <input type="submit" name="login_button" value="Login">
  </form>
</body></html>
"#;

fn page_url() -> Url {
    Url::parse("https://login.uci.edu/ucinetid/webauth?return_url=x").unwrap()
}

fn creds() -> Arc<CredentialStore> {
    Arc::new(CredentialStore::new("peter", "anteater").unwrap())
}

fn login_page(action: &str) -> String {
    format!(
        r#"<html><body><form method="post" action="{action}">
             <input type="hidden" name="csrf" value="abc123">
             <input type="text" name="id">
             <input type="password" name="secret">
           </form></body></html>"#
    )
}

// ============================================================================
// Form parsing
// ============================================================================

#[test]
fn test_parse_webauth_form() {
    let form = LoginForm::parse(WEBAUTH_PAGE, &page_url(), &LoginFormConfig::default()).unwrap();

    assert_eq!(form.action.as_str(), "https://login.uci.edu/ucinetid/webauth");
    assert_eq!(
        form.hidden_fields,
        vec![
            ("referer".to_string(), String::new()),
            ("return_url".to_string(), "https://eee.uci.edu/myeee".to_string()),
            ("csrf".to_string(), "abc&123".to_string()),
        ]
    );
    assert_eq!(form.username_field, "ucinetid");
    assert_eq!(form.password_field, "password");
    assert_eq!(
        form.submit_field,
        Some(("login_button".to_string(), "Login".to_string()))
    );
}

#[test]
fn test_payload_order() {
    let form = LoginForm::parse(WEBAUTH_PAGE, &page_url(), &LoginFormConfig::default()).unwrap();
    let payload = form.payload(&creds());
    let names: Vec<&str> = payload.iter().map(|(k, _)| k.as_str()).collect();

    assert_eq!(
        names,
        vec!["referer", "return_url", "csrf", "ucinetid", "password", "login_button"]
    );
    assert_eq!(payload[3].1, "peter");
    assert_eq!(payload[4].1, "anteater");
}

#[test]
fn test_empty_action_posts_back_to_page() {
    let html = r#"<form><input type="text" name="u"><input type="password" name="p"></form>"#;
    let form = LoginForm::parse(html, &page_url(), &LoginFormConfig::default()).unwrap();
    assert_eq!(form.action, page_url());
}

#[test]
fn test_field_overrides() {
    let html = r#"<form action="go">
        <input type="text" name="nickname">
        <input type="text" name="netid">
        <input type="password" name="pw">
    </form>"#;
    let overrides = LoginFormConfig {
        username_field: Some("netid".to_string()),
        ..LoginFormConfig::default()
    };
    let form = LoginForm::parse(html, &page_url(), &overrides).unwrap();
    assert_eq!(form.username_field, "netid");
    assert_eq!(form.action.as_str(), "https://login.uci.edu/ucinetid/go");
}

#[test]
fn test_missing_form() {
    let err = LoginForm::parse("<p>maintenance</p>", &page_url(), &LoginFormConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::MissingFormField { field } if field == "form"));
}

#[test]
fn test_missing_password_input() {
    let html = r#"<form action="/x"><input type="text" name="q"></form>"#;
    let err = LoginForm::parse(html, &page_url(), &LoginFormConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingFormField { field } if field == "password"));
}

#[test]
fn test_missing_username_input() {
    let html = r#"<form action="/x"><input type="password" name="p"></form>"#;
    let err = LoginForm::parse(html, &page_url(), &LoginFormConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingFormField { field } if field == "username"));
}

#[test]
fn test_override_not_on_page() {
    let overrides = LoginFormConfig {
        username_field: Some("netid".to_string()),
        ..LoginFormConfig::default()
    };
    let err = LoginForm::parse(WEBAUTH_PAGE, &page_url(), &overrides).unwrap_err();
    assert!(matches!(err, Error::MissingFormField { field } if field == "netid"));
}

// ============================================================================
// Submission
// ============================================================================

fn submitter(mock_server: &MockServer) -> LoginFormSubmitter {
    let config = WebAuthConfig::for_gateway(
        Url::parse(&format!("{}/login", mock_server.uri())).unwrap(),
    );
    LoginFormSubmitter::new(creds(), &config).unwrap()
}

fn urls(mock_server: &MockServer) -> (Url, Url) {
    (
        Url::parse(&format!("{}/login", mock_server.uri())).unwrap(),
        Url::parse(&format!("{}/myeee", mock_server.uri())).unwrap(),
    )
}

#[test]
fn test_login_page_url_replaces_return_param() {
    let config = WebAuthConfig::default();
    let submitter = LoginFormSubmitter::new(creds(), &config).unwrap();
    let login = Url::parse("https://login.uci.edu/ucinetid/webauth?return_url=old&lang=en").unwrap();
    let target = Url::parse("https://eee.uci.edu/myeee").unwrap();

    assert_eq!(
        submitter.login_page_url(&login, &target).as_str(),
        "https://login.uci.edu/ucinetid/webauth?lang=en&return_url=https%3A%2F%2Feee.uci.edu%2Fmyeee"
    );
}

#[tokio::test]
async fn test_submit_success_redirect() {
    let mock_server = MockServer::start().await;
    let (login, target) = urls(&mock_server);

    Mock::given(method("GET"))
        .and(path("/login"))
        .and(query_param("return_url", target.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .set_body_string(login_page("/login")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("csrf=abc123"))
        .and(body_string_contains("id=peter"))
        .and(body_string_contains("secret=anteater"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", "sess=xyz; Path=/")
                .insert_header("Location", "/myeee?ucinetid_auth=tok"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new().unwrap();
    let outcome = submitter(&mock_server)
        .submit(&session, &login, &target)
        .await
        .unwrap();

    assert_eq!(outcome.continue_url.path(), "/myeee");
    assert_eq!(outcome.continue_url.query(), Some("ucinetid_auth=tok"));
    assert_eq!(outcome.chain.len(), 1);
    assert_eq!(session.cookie_header(&target).as_deref(), Some("sess=xyz"));
}

#[tokio::test]
async fn test_submit_meta_refresh_success() {
    let mock_server = MockServer::start().await;
    let (login, target) = urls(&mock_server);

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page("")))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta http-equiv="refresh" content="0;url=/myeee?ucinetid_auth=meta"></head></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new().unwrap();
    let outcome = submitter(&mock_server)
        .submit(&session, &login, &target)
        .await
        .unwrap();

    assert_eq!(outcome.continue_url.query(), Some("ucinetid_auth=meta"));
}

#[tokio::test]
async fn test_submit_rejected_with_form_again() {
    let mock_server = MockServer::start().await;
    let (login, target) = urls(&mock_server);

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page("/login")))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page("/login")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new().unwrap();
    let err = submitter(&mock_server)
        .submit(&session, &login, &target)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidCredentials));
}

#[tokio::test]
async fn test_submit_rejected_with_redirect_to_gateway() {
    let mock_server = MockServer::start().await;
    let (login, target) = urls(&mock_server);

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page("/login")))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/login?error=bad_password"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new().unwrap();
    let err = submitter(&mock_server)
        .submit(&session, &login, &target)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidCredentials));
}

#[tokio::test]
async fn test_submit_unrecognised_page_is_not_posted() {
    let mock_server = MockServer::start().await;
    let (login, target) = urls(&mock_server);

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Down for maintenance</p>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let session = Session::new().unwrap();
    let err = submitter(&mock_server)
        .submit(&session, &login, &target)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingFormField { .. }));
}

#[tokio::test]
async fn test_existing_gateway_session_skips_post() {
    let mock_server = MockServer::start().await;
    let (login, target) = urls(&mock_server);

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/myeee?ucinetid_auth=sso"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let session = Session::new().unwrap();
    let outcome = submitter(&mock_server)
        .submit(&session, &login, &target)
        .await
        .unwrap();

    assert_eq!(outcome.continue_url.query(), Some("ucinetid_auth=sso"));
}

#[tokio::test]
async fn test_login_page_error_status() {
    let mock_server = MockServer::start().await;
    let (login, target) = urls(&mock_server);

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let session = Session::new().unwrap();
    let err = submitter(&mock_server)
        .submit(&session, &login, &target)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedLoginResponse { status: 503 }));
}
