mod common;

use common::{BASE_URL, Listing, mock_service};
use mobilestack_client::{AUTH_HEADER, AuthError, AuthProvider, ClientError, User, parse_login_redirect};
use pretty_assertions::assert_eq;

const LOGIN_JSON: &str = r#"{"user":{"userId":"Facebook:1234"},"authenticationToken":"tok-1"}"#;

fn token_redirect() -> String {
    format!("{BASE_URL}/login/done#token={}", urlencoding::encode(LOGIN_JSON))
}

// ── Providers ────────────────────────────────────────────────────

#[test]
fn provider_names() {
    let names: Vec<_> = AuthProvider::ALL.iter().map(|p| p.to_string()).collect();
    assert_eq!(names, vec!["microsoft", "twitter", "facebook", "google"]);
}

#[test]
fn provider_parses_case_insensitively() {
    assert_eq!("Google".parse::<AuthProvider>(), Ok(AuthProvider::Google));
    assert!("myspace".parse::<AuthProvider>().is_err());
}

#[test]
fn login_urls() {
    let (service, _) = mock_service();
    assert_eq!(
        service.login_url(AuthProvider::Twitter),
        format!("{BASE_URL}/login/twitter")
    );
    assert_eq!(service.login_done_url(), format!("{BASE_URL}/login/done"));
}

// ── Redirect parsing ─────────────────────────────────────────────

#[test]
fn token_fragment_yields_user() {
    let user = parse_login_redirect(&token_redirect()).unwrap();
    assert_eq!(user, User::new("Facebook:1234", "tok-1"));
}

#[test]
fn error_fragment_is_rejection() {
    let url = format!("{BASE_URL}/login/done#error=Access%20denied");
    match parse_login_redirect(&url) {
        Err(AuthError::Rejected(reason)) => assert_eq!(reason, "Access denied"),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn plain_done_url_is_incomplete() {
    let url = format!("{BASE_URL}/login/done");
    assert!(matches!(parse_login_redirect(&url), Err(AuthError::Incomplete)));
}

#[test]
fn garbled_token_is_malformed_user() {
    let url = format!("{BASE_URL}/login/done#token=%7Bnope");
    assert!(matches!(
        parse_login_redirect(&url),
        Err(AuthError::MalformedUser(_))
    ));
}

#[test]
fn token_missing_user_is_malformed_user() {
    let url = format!(
        "{BASE_URL}/login/done#token={}",
        urlencoding::encode(r#"{"authenticationToken":"x"}"#)
    );
    assert!(matches!(
        parse_login_redirect(&url),
        Err(AuthError::MalformedUser(_))
    ));
}

// ── Session ──────────────────────────────────────────────────────

#[test]
fn complete_login_installs_token() {
    let (service, transport) = mock_service();
    transport.respond(200, "[]");

    let user = service.complete_login(&token_redirect()).unwrap();
    assert_eq!(service.current_user(), Some(user));

    service.table::<Listing>().unwrap().select_all().unwrap();
    assert_eq!(transport.requests()[0].header_value(AUTH_HEADER), Some("tok-1"));
}

#[test]
fn failed_login_leaves_session_untouched() {
    let (service, _) = mock_service();
    let err = service
        .complete_login(&format!("{BASE_URL}/login/done#error=nope"))
        .unwrap_err();
    assert!(matches!(err, ClientError::Auth(AuthError::Rejected(_))));
    assert_eq!(service.current_user(), None);
}

#[test]
fn logout_drops_token() {
    let (service, transport) = mock_service();
    transport.respond(200, "[]");
    service.set_user(User::new("Google:9", "tok-9"));
    service.logout();

    assert_eq!(service.current_user(), None);
    service.table::<Listing>().unwrap().select_all().unwrap();
    assert_eq!(transport.requests()[0].header_value(AUTH_HEADER), None);
}

#[test]
fn clones_share_the_session() {
    let (service, _) = mock_service();
    let other = service.clone();
    service.set_user(User::new("Twitter:5", "tok-5"));
    assert_eq!(other.current_user().map(|u| u.user_id), Some("Twitter:5".into()));
}
