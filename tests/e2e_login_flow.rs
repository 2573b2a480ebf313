//! E2E tests for the OAuth login/callback/logout cycle against a
//! mocked provider

mod common;

use common::TestServer;
use reqwest::StatusCode;
use reqwest::header::{LOCATION, SET_COOKIE};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

/// Mount the provider responses for a successful login as `alice`,
/// a member of `acme` and of the `Owners` team only.
async fn mount_happy_path(server: &TestServer) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T"})))
        .mount(&server.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice"})))
        .mount(&server.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/members/alice"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Owners"},
            {"id": 2, "name": "ReadWrite"},
            {"name": "Nameless"},
        ])))
        .mount(&server.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/teams/1/memberships/alice"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/teams/2/memberships/alice"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server.github)
        .await;
}

fn session_cookie_from(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .map(|v| v.split(';').next().unwrap().to_string())
}

#[tokio::test]
async fn login_page_renders_authorization_url() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/login"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Sign in with GitHub"));
    assert!(body.contains("/login/oauth/authorize?client_id=test-client-id"));
    assert!(body.contains("state="));
    assert!(body.contains("scope=read%3Aorg"));
}

#[tokio::test]
async fn login_redirects_when_already_authenticated() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/login"))
        .header("Cookie", server.session_cookie("alice", &[]))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[LOCATION], "/");
}

#[tokio::test]
async fn full_login_cycle_establishes_session() {
    let server = TestServer::new().await;
    mount_happy_path(&server).await;

    let state = server.issue_state().await;
    let response = server
        .client
        .get(server.url(&format!("/oauth/callback?state={state}&code=XYZ")))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[LOCATION], "/");
    let cookie = session_cookie_from(&response).expect("session cookie set");

    // The session carries the membership snapshot; the gate allows a
    // requirement-free route with no further provider calls.
    let home = server
        .client
        .get(server.url("/"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(home.status(), StatusCode::OK);
    assert_eq!(home.text().await.unwrap(), "alice");

    // Snapshot took Owners (200) but not ReadWrite (404)
    let owners = server
        .client
        .get(server.url("/owners"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(owners.status(), StatusCode::OK);

    // Access token was persisted for later revalidation
    let stored = server.state.directory.stored_token("alice").await.unwrap();
    assert_eq!(stored.as_deref(), Some("T"));
}

#[tokio::test]
async fn callback_with_provider_error_denies_without_upstream_calls() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/oauth/callback?error=access_denied"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let requests = server.github.received_requests().await.unwrap();
    assert!(
        requests.is_empty(),
        "provider error must short-circuit before any upstream call"
    );
}

#[tokio::test]
async fn callback_with_unknown_state_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/oauth/callback?state=never-issued&code=XYZ"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let requests = server.github.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn callback_without_code_is_rejected() {
    let server = TestServer::new().await;

    let state = server.issue_state().await;
    let response = server
        .client
        .get(server.url(&format!("/oauth/callback?state={state}")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn exchange_without_access_token_field_is_denied_not_a_crash() {
    let server = TestServer::new().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "bad_verification_code"})),
        )
        .mount(&server.github)
        .await;

    let state = server.issue_state().await;
    let response = server
        .client
        .get(server.url(&format!("/oauth/callback?state={state}&code=expired")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(session_cookie_from(&response).is_none());
}

#[tokio::test]
async fn non_org_member_is_denied_and_no_session_is_set() {
    let server = TestServer::new().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T"})))
        .mount(&server.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "mallory"})))
        .mount(&server.github)
        .await;
    // 404 is the provider's normal "not a member" answer
    Mock::given(method("GET"))
        .and(path("/orgs/acme/members/mallory"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server.github)
        .await;

    let state = server.issue_state().await;
    let response = server
        .client
        .get(server.url(&format!("/oauth/callback?state={state}&code=XYZ")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(session_cookie_from(&response).is_none());
    assert!(server
        .state
        .directory
        .stored_token("mallory")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn logout_clears_session_and_stored_token() {
    let server = TestServer::new().await;
    server
        .state
        .directory
        .remember_token("alice", "T")
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/logout"))
        .header("Cookie", server.session_cookie("alice", &["Owners"]))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[LOCATION], "/login");
    let removal = session_cookie_from(&response).expect("session removal cookie");
    assert_eq!(removal, "session=");
    assert!(server
        .state
        .directory
        .stored_token("alice")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn logout_is_idempotent_for_anonymous_requests() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/logout")).send().await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[LOCATION], "/login");
}

#[tokio::test]
async fn health_endpoint_responds() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}
