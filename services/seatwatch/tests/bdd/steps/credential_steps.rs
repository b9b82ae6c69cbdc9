//! BDD step definitions for the credential lifecycle feature

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};

use seatwatch::auth::{AuthClient, CredentialManager};
use seatwatch::credential::{self, ClientIdentity, Credential};
use seatwatch::io::HttpResponse;

use crate::world::SeatWatchWorld;

const TOKEN_URL: &str = "http://auth.test/token";

fn auth_client(world: &SeatWatchWorld) -> AuthClient {
    AuthClient::new(
        TOKEN_URL,
        &ClientIdentity::new("client", "secret"),
        world.http.clone(),
    )
}

fn install(world: &mut SeatWatchWorld, initial: Credential) {
    let (writer, reader) = credential::channel(initial);
    world.manager = Some(CredentialManager::new(
        auth_client(world),
        writer,
        Duration::from_secs(600),
        Duration::from_secs(15),
    ));
    world.reader = Some(reader);
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[given(expr = "the token endpoint issues access token {string} with refresh token {string}")]
fn token_endpoint_issues(world: &mut SeatWatchWorld, access: String, refresh: String) {
    world.http.push_token_response(HttpResponse {
        status: 200,
        body: format!(
            r#"{{"scope":"PRODUCTION","token_type":"bearer","expires_in":3600,"refresh_token":"{}","access_token":"{}"}}"#,
            refresh, access
        ),
    });
}

#[given(expr = "the token endpoint rejects a request with status {int}")]
fn token_endpoint_rejects(world: &mut SeatWatchWorld, status: u16) {
    world.http.push_token_response(HttpResponse {
        status,
        body: r#"{"error":"invalid_grant"}"#.to_string(),
    });
}

#[given(expr = "the service holds access token {string} with refresh token {string}")]
fn service_holds(world: &mut SeatWatchWorld, access: String, refresh: String) {
    install(world, Credential::new(access, refresh));
}

#[when("a credential is issued")]
async fn issue_credential(world: &mut SeatWatchWorld) {
    let result = auth_client(world).issue().await;
    let outcome = match result {
        Ok(initial) => {
            install(world, initial);
            Ok(())
        }
        Err(e) => Err(e),
    };
    world.issue_result = Some(outcome);
}

#[when("the credential is refreshed")]
async fn refresh_credential(world: &mut SeatWatchWorld) {
    let manager = world.manager.as_ref().expect("no credential held");
    world.refresh_result = Some(manager.refresh_once().await);
}

#[then("the issuance should succeed")]
fn issuance_succeeds(world: &mut SeatWatchWorld) {
    let result = world.issue_result.as_ref().expect("no issuance attempted");
    result.as_ref().unwrap();
}

#[then("the refresh should succeed")]
fn refresh_succeeds(world: &mut SeatWatchWorld) {
    let result = world.refresh_result.as_ref().expect("no refresh attempted");
    result.as_ref().unwrap();
}

#[then("the refresh should fail")]
fn refresh_fails(world: &mut SeatWatchWorld) {
    let result = world.refresh_result.as_ref().expect("no refresh attempted");
    assert!(result.is_err(), "refresh unexpectedly succeeded");
}

#[then(expr = "the current bearer token should be {string}")]
fn current_bearer_token(world: &mut SeatWatchWorld, expected: String) {
    let reader = world.reader.as_ref().expect("no credential held");
    assert_eq!(reader.current().bearer_token, expected);
}

#[then(expr = "the current renewal secret should be {string}")]
fn current_renewal_secret(world: &mut SeatWatchWorld, expected: String) {
    let reader = world.reader.as_ref().expect("no credential held");
    assert_eq!(reader.current().renewal_secret, expected);
}

#[then(expr = "the last token request should use the {string} grant")]
fn last_token_request_grant(world: &mut SeatWatchWorld, expected: String) {
    let requests = world.http.token_requests.lock().unwrap();
    let last = requests.last().expect("no token request made");
    assert_eq!(param(&last.params, "grant_type"), Some(expected.as_str()));
    assert_eq!(param(&last.params, "scope"), Some("PRODUCTION"));
    assert!(last.authorization.starts_with("Basic "));
}

#[then(expr = "every token request should send refresh token {string}")]
fn every_request_sends_refresh_token(world: &mut SeatWatchWorld, expected: String) {
    let requests = world.http.token_requests.lock().unwrap();
    assert!(!requests.is_empty(), "no token request made");
    for request in requests.iter() {
        assert_eq!(param(&request.params, "refresh_token"), Some(expected.as_str()));
    }
}

#[then("readers should observe the same credential")]
fn readers_agree(world: &mut SeatWatchWorld) {
    let reader = world.reader.as_ref().expect("no credential held");
    let other = reader.clone();
    assert!(Arc::ptr_eq(&reader.current(), &other.current()));
}
