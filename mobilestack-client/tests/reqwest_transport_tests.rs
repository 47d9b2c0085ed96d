//! End-to-end tests of the table client over real HTTP against a wiremock
//! server. The blocking client must not run on an async worker, so every
//! service is built, used and dropped inside `spawn_blocking`.

mod common;

use common::{APP_KEY, Listing, listing};
use mobilestack_client::{
    APPLICATION_KEY_HEADER, AUTH_HEADER, MobileService, ServiceConfig, User,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(uri: String) -> MobileService {
    let config = ServiceConfig {
        request_timeout_secs: 5,
        ..ServiceConfig::new(uri, APP_KEY)
    };
    MobileService::new(config).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_posts_json_and_reads_back_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tables/listing"))
        .and(header(APPLICATION_KEY_HEADER, APP_KEY))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "title": "Loft",
            "bedrooms": 2,
            "footage": 900,
            "price": 1250.0,
            "published": 1,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let id = tokio::task::spawn_blocking(move || {
        let service = service_for(uri);
        let mut row = listing("Loft", 2);
        service.table::<Listing>().unwrap().insert(&mut row).unwrap();
        row.id
    })
    .await
    .unwrap();

    assert_eq!(id, 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn query_parameters_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tables/listing"))
        .and(query_param("$filter", "((bedrooms eq 2) and (footage gt 1337))"))
        .and(query_param("$top", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "A", "bedrooms": 2, "footage": 1400, "price": 10, "published": 1},
            {"id": 2, "title": "B", "bedrooms": 2, "footage": 2000, "price": 20, "published": 0},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let rows = tokio::task::spawn_blocking(move || {
        service_for(uri)
            .table::<Listing>()
            .unwrap()
            .query()
            .equal("bedrooms", 2)
            .gt("footage", 1337)
            .top(10)
            .unwrap()
            .select()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(rows.iter().map(|l| l.title.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
    assert!(rows[0].published);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_and_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/tables/listing/5"))
        .and(header(AUTH_HEADER, "user-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let service = service_for(uri);
        service.set_user(User::new("Google:1", "user-token"));
        let mut row = listing("Loft", 2);
        row.id = 5;
        service.table::<Listing>().unwrap().delete(&row).unwrap();
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/tables/listing/3"))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let service = service_for(uri);
        let mut row = listing("Loft", 2);
        row.id = 3;
        service.table::<Listing>().unwrap().update(&row).unwrap_err()
    })
    .await
    .unwrap();

    assert_eq!(err.status(), Some(409));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let err = tokio::task::spawn_blocking(move || {
        let service = service_for(uri);
        service.table::<Listing>().unwrap().select_all().unwrap_err()
    })
    .await
    .unwrap();

    assert_eq!(err.status(), None);
    assert!(err.to_string().starts_with("operation error: select failed"));
}
