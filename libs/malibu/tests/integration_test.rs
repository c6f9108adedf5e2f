use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use malibu::{
    ContentType, ETagStore, FileStorage, MalibuError, Mock, Mode, Networking, Request,
    StatusCodeValidator,
};
use serde::Deserialize;
use serde_json::json;

fn networking(server: &MockServer) -> Networking {
    Networking::builder()
        .base_url(server.base_url())
        .languages(["en-US"])
        .build()
        .unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
}

#[tokio::test]
async fn test_get_with_query() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/users")
            .query_param("page", "2")
            .header("Authorization", "Bearer secret")
            .header("Accept-Language", "en-US;q=1.0");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([{"id": 1, "name": "Kai"}]));
    });

    let networking = networking(&server);
    networking.authenticate_bearer("secret");

    let wave = networking
        .execute(Request::get("/users").parameter("page", json!(2)))
        .validate_status()
        .await
        .unwrap();

    let users: Vec<User> = wave.decode().unwrap();
    assert_eq!(users, vec![User { id: 1, name: "Kai".to_owned() }]);
    assert_eq!(wave.request().url().query(), Some("page=2"));
    mock.assert();
}

#[tokio::test]
async fn test_post_json_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/users")
            .header("Content-Type", "application/json")
            .json_body(json!({"name": "Leilani"}));
        then.status(201).json_body(json!({"id": 2, "name": "Leilani"}));
    });

    let networking = networking(&server);
    let wave = networking
        .execute(Request::post("/users").parameter("name", json!("Leilani")))
        .validate(&StatusCodeValidator::new([201]))
        .await
        .unwrap();

    assert_eq!(wave.to_json_dictionary().unwrap()["id"], json!(2));
    mock.assert();
}

#[tokio::test]
async fn test_form_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/profile")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("city=Malibu&name=Kai");
        then.status(204);
    });

    let networking = networking(&server);
    let request = Request::put("/profile")
        .content_type(ContentType::FormUrlEncoded)
        .parameter("name", json!("Kai"))
        .parameter("city", json!("Malibu"));
    let wave = networking.execute(request).await.unwrap();

    assert_eq!(wave.response().status_code(), 204);
    assert_eq!(wave.to_json().unwrap(), serde_json::Value::Null);
    mock.assert();
}

#[tokio::test]
async fn test_unacceptable_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/users/9");
        then.status(404).body("missing");
    });

    let err = networking(&server)
        .execute(Request::delete("/users/9"))
        .validate_status()
        .await
        .unwrap_err();
    assert!(matches!(err, MalibuError::UnacceptableStatusCode(404)));
}

#[tokio::test]
async fn test_etag_replayed_as_if_none_match() {
    let server = MockServer::start();
    let mut first = server.mock(|when, then| {
        when.method(GET).path("/feed");
        then.status(200).header("ETag", "\"v1\"").body("[]");
    });

    let networking = networking(&server);
    networking.execute(Request::get("/feed")).await.unwrap();
    first.assert();
    first.delete();

    let second = server.mock(|when, then| {
        when.method(GET).path("/feed").header("If-None-Match", "\"v1\"");
        then.status(304);
    });
    let wave = networking.execute(Request::get("/feed")).await.unwrap();
    assert_eq!(wave.response().status_code(), 304);
    second.assert();
}

#[tokio::test]
async fn test_etag_persisted_in_file_storage() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/feed");
        then.status(200).header("ETag", "\"v7\"").body("[]");
    });
    let dir = tempfile::tempdir().unwrap();

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let networking = Networking::builder()
        .base_url(server.base_url())
        .etag_storage(storage)
        .build()
        .unwrap();
    networking.execute(Request::get("/feed")).await.unwrap();

    let reopened = ETagStore::new(Arc::new(FileStorage::open(dir.path()).unwrap()));
    let key = Request::get("/feed").etag_key(&server.base_url());
    assert_eq!(reopened.get(&key).as_deref(), Some("\"v7\""));
}

#[tokio::test]
async fn test_partial_mode_mixes_mocks_and_live() {
    let server = MockServer::start();
    let live = server.mock(|when, then| {
        when.method(GET).path("/live");
        then.status(200).body("from server");
    });
    let shadowed = server.mock(|when, then| {
        when.method(GET).path("/mocked");
        then.status(200).json_body(json!({"mocked": false}));
    });

    let networking = networking(&server);
    networking.set_mode(Mode::Partial);
    networking.register_mock(Mock::from_json(Request::get("/mocked"), &json!({"mocked": true})));

    let mocked = networking.execute(Request::get("/mocked")).json().await.unwrap();
    assert_eq!(mocked, json!({"mocked": true}));

    let wave = networking.execute(Request::get("/live")).await.unwrap();
    assert_eq!(wave.to_text().unwrap(), "from server");
    live.assert();
    assert_eq!(shadowed.hits(), 0);
}

#[tokio::test]
async fn test_fake_mode_never_hits_the_server() {
    let server = MockServer::start();
    let live = server.mock(|when, then| {
        when.method(GET).path("/users");
        then.status(200);
    });

    let networking = networking(&server);
    networking.set_mode(Mode::Fake);
    let err = networking.execute(Request::get("/users")).await.unwrap_err();

    assert!(matches!(err, MalibuError::NoMockProvided));
    assert_eq!(live.hits(), 0);
}

#[tokio::test]
async fn test_fixture_mock() {
    let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/users.json");
    let networking = Networking::builder().mode(Mode::Fake).build().unwrap();
    networking.register_mock(Mock::from_fixture(Request::get("/users"), fixture));

    let wave = networking.execute(Request::get("/users")).await.unwrap();
    let users: Vec<User> = wave.decode().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(wave.response().url().scheme(), "file");
}

#[tokio::test]
async fn test_cancel_aborts_live_request() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).delay(Duration::from_secs(5)).body("late");
    });

    let networking = networking(&server);
    let ride = networking.execute(Request::get("/slow"));
    ride.cancel();
    assert!(ride.is_cancelled());

    let result = tokio::time::timeout(Duration::from_secs(2), ride).await.unwrap();
    assert!(matches!(result, Err(MalibuError::Cancelled)));
}
