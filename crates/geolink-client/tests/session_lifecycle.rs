//! Session lifecycle against a mock service: anonymous access, login,
//! rejected credentials, expiry, logout and persistence.

mod common;

use common::{EDITABLE_PATH, MockFeatureServer, SERVICE_PATH, TOKEN_PATH, form};
use geolink_client::{
    ClientError, FeatureClassId, JsonFileStore, KeyValueStore, QueryOptions, Session,
};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{method, path},
};

fn secret(s: &str) -> SecretString {
    SecretString::new(s.to_string())
}

fn empty_query() -> serde_json::Value {
    json!({"geometryType": "esriGeometryPoint", "features": []})
}

#[tokio::test]
async fn anonymous_requests_use_read_only_root_without_token() {
    let mock = MockFeatureServer::start().await;
    mock.mock_route(SERVICE_PATH, "MapServer/3/query", empty_query()).await;

    let client = mock.client().await;
    client
        .query(&FeatureClassId::from(3), &QueryOptions::new())
        .await
        .unwrap();

    let requests = mock.requests_to(&format!("{SERVICE_PATH}/MapServer/3/query")).await;
    assert_eq!(requests.len(), 1);
    let body = form(&requests[0]);
    assert_eq!(body["f"], "json");
    assert!(!body.contains_key("token"));
    assert!(mock.requests_to(TOKEN_PATH).await.is_empty());
}

#[tokio::test]
async fn login_switches_to_editable_root_with_token() {
    let mock = MockFeatureServer::start().await;
    mock.mock_token_success("tok-1", 1).await;
    mock.mock_route(EDITABLE_PATH, "MapServer/3/query", empty_query()).await;

    let client = mock.client().await;
    assert!(client.authenticate("editor", secret("pw")).await.unwrap());
    assert_eq!(client.current_base_url().await, format!("{}/", mock.editable_url));

    client
        .query(&FeatureClassId::from(3), &QueryOptions::new())
        .await
        .unwrap();

    let token_body = form(&mock.requests_to(TOKEN_PATH).await[0]);
    assert_eq!(token_body["username"], "editor");
    assert_eq!(token_body["password"], "pw");
    assert_eq!(token_body["f"], "json");

    let query = mock.requests_to(&format!("{EDITABLE_PATH}/MapServer/3/query")).await;
    assert_eq!(form(&query[0])["token"], "tok-1");
}

#[tokio::test]
async fn rejected_credentials_reset_and_stay_anonymous() {
    let mock = MockFeatureServer::start().await;
    mock.mock_token_invalid_credentials().await;

    let client = mock.client().await;
    assert!(!client.authenticate("editor", secret("wrong")).await.unwrap());

    let session = client.session().await;
    assert!(!session.is_authenticated);
    assert!(session.username.is_none());
    assert!(session.auth_token.is_none());
    assert_eq!(client.current_base_url().await, format!("{}/", mock.service_url));
}

#[tokio::test]
async fn expired_token_is_renewed_once() {
    let mock = MockFeatureServer::start().await;
    mock.mock_token_success("fresh", 1).await;
    mock.mock_route(EDITABLE_PATH, "MapServer/3/query", empty_query()).await;

    let client = mock.client().await;
    client
        .restore(Session {
            username: Some("editor".to_string()),
            password: Some(secret("pw")),
            auth_token: Some("stale".to_string()),
            auth_token_expires: chrono::Utc::now().timestamp_millis() - 1_000,
            is_authenticated: true,
        })
        .await
        .unwrap();
    assert!(client.session_manager().is_expired().await);

    for _ in 0..2 {
        client
            .query(&FeatureClassId::from(3), &QueryOptions::new())
            .await
            .unwrap();
    }

    let queries = mock.requests_to(&format!("{EDITABLE_PATH}/MapServer/3/query")).await;
    assert_eq!(queries.len(), 2);
    for query in &queries {
        assert_eq!(form(query)["token"], "fresh");
    }
}

#[tokio::test]
async fn concurrent_requests_share_one_token_request() {
    let mock = MockFeatureServer::start().await;
    mock.mock_token_success("shared", 1).await;
    mock.mock_route(EDITABLE_PATH, "MapServer/3/query", empty_query()).await;

    let client = Arc::new(mock.client().await);
    client
        .restore(Session {
            username: Some("editor".to_string()),
            password: Some(secret("pw")),
            ..Default::default()
        })
        .await
        .unwrap();

    let results = futures::future::join_all((0..6).map(|_| {
        let client = Arc::clone(&client);
        async move {
            client
                .query(&FeatureClassId::from(3), &QueryOptions::new())
                .await
        }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(mock.requests_to(TOKEN_PATH).await.len(), 1);
}

#[tokio::test]
async fn logout_returns_to_read_only_root() {
    let mock = MockFeatureServer::start().await;
    mock.mock_token_success("tok", 1).await;
    mock.mock_route(SERVICE_PATH, "MapServer/legend", json!({"layers": []})).await;

    let client = mock.client().await;
    client.authenticate("editor", secret("pw")).await.unwrap();
    client.logout().await.unwrap();

    client.legend().await.unwrap();
    let legend = mock.requests_to(&format!("{SERVICE_PATH}/MapServer/legend")).await;
    assert!(!form(&legend[0]).contains_key("token"));
}

#[tokio::test]
async fn session_survives_restart_through_file_store() {
    let mock = MockFeatureServer::start().await;
    mock.mock_token_success("persisted", 1).await;
    mock.mock_route(EDITABLE_PATH, "MapServer/legend", json!({"layers": []})).await;

    let dir = TempDir::new().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path(), "continuum"));
    {
        let client = mock.client_with_store(Arc::clone(&store)).await;
        assert!(client.authenticate("editor", secret("pw")).await.unwrap());
    }

    let reopened: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path(), "continuum"));
    let stored = reopened.get("userInfo").await.unwrap().unwrap();
    assert_eq!(stored["authToken"], json!("persisted"));
    assert_eq!(stored["isAuthenticated"], json!(true));

    let client = mock.client_with_store(reopened).await;
    client.legend().await.unwrap();

    // Only the first login hit the token endpoint
    assert_eq!(mock.requests_to(TOKEN_PATH).await.len(), 1);
    let legend = mock.requests_to(&format!("{EDITABLE_PATH}/MapServer/legend")).await;
    assert_eq!(form(&legend[0])["token"], "persisted");
}

#[tokio::test]
async fn token_endpoint_failure_leaves_session_unchanged() {
    let mock = MockFeatureServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock.server)
        .await;

    let client = mock.client().await;
    let before = Session {
        username: Some("editor".to_string()),
        password: Some(secret("pw")),
        auth_token: Some("old".to_string()),
        auth_token_expires: 1,
        is_authenticated: true,
    };
    client.restore(before).await.unwrap();

    let err = client.legend().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));

    let after = client.session().await;
    assert_eq!(after.auth_token.as_deref(), Some("old"));
    assert_eq!(after.auth_token_expires, 1);
    assert!(after.is_authenticated);
}
