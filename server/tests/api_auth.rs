//! Integration tests per gli endpoints di autenticazione
//!
//! Test per:
//! - POST /api/auth/register
//! - POST /api/auth/login
//! - GET /api/users
//!
//! Lo stato gira su store in memoria: nessun database richiesto.

mod common;

#[cfg(test)]
mod auth_tests {
    use super::common::*;
    use axum_test::http::HeaderName;
    use chat_relay::auth::decode_jwt;
    use serde_json::{Value, json};

    // ============================================================
    // Test per POST /api/auth/register - register_user
    // ============================================================

    #[tokio::test]
    async fn test_register_then_login() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "username": "logintest",
                "password": "TestLogin123",
                "name": "Login Test"
            }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["user"]["username"], "logintest");
        assert_eq!(body["user"]["name"], "Login Test");
        assert!(body["user"].get("password_hash").is_none(), "Hash must never be serialized");

        let claims = decode_jwt(body["token"].as_str().unwrap(), TEST_JWT_SECRET)
            .expect("Register token should be valid")
            .claims;
        assert_eq!(claims.username, "logintest");

        let response = server
            .post("/api/auth/login")
            .json(&json!({"username": "logintest", "password": "TestLogin123"}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["user"]["id"], claims.id);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn test_register_without_name_uses_username() {
        let state = create_test_state();
        let server = create_test_server(state);

        let response = server
            .post("/api/auth/register")
            .json(&json!({"username": "noname", "password": "secret1"}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["user"]["name"], "noname");
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let state = create_test_state();
        seed_user(&state, "alice", "Alice").await;
        let server = create_test_server(state);

        let response = server
            .post("/api/auth/register")
            .json(&json!({"username": "alice", "password": "secret1"}))
            .await;

        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_invalid_fields() {
        let state = create_test_state();
        let server = create_test_server(state);

        let invalid = [
            json!({"username": "ab", "password": "secret1"}),
            json!({"username": "has space", "password": "secret1"}),
            json!({"username": "valid_user", "password": "123"}),
        ];

        for body in invalid {
            let response = server.post("/api/auth/register").json(&body).await;
            response.assert_status_bad_request();
        }
    }

    // ============================================================
    // Test per POST /api/auth/login - login_user
    // ============================================================

    #[tokio::test]
    async fn test_login_unknown_user() {
        let state = create_test_state();
        let server = create_test_server(state);

        let response = server
            .post("/api/auth/login")
            .json(&json!({"username": "ghost", "password": "whatever"}))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = create_test_state();
        let server = create_test_server(state);

        server
            .post("/api/auth/register")
            .json(&json!({"username": "bob", "password": "rightpass"}))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/auth/login")
            .json(&json!({"username": "bob", "password": "wrongpass"}))
            .await;

        response.assert_status_unauthorized();
    }

    // ============================================================
    // Test per GET /api/users - list_users
    // ============================================================

    #[tokio::test]
    async fn test_list_users_requires_token() {
        let state = create_test_state();
        let server = create_test_server(state);

        server.get("/api/users").await.assert_status_unauthorized();

        server
            .get("/api/users")
            .add_header(HeaderName::from_static("authorization"), "Bearer invalid_token_here")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_list_users() {
        let state = create_test_state();
        let alice = seed_user(&state, "alice", "Alice").await;
        seed_user(&state, "bob", "Bob").await;
        let server = create_test_server(state);

        let response = server
            .get("/api/users")
            .add_header(HeaderName::from_static("authorization"), bearer(&create_test_jwt(&alice)))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        let usernames: Vec<&str> = body["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["username"].as_str().unwrap())
            .collect();
        assert_eq!(usernames, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_root_health() {
        let state = create_test_state();
        let server = create_test_server(state);

        server.get("/").await.assert_status_ok();
    }
}
