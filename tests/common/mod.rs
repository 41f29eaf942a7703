//! Common test utilities for PrivX connector integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use privx_connector::{Config, PrivxConnector};

pub const TOKEN_PATH: &str = "/auth/api/v1/oauth/token";
pub const USERS_SEARCH_PATH: &str = "/role-store/api/v1/users/search";
pub const ROLES_PATH: &str = "/role-store/api/v1/roles";

/// Test data factory for PrivX users.
pub fn create_test_user(id: &str, full_name: &str) -> Value {
    json!({
        "id": id,
        "full_name": full_name,
        "email": format!("{}@example.com", id),
        "principal": full_name.to_lowercase().replace(' ', "."),
        "source": "local"
    })
}

/// Test data factory for PrivX roles.
pub fn create_test_role(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "permissions": ["users-view"],
        "member_count": 0
    })
}

/// Generate a sequence of test users starting at `start`.
pub fn generate_test_users(start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| create_test_user(&format!("user-{}", i), &format!("User {}", i)))
        .collect()
}

/// Wraps items in the role-store `{count, items}` envelope.
pub fn items_response(items: Vec<Value>) -> Value {
    json!({
        "count": items.len(),
        "items": items
    })
}

/// Creates a mock OAuth token response.
pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

/// Configuration pointing at the mock server.
pub fn test_config(base_url: &str, page_size: u32) -> Config {
    let mut config = Config::from_toml(&format!(
        r#"
[privx]
base_url = "{}/"
api_client_id = "api-client-id"
api_client_secret = "api-client-secret"
oauth_client_id = "privx-external"
oauth_client_secret = "oauth-client-secret"

[sync]
page_size = {}
"#,
        base_url, page_size
    ))
    .unwrap();
    config.http.timeout_seconds = 5;
    config.validate().unwrap();
    config
}

/// Mock server wrapper with common setup helpers.
pub struct MockPrivxServer {
    pub server: MockServer,
}

impl MockPrivxServer {
    /// Creates a new mock PrivX server.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Returns the mock server's base URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Connector wired to this server.
    pub fn connector(&self) -> PrivxConnector {
        PrivxConnector::from_config(&test_config(&self.url(), 100)).unwrap()
    }

    /// Sets up the OAuth token endpoint.
    pub async fn mock_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 3600)),
            )
            .mount(&self.server)
            .await;
    }
}
