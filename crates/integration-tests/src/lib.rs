//! Shared harness for the end-to-end tests: the real router wired to the
//! in-memory store, driven request by request through `tower::ServiceExt`.

use std::sync::Arc;
use std::time::Duration;

use auth_adapters::{Argon2Hasher, JwtAuthProvider};
use services::{AccountService, AdService, ProposalService};
use storage_adapters::InMemoryStore;

pub const JWT_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const JWT_ISSUER: &str = "barter-test";
pub const DEFAULT_PASSWORD: &str = "correct-horse-battery";

/// Services over one fresh store; Argon2 runs at minimum cost.
pub struct Backend {
    pub store: Arc<InMemoryStore>,
    pub ads: Arc<AdService>,
    pub proposals: Arc<ProposalService>,
    pub accounts: Arc<AccountService>,
}

impl Backend {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let hasher = Argon2Hasher::with_cost(8, 1, 1).expect("argon2 test parameters");
        let auth = Arc::new(
            JwtAuthProvider::new(JWT_SECRET, JWT_ISSUER, Duration::from_secs(600), hasher)
                .expect("jwt provider"),
        );
        Self {
            ads: Arc::new(AdService::new(store.clone())),
            proposals: Arc::new(ProposalService::new(store.clone(), store.clone())),
            accounts: Arc::new(AccountService::new(store.clone(), auth)),
            store,
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "web-axum")]
pub use harness::{Reply, TestApp};

#[cfg(feature = "web-axum")]
mod harness {
    use std::sync::Arc;

    use api_adapters::{router, AppState, HttpMetrics};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{Backend, DEFAULT_PASSWORD};

    #[derive(Debug)]
    pub struct Reply {
        pub status: StatusCode,
        pub headers: HeaderMap,
        /// `Null` for empty bodies, a JSON string for non-JSON text
        pub body: Value,
    }

    impl Reply {
        /// Field names reported in a validation error payload.
        pub fn error_fields(&self) -> Vec<String> {
            self.body["fields"]
                .as_array()
                .map(|fields| {
                    fields
                        .iter()
                        .filter_map(|f| f["field"].as_str().map(str::to_owned))
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    pub struct TestApp {
        router: Router,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with_page_size(10)
        }

        pub fn with_page_size(page_size: u32) -> Self {
            let backend = Backend::new();
            let state = AppState {
                ads: backend.ads,
                proposals: backend.proposals,
                accounts: backend.accounts,
                page_size,
                metrics: Arc::new(HttpMetrics::new()),
            };
            Self {
                router: router(state),
            }
        }

        pub async fn request(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> Reply {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => builder.body(Body::empty()),
            }
            .expect("valid request");

            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible");
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("readable body");
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };
            Reply {
                status,
                headers,
                body,
            }
        }

        pub async fn get(&self, uri: &str, token: &str) -> Reply {
            self.request(Method::GET, uri, Some(token), None).await
        }

        pub async fn post(&self, uri: &str, token: &str, body: Value) -> Reply {
            self.request(Method::POST, uri, Some(token), Some(body)).await
        }

        pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Reply {
            self.request(Method::PATCH, uri, Some(token), Some(body)).await
        }

        pub async fn put(&self, uri: &str, token: &str, body: Value) -> Reply {
            self.request(Method::PUT, uri, Some(token), Some(body)).await
        }

        pub async fn delete(&self, uri: &str, token: &str) -> Reply {
            self.request(Method::DELETE, uri, Some(token), None).await
        }

        /// Registers `username` and returns a bearer token for it.
        pub async fn signup(&self, username: &str) -> String {
            let credentials = json!({ "username": username, "password": DEFAULT_PASSWORD });
            let registered = self
                .request(
                    Method::POST,
                    "/api/v1/auth/register",
                    None,
                    Some(credentials.clone()),
                )
                .await;
            assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

            let issued = self
                .request(Method::POST, "/api/v1/auth/token", None, Some(credentials))
                .await;
            assert_eq!(issued.status, StatusCode::OK, "{:?}", issued.body);
            issued.body["access_token"]
                .as_str()
                .expect("access_token in response")
                .to_owned()
        }

        /// Creates an ad and returns its id.
        pub async fn create_ad(&self, token: &str, title: &str, description: &str) -> i64 {
            let reply = self
                .post(
                    "/api/v1/ads",
                    token,
                    json!({
                        "title": title,
                        "description": description,
                        "category": "Спорт",
                        "condition": "used",
                    }),
                )
                .await;
            assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
            reply.body["id"].as_i64().expect("ad id")
        }

        /// Creates a proposal and returns its id.
        pub async fn propose(&self, token: &str, sender: i64, receiver: i64) -> i64 {
            let reply = self
                .post(
                    "/api/v1/proposals",
                    token,
                    json!({
                        "ad_sender_id": sender,
                        "ad_receiver_id": receiver,
                        "comment": "trade?",
                    }),
                )
                .await;
            assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
            reply.body["id"].as_i64().expect("proposal id")
        }
    }

    impl Default for TestApp {
        fn default() -> Self {
            Self::new()
        }
    }
}
