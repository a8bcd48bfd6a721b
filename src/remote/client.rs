use super::auth::TokenStore;
use super::transport::{ApiRequest, ApiResponse, HttpTransport, Method, RequestBody};
use crate::config::ApiConfig;
use crate::errors::{ApiError, ApiResult};
use rand::Rng;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Shared entry point for every REST call: adds the auth header, retries
/// reads on transient failures, and folds non-2xx responses into `ApiError`.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: ApiConfig, transport: Arc<dyn HttpTransport>, tokens: TokenStore) -> Self {
        Self {
            config,
            transport,
            tokens,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub async fn send(&self, method: Method, url: &str, body: RequestBody) -> ApiResult<ApiResponse> {
        let request_id = Uuid::new_v4();
        let attempts = if method.is_retryable() {
            self.config.get_retries + 1
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = ApiRequest::new(method, url, body.clone());
            if let Some(authorization) = self.tokens.authorization() {
                request.headers.push(("Authorization".to_string(), authorization));
            }

            match self.transport.execute(request).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!(%request_id, method = method.as_str(), url, status = response.status, "api call succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    tracing::warn!(%request_id, method = method.as_str(), url, status = response.status, "api call rejected");
                    return Err(ApiError::Http {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(error) if error.is_transient() && attempt < attempts => {
                    let delay = backoff_delay(self.config.retry_backoff_ms, attempt);
                    tracing::warn!(%request_id, method = method.as_str(), url, attempt, error = %error, "retrying api call");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    tracing::warn!(%request_id, method = method.as_str(), url, error = %error, "api call failed");
                    return Err(error);
                }
            }
        }
    }

    pub async fn fetch<T: DeserializeOwned>(&self, method: Method, url: &str, body: RequestBody) -> ApiResult<T> {
        let response = self.send(method, url, body).await?;
        decode(&response.body)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        self.fetch(Method::Get, url, RequestBody::Empty).await
    }

    /// Succeeds on any 2xx, with or without a body.
    pub async fn delete(&self, url: &str) -> ApiResult<()> {
        self.send(Method::Delete, url, RequestBody::Empty).await.map(|_| ())
    }
}

/// An empty 2xx body where a value was expected is a decode failure, so it
/// is never mistaken for an empty result.
pub fn decode<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    if body.trim().is_empty() {
        return Err(ApiError::Decode("empty response body".to_string()));
    }
    serde_json::from_str(body).map_err(|error| ApiError::Decode(error.to_string()))
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponential = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(6));
    let jitter = if base_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=base_ms / 2)
    };
    Duration::from_millis(exponential + jitter)
}

#[cfg(test)]
mod tests {
    use super::{decode, ApiClient};
    use crate::config::ApiConfig;
    use crate::errors::ApiError;
    use crate::remote::auth::TokenStore;
    use crate::remote::testing::FakeTransport;
    use crate::remote::transport::{Method, RequestBody};
    use std::sync::Arc;

    fn client(transport: Arc<FakeTransport>, tokens: TokenStore) -> ApiClient {
        let config = ApiConfig {
            base_url: "http://backend.test/".to_string(),
            retry_backoff_ms: 0,
            ..Default::default()
        };
        ApiClient::new(config, transport, tokens)
    }

    #[tokio::test]
    async fn auth_header_is_absent_until_a_token_is_stored() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(Method::Get, "http://backend.test/ping/", 200, "[]");
        let tokens = TokenStore::ephemeral(None);
        let client = client(transport.clone(), tokens.clone());

        let _: Vec<serde_json::Value> = client.get("http://backend.test/ping/").await.expect("unauthenticated");
        tokens.set_token("secret").expect("set");
        let _: Vec<serde_json::Value> = client.get("http://backend.test/ping/").await.expect("authenticated");

        let seen = transport.requests();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].header("Authorization").is_none());
        assert_eq!(seen[1].header("authorization"), Some("Token secret"));
    }

    #[tokio::test]
    async fn non_success_status_is_returned_with_body() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(Method::Get, "http://backend.test/boom/", 500, "server exploded");
        let client = client(transport.clone(), TokenStore::ephemeral(None));

        let error = client
            .get::<Vec<serde_json::Value>>("http://backend.test/boom/")
            .await
            .expect_err("500");
        assert_eq!(
            error,
            ApiError::Http {
                status: 500,
                body: "server exploded".to_string()
            }
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn reads_are_retried_on_transient_failures() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_next(ApiError::Timeout("read".to_string()));
        transport.fail_next(ApiError::Connect("refused".to_string()));
        transport.respond(Method::Get, "http://backend.test/items/", 200, "[1, 2]");
        let client = client(transport.clone(), TokenStore::ephemeral(None));

        let items: Vec<i64> = client.get("http://backend.test/items/").await.expect("eventually ok");
        assert_eq!(items, vec![1, 2]);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn writes_are_never_retried() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail_next(ApiError::Timeout("write".to_string()));
        let client = client(transport.clone(), TokenStore::ephemeral(None));

        let error = client
            .fetch::<serde_json::Value>(Method::Post, "http://backend.test/items/", RequestBody::Json(serde_json::json!({})))
            .await
            .expect_err("timeout");
        assert!(matches!(error, ApiError::Timeout(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(Method::Delete, "http://backend.test/items/1/", 204, "");
        let client = client(transport, TokenStore::ephemeral(None));
        client.delete("http://backend.test/items/1/").await.expect("deleted");
    }

    #[test]
    fn empty_body_is_not_an_empty_result() {
        assert!(matches!(decode::<Vec<i64>>("  "), Err(ApiError::Decode(_))));
        assert!(matches!(decode::<Vec<i64>>("{oops"), Err(ApiError::Decode(_))));
        assert_eq!(decode::<Vec<i64>>("[]").expect("empty list"), Vec::<i64>::new());
    }
}
