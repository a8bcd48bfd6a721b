use super::transport::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Canned-response transport that records every request it sees.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), (u16, String)>>,
    failures: Mutex<VecDeque<ApiError>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn respond(&self, method: Method, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert((method, url.to_string()), (status, body.to_string()));
    }

    /// Queues a transport failure served before any route is consulted.
    pub fn fail_next(&self, error: ApiError) {
        self.failures.lock().expect("failures lock").push_back(error);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let key = (request.method, request.url.clone());
        self.seen.lock().expect("seen lock").push(request);
        if let Some(error) = self.failures.lock().expect("failures lock").pop_front() {
            return Err(error);
        }
        let routes = self.routes.lock().expect("routes lock");
        Ok(match routes.get(&key) {
            Some((status, body)) => ApiResponse {
                status: *status,
                body: body.clone(),
            },
            None => ApiResponse {
                status: 404,
                body: format!("no route for {} {}", key.0.as_str(), key.1),
            },
        })
    }
}
