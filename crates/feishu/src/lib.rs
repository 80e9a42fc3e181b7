//! Feishu (Lark) platform adapter.
//!
//! Parses event callbacks into channel messages and drives CardKit streaming
//! cards through the open platform API using a cached tenant access token.

pub mod auth;
pub mod cards;
pub mod client;
pub mod event;
pub mod sequence;

pub use {
    client::FeishuClient,
    event::{FeishuEvent, parse_event},
};

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use axum::{Router, extract::Request, response::IntoResponse};

    #[derive(Debug, Clone)]
    pub struct CapturedRequest {
        pub method: String,
        pub path: String,
        pub authorization: Option<String>,
        pub body: serde_json::Value,
    }

    pub type Captured = Arc<Mutex<Vec<CapturedRequest>>>;

    /// Mock open platform: answers the token endpoint, then every other
    /// request with `reply(path)`.
    pub async fn start_open_api_mock(
        reply: fn(&str) -> serde_json::Value,
    ) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let cap = Arc::clone(&captured);

        let app = Router::new().fallback(move |req: Request| {
            let cap = Arc::clone(&cap);
            async move {
                let method = req.method().to_string();
                let path = req.uri().path().to_string();
                let authorization = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = axum::body::to_bytes(req.into_body(), 1024 * 1024)
                    .await
                    .unwrap_or_default();
                let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
                let response = if path.ends_with("/auth/v3/tenant_access_token/internal") {
                    serde_json::json!({
                        "code": 0,
                        "msg": "ok",
                        "tenant_access_token": "t-mock",
                        "expire": 7200,
                    })
                } else {
                    reply(&path)
                };
                cap.lock().unwrap().push(CapturedRequest {
                    method,
                    path,
                    authorization,
                    body,
                });
                axum::Json(response)
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    /// Mock whose responses at paths ending in `broken_suffix` are cut off
    /// mid-body; the token endpoint answers normally otherwise.
    pub async fn start_broken_body_mock(broken_suffix: &'static str) -> String {
        let app = Router::new().fallback(move |req: Request| async move {
            let path = req.uri().path().to_string();
            if path.ends_with(broken_suffix) {
                let frames = futures::stream::iter(vec![
                    Ok(b"{\"code\":0,".to_vec()),
                    Err(std::io::Error::other("connection cut")),
                ]);
                return axum::response::Response::builder()
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from_stream(frames))
                    .unwrap();
            }
            axum::Json(serde_json::json!({
                "code": 0,
                "msg": "ok",
                "tenant_access_token": "t-mock",
                "expire": 7200,
            }))
            .into_response()
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub fn requests_to(captured: &Captured, suffix: &str) -> Vec<CapturedRequest> {
        captured
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.ends_with(suffix))
            .cloned()
            .collect()
    }
}
