use std::time::{Duration, Instant};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
};

use {
    streambot_channels::{Error, Result},
    streambot_config::FeishuConfig,
};

#[derive(Clone)]
pub struct CachedAccessToken {
    pub token: Secret<String>,
    pub expires_at: Instant,
}

impl CachedAccessToken {
    fn is_valid(&self) -> bool {
        let refresh_skew = Duration::from_secs(60);
        self.expires_at > Instant::now() + refresh_skew
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    expire: Option<u64>,
}

/// Return a tenant access token, fetching a new one when the cached token is
/// missing or within a minute of expiry.
pub async fn get_tenant_access_token(
    client: &reqwest::Client,
    config: &FeishuConfig,
    cache: &tokio::sync::Mutex<Option<CachedAccessToken>>,
) -> Result<Secret<String>> {
    {
        let guard = cache.lock().await;
        if let Some(token) = guard.as_ref()
            && token.is_valid()
        {
            return Ok(token.token.clone());
        }
    }

    let token_url = format!(
        "{}/auth/v3/tenant_access_token/internal",
        config.base_url.trim_end_matches('/')
    );
    let body = serde_json::json!({
        "app_id": config.app_id,
        "app_secret": config.app_secret.expose_secret(),
    });

    let resp = client
        .post(token_url)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::external("feishu token request", e))?;
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| Error::external("feishu response body", e))?;
    let body: TokenResponse = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(_) if !status.is_success() => {
            return Err(Error::unavailable(format!(
                "feishu token request failed ({status}): {text}"
            )));
        },
        Err(e) => return Err(e.into()),
    };
    if body.code != 0 {
        return Err(Error::api(body.code, body.msg));
    }

    let ttl = body.expire.unwrap_or(7200).max(120);
    debug!(ttl_secs = ttl, "refreshed feishu tenant access token");
    let cached = CachedAccessToken {
        token: Secret::new(body.tenant_access_token),
        expires_at: Instant::now() + Duration::from_secs(ttl),
    };
    let token = cached.token.clone();

    let mut guard = cache.lock().await;
    *guard = Some(cached);
    Ok(token)
}
