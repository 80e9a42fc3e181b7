use std::{net::SocketAddr, time::Duration};

use {
    axum::{
        Router,
        extract::State,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tokio_util::sync::CancellationToken,
    tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer},
    tracing::{debug, info, warn},
};

use crate::{
    feishu_routes::{card_handler, event_handler},
    state::GatewayState,
};

/// Callback bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How often expired sessions and dedup markers are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// How long shutdown waits for cancelled exchanges to unwind.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: GatewayState) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/feishu/event", post(event_handler))
        .route("/feishu/card", post(card_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `state.cancel` fires, then wait briefly for spawned exchanges.
pub async fn start_gateway(bind: &str, port: u16, state: GatewayState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, version = state.version, "gateway listening");

    spawn_purge_task(state.clone());

    let cancel = state.cancel.clone();
    let tasks = state.tasks.clone();
    let app = build_gateway_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    tasks.close();
    if tokio::time::timeout(DRAIN_TIMEOUT, tasks.wait()).await.is_err() {
        warn!(
            pending = tasks.len(),
            "exchanges still running after shutdown grace period"
        );
    }
    info!("gateway stopped");
    Ok(())
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
pub fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                },
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                },
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                    return;
                }
            },
            () = terminate => {},
        }
        info!("shutdown requested");
        cancel.cancel();
    });
}

fn spawn_purge_task(state: GatewayState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.tick().await;
        loop {
            tokio::select! {
                () = state.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let removed = state.engine.purge_expired();
                    if removed > 0 {
                        debug!(removed, "purged expired sessions and dedup markers");
                    }
                },
            }
        }
    });
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn ping_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
        "version": state.version,
    }))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        secrecy::Secret,
        serde_json::{Value, json},
        std::sync::Arc,
        streambot_common::ChatMessage,
        streambot_config::{FeishuConfig, StreambotConfig},
        streambot_providers::ProviderManager,
    };

    async fn serve(token: Option<&str>) -> (String, GatewayState) {
        let mut config = StreambotConfig::default();
        config.bot.feishu = Some(FeishuConfig {
            enable: true,
            app_id: "cli_a".into(),
            app_secret: Secret::new("s".into()),
            app_verification_token: token.map(|t| Secret::new(t.to_string())),
            bot_name: "streambot".into(),
            // Nothing listens here; spawned exchanges fail to open their card.
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        });
        let state = GatewayState::from_config(
            &config,
            Arc::new(ProviderManager::new()),
            CancellationToken::new(),
        )
        .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_gateway_app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    async fn post_json(url: String, body: Value) -> (u16, Value) {
        let resp = reqwest::Client::new()
            .post(url)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn ping_reports_ok() {
        let (base, _) = serve(None).await;
        let body: Value = reqwest::get(format!("{base}/ping"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body["time"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn url_verification_echoes_challenge() {
        let (base, _) = serve(Some("vtok")).await;
        let (status, body) = post_json(
            format!("{base}/feishu/event"),
            json!({ "type": "url_verification", "challenge": "c-1", "token": "vtok" }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "challenge": "c-1" }));
    }

    #[tokio::test]
    async fn wrong_token_is_refused() {
        let (base, _) = serve(Some("vtok")).await;
        let (status, _) = post_json(
            format!("{base}/feishu/event"),
            json!({ "type": "url_verification", "challenge": "c-1", "token": "nope" }),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn unsupported_message_is_acknowledged() {
        let (base, _) = serve(None).await;
        let (status, _) = post_json(
            format!("{base}/feishu/event"),
            json!({
                "schema": "2.0",
                "header": { "event_id": "e", "event_type": "im.message.receive_v1" },
                "event": {
                    "sender": { "sender_id": { "open_id": "ou_1" } },
                    "message": {
                        "message_id": "om_1",
                        "chat_id": "oc_1",
                        "chat_type": "p2p",
                        "message_type": "image",
                        "content": "{}",
                    },
                },
            }),
        )
        .await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn message_event_is_acknowledged_immediately() {
        let (base, state) = serve(None).await;
        let (status, body) = post_json(
            format!("{base}/feishu/event"),
            json!({
                "schema": "2.0",
                "header": { "event_id": "e", "event_type": "im.message.receive_v1" },
                "event": {
                    "sender": { "sender_id": { "user_id": "u_1" } },
                    "message": {
                        "message_id": "om_1",
                        "chat_id": "oc_1",
                        "chat_type": "p2p",
                        "message_type": "text",
                        "content": "{\"text\":\"hello\"}",
                    },
                },
            }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({}));

        state.tasks.close();
        state.tasks.wait().await;
        assert!(state.engine.sessions().get_messages("om_1").is_empty());
    }

    #[tokio::test]
    async fn clear_card_callback_returns_raw_card() {
        let (base, state) = serve(None).await;
        state
            .engine
            .sessions()
            .set_messages("om_root", vec![ChatMessage::user("q")]);

        let (status, body) = post_json(
            format!("{base}/feishu/card"),
            json!({
                "open_id": "ou_1",
                "action": {
                    "tag": "button",
                    "value": { "kind": "clear", "chatType": "group", "sessionId": "om_root", "msgId": "om_1" },
                },
            }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["card"]["type"], "raw");
        assert_eq!(body["card"]["data"]["header"]["template"], "grey");
        assert!(state.engine.sessions().get_messages("om_root").is_empty());
    }

    #[tokio::test]
    async fn unknown_card_action_is_rejected() {
        let (base, _) = serve(None).await;
        let (status, _) = post_json(
            format!("{base}/feishu/card"),
            json!({ "action": { "value": { "kind": "vote" } } }),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[test]
    fn state_requires_an_enabled_platform() {
        let err = GatewayState::from_config(
            &StreambotConfig::default(),
            Arc::new(ProviderManager::new()),
            CancellationToken::new(),
        );
        assert!(err.is_err());
    }
}
