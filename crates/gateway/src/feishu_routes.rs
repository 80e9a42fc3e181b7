//! Feishu callback endpoints.

use {
    axum::{
        Json,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::{Value, json},
    tracing::{debug, error, warn},
};

use {
    streambot_channels::{CardCallback, Error as ChannelError},
    streambot_feishu::{FeishuEvent, cards::static_card_json, parse_event},
};

use crate::state::GatewayState;

/// `POST /feishu/event`: message events run on a spawned task so the platform
/// gets its acknowledgement before the exchange starts.
pub async fn event_handler(
    State(state): State<GatewayState>,
    Json(payload): Json<Value>,
) -> Response {
    let event = match parse_event(payload, state.verification_token.as_deref()) {
        Ok(event) => event,
        Err(e) => return parse_failure(e),
    };
    match event {
        FeishuEvent::UrlVerification { challenge } => {
            Json(json!({ "challenge": challenge })).into_response()
        },
        FeishuEvent::Message(msg) => {
            let engine = state.engine.clone();
            state.tasks.spawn(async move {
                engine.handle_message(&msg).await;
            });
            ack()
        },
        FeishuEvent::CardAction(callback) => card_response(&state, &callback).await,
        FeishuEvent::Ignored { event_type } => {
            debug!(event_type = %event_type, "ignored feishu event");
            ack()
        },
    }
}

/// `POST /feishu/card`: card button presses answered with the replacement
/// card.
pub async fn card_handler(
    State(state): State<GatewayState>,
    Json(payload): Json<Value>,
) -> Response {
    match parse_event(payload, state.verification_token.as_deref()) {
        Ok(FeishuEvent::UrlVerification { challenge }) => {
            Json(json!({ "challenge": challenge })).into_response()
        },
        Ok(FeishuEvent::CardAction(callback)) => card_response(&state, &callback).await,
        Ok(other) => {
            warn!(?other, "unexpected payload on card callback route");
            ack()
        },
        Err(e) => parse_failure(e),
    }
}

async fn card_response(state: &GatewayState, callback: &CardCallback) -> Response {
    match state.engine.handle_callback(callback).await {
        Ok(card) => Json(json!({
            "card": { "type": "raw", "data": static_card_json(&card) },
        }))
        .into_response(),
        Err(e) => {
            error!(kind = %callback.kind, error = %e, "card callback failed");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        },
    }
}

fn ack() -> Response {
    Json(json!({})).into_response()
}

/// Unsupported content is acknowledged so the platform does not redeliver
/// it; malformed payloads and token mismatches are refused.
fn parse_failure(e: ChannelError) -> Response {
    if matches!(e, ChannelError::Unsupported { .. }) {
        error!(error = %e, "dropping unsupported feishu event");
        return ack();
    }
    warn!(error = %e, "rejected feishu callback");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}
