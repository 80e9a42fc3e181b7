//! Gateway: HTTP server for platform callbacks.
//!
//! Lifecycle:
//! 1. Build [`GatewayState`] from validated config (Feishu client, chat engine)
//! 2. Bind and serve `/ping`, `/feishu/event`, `/feishu/card`
//! 3. Sweep expired sessions periodically
//! 4. On shutdown, cancel in-flight exchanges and drain spawned tasks

pub mod feishu_routes;
pub mod server;
pub mod state;

pub use {
    server::{build_gateway_app, spawn_shutdown_listener, start_gateway},
    state::GatewayState,
};
