use std::sync::Arc;

use {
    async_trait::async_trait,
    tokio::time::Instant,
    tracing::info,
};

use streambot_channels::InboundMessage;

use crate::{admission::AdmissionFilter, orchestrator::Orchestrator};

/// Terminal stage: runs the streaming exchange and waits for its outcome.
pub struct DispatchFilter {
    orchestrator: Arc<Orchestrator>,
}

impl DispatchFilter {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl AdmissionFilter for DispatchFilter {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    async fn admit(&self, msg: &InboundMessage) -> bool {
        let started = Instant::now();
        let outcome = self.orchestrator.run(msg).await;
        info!(
            message_id = %msg.message_id,
            conversation_id = %msg.conversation_id,
            outcome = outcome.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exchange finished"
        );
        true
    }
}
