use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use {
    streambot_channels::{CardCallback, CardReplier, CardSink, InboundMessage, StaticCard},
    streambot_config::StreambotConfig,
    streambot_providers::ProviderManager,
    streambot_sessions::{DedupCache, SessionStore},
};

use crate::{
    admission::{AdmissionFilter, AdmissionPipeline, DedupFilter, EmptyContentFilter, MentionFilter},
    callback::{CallbackAction, CallbackChain, ClearCardAction},
    commands::CommandFilter,
    dispatch::DispatchFilter,
    error::Result,
    orchestrator::{Orchestrator, OrchestratorConfig},
    replies::Replies,
};

/// Settings the chat engine takes from the loaded configuration.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub bot_name: String,
    pub assistant_name: String,
    pub session_ttl: Duration,
    pub max_context_len: usize,
    pub dedup_ttl: Duration,
    pub stream: OrchestratorConfig,
}

impl ChatSettings {
    pub fn from_config(config: &StreambotConfig) -> Self {
        let feishu = config.bot.feishu.clone().unwrap_or_default();
        Self {
            bot_name: feishu.bot_name,
            assistant_name: feishu.assistant_name,
            session_ttl: Duration::from_secs(config.session.ttl_secs),
            max_context_len: config.session.max_context_len,
            dedup_ttl: Duration::from_secs(config.session.dedup_ttl_secs),
            stream: OrchestratorConfig::from(&config.stream),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&StreambotConfig::default())
    }
}

/// Inbound message and card callback handling, wired with the standard
/// filter chain: dedup, mention gating, empty content, commands, dispatch.
pub struct ChatEngine {
    pipeline: AdmissionPipeline,
    callbacks: CallbackChain,
    sessions: SessionStore,
    dedup: DedupCache,
}

impl ChatEngine {
    pub fn new(
        settings: &ChatSettings,
        sink: Arc<dyn CardSink>,
        replier: Arc<dyn CardReplier>,
        providers: Arc<ProviderManager>,
        cancel: CancellationToken,
    ) -> Self {
        let sessions = SessionStore::new(settings.session_ttl, settings.max_context_len);
        let dedup = DedupCache::new(settings.dedup_ttl);
        let replies = Replies::new(settings.assistant_name.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            sink,
            providers,
            sessions.clone(),
            settings.stream,
            cancel,
        ));

        let filters: Vec<Arc<dyn AdmissionFilter>> = vec![
            Arc::new(DedupFilter::new(dedup.clone())),
            Arc::new(MentionFilter::new(settings.bot_name.clone())),
            Arc::new(EmptyContentFilter::new(
                Arc::clone(&replier),
                replies.clone(),
            )),
            Arc::new(CommandFilter::new(
                sessions.clone(),
                Arc::clone(&replier),
                replies.clone(),
            )),
            Arc::new(DispatchFilter::new(orchestrator)),
        ];
        let actions: Vec<Arc<dyn CallbackAction>> =
            vec![Arc::new(ClearCardAction::new(sessions.clone(), replies))];

        Self {
            pipeline: AdmissionPipeline::new(filters),
            callbacks: CallbackChain::new(actions),
            sessions,
            dedup,
        }
    }

    pub fn pipeline(&self) -> &AdmissionPipeline {
        &self.pipeline
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run an inbound message through admission and, if admitted, the
    /// streaming exchange. Returns whether the message reached dispatch.
    pub async fn handle_message(&self, msg: &InboundMessage) -> bool {
        self.pipeline.run(msg).await
    }

    /// Resolve a card button press to the card that replaces it.
    pub async fn handle_callback(&self, callback: &CardCallback) -> Result<StaticCard> {
        self.callbacks.run(callback).await
    }

    /// Drop expired sessions and dedup markers. Returns how many entries were
    /// removed in total.
    pub fn purge_expired(&self) -> usize {
        self.sessions.purge_expired() + self.dedup.purge_expired()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{FakeReplier, FakeSink, ScriptedProvider, Step, inbound},
        streambot_channels::{ChatKind, Mention},
        streambot_common::ChatMessage,
        streambot_providers::ProviderEvent,
    };

    struct Harness {
        engine: ChatEngine,
        sink: Arc<FakeSink>,
        replier: Arc<FakeReplier>,
        provider: Arc<ScriptedProvider>,
    }

    fn harness(steps: Vec<Step>) -> Harness {
        let sink = Arc::new(FakeSink::default());
        let replier = Arc::new(FakeReplier::default());
        let provider = Arc::new(ScriptedProvider::new(steps));
        let providers = Arc::new(ProviderManager::new());
        providers.register(provider.clone());
        providers.set_default("scripted").unwrap();
        let settings = ChatSettings {
            bot_name: "streambot".into(),
            ..Default::default()
        };
        let engine = ChatEngine::new(
            &settings,
            sink.clone(),
            replier.clone(),
            providers,
            CancellationToken::new(),
        );
        Harness {
            engine,
            sink,
            replier,
            provider,
        }
    }

    fn answers(chunks: &[&str]) -> Vec<Step> {
        chunks
            .iter()
            .map(|c| Step::Emit(ProviderEvent::Answer((*c).to_string())))
            .collect()
    }

    #[test]
    fn standard_filter_order() {
        let h = harness(Vec::new());
        assert_eq!(h.engine.pipeline().filter_names(), [
            "dedup",
            "mention",
            "empty_content",
            "command",
            "dispatch"
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_message_is_answered_and_stored() {
        let h = harness(answers(&["Hi", " there"]));
        let msg = inbound(ChatKind::Direct, "hello");

        assert!(h.engine.handle_message(&msg).await);
        assert_eq!(h.engine.sessions().get_messages(&msg.conversation_id), vec![
            ChatMessage::user("hello"),
            ChatMessage::assistant("Hi there"),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_delivery_is_admitted_once() {
        let h = harness(answers(&["ok"]));
        let msg = inbound(ChatKind::Direct, "hello");

        assert!(h.engine.handle_message(&msg).await);
        assert!(!h.engine.handle_message(&msg).await);
        assert_eq!(h.provider.histories().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn group_message_needs_the_bot_mention() {
        let h = harness(answers(&["ok"]));
        let mut msg = inbound(ChatKind::Group, "hello");

        assert!(!h.engine.handle_message(&msg).await);
        assert!(h.replier.replies().is_empty());
        assert!(h.sink.calls().is_empty());

        msg.message_id = "om_2".into();
        msg.mentions.push(Mention {
            name: "streambot".into(),
            id: Some("ou_bot".into()),
        });
        assert!(h.engine.handle_message(&msg).await);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_gets_prompt_card_without_ai_call() {
        let h = harness(answers(&["never"]));
        let msg = inbound(ChatKind::Direct, "");

        assert!(!h.engine.handle_message(&msg).await);
        assert_eq!(h.replier.replies().len(), 1);
        assert!(h.provider.histories().is_empty());
        assert!(h.engine.sessions().get_messages(&msg.conversation_id).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_command_resets_conversation() {
        let h = harness(answers(&["never"]));
        let msg = inbound(ChatKind::Direct, "/clear");
        h.engine
            .sessions()
            .set_messages(&msg.conversation_id, vec![ChatMessage::user("old")]);

        assert!(!h.engine.handle_message(&msg).await);
        assert!(h.engine.sessions().get_messages(&msg.conversation_id).is_empty());
        assert_eq!(h.replier.replies().len(), 1);
        assert!(h.provider.histories().is_empty());
    }

    #[tokio::test]
    async fn clear_button_callback() {
        let h = harness(Vec::new());
        h.engine
            .sessions()
            .set_messages("om_root", vec![ChatMessage::user("old")]);
        let callback = CardCallback::from_value(serde_json::json!({
            "kind": "clear",
            "chatType": "personal",
            "sessionId": "om_root",
            "msgId": "om_1",
        }))
        .unwrap();

        let card = h.engine.handle_callback(&callback).await.unwrap();
        assert_eq!(card, Replies::new("DeepSeek").cleared());
        assert!(h.engine.sessions().get_messages("om_root").is_empty());
    }
}
