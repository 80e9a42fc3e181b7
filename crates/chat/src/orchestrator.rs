//! Streams one AI reply into an editable card.
//!
//! Each exchange runs three tasks: the AI task forwards provider events over
//! a bounded channel, the ticker pushes the latest snapshot to the card on a
//! fixed period, and the calling task is the single writer of the
//! [`Exchange`], selecting over events, the idle timeout and shutdown.

use std::{future::Future, sync::Arc, time::Duration};

use {
    futures::StreamExt,
    tokio::{
        sync::{mpsc, watch},
        task::JoinHandle,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    streambot_channels::{CardSink, InboundMessage, StreamUpdate},
    streambot_common::ChatMessage,
    streambot_config::StreamConfig,
    streambot_providers::{ProviderEvent, ProviderManager},
    streambot_sessions::SessionStore,
};

use crate::{
    error::Error,
    exchange::{Exchange, ExchangeOutcome, ExchangeState},
};

/// Answer shown when the provider stays silent past the idle timeout.
pub const TIMEOUT_ANSWER: &str = "请求超时";
/// Answer shown when the exchange fails.
pub const FAILURE_ANSWER: &str = "聊天失败";

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Period of snapshot pushes while streaming.
    pub tick: Duration,
    /// How long to wait for the first provider event.
    pub idle_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(700),
            idle_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&StreamConfig> for OrchestratorConfig {
    fn from(config: &StreamConfig) -> Self {
        Self {
            tick: Duration::from_millis(config.tick_ms),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

/// Why the main loop stopped reading provider events.
enum StreamEnd {
    Finished,
    TimedOut,
    Failed(Error),
    Cancelled,
}

pub struct Orchestrator {
    sink: Arc<dyn CardSink>,
    providers: Arc<ProviderManager>,
    sessions: SessionStore,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        sink: Arc<dyn CardSink>,
        providers: Arc<ProviderManager>,
        sessions: SessionStore,
        config: OrchestratorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink,
            providers,
            sessions,
            config,
            cancel,
        }
    }

    /// Run one exchange for `msg` to completion.
    pub async fn run(&self, msg: &InboundMessage) -> ExchangeOutcome {
        let started = Instant::now();
        let mut exchange = Exchange::new();

        let card_id = match self.open_card(&msg.message_id).await {
            Ok(card_id) => card_id,
            Err(streambot_channels::Error::Cancelled) => return ExchangeOutcome::Cancelled,
            Err(e) => {
                warn!(message_id = %msg.message_id, error = %e, "failed to open streaming card");
                return ExchangeOutcome::OpenFailed;
            },
        };
        debug!(card_id = %card_id, conversation_id = %msg.conversation_id, "streaming card opened");
        exchange.state = ExchangeState::AwaitingContent;

        let mut history = self.sessions.get_messages(&msg.conversation_id);
        history.push(ChatMessage::user(msg.text.clone()));

        let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
        let mut ai_task = spawn_ai_task(Arc::clone(&self.providers), history.clone(), event_tx);

        let (snapshot_tx, snapshot_rx) = watch::channel(StreamUpdate::default());
        let mut ticker: Option<Ticker> = None;
        let idle = tokio::time::sleep_until(started + self.config.idle_timeout);
        tokio::pin!(idle);

        let end = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break StreamEnd::Cancelled,
                item = event_rx.recv() => match item {
                    Some(Ok(event)) => {
                        if exchange.state == ExchangeState::AwaitingContent {
                            exchange.state = ExchangeState::Streaming;
                            ticker = Some(Ticker::spawn(
                                Arc::clone(&self.sink),
                                card_id.clone(),
                                snapshot_rx.clone(),
                                self.config.tick,
                                self.cancel.clone(),
                            ));
                        }
                        exchange.apply(event);
                        snapshot_tx.send_replace(exchange.snapshot());
                    },
                    Some(Err(e)) => break StreamEnd::Failed(e.into()),
                    None => break StreamEnd::Finished,
                },
                () = &mut idle, if exchange.state == ExchangeState::AwaitingContent => {
                    break StreamEnd::TimedOut;
                },
            }
        };

        if let Some(ticker) = ticker.take() {
            ticker.stop().await;
        }

        let outcome = match end {
            StreamEnd::Finished => match (&mut ai_task).await {
                Ok(()) => self.complete(msg, &card_id, &mut exchange, history).await,
                Err(e) => self.fail(&card_id, &mut exchange, e.into()).await,
            },
            StreamEnd::TimedOut => {
                ai_task.abort();
                warn!(
                    card_id = %card_id,
                    conversation_id = %msg.conversation_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "no provider output before idle timeout"
                );
                self.close_card(&card_id, &StreamUpdate::answer(TIMEOUT_ANSWER))
                    .await;
                ExchangeOutcome::TimedOut
            },
            StreamEnd::Failed(e) => {
                ai_task.abort();
                self.fail(&card_id, &mut exchange, e).await
            },
            // Shutdown abandons the card as it stands; no closing update.
            StreamEnd::Cancelled => {
                ai_task.abort();
                info!(card_id = %card_id, "exchange cancelled by shutdown");
                ExchangeOutcome::Cancelled
            },
        };
        exchange.state = ExchangeState::Done;
        outcome
    }

    async fn open_card(&self, message_id: &str) -> streambot_channels::Result<String> {
        let card_id = with_cancel(&self.cancel, self.sink.create_card()).await?;
        with_cancel(
            &self.cancel,
            self.sink.post_card_reply(message_id, &card_id),
        )
        .await?;
        Ok(card_id)
    }

    async fn complete(
        &self,
        msg: &InboundMessage,
        card_id: &str,
        exchange: &mut Exchange,
        mut history: Vec<ChatMessage>,
    ) -> ExchangeOutcome {
        exchange.state = ExchangeState::Finalizing;
        let final_update = exchange.final_update();
        let pushed = match with_cancel(
            &self.cancel,
            self.sink.update_card_content(card_id, &final_update),
        )
        .await
        {
            Ok(()) => with_cancel(&self.cancel, self.sink.finalize_card(card_id)).await,
            Err(e) => Err(e),
        };
        match pushed {
            Ok(()) => {},
            Err(streambot_channels::Error::Cancelled) => return ExchangeOutcome::Cancelled,
            Err(e) => return self.fail(card_id, exchange, e.into()).await,
        }

        info!(
            user_id = %msg.sender_id,
            conversation_id = %msg.conversation_id,
            request = %serde_json::to_string(&history).unwrap_or_default(),
            response = %exchange.response_log(),
            "exchange completed"
        );
        history.push(ChatMessage::assistant(exchange.answer.clone()));
        self.sessions.set_messages(&msg.conversation_id, history);
        ExchangeOutcome::Completed
    }

    async fn fail(&self, card_id: &str, exchange: &mut Exchange, error: Error) -> ExchangeOutcome {
        exchange.state = ExchangeState::Failed;
        error!(card_id = %card_id, error = %error, "exchange failed");
        exchange.answer = FAILURE_ANSWER.to_string();
        self.close_card(card_id, &StreamUpdate::answer(FAILURE_ANSWER))
            .await;
        ExchangeOutcome::Failed
    }

    /// Best-effort last update and finalize; failures are only logged.
    async fn close_card(&self, card_id: &str, update: &StreamUpdate) {
        if let Err(e) = with_cancel(&self.cancel, self.sink.update_card_content(card_id, update)).await
        {
            warn!(card_id = %card_id, error = %e, "failed to push closing card update");
        }
        if let Err(e) = with_cancel(&self.cancel, self.sink.finalize_card(card_id)).await {
            warn!(card_id = %card_id, error = %e, "failed to finalize card");
        }
    }
}

/// Run a card sink call unless shutdown fires first.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = streambot_channels::Result<T>>,
) -> streambot_channels::Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(streambot_channels::Error::Cancelled),
        result = fut => result,
    }
}

fn spawn_ai_task(
    providers: Arc<ProviderManager>,
    history: Vec<ChatMessage>,
    events: mpsc::Sender<streambot_providers::Result<ProviderEvent>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = providers.stream_chat(history);
        while let Some(item) = stream.next().await {
            let terminal = item.is_err();
            if events.send(item).await.is_err() || terminal {
                break;
            }
        }
    })
}

/// Periodic snapshot pusher for one card.
struct Ticker {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(
        sink: Arc<dyn CardSink>,
        card_id: String,
        snapshots: watch::Receiver<StreamUpdate>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let stop = CancellationToken::new();
        let stopped = stop.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = stopped.cancelled() => break,
                    _ = interval.tick() => {
                        let update = snapshots.borrow().clone();
                        match with_cancel(&cancel, sink.update_card_content(&card_id, &update)).await {
                            Ok(()) => {},
                            Err(streambot_channels::Error::Cancelled) => break,
                            Err(e) => warn!(card_id = %card_id, error = %e, "periodic card update failed"),
                        }
                    },
                }
            }
        });
        Self { stop, handle }
    }

    /// Stop ticking and wait for an in-flight push to finish.
    async fn stop(self) {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "card ticker ended abnormally");
        }
    }
}
