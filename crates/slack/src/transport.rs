use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use huddle_core::events::{ConnectionStatus, ConnectionStatusEvent, InboundEvent};
use huddle_core::runtime::BotRuntime;

use crate::inbound::EventParser;
use crate::outbound::{deliver, ChatApi};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 500, max_delay_ms: 30_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Raw frame stream from the platform. `next_frame` returning `None`
/// means the server closed the stream cleanly.
#[async_trait]
pub trait RtmTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_frame(&self) -> Result<Option<String>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Stands in where no real connection is configured; the stream closes
/// immediately.
#[derive(Default)]
pub struct NoopRtmTransport;

#[async_trait]
impl RtmTransport for NoopRtmTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_frame(&self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Reconnecting event pump: frames in, parsed events through the runtime,
/// effects out through the chat API. Handler and delivery failures are
/// logged and the loop keeps going; only transport failures trigger the
/// backoff path.
pub struct RtmRunner {
    transport: Arc<dyn RtmTransport>,
    api: Arc<dyn ChatApi>,
    parser: EventParser,
    runtime: BotRuntime,
    reconnect_policy: ReconnectPolicy,
    sweep_interval: Duration,
}

impl RtmRunner {
    pub fn new(
        transport: Arc<dyn RtmTransport>,
        api: Arc<dyn ChatApi>,
        parser: EventParser,
        runtime: BotRuntime,
    ) -> Self {
        Self {
            transport,
            api,
            parser,
            runtime,
            reconnect_policy: ReconnectPolicy::default(),
            sweep_interval: Duration::from_secs(60),
        }
    }

    pub fn with_reconnect_policy(mut self, reconnect_policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = reconnect_policy;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub async fn start(&mut self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "rtm transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "rtm retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&mut self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening rtm connection");
        self.transport.connect().await?;
        info!(attempt, "rtm connected");
        self.dispatch(InboundEvent::ConnectionStatus(ConnectionStatusEvent {
            status: ConnectionStatus::Opened,
            detail: None,
        }))
        .await;

        let transport = Arc::clone(&self.transport);
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = transport.next_frame() => {
                    let Some(raw) = frame? else {
                        info!(attempt, "rtm stream closed");
                        self.dispatch(InboundEvent::ConnectionStatus(ConnectionStatusEvent {
                            status: ConnectionStatus::Closed,
                            detail: None,
                        }))
                        .await;
                        self.transport.disconnect().await?;
                        return Ok(());
                    };

                    match self.parser.parse(&raw) {
                        Ok(Some(event)) => {
                            debug!(
                                event_name = "ingress.rtm.frame_received",
                                kind = event.kind(),
                                "received rtm frame"
                            );
                            self.dispatch(event).await;
                        }
                        Ok(None) => trace!("skipping frame"),
                        Err(error) => warn!(error = %error, "could not parse rtm frame"),
                    }
                }
                _ = sweep.tick() => {
                    let swept = self.runtime.sweep_idle();
                    if !swept.is_empty() {
                        debug!(count = swept.len(), "idle conversations swept");
                    }
                }
            }
        }
    }

    async fn dispatch(&mut self, event: InboundEvent) {
        let kind = event.kind();
        match self.runtime.handle_event(event).await {
            Ok(effects) => {
                if let Err(error) = deliver(self.api.as_ref(), effects).await {
                    warn!(kind, error = %error, "effect delivery failed; continuing rtm loop");
                }
            }
            Err(error) => {
                warn!(kind, error = %error, "event handling failed; continuing rtm loop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use huddle_core::dispatch::{Dispatcher, Outcome};
    use huddle_core::errors::HandlerError;
    use huddle_core::events::{ChannelContext, MessageEvent};
    use huddle_core::pattern::Pattern;
    use huddle_core::reply::{Dialog, Reply};
    use huddle_core::runtime::BotRuntime;

    use crate::inbound::EventParser;
    use crate::outbound::{ApiError, ChatApi};

    use super::{ReconnectPolicy, RtmRunner, RtmTransport, TransportError};

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        frames: VecDeque<Result<Option<String>, TransportError>>,
        connect_attempts: usize,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            frames: Vec<Result<Option<String>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    frames: frames.into(),
                    connect_attempts: 0,
                    disconnect_calls: 0,
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl RtmTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_frame(&self) -> Result<Option<String>, TransportError> {
            let mut state = self.state.lock().await;
            state.frames.pop_front().unwrap_or(Ok(None))
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingApi {
        posts: std::sync::Mutex<Vec<(String, String)>>,
    }

    impl RecordingApi {
        fn posts(&self) -> Vec<(String, String)> {
            self.posts.lock().expect("posts lock").clone()
        }
    }

    #[async_trait]
    impl ChatApi for RecordingApi {
        async fn post_message(&self, channel_id: &str, reply: &Reply) -> Result<(), ApiError> {
            self.posts
                .lock()
                .expect("posts lock")
                .push((channel_id.to_owned(), reply.text.clone().unwrap_or_default()));
            Ok(())
        }

        async fn update_message(
            &self,
            _channel_id: &str,
            _ts: &str,
            _reply: &Reply,
        ) -> Result<(), ApiError> {
            Ok(())
        }

        async fn open_dialog(&self, _trigger_id: &str, _dialog: &Dialog) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn greeting_runtime() -> BotRuntime {
        let dispatcher = Dispatcher::new()
            .hear(
                Pattern::keywords(["hello", "hi"]),
                &[ChannelContext::DirectMessage, ChannelContext::DirectMention],
                |_: &MessageEvent| Ok(Outcome::reply("Yo!")),
            )
            .hear(
                Pattern::keyword("boom"),
                &[ChannelContext::DirectMessage],
                |_: &MessageEvent| Err(HandlerError::Failed("lookup exploded".to_owned())),
            );
        BotRuntime::new(dispatcher)
    }

    fn message_frame(text: &str) -> Result<Option<String>, TransportError> {
        Ok(Some(format!(
            r#"{{"type":"message","channel":"D1","user":"U1","text":"{text}","ts":"1730000000.0001"}}"#
        )))
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure_and_delivers_replies() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![message_frame("hello"), Ok(None)],
        ));
        let api = Arc::new(RecordingApi::default());

        let mut runner = RtmRunner::new(
            transport.clone(),
            api.clone(),
            EventParser::new("UBOT"),
            greeting_runtime(),
        )
        .with_reconnect_policy(ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 });

        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.disconnect_calls().await, 1);
        assert_eq!(api.posts(), vec![("D1".to_owned(), "Yo!".to_owned())]);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));
        let api = Arc::new(RecordingApi::default());

        let mut runner = RtmRunner::new(
            transport.clone(),
            api,
            EventParser::new("UBOT"),
            greeting_runtime(),
        )
        .with_reconnect_policy(ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 });

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn handler_failures_do_not_kill_the_pump() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![message_frame("boom"), message_frame("hello"), Ok(None)],
        ));
        let api = Arc::new(RecordingApi::default());

        let mut runner = RtmRunner::new(
            transport.clone(),
            api.clone(),
            EventParser::new("UBOT"),
            greeting_runtime(),
        )
        .with_reconnect_policy(ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 });

        runner.start().await.expect("runner should keep pumping");
        assert_eq!(api.posts(), vec![("D1".to_owned(), "Yo!".to_owned())]);
    }

    #[tokio::test]
    async fn unparseable_frames_are_logged_and_skipped() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![Ok(Some("not json".to_owned())), message_frame("hello"), Ok(None)],
        ));
        let api = Arc::new(RecordingApi::default());

        let mut runner = RtmRunner::new(
            transport.clone(),
            api.clone(),
            EventParser::new("UBOT"),
            greeting_runtime(),
        );

        runner.start().await.expect("runner should skip bad frames");
        assert_eq!(api.posts(), vec![("D1".to_owned(), "Yo!".to_owned())]);
    }

    #[test]
    fn backoff_grows_exponentially_and_caps_at_the_max_delay() {
        let policy = ReconnectPolicy { max_retries: 10, base_delay_ms: 100, max_delay_ms: 1_000 };
        assert_eq!(policy.backoff(0).as_millis(), 100);
        assert_eq!(policy.backoff(1).as_millis(), 200);
        assert_eq!(policy.backoff(2).as_millis(), 400);
        assert_eq!(policy.backoff(5).as_millis(), 1_000);
        assert_eq!(policy.backoff(63).as_millis(), 1_000);
    }
}
