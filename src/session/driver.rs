//! Conversation sessions with event subscriptions.
//!
//! A [`Session`] owns the conversation history and the tools offered to the engine.
//! Subscribers register with [`Session::on`] and receive every [`SessionEvent`] in
//! emission order. [`Session::send_and_wait`] runs one turn and resolves only after
//! the turn's terminal event has been delivered to every subscriber.

use crate::error::{Result, WeatherAgentError};
use crate::llm::broker::{BrokerEvent, LlmBroker};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmMessage, MessageRole};
use crate::llm::tools::LlmTool;
use crate::session::events::{SessionEvent, SessionEventData};
use futures::stream::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Callback invoked for every session event
pub type EventHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Handle returned by [`Session::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Settings fixed at session creation
pub struct SessionConfig {
    pub model: String,
    pub streaming: bool,
    pub tools: Vec<Box<dyn LlmTool>>,
    pub system_message: Option<String>,
    pub completion: CompletionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            streaming: true,
            tools: Vec::new(),
            system_message: None,
            completion: CompletionConfig::default(),
        }
    }
}

/// A prompt to send in one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOptions {
    pub prompt: String,
}

impl MessageOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

pub struct Session {
    id: Uuid,
    broker: Arc<LlmBroker>,
    tools: Arc<Vec<Box<dyn LlmTool>>>,
    streaming: bool,
    completion: Arc<CompletionConfig>,
    history: Arc<Mutex<Vec<LlmMessage>>>,
    handlers: Arc<RwLock<Vec<(SubscriptionId, EventHandler)>>>,
    next_subscription: AtomicU64,
    turn_in_flight: Arc<AtomicBool>,
}

impl Session {
    /// Create a session against `gateway`.
    ///
    /// Fails with [`WeatherAgentError::ConfigError`] when the model is blank or two
    /// tools share a name.
    pub fn create(gateway: Arc<dyn LlmGateway>, config: SessionConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(WeatherAgentError::ConfigError("model must not be empty".to_string()));
        }

        let mut names = HashSet::new();
        for tool in &config.tools {
            let name = tool.name();
            if !names.insert(name.clone()) {
                return Err(WeatherAgentError::ConfigError(format!(
                    "tool '{}' is registered more than once",
                    name
                )));
            }
        }

        let history = config.system_message.map(LlmMessage::system).into_iter().collect();
        let id = Uuid::new_v4();

        info!(
            session_id = %id,
            model = %config.model,
            streaming = config.streaming,
            tools = config.tools.len(),
            "Session created"
        );

        Ok(Self {
            id,
            broker: Arc::new(LlmBroker::new(config.model, gateway)),
            tools: Arc::new(config.tools),
            streaming: config.streaming,
            completion: Arc::new(config.completion),
            history: Arc::new(Mutex::new(history)),
            handlers: Arc::new(RwLock::new(Vec::new())),
            next_subscription: AtomicU64::new(0),
            turn_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &str {
        self.broker.model()
    }

    /// Subscribe to session events
    pub fn on<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        handlers.len() != before
    }

    /// Snapshot of the committed conversation
    pub async fn history(&self) -> Vec<LlmMessage> {
        self.history.lock().await.clone()
    }

    /// Send a prompt and wait for the turn to finish.
    ///
    /// Returns the text of the turn's final assistant message, if it had any. With
    /// `timeout: None` the call waits as long as the engine and tools take.
    ///
    /// Only one turn may be in flight; a concurrent call fails with
    /// [`WeatherAgentError::SessionError`]. A failed or timed-out turn leaves the
    /// history unchanged.
    pub async fn send_and_wait(
        &self,
        options: MessageOptions,
        timeout: Option<Duration>,
    ) -> Result<Option<String>> {
        if self.turn_in_flight.swap(true, Ordering::SeqCst) {
            return Err(WeatherAgentError::SessionError(
                "a turn is already in progress".to_string(),
            ));
        }
        let mut guard = TurnGuard::new(self.turn_in_flight.clone());

        debug!(session_id = %self.id, "Sending prompt");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();

        let pump = tokio::spawn(pump_events(event_rx, self.handlers.clone(), done_tx));
        guard.track(pump.abort_handle());

        let turn = tokio::spawn(drive_turn(
            self.broker.clone(),
            self.tools.clone(),
            self.completion.clone(),
            self.streaming,
            self.history.clone(),
            options.prompt,
            event_tx,
        ));
        guard.track(turn.abort_handle());

        let signalled = match timeout {
            Some(limit) => tokio::time::timeout(limit, done_rx).await.map_err(|_| {
                WeatherAgentError::TimeoutError(format!(
                    "turn did not finish within {:?}",
                    limit
                ))
            })?,
            None => done_rx.await,
        };

        if signalled.is_err() {
            return Err(WeatherAgentError::SessionError(
                "turn ended without a completion signal".to_string(),
            ));
        }

        turn.await
            .map_err(|e| WeatherAgentError::SessionError(format!("turn task failed: {}", e)))?
    }
}

/// Clears the in-flight flag and stops a turn's tasks when the wait ends, however it ends.
struct TurnGuard {
    flag: Arc<AtomicBool>,
    tasks: Vec<AbortHandle>,
}

impl TurnGuard {
    fn new(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            tasks: Vec::new(),
        }
    }

    fn track(&mut self, task: AbortHandle) {
        self.tasks.push(task);
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Deliver events to subscribers in order, then signal completion after the terminal event.
async fn pump_events(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    handlers: Arc<RwLock<Vec<(SubscriptionId, EventHandler)>>>,
    done: oneshot::Sender<()>,
) {
    let mut done = Some(done);

    while let Some(event) = events.recv().await {
        let snapshot: Vec<EventHandler> = handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &snapshot {
            handler(&event);
        }

        if event.data.is_terminal() {
            if let Some(done) = done.take() {
                let _ = done.send(());
            }
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<SessionEvent>, data: SessionEventData) {
    if events.send(SessionEvent::new(data)).is_err() {
        debug!("Session event dropped; nobody is waiting for this turn");
    }
}

/// Run one turn on the broker, translating its events into session events.
///
/// History is only committed when the turn succeeds.
async fn drive_turn(
    broker: Arc<LlmBroker>,
    tools: Arc<Vec<Box<dyn LlmTool>>>,
    completion: Arc<CompletionConfig>,
    streaming: bool,
    history: Arc<Mutex<Vec<LlmMessage>>>,
    prompt: String,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<Option<String>> {
    let user = LlmMessage::user(prompt);
    let mut messages = history.lock().await.clone();
    messages.push(user.clone());

    let mut appended = vec![user];
    let outcome = relay_turn(
        &broker,
        &tools,
        &completion,
        streaming,
        messages,
        &events,
        &mut appended,
    )
    .await;

    match outcome {
        Ok(final_content) => {
            history.lock().await.extend(appended);
            emit(&events, SessionEventData::SessionIdle);
            Ok(final_content)
        }
        Err(e) => {
            error!(error = %e, "Turn failed");
            emit(
                &events,
                SessionEventData::SessionError {
                    message: e.to_string(),
                },
            );
            Err(e)
        }
    }
}

async fn relay_turn(
    broker: &LlmBroker,
    tools: &[Box<dyn LlmTool>],
    completion: &CompletionConfig,
    streaming: bool,
    messages: Vec<LlmMessage>,
    events: &mpsc::UnboundedSender<SessionEvent>,
    appended: &mut Vec<LlmMessage>,
) -> Result<Option<String>> {
    let mut final_content = None;
    let mut stream = broker.run_turn(messages, tools, completion, streaming);

    while let Some(event) = stream.next().await {
        match event? {
            BrokerEvent::Content(delta_content) => {
                emit(events, SessionEventData::AssistantMessageDelta { delta_content });
            }
            BrokerEvent::ToolCallStarted(call) => {
                emit(
                    events,
                    SessionEventData::ToolExecutionStart {
                        tool_call_id: call.id,
                        tool_name: call.name,
                        arguments: call.arguments,
                    },
                );
            }
            BrokerEvent::ToolCallFinished {
                call,
                success,
                result,
            } => {
                emit(
                    events,
                    SessionEventData::ToolExecutionComplete {
                        tool_call_id: call.id,
                        tool_name: call.name,
                        success,
                        result,
                    },
                );
            }
            BrokerEvent::Message(message) => {
                if message.role == MessageRole::Assistant {
                    if let Some(content) = message.content.as_ref().filter(|c| !c.is_empty()) {
                        emit(
                            events,
                            SessionEventData::AssistantMessage {
                                content: content.clone(),
                            },
                        );
                        final_content = Some(content.clone());
                    }
                }
                appended.push(message);
            }
        }
    }

    Ok(final_content)
}
