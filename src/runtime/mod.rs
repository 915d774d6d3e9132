//! Agent runtime adapter: the stateful, in-memory conversation engine behind
//! the turn loop.
//!
//! Runtime sessions are keyed by (app name, user id, session id) and live only
//! in process memory. A process restart forgets them; the durable session
//! store is what survives, and the reconciler re-seeds a fresh runtime session
//! from it. The runtime itself never touches durable storage.

use crate::events::Event;
use anyhow::Result;
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionKey {
    fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// In-memory session snapshot: the live event sequence plus the small
/// string-keyed state map tools write through.
#[derive(Debug, Clone)]
pub struct RuntimeSession {
    pub app_name: String,
    pub user_id: String,
    pub id: String,
    pub events: Vec<Event>,
    pub state: HashMap<String, String>,
}

/// What the runtime hands an agent for one turn.
pub struct TurnRequest {
    pub message: String,
    pub state: HashMap<String, String>,
}

/// What an agent produces for one turn: its events, in order, plus any
/// session-state updates its tools made.
pub struct AgentTurn {
    pub events: Vec<Event>,
    pub state_delta: HashMap<String, String>,
}

/// The conversational brain the runtime drives. Opaque to everything above
/// the runtime adapter.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, request: TurnRequest) -> Result<AgentTurn>;
}

/// Session-management and turn-execution contract of the runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Snapshot of a live session, if the runtime remembers it.
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Option<RuntimeSession>;

    /// Create a session under the given identifier. Callable even when a
    /// durable record with the same identifier already exists; that is how
    /// runtime memory is re-established after a restart.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> RuntimeSession;

    /// Replace a freshly created session's event log with pre-existing
    /// durable history. Refuses a session that already has live events.
    async fn seed_events(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        events: Vec<Event>,
    ) -> Result<()>;

    /// Execute one conversational step. The stream is lazy, finite, and not
    /// restartable; the caller drains it fully before re-reading the session
    /// log.
    fn run_turn(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> BoxStream<'static, Result<Event>>;
}

/// Process-wide in-memory runtime. Constructed once at startup and shared
/// across requests.
pub struct InMemoryRuntime {
    app_name: String,
    agent: Arc<dyn Agent>,
    sessions: Arc<Mutex<HashMap<SessionKey, RuntimeSession>>>,
}

impl InMemoryRuntime {
    pub fn new(app_name: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        Self {
            app_name: app_name.into(),
            agent,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl AgentRuntime for InMemoryRuntime {
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Option<RuntimeSession> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&SessionKey::new(app_name, user_id, session_id))
            .cloned()
    }

    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> RuntimeSession {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(SessionKey::new(app_name, user_id, session_id))
            .or_insert_with(|| RuntimeSession {
                app_name: app_name.to_string(),
                user_id: user_id.to_string(),
                id: session_id.to_string(),
                events: Vec::new(),
                state: HashMap::new(),
            })
            .clone()
    }

    async fn seed_events(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        events: Vec<Event>,
    ) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&SessionKey::new(app_name, user_id, session_id))
            .ok_or_else(|| anyhow::anyhow!("no runtime session {session_id} for {user_id}"))?;
        anyhow::ensure!(
            session.events.is_empty(),
            "refusing to seed session {session_id}: live history present"
        );
        session.events = events;
        Ok(())
    }

    fn run_turn(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> BoxStream<'static, Result<Event>> {
        let key = SessionKey::new(&self.app_name, user_id, session_id);
        let sessions = Arc::clone(&self.sessions);
        let agent = Arc::clone(&self.agent);
        let message = message.to_string();

        try_stream! {
            // Record the caller's message and snapshot state for the agent.
            let state = {
                let mut sessions = sessions.lock().await;
                let session = sessions.get_mut(&key).ok_or_else(|| {
                    anyhow::anyhow!(
                        "no runtime session {} for {}",
                        key.session_id,
                        key.user_id
                    )
                })?;
                session.events.push(Event::user(&message));
                session.state.clone()
            };

            let turn = agent
                .run(TurnRequest {
                    message,
                    state,
                })
                .await?;

            // Append the agent's events to the live log, plus a state-delta
            // marker when its tools updated session state.
            let produced = {
                let mut sessions = sessions.lock().await;
                let session = sessions.get_mut(&key).ok_or_else(|| {
                    anyhow::anyhow!("runtime session {} vanished mid-turn", key.session_id)
                })?;

                let mut produced = turn.events;
                if !turn.state_delta.is_empty() {
                    for (k, v) in &turn.state_delta {
                        session.state.insert(k.clone(), v.clone());
                    }
                    produced.push(Event::state_delta_marker(
                        agent.name(),
                        serde_json::json!(turn.state_delta),
                    ));
                }
                session.events.extend(produced.iter().cloned());
                produced
            };

            for event in produced {
                yield event;
            }
        }
        .boxed()
    }
}
