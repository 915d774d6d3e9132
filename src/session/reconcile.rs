//! Session reconciliation: aligns the runtime's ephemeral session memory with
//! the durable per-user record around every turn.
//!
//! The durable store is the single source of truth across restarts; the
//! runtime session is a rebuildable cache of it. Per turn: load the durable
//! record, make sure the runtime holds a live session seeded with that
//! history (seeding only a freshly created session, never a live one), run
//! the turn, re-read the runtime's full log, clean it, and overwrite the
//! durable record wholesale.

use crate::error::TurnError;
use crate::events::{self, Event};
use crate::runtime::AgentRuntime;
use crate::session::store::SessionStore;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// What one completed turn hands back to the transport layer: the raw events
/// the runtime produced (bookkeeping included, for rich client display) plus
/// the resolved identifiers.
#[derive(Debug)]
pub struct TurnOutcome {
    pub events: Vec<Event>,
    pub user_id: String,
    pub session_id: String,
}

/// Long-lived reconciliation service, constructed once at startup and shared
/// across requests.
pub struct SessionReconciler {
    app_name: String,
    store: Arc<dyn SessionStore>,
    runtime: Arc<dyn AgentRuntime>,
    // Durable records are keyed by user, so the user id is the lock key.
    // Holding the lock across the whole read-reconcile-write cycle closes
    // the last-writer-wins race between concurrent same-user turns.
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionReconciler {
    pub fn new(
        app_name: impl Into<String>,
        store: Arc<dyn SessionStore>,
        runtime: Arc<dyn AgentRuntime>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            store,
            runtime,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for_user(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .turn_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Execute one turn for `user_id`, reconciling runtime and durable state
    /// before and after.
    pub async fn run_turn(&self, user_id: &str, message: &str) -> Result<TurnOutcome, TurnError> {
        let lock = self.lock_for_user(user_id);
        let _guard = lock.lock().await;

        // 1. Durable record decides the session identifier and prior history.
        let record = self
            .store
            .find_for_user(user_id)
            .await
            .map_err(TurnError::Storage)?;
        let (session_id, previous_events) = match record {
            Some(record) => {
                let previous = record.decode_events();
                (record.id, previous)
            }
            None => (Uuid::new_v4().to_string(), Vec::new()),
        };

        // 2. Make sure the runtime holds a live session. Seed durable history
        //    only into a session we just created; a live session already has
        //    the authoritative in-flight log.
        let live = self
            .runtime
            .get_session(&self.app_name, user_id, &session_id)
            .await;
        if live.is_none() {
            self.runtime
                .create_session(&self.app_name, user_id, &session_id)
                .await;
            if !previous_events.is_empty() {
                tracing::info!(
                    %user_id,
                    %session_id,
                    events = previous_events.len(),
                    "restoring runtime session from durable history"
                );
                self.runtime
                    .seed_events(&self.app_name, user_id, &session_id, previous_events)
                    .await
                    .map_err(|error| TurnError::Runtime(error.to_string()))?;
            }
        }

        // 3. Run the turn, draining the full event sequence.
        let mut stream = self.runtime.run_turn(user_id, &session_id, message);
        let mut turn_events = Vec::new();
        while let Some(event) = stream.next().await {
            turn_events.push(event.map_err(|error| TurnError::Runtime(error.to_string()))?);
        }
        drop(stream);

        // 4–6. Re-read the runtime's full post-turn log, clean it, and
        //      overwrite the durable record. Last writer wins by design.
        if let Some(updated) = self
            .runtime
            .get_session(&self.app_name, user_id, &session_id)
            .await
        {
            let cleaned = events::clean_events(&updated.events);
            let encoded = events::encode_events(&cleaned)
                .map_err(|error| TurnError::Storage(error.into()))?;
            self.store
                .upsert(&session_id, user_id, &encoded)
                .await
                .map_err(TurnError::Storage)?;
        }

        Ok(TurnOutcome {
            events: turn_events,
            user_id: user_id.to_string(),
            session_id,
        })
    }
}
