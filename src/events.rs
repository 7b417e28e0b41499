//! Runtime event tap for observing drains without instrumenting user code.
//!
//! The scheduler broadcasts a [`RuntimeEvent`] for every significant moment of
//! a drain - start, each agent invocation, failures, completion - plus any
//! agent-scoped diagnostics emitted through
//! [`AgentContext::emit`](crate::agent::AgentContext::emit). Consumers call
//! [`Scheduler::tap_events`](crate::scheduler::Scheduler::tap_events) to get a
//! `flume` receiver; any number of taps may be attached, each sees every
//! event, and a dropped receiver is pruned on the next emission.
//!
//! Events carry UTC timestamps and serialize with `serde`, so a tap can feed a
//! log sink, a test assertion, or a wire format directly.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamped occurrence inside the runtime.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeEvent {
    /// When the event was recorded.
    pub at: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

/// The kinds of runtime events a drain can produce.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    /// A drain began with this many agents pending.
    DrainStarted { pending: usize },
    /// An agent was invoked once and succeeded.
    AgentInvoked {
        agent: String,
        invocation: u64,
        consumed: usize,
        emitted: usize,
    },
    /// An agent invocation failed; the drain stopped and returned the error.
    AgentFailed { agent: String, error: String },
    /// An agent emitted a scoped diagnostic through its context.
    AgentMessage {
        agent: String,
        scope: String,
        message: String,
    },
    /// A drain reached its local fixed point.
    DrainCompleted {
        invocations: u64,
        consumed: u64,
        emitted: u64,
    },
}

impl RuntimeEvent {
    /// Wrap an [`EventKind`] with the current UTC time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }

    /// The agent this event concerns, if any.
    #[must_use]
    pub fn agent(&self) -> Option<&str> {
        match &self.kind {
            EventKind::AgentInvoked { agent, .. }
            | EventKind::AgentFailed { agent, .. }
            | EventKind::AgentMessage { agent, .. } => Some(agent),
            EventKind::DrainStarted { .. } | EventKind::DrainCompleted { .. } => None,
        }
    }

    /// Convert to a normalized JSON object for sink consumption.
    ///
    /// ```rust
    /// use rillflow::events::{EventKind, RuntimeEvent};
    ///
    /// let event = RuntimeEvent::now(EventKind::DrainStarted { pending: 2 });
    /// let json = event.to_json_value();
    /// assert_eq!(json["type"], "drain_started");
    /// assert_eq!(json["pending"], 2);
    /// ```
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::json;

        let mut value = match &self.kind {
            EventKind::DrainStarted { pending } => json!({
                "type": "drain_started",
                "pending": pending,
            }),
            EventKind::AgentInvoked {
                agent,
                invocation,
                consumed,
                emitted,
            } => json!({
                "type": "agent_invoked",
                "agent": agent,
                "invocation": invocation,
                "consumed": consumed,
                "emitted": emitted,
            }),
            EventKind::AgentFailed { agent, error } => json!({
                "type": "agent_failed",
                "agent": agent,
                "error": error,
            }),
            EventKind::AgentMessage {
                agent,
                scope,
                message,
            } => json!({
                "type": "agent_message",
                "agent": agent,
                "scope": scope,
                "message": message,
            }),
            EventKind::DrainCompleted {
                invocations,
                consumed,
                emitted,
            } => json!({
                "type": "drain_completed",
                "invocations": invocations,
                "consumed": consumed,
                "emitted": emitted,
            }),
        };
        value["timestamp"] = json!(self.at.to_rfc3339());
        value
    }
}

impl fmt::Display for RuntimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::DrainStarted { pending } => {
                write!(f, "drain started ({pending} pending)")
            }
            EventKind::AgentInvoked {
                agent,
                invocation,
                consumed,
                emitted,
            } => write!(
                f,
                "[{agent}@{invocation}] consumed {consumed}, emitted {emitted}"
            ),
            EventKind::AgentFailed { agent, error } => write!(f, "[{agent}] failed: {error}"),
            EventKind::AgentMessage {
                agent,
                scope,
                message,
            } => write!(f, "[{agent}/{scope}] {message}"),
            EventKind::DrainCompleted {
                invocations,
                consumed,
                emitted,
            } => write!(
                f,
                "drain completed: {invocations} invocations, {consumed} consumed, {emitted} emitted"
            ),
        }
    }
}

/// Shared broadcast surface for runtime events.
///
/// Held by the scheduler and handed to agents through their context. Cloning
/// shares the tap list.
#[derive(Clone, Default)]
pub struct EventEmitter {
    taps: Arc<Mutex<Vec<flume::Sender<RuntimeEvent>>>>,
}

impl EventEmitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Attach a new tap. Every subsequent event is delivered to it until the
    /// receiver is dropped.
    pub fn tap(&self) -> flume::Receiver<RuntimeEvent> {
        let (tx, rx) = flume::unbounded();
        self.taps.lock().expect("event taps poisoned").push(tx);
        rx
    }

    /// Broadcast an event to all live taps, pruning disconnected ones.
    pub fn emit(&self, kind: EventKind) {
        let mut taps = self.taps.lock().expect("event taps poisoned");
        if taps.is_empty() {
            return;
        }
        let event = RuntimeEvent::now(kind);
        taps.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
