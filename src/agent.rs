//! The agent abstraction: reactive units invoked by the scheduler.
//!
//! An [`Agent`] sits between streams. When any of its input streams grows, the
//! scheduler marks it pending and - during the next drain - invokes it once.
//! The agent consumes as much unread input as it can, appends whatever its
//! transformation produces to its output stream(s), and reports an
//! [`AgentOutcome`] so the scheduler knows whether to re-enqueue it.
//!
//! Built-in operators ([`crate::operators`]) cover the common shapes; custom
//! agents implement this trait directly and wire themselves with
//! [`Scheduler::register`](crate::scheduler::Scheduler::register) and
//! [`Stream::subscribe`](crate::stream::Stream::subscribe).

use async_trait::async_trait;
use miette::Diagnostic;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::events::{EventEmitter, EventKind};

/// Boxed error type carried out of user transformation functions.
pub type TransformFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identity of a registered agent within its scheduler.
///
/// Ids are dense indices assigned at registration; they are only meaningful
/// to the scheduler that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub(crate) usize);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// A reactive unit of computation bound to input and output streams.
///
/// Implementations own their read cursors: a cursor is monotonically
/// non-decreasing and never exceeds the length of its stream. The scheduler
/// guarantees at most one in-flight invocation per agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Diagnostic name, used in errors, events, and tracing output.
    fn name(&self) -> &str;

    /// Consume currently-unread input and produce output.
    ///
    /// Called by the scheduler only; an invocation sees the input available at
    /// the time it starts and must process its own unread elements in strict
    /// stream order. On error, cursors must be left *before* the failing
    /// element so a later drain replays it.
    async fn invoke(&self, ctx: AgentContext) -> Result<AgentOutcome, AgentError>;

    /// Current cursor positions, one per input stream. Diagnostics only.
    fn cursors(&self) -> Vec<CursorView>;
}

/// Execution context passed to an agent for one invocation.
#[derive(Clone)]
pub struct AgentContext {
    /// Identity assigned at registration.
    pub agent_id: AgentId,
    /// Scheduler-wide invocation counter at the time of this call.
    pub invocation: u64,
    /// Emitter for the scheduler's runtime event tap.
    pub emitter: EventEmitter,
    /// The agent's diagnostic name (mirrors [`Agent::name`]).
    pub agent: String,
}

impl AgentContext {
    /// Emit an agent-scoped diagnostic event enriched with this context's
    /// identity. Best-effort: dropped taps are pruned silently.
    pub fn emit(&self, scope: impl Into<String>, message: impl Into<String>) {
        self.emitter.emit(EventKind::AgentMessage {
            agent: self.agent.clone(),
            scope: scope.into(),
            message: message.into(),
        });
    }
}

/// What one invocation accomplished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentOutcome {
    /// Input elements consumed (cursors advanced) during this invocation.
    pub consumed: usize,
    /// Output values appended during this invocation.
    pub emitted: usize,
    /// True if the agent could make further progress right now and wants to
    /// be re-enqueued (e.g. a bounded batch left unread input behind).
    pub more_work: bool,
}

impl AgentOutcome {
    /// Outcome of an invocation that found nothing to do.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Read-only view of one input cursor, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorView {
    /// Name of the input stream this cursor reads.
    pub stream: String,
    /// Next unread index.
    pub position: usize,
}

/// Errors produced by an agent invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    /// The user transformation function failed on a specific element.
    ///
    /// The agent's cursor stops before `index`, so re-running the scheduler
    /// after the caller fixes state replays that element (at-least-once).
    #[error("transform failed on {stream}[{index}]")]
    #[diagnostic(
        code(rillflow::agent::transform),
        help("The agent's cursor was left before the failing element; fix the underlying cause and call run() again to replay it.")
    )]
    Transform {
        /// Input stream the failing element was read from.
        stream: String,
        /// Absolute index of the failing element in that stream.
        index: usize,
        #[source]
        source: TransformFailure,
    },
}

/// Handle to a registered agent, returned by operator constructors.
///
/// Keeps the agent reachable for inspection; dropping the handle does not
/// unregister the agent (the scheduler's registry keeps it alive).
#[derive(Clone)]
pub struct AgentHandle {
    pub(crate) id: AgentId,
    pub(crate) agent: Arc<dyn Agent>,
}

impl AgentHandle {
    /// Identity within the scheduler that registered this agent.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// The agent's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.agent.name()
    }

    /// Current cursor positions, one per input stream.
    #[must_use]
    pub fn cursors(&self) -> Vec<CursorView> {
        self.agent.cursors()
    }
}

impl fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.id)
            .field("name", &self.agent.name())
            .finish()
    }
}
