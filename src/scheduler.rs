//! The drain scheduler: registry, pending-work queue, and `run()`.
//!
//! A [`Scheduler`] is an explicit object with its own agent registry and
//! FIFO pending queue - there is no process-global state, so a test harness
//! can instantiate an isolated scheduler per test and two schedulers never
//! interfere.
//!
//! # Scheduling model
//!
//! Appending to a stream marks every subscribed agent pending (idempotently:
//! an agent appears in the queue at most once no matter how much unread input
//! it has). [`Scheduler::run`] pops pending agents in FIFO order and awaits
//! each invocation to completion before starting the next - one logical
//! thread of control, no interleaving between agents. An invocation consumes
//! the input visible when it starts; output it appends may mark other agents
//! (or the agent itself) pending, and the drain continues until the queue is
//! empty: a *local* fixed point for the data available at call time plus
//! whatever the drain produced. Callers invoke `run()` again after appending
//! more external input.
//!
//! FIFO across distinct agents is the documented fairness policy: an agent
//! with pending input is never starved, and re-enqueued agents go to the back
//! of the queue.
//!
//! # Examples
//!
//! ```rust
//! use rillflow::{map_element, Emit, Scheduler, Stream};
//!
//! # async fn example() -> Result<(), rillflow::RunError> {
//! let sched = Scheduler::new();
//! let x: Stream<i64> = Stream::new("x");
//! let y: Stream<i64> = Stream::new("y");
//!
//! map_element(&sched, |v| if v % 2 == 0 { Emit::suppress() } else { Emit::one(v) }, &x, &y);
//!
//! x.extend(0..10);
//! let summary = sched.run().await?;
//! assert_eq!(summary.consumed, 10);
//! assert_eq!(y.recent_values(), vec![1, 3, 5, 7, 9]);
//!
//! // Idempotent: nothing new appended, nothing happens.
//! assert_eq!(sched.run().await?.invocations, 0);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::instrument;

use crate::agent::{Agent, AgentContext, AgentError, AgentHandle, AgentId};
use crate::events::{EventEmitter, EventKind, RuntimeEvent};

/// The scheduler's pending-work queue: a FIFO over agent identities with
/// at-most-once membership.
///
/// Streams hold a clone per subscriber so appends can mark agents pending;
/// the handle is opaque and cheap to clone.
#[derive(Clone, Default)]
pub struct WorkQueue {
    state: Arc<Mutex<QueueState>>,
}

#[derive(Default)]
struct QueueState {
    order: VecDeque<AgentId>,
    queued: FxHashSet<AgentId>,
}

impl WorkQueue {
    /// Mark an agent as having pending input. Idempotent: re-signaling an
    /// already-pending agent is a no-op.
    pub fn mark_pending(&self, agent: AgentId) {
        let mut state = self.state.lock().expect("work queue poisoned");
        if state.queued.insert(agent) {
            state.order.push_back(agent);
        }
    }

    fn pop(&self) -> Option<AgentId> {
        let mut state = self.state.lock().expect("work queue poisoned");
        let agent = state.order.pop_front()?;
        state.queued.remove(&agent);
        Some(agent)
    }

    /// Number of distinct agents currently pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expect("work queue poisoned").order.len()
    }

    /// True if no agent is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tunables for a scheduler.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchedulerConfig {
    /// Upper bound on work a built-in operator performs per invocation:
    /// input elements for the element-wise operators and `inspect`, complete
    /// windows for `sliding_window`, pairs for `zip_map`. `None` (the
    /// default) processes the whole unread backlog in one call; with a
    /// bound, an agent that leaves work behind is re-enqueued at the back of
    /// the queue so its neighbors get a turn in between.
    pub max_batch: Option<NonZeroUsize>,
    /// Upper bound on agent invocations within a single drain. `None` (the
    /// default) trusts the dataflow to quiesce; set it to bound feedback
    /// cycles that keep producing their own input.
    pub invocation_limit: Option<u64>,
}

/// What a drain accomplished before reaching its fixed point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Agent invocations performed.
    pub invocations: u64,
    /// Total input elements consumed across all invocations.
    pub consumed: u64,
    /// Total output values appended across all invocations.
    pub emitted: u64,
}

impl DrainSummary {
    /// True if the drain found nothing to do.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.invocations == 0
    }
}

/// Errors returned by [`Scheduler::run`].
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    /// An agent invocation failed. The agent is left pending with its cursor
    /// before the failing element; no automatic retry is performed.
    #[error("agent `{agent}` failed during drain")]
    #[diagnostic(
        code(rillflow::scheduler::agent),
        help("The failing agent is still pending; fix the underlying cause and call run() again to replay the element.")
    )]
    Agent {
        /// Diagnostic name of the failing agent.
        agent: String,
        #[source]
        source: AgentError,
    },

    /// The drain performed more invocations than the configured limit allows.
    #[error("drain exceeded the configured invocation limit of {limit}")]
    #[diagnostic(
        code(rillflow::scheduler::invocation_limit),
        help("A feedback cycle may be producing its own input forever; break the cycle or raise SchedulerConfig::invocation_limit.")
    )]
    InvocationLimit { limit: u64 },
}

/// Coordinates agents over streams: registration, pending-work bookkeeping,
/// and the synchronous drain.
///
/// Cloning a `Scheduler` clones a handle to the same registry and queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    config: SchedulerConfig,
    agents: Mutex<Vec<Arc<dyn Agent>>>,
    queue: WorkQueue,
    emitter: EventEmitter,
    invocations: AtomicU64,
}

impl Scheduler {
    /// A scheduler with default configuration (unbounded batches, no
    /// invocation limit).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler with explicit tunables.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                emitter: EventEmitter::new(),
                ..Default::default()
            }),
        }
    }

    /// The configuration this scheduler was built with.
    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }

    /// Add an agent to the registry and return its handle.
    ///
    /// Registration alone does not wire dataflow: callers (normally operator
    /// constructors) also [`subscribe`](crate::stream::Stream::subscribe) the
    /// agent to its input streams and, if those streams already hold unread
    /// data, [`mark_pending`](Self::mark_pending) it.
    pub fn register(&self, agent: Arc<dyn Agent>) -> AgentHandle {
        let mut agents = self.inner.agents.lock().expect("agent registry poisoned");
        let id = AgentId(agents.len());
        tracing::debug!(agent = agent.name(), %id, "agent registered");
        agents.push(Arc::clone(&agent));
        AgentHandle { id, agent }
    }

    /// A handle to this scheduler's pending-work queue, for wiring stream
    /// subscriptions.
    #[must_use]
    pub fn work_queue(&self) -> WorkQueue {
        self.inner.queue.clone()
    }

    /// Mark an agent pending. Idempotent.
    pub fn mark_pending(&self, agent: AgentId) {
        self.inner.queue.mark_pending(agent);
    }

    /// Number of distinct agents currently pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// True if no agent has pending input.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.inner.queue.is_empty()
    }

    /// Attach a tap that receives every [`RuntimeEvent`] this scheduler emits.
    pub fn tap_events(&self) -> flume::Receiver<RuntimeEvent> {
        self.inner.emitter.tap()
    }

    /// Drain all pending work to a local fixed point.
    ///
    /// Pops pending agents FIFO and invokes each once; agents that report
    /// `more_work` (bounded batches) or that are re-marked pending by appends
    /// during the drain go to the back of the queue. Returns when the queue
    /// is empty.
    ///
    /// On an agent error the drain stops immediately: the failing agent stays
    /// pending with its cursor before the failing element, agents behind it in
    /// the queue stay pending, and a later `run()` resumes where this one
    /// stopped.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<DrainSummary, RunError> {
        let mut summary = DrainSummary::default();
        if self.inner.queue.is_empty() {
            return Ok(summary);
        }
        self.inner.emitter.emit(EventKind::DrainStarted {
            pending: self.inner.queue.len(),
        });

        while let Some(id) = self.inner.queue.pop() {
            let agent = {
                let agents = self.inner.agents.lock().expect("agent registry poisoned");
                agents.get(id.0).cloned()
            };
            // Ids are dense and issued by this registry; a miss would mean a
            // foreign id was marked pending by hand. Skip it.
            let Some(agent) = agent else { continue };

            if let Some(limit) = self.inner.config.invocation_limit
                && summary.invocations >= limit
            {
                self.inner.queue.mark_pending(id);
                return Err(RunError::InvocationLimit { limit });
            }

            let invocation = self.inner.invocations.fetch_add(1, Ordering::Relaxed) + 1;
            let ctx = AgentContext {
                agent_id: id,
                invocation,
                emitter: self.inner.emitter.clone(),
                agent: agent.name().to_string(),
            };

            match agent.invoke(ctx).await {
                Ok(outcome) => {
                    summary.invocations += 1;
                    summary.consumed += outcome.consumed as u64;
                    summary.emitted += outcome.emitted as u64;
                    tracing::debug!(
                        agent = agent.name(),
                        invocation,
                        consumed = outcome.consumed,
                        emitted = outcome.emitted,
                        more_work = outcome.more_work,
                        "agent invoked"
                    );
                    self.inner.emitter.emit(EventKind::AgentInvoked {
                        agent: agent.name().to_string(),
                        invocation,
                        consumed: outcome.consumed,
                        emitted: outcome.emitted,
                    });
                    if outcome.more_work {
                        self.inner.queue.mark_pending(id);
                    }
                }
                Err(source) => {
                    self.inner.queue.mark_pending(id);
                    tracing::warn!(
                        agent = agent.name(),
                        error = %source,
                        "agent failed; left pending for replay"
                    );
                    self.inner.emitter.emit(EventKind::AgentFailed {
                        agent: agent.name().to_string(),
                        error: source.to_string(),
                    });
                    return Err(RunError::Agent {
                        agent: agent.name().to_string(),
                        source,
                    });
                }
            }
        }

        tracing::debug!(
            invocations = summary.invocations,
            consumed = summary.consumed,
            emitted = summary.emitted,
            "drain completed"
        );
        self.inner.emitter.emit(EventKind::DrainCompleted {
            invocations: summary.invocations,
            consumed: summary.consumed,
            emitted: summary.emitted,
        });
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_pending_is_idempotent() {
        let queue = WorkQueue::default();
        queue.mark_pending(AgentId(0));
        queue.mark_pending(AgentId(0));
        queue.mark_pending(AgentId(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(AgentId(0)));
        assert_eq!(queue.pop(), Some(AgentId(1)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn popped_agents_can_requeue() {
        let queue = WorkQueue::default();
        queue.mark_pending(AgentId(3));
        assert_eq!(queue.pop(), Some(AgentId(3)));
        queue.mark_pending(AgentId(3));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn idle_run_returns_immediately() {
        let sched = Scheduler::new();
        let summary = sched.run().await.expect("idle drain");
        assert!(summary.is_noop());
    }
}
