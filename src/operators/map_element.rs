//! The element-map operator: the primitive one-in, one-out transformer.
//!
//! For each unread element `v` on its input stream, the agent invokes the
//! user transformation exactly once, in stream order, and interprets the
//! returned [`Emit`]:
//!
//! 1. [`Emit::Suppress`] - nothing is appended for this element.
//! 2. [`Emit::FanOut`] - each wrapped value is appended in order.
//! 3. [`Emit::Single`] - the value is appended unchanged. `None` (for option
//!    element types) and whole `Vec`s are legitimate single values here.
//!
//! The operator performs no I/O beyond stream reads and writes; side effects
//! of the transformation are the caller's business.
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
//! // Fan out: each input becomes two outputs.
//! map_element(&sched, |v| Emit::many([v, v + 100]), &x, &y);
//!
//! x.extend(0..3);
//! sched.run().await?;
//! assert_eq!(y.recent_values(), vec![0, 100, 1, 101, 2, 102]);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::agent::{
    Agent, AgentContext, AgentError, AgentHandle, AgentOutcome, CursorView, TransformFailure,
};
use crate::emit::Emit;
use crate::scheduler::Scheduler;
use crate::stream::Stream;

/// The agent behind the whole element-map family. Variants differ only in
/// how the constructor wraps the user closure into the canonical fallible
/// shape stored here.
struct ElementMap<T, U, F> {
    name: String,
    input: Stream<T>,
    output: Stream<U>,
    transform: Mutex<F>,
    cursor: AtomicUsize,
    max_batch: Option<NonZeroUsize>,
}

#[async_trait]
impl<T, U, F> Agent for ElementMap<T, U, F>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Result<Emit<U>, TransformFailure> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _ctx: AgentContext) -> Result<AgentOutcome, AgentError> {
        let start = self.cursor.load(Ordering::Acquire);
        // Bounded batches clone only the slice this invocation will consume.
        let (batch, _) = match self.max_batch {
            Some(bound) => self.input.read_batch(start, bound.get()),
            None => self.input.read_from(start),
        };
        if batch.is_empty() {
            return Ok(AgentOutcome::idle());
        }

        let mut consumed = 0usize;
        let mut emitted = 0usize;
        let mut transform = self.transform.lock().expect("transform poisoned");
        for value in batch {
            match (*transform)(value) {
                Ok(Emit::Suppress) => {}
                Ok(Emit::Single(out)) => {
                    self.output.append(out);
                    emitted += 1;
                }
                Ok(Emit::FanOut(outs)) => {
                    emitted += outs.len();
                    self.output.extend(outs);
                }
                Err(source) => {
                    // Cursor stays before the failing element so the next
                    // drain replays it; output from earlier elements stands.
                    self.cursor.store(start + consumed, Ordering::Release);
                    return Err(AgentError::Transform {
                        stream: self.input.name().to_string(),
                        index: start + consumed,
                        source,
                    });
                }
            }
            consumed += 1;
        }
        drop(transform);

        self.cursor.store(start + consumed, Ordering::Release);
        Ok(AgentOutcome {
            consumed,
            emitted,
            more_work: self.input.len() > start + consumed,
        })
    }

    fn cursors(&self) -> Vec<CursorView> {
        vec![CursorView {
            stream: self.input.name().to_string(),
            position: self.cursor.load(Ordering::Acquire),
        }]
    }
}

/// Shared wiring for the whole family: build, register, subscribe, and mark
/// pending if the input already holds unread data.
fn wire<T, U, F>(
    sched: &Scheduler,
    kind: &str,
    transform: F,
    input: &Stream<T>,
    output: &Stream<U>,
) -> AgentHandle
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Result<Emit<U>, TransformFailure> + Send + 'static,
{
    let agent = ElementMap {
        name: format!("{kind}({}->{})", input.name(), output.name()),
        input: input.clone(),
        output: output.clone(),
        transform: Mutex::new(transform),
        cursor: AtomicUsize::new(0),
        max_batch: sched.config().max_batch,
    };
    let handle = sched.register(std::sync::Arc::new(agent));
    input.subscribe(handle.id(), sched.work_queue());
    if !input.is_empty() {
        sched.mark_pending(handle.id());
    }
    handle
}

/// Wire a pure element transformer between `input` and `output`.
///
/// `f` is called once per unread input element, in stream order; its
/// [`Emit`] return decides what lands on `output`. See the module docs for
/// the full contract.
pub fn map_element<T, U, F>(
    sched: &Scheduler,
    mut f: F,
    input: &Stream<T>,
    output: &Stream<U>,
) -> AgentHandle
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Emit<U> + Send + 'static,
{
    wire(
        sched,
        "map_element",
        move |v| Ok::<_, TransformFailure>(f(v)),
        input,
        output,
    )
}

/// Fallible variant of [`map_element`].
///
/// An `Err` from `f` aborts the invocation: the agent's cursor stops before
/// the failing element (output from earlier elements stands), the error
/// propagates out of [`Scheduler::run`], and the element is replayed on the
/// next drain. The runtime performs no retry of its own.
pub fn try_map_element<T, U, E, F>(
    sched: &Scheduler,
    mut f: F,
    input: &Stream<T>,
    output: &Stream<U>,
) -> AgentHandle
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut(T) -> Result<Emit<U>, E> + Send + 'static,
{
    wire(
        sched,
        "try_map_element",
        move |v| f(v).map_err(|e| Box::new(e) as TransformFailure),
        input,
        output,
    )
}

/// Stateful variant of [`map_element`]: `state` is threaded into every call.
///
/// State is passed by mutable reference rather than returned alongside the
/// result; with the fallible variant this keeps the state untouched by a
/// rejected element, so the replay sees what the element saw the first time.
pub fn map_element_with_state<T, U, S, F>(
    sched: &Scheduler,
    mut f: F,
    state: S,
    input: &Stream<T>,
    output: &Stream<U>,
) -> AgentHandle
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    S: Send + 'static,
    F: FnMut(&mut S, T) -> Emit<U> + Send + 'static,
{
    let mut state = state;
    wire(
        sched,
        "map_element_with_state",
        move |v| Ok::<_, TransformFailure>(f(&mut state, v)),
        input,
        output,
    )
}

/// Stateful and fallible variant of [`map_element`].
pub fn try_map_element_with_state<T, U, S, E, F>(
    sched: &Scheduler,
    mut f: F,
    state: S,
    input: &Stream<T>,
    output: &Stream<U>,
) -> AgentHandle
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    S: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut(&mut S, T) -> Result<Emit<U>, E> + Send + 'static,
{
    let mut state = state;
    wire(
        sched,
        "try_map_element_with_state",
        move |v| f(&mut state, v).map_err(|e| Box::new(e) as TransformFailure),
        input,
        output,
    )
}

/// Keep elements matching `predicate`, drop the rest. Built on the same
/// agent as [`map_element`] with a fixed emit policy.
pub fn filter_element<T, P>(
    sched: &Scheduler,
    mut predicate: P,
    input: &Stream<T>,
    output: &Stream<T>,
) -> AgentHandle
where
    T: Clone + Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    wire(
        sched,
        "filter_element",
        move |v| {
            Ok::<_, TransformFailure>(if predicate(&v) {
                Emit::one(v)
            } else {
                Emit::suppress()
            })
        },
        input,
        output,
    )
}

/// Emit every value of the iterator `f` returns, in order - fan-out as a
/// fixed policy.
pub fn flat_map_element<T, U, I, F>(
    sched: &Scheduler,
    mut f: F,
    input: &Stream<T>,
    output: &Stream<U>,
) -> AgentHandle
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    I: IntoIterator<Item = U>,
    F: FnMut(T) -> I + Send + 'static,
{
    wire(
        sched,
        "flat_map_element",
        move |v| Ok::<_, TransformFailure>(Emit::many(f(v))),
        input,
        output,
    )
}
