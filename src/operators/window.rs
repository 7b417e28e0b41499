//! Sliding-window aggregation over a single input stream.
//!
//! Emits one aggregate per complete window. With window size `w` and step
//! `s`, the first window covers elements `[0, w)`, the second `[s, s + w)`,
//! and so on; the cursor advances by `s` per emitted window, so overlapping
//! elements are re-read from the buffer but never re-consumed. When fewer
//! than `w` elements remain unconsumed the agent simply waits - it reports
//! no further work and is re-invoked when the input grows. Under a
//! [`max_batch`](crate::scheduler::SchedulerConfig::max_batch) bound, one
//! invocation emits at most that many windows and re-enqueues itself while
//! complete windows remain.

use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::agent::{Agent, AgentContext, AgentError, AgentHandle, AgentOutcome, CursorView};
use crate::operators::WiringError;
use crate::scheduler::Scheduler;
use crate::stream::Stream;

struct WindowAgent<T, U, F> {
    name: String,
    input: Stream<T>,
    output: Stream<U>,
    aggregate: Mutex<F>,
    cursor: AtomicUsize,
    window: usize,
    step: usize,
    max_batch: Option<NonZeroUsize>,
}

#[async_trait]
impl<T, U, F> Agent for WindowAgent<T, U, F>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(&[T]) -> U + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _ctx: AgentContext) -> Result<AgentOutcome, AgentError> {
        let start = self.cursor.load(Ordering::Acquire);
        // A bound of b windows needs at most (b - 1) * step + window elements.
        let (buffer, _) = match self.max_batch {
            Some(bound) => self
                .input
                .read_batch(start, (bound.get() - 1) * self.step + self.window),
            None => self.input.read_from(start),
        };
        if buffer.len() < self.window {
            return Ok(AgentOutcome::idle());
        }

        let steps = 1 + (buffer.len() - self.window) / self.step;
        let mut aggregate = self.aggregate.lock().expect("aggregate poisoned");
        let mut outputs = Vec::with_capacity(steps);
        for i in 0..steps {
            let lo = i * self.step;
            outputs.push((*aggregate)(&buffer[lo..lo + self.window]));
        }
        drop(aggregate);
        self.output.extend(outputs);

        let consumed = steps * self.step;
        self.cursor.store(start + consumed, Ordering::Release);
        Ok(AgentOutcome {
            consumed,
            emitted: steps,
            // Anything short of a complete window cannot progress until the
            // input grows; only a batch-limited invocation re-enqueues.
            more_work: self.input.len() - (start + consumed) >= self.window,
        })
    }

    fn cursors(&self) -> Vec<CursorView> {
        vec![CursorView {
            stream: self.input.name().to_string(),
            position: self.cursor.load(Ordering::Acquire),
        }]
    }
}

/// Wire a sliding-window aggregator between `input` and `output`.
///
/// `aggregate` is called once per complete window with a slice of
/// `window_size` consecutive elements; successive windows start `step_size`
/// elements apart. Fails fast on zero sizes.
///
/// ```rust
/// use rillflow::{sliding_window, Scheduler, Stream};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sched = Scheduler::new();
/// let x: Stream<i64> = Stream::new("x");
/// let sums: Stream<i64> = Stream::new("sums");
/// sliding_window(&sched, |w: &[i64]| w.iter().sum(), &x, &sums, 5, 2)?;
///
/// x.extend(0..10);
/// sched.run().await?;
/// assert_eq!(sums.recent_values(), vec![10, 20, 30]);
/// # Ok(())
/// # }
/// ```
pub fn sliding_window<T, U, F>(
    sched: &Scheduler,
    aggregate: F,
    input: &Stream<T>,
    output: &Stream<U>,
    window_size: usize,
    step_size: usize,
) -> Result<AgentHandle, WiringError>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(&[T]) -> U + Send + 'static,
{
    if window_size == 0 {
        return Err(WiringError::ZeroWindow);
    }
    if step_size == 0 {
        return Err(WiringError::ZeroStep);
    }

    let agent = WindowAgent {
        name: format!(
            "sliding_window({}->{}, w={window_size}, s={step_size})",
            input.name(),
            output.name()
        ),
        input: input.clone(),
        output: output.clone(),
        aggregate: Mutex::new(aggregate),
        cursor: AtomicUsize::new(0),
        window: window_size,
        step: step_size,
        max_batch: sched.config().max_batch,
    };
    let handle = sched.register(std::sync::Arc::new(agent));
    input.subscribe(handle.id(), sched.work_queue());
    if !input.is_empty() {
        sched.mark_pending(handle.id());
    }
    Ok(handle)
}
