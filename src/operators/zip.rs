//! Two-input merge: pairwise combination in arrival order.
//!
//! The agent wakes whenever either input grows, combines as many pairs as
//! both sides can supply, and leaves the longer side's surplus unread. A
//! lone surplus cannot progress until the other input grows, which re-marks
//! the agent pending anyway; only an invocation cut short by the
//! [`max_batch`](crate::scheduler::SchedulerConfig::max_batch) bound asks to
//! be re-enqueued.

use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::agent::{Agent, AgentContext, AgentError, AgentHandle, AgentOutcome, CursorView};
use crate::scheduler::Scheduler;
use crate::stream::Stream;

struct ZipAgent<A, B, O, F> {
    name: String,
    left: Stream<A>,
    right: Stream<B>,
    output: Stream<O>,
    combine: Mutex<F>,
    left_cursor: AtomicUsize,
    right_cursor: AtomicUsize,
    max_batch: Option<NonZeroUsize>,
}

#[async_trait]
impl<A, B, O, F> Agent for ZipAgent<A, B, O, F>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    O: Send + 'static,
    F: FnMut(A, B) -> O + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _ctx: AgentContext) -> Result<AgentOutcome, AgentError> {
        let lc = self.left_cursor.load(Ordering::Acquire);
        let rc = self.right_cursor.load(Ordering::Acquire);
        let (left, right) = match self.max_batch {
            Some(bound) => (
                self.left.read_batch(lc, bound.get()).0,
                self.right.read_batch(rc, bound.get()).0,
            ),
            None => (self.left.read_from(lc).0, self.right.read_from(rc).0),
        };
        let pairs = left.len().min(right.len());
        if pairs == 0 {
            return Ok(AgentOutcome::idle());
        }

        let mut combine = self.combine.lock().expect("combiner poisoned");
        let mut outputs = Vec::with_capacity(pairs);
        for (a, b) in left.into_iter().take(pairs).zip(right) {
            outputs.push((*combine)(a, b));
        }
        drop(combine);
        self.output.extend(outputs);

        let (lc, rc) = (lc + pairs, rc + pairs);
        self.left_cursor.store(lc, Ordering::Release);
        self.right_cursor.store(rc, Ordering::Release);
        Ok(AgentOutcome {
            consumed: pairs * 2,
            emitted: pairs,
            // A batch-limited invocation leaves complete pairs behind.
            more_work: (self.left.len() - lc).min(self.right.len() - rc) > 0,
        })
    }

    fn cursors(&self) -> Vec<CursorView> {
        vec![
            CursorView {
                stream: self.left.name().to_string(),
                position: self.left_cursor.load(Ordering::Acquire),
            },
            CursorView {
                stream: self.right.name().to_string(),
                position: self.right_cursor.load(Ordering::Acquire),
            },
        ]
    }
}

/// Wire a pairwise combiner over two inputs.
///
/// Element `i` of `output` is `combine(left[i], right[i])`; each invocation
/// combines the pairwise minimum of unread input and leaves the rest for
/// later.
///
/// ```rust
/// use rillflow::{zip_map, Scheduler, Stream};
///
/// # async fn example() -> Result<(), rillflow::RunError> {
/// let sched = Scheduler::new();
/// let x: Stream<f64> = Stream::new("x");
/// let y: Stream<f64> = Stream::new("y");
/// let z: Stream<(f64, f64)> = Stream::new("z");
/// zip_map(&sched, |a, b| (a, b), &x, &y, &z);
///
/// x.extend([0.0, 1.0, 2.0]);
/// sched.run().await?;
/// assert!(z.is_empty()); // right side still empty
///
/// y.extend([100.0, 101.0]);
/// sched.run().await?;
/// assert_eq!(z.recent_values(), vec![(0.0, 100.0), (1.0, 101.0)]);
/// # Ok(())
/// # }
/// ```
pub fn zip_map<A, B, O, F>(
    sched: &Scheduler,
    combine: F,
    left: &Stream<A>,
    right: &Stream<B>,
    output: &Stream<O>,
) -> AgentHandle
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    O: Send + 'static,
    F: FnMut(A, B) -> O + Send + 'static,
{
    let agent = ZipAgent {
        name: format!(
            "zip_map({}+{}->{})",
            left.name(),
            right.name(),
            output.name()
        ),
        left: left.clone(),
        right: right.clone(),
        output: output.clone(),
        combine: Mutex::new(combine),
        left_cursor: AtomicUsize::new(0),
        right_cursor: AtomicUsize::new(0),
        max_batch: sched.config().max_batch,
    };
    let handle = sched.register(std::sync::Arc::new(agent));
    left.subscribe(handle.id(), sched.work_queue());
    right.subscribe(handle.id(), sched.work_queue());
    if !left.is_empty() || !right.is_empty() {
        sched.mark_pending(handle.id());
    }
    handle
}
