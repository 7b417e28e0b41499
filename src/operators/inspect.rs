//! Terminal sink operator: observe every element, produce nothing.

use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::agent::{Agent, AgentContext, AgentError, AgentHandle, AgentOutcome, CursorView};
use crate::scheduler::Scheduler;
use crate::stream::Stream;

struct InspectAgent<T, F> {
    name: String,
    input: Stream<T>,
    observe: Mutex<F>,
    cursor: AtomicUsize,
    max_batch: Option<NonZeroUsize>,
}

#[async_trait]
impl<T, F> Agent for InspectAgent<T, F>
where
    T: Clone + Send + 'static,
    F: FnMut(&T) + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _ctx: AgentContext) -> Result<AgentOutcome, AgentError> {
        let start = self.cursor.load(Ordering::Acquire);
        let (batch, _) = match self.max_batch {
            Some(bound) => self.input.read_batch(start, bound.get()),
            None => self.input.read_from(start),
        };
        if batch.is_empty() {
            return Ok(AgentOutcome::idle());
        }

        let mut observe = self.observe.lock().expect("observer poisoned");
        for value in &batch {
            (*observe)(value);
        }
        drop(observe);

        let take = batch.len();
        self.cursor.store(start + take, Ordering::Release);
        Ok(AgentOutcome {
            consumed: take,
            emitted: 0,
            more_work: self.input.len() > start + take,
        })
    }

    fn cursors(&self) -> Vec<CursorView> {
        vec![CursorView {
            stream: self.input.name().to_string(),
            position: self.cursor.load(Ordering::Acquire),
        }]
    }
}

/// Wire a side-effect observer onto `input`. The observer sees each element
/// exactly once, in stream order; nothing flows downstream.
pub fn inspect<T, F>(sched: &Scheduler, observe: F, input: &Stream<T>) -> AgentHandle
where
    T: Clone + Send + 'static,
    F: FnMut(&T) + Send + 'static,
{
    let agent = InspectAgent {
        name: format!("inspect({})", input.name()),
        input: input.clone(),
        observe: Mutex::new(observe),
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
