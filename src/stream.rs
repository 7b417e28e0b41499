//! Named, append-only value streams with independent reader cursors.
//!
//! A [`Stream`] is the buffer between agents: one side appends values, any
//! number of agents read them through private cursors. Values are never
//! mutated, reordered, or removed - once a value lands at index *i* it stays
//! at index *i* for the stream's lifetime.
//!
//! Handles are cheap `Arc` clones; the underlying buffer is dropped when the
//! last handle (caller- or agent-held) goes away. Appends additionally signal
//! the work queue of every subscribed agent so the scheduler knows who has
//! pending input.
//!
//! # Examples
//!
//! ```rust
//! use rillflow::Stream;
//!
//! let x: Stream<i64> = Stream::new("x");
//! x.extend(0..3);
//! x.append(3);
//!
//! assert_eq!(x.len(), 4);
//! assert_eq!(x.recent_values(), vec![0, 1, 2, 3]);
//!
//! // Cursor protocol: read everything since a prior position.
//! let (values, cursor) = x.read_from(2);
//! assert_eq!(values, vec![2, 3]);
//! assert_eq!(cursor, 4);
//!
//! // No new data: empty read, cursor unchanged.
//! let (values, cursor) = x.read_from(cursor);
//! assert!(values.is_empty());
//! assert_eq!(cursor, 4);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::agent::AgentId;
use crate::scheduler::WorkQueue;

/// Handle to a named, append-only sequence of values.
///
/// Cloning a `Stream` clones the handle, not the buffer: all clones append to
/// and read from the same underlying sequence.
pub struct Stream<T> {
    inner: Arc<StreamInner<T>>,
}

struct StreamInner<T> {
    name: String,
    values: Mutex<Vec<T>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

/// An agent's standing interest in a stream: appends mark it pending on the
/// queue it was registered with.
struct Subscriber {
    agent: AgentId,
    queue: WorkQueue,
}

impl<T> Stream<T> {
    /// Create an empty stream. The name is for diagnostics only; it need not
    /// be unique.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                name: name.into(),
                values: Mutex::new(Vec::new()),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Diagnostic name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of values ever appended. Monotonically non-decreasing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values.lock().expect("stream buffer poisoned").len()
    }

    /// True if nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one value and signal every subscribed agent's work queue.
    ///
    /// Appending is always accepted; the buffer grows without bound (a
    /// documented tradeoff - callers bound input rates in long-running
    /// deployments).
    pub fn append(&self, value: T) {
        let len = {
            let mut values = self.inner.values.lock().expect("stream buffer poisoned");
            values.push(value);
            values.len()
        };
        tracing::trace!(stream = %self.inner.name, len, "append");
        self.notify_subscribers();
    }

    /// Append each value in order. Equivalent to repeated [`append`](Self::append)
    /// but signals subscribers once per call; an empty batch does not signal.
    pub fn extend(&self, values: impl IntoIterator<Item = T>) {
        let (appended, len) = {
            let mut buffer = self.inner.values.lock().expect("stream buffer poisoned");
            let before = buffer.len();
            buffer.extend(values);
            (buffer.len() - before, buffer.len())
        };
        if appended == 0 {
            return;
        }
        tracing::trace!(stream = %self.inner.name, appended, len, "extend");
        self.notify_subscribers();
    }

    /// Register an agent so appends to this stream mark it pending on `queue`.
    ///
    /// Operator constructors call this internally; it is public so callers can
    /// wire custom [`Agent`](crate::agent::Agent) implementations on the same
    /// primitives.
    pub fn subscribe(&self, agent: AgentId, queue: WorkQueue) {
        self.inner
            .subscribers
            .lock()
            .expect("stream subscribers poisoned")
            .push(Subscriber { agent, queue });
    }

    fn notify_subscribers(&self) {
        let subscribers = self
            .inner
            .subscribers
            .lock()
            .expect("stream subscribers poisoned");
        for sub in subscribers.iter() {
            sub.queue.mark_pending(sub.agent);
        }
    }
}

impl<T: Clone> Stream<T> {
    /// All values appended since `cursor`, in order, plus the updated cursor
    /// (the current length). Never blocks; with no new data, returns an empty
    /// vector and `cursor` unchanged.
    pub fn read_from(&self, cursor: usize) -> (Vec<T>, usize) {
        let values = self.inner.values.lock().expect("stream buffer poisoned");
        if cursor >= values.len() {
            return (Vec::new(), cursor);
        }
        (values[cursor..].to_vec(), values.len())
    }

    /// At most `limit` values appended since `cursor`, in order, plus the
    /// cursor after them. Same contract as [`read_from`](Self::read_from)
    /// otherwise; values past the limit are not cloned.
    pub fn read_batch(&self, cursor: usize, limit: usize) -> (Vec<T>, usize) {
        let values = self.inner.values.lock().expect("stream buffer poisoned");
        if cursor >= values.len() || limit == 0 {
            return (Vec::new(), cursor);
        }
        let end = values.len().min(cursor + limit);
        (values[cursor..end].to_vec(), end)
    }

    /// Snapshot of every value currently in the stream.
    ///
    /// Read-only inspection surface for callers and tests; not part of the
    /// dataflow graph and does not touch any cursor.
    #[must_use]
    pub fn recent_values(&self) -> Vec<T> {
        self.inner.values.lock().expect("stream buffer poisoned").clone()
    }
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .finish()
    }
}
