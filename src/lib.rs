//! # Rillflow: Streaming Dataflow Runtime
//!
//! Rillflow connects named, append-only **streams** with reactive **agents**
//! driven by a FIFO drain **scheduler**. A caller appends values to a stream;
//! every agent subscribed to it becomes pending; a call to
//! [`Scheduler::run`] processes pending agents until the graph quiesces for
//! the data available so far.
//!
//! ## Core Concepts
//!
//! - **Streams**: append-only buffers with independent per-agent read cursors
//! - **Agents**: async units invoked by the scheduler when input is available
//! - **Emit**: the sentinel contract - suppress, single value, or fan-out
//! - **Scheduler**: explicit, isolated registry plus pending queue; no globals
//!
//! ## Quick Start
//!
//! ```rust
//! use rillflow::{map_element, Emit, Scheduler, Stream};
//!
//! # async fn example() -> Result<(), rillflow::RunError> {
//! let sched = Scheduler::new();
//! let x: Stream<i64> = Stream::new("x");
//! let y: Stream<i64> = Stream::new("y");
//!
//! // Keep odd values, drop even ones.
//! map_element(
//!     &sched,
//!     |v| if v % 2 == 0 { Emit::suppress() } else { Emit::one(v) },
//!     &x,
//!     &y,
//! );
//!
//! x.extend(0..10);
//! sched.run().await?;
//! assert_eq!(y.recent_values(), vec![1, 3, 5, 7, 9]);
//!
//! // Append more, drain again: the cursor picks up where it left off.
//! x.extend(10..14);
//! sched.run().await?;
//! assert_eq!(y.recent_values(), vec![1, 3, 5, 7, 9, 11, 13]);
//! # Ok(())
//! # }
//! ```
//!
//! ## The Sentinel Contract
//!
//! A transformation returns [`Emit`], not a bare value:
//!
//! ```rust
//! use rillflow::Emit;
//!
//! fn classify(v: i64) -> Emit<i64> {
//!     match v % 3 {
//!         0 => Emit::suppress(),         // nothing appended
//!         1 => Emit::one(v),             // one value appended
//!         _ => Emit::many([v, v + 100]), // each appended, in order
//!     }
//! }
//! assert_eq!(classify(4).len(), 1);
//! ```
//!
//! Because `Emit<T>` is a separate type, any real value - including `None`
//! for option element types, or a whole `Vec` as one structured element -
//! passes through [`Emit::one`] unchanged. There is no in-band magic value.
//!
//! ## Error Handling
//!
//! A failing transformation stops the drain with its cursor *before* the
//! offending element; the agent stays pending, so fixing the cause and
//! calling [`Scheduler::run`] again replays exactly that element. See
//! [`try_map_element`] and [`RunError`].
//!
//! ## Module Guide
//!
//! - [`stream`] - Append-only streams and the cursor protocol
//! - [`emit`] - The suppress/single/fan-out result type
//! - [`agent`] - The [`Agent`] trait and invocation outcome types
//! - [`operators`] - Element-map family, sliding windows, zip, inspect
//! - [`scheduler`] - Registry, pending queue, and the drain loop
//! - [`events`] - Runtime event tap for observability
//! - [`telemetry`] - `tracing` subscriber helpers

pub mod agent;
pub mod emit;
pub mod events;
pub mod operators;
pub mod scheduler;
pub mod stream;
pub mod telemetry;

pub use agent::{
    Agent, AgentContext, AgentError, AgentHandle, AgentId, AgentOutcome, CursorView,
    TransformFailure,
};
pub use emit::Emit;
pub use events::{EventKind, RuntimeEvent};
pub use operators::{
    WiringError, filter_element, flat_map_element, inspect, map_element, map_element_with_state,
    sliding_window, try_map_element, try_map_element_with_state, zip_map,
};
pub use scheduler::{DrainSummary, RunError, Scheduler, SchedulerConfig, WorkQueue};
pub use stream::Stream;
