//! Operator constructors: prebuilt agents wired between streams.
//!
//! Every operator here is an [`Agent`](crate::agent::Agent) implementation
//! plus a constructor that registers it with a scheduler and subscribes it to
//! its input stream(s). The element-map family is the primitive the rest of
//! the crate is specified around; the others are built on the same seams and
//! double as examples for writing custom operators.
//!
//! - [`map_element`] / [`try_map_element`] / [`map_element_with_state`] /
//!   [`try_map_element_with_state`] - one input, one output, one
//!   [`Emit`](crate::emit::Emit) decision per element.
//! - [`filter_element`], [`flat_map_element`] - thin wrappers over the same
//!   agent with a fixed emit policy.
//! - [`inspect`] - terminal sink: observe elements, produce nothing.
//! - [`sliding_window`] - overlapping window aggregation over one input.
//! - [`zip_map`] - pairwise combination of two inputs.

use miette::Diagnostic;
use thiserror::Error;

mod inspect;
mod map_element;
mod window;
mod zip;

pub use inspect::inspect;
pub use map_element::{
    filter_element, flat_map_element, map_element, map_element_with_state, try_map_element,
    try_map_element_with_state,
};
pub use window::sliding_window;
pub use zip::zip_map;

/// Fail-fast construction errors for operator wiring.
#[derive(Debug, Error, Diagnostic)]
pub enum WiringError {
    /// A window operator was given a zero window size.
    #[error("window size must be nonzero")]
    #[diagnostic(code(rillflow::operators::zero_window))]
    ZeroWindow,

    /// A window operator was given a zero step size.
    #[error("step size must be nonzero")]
    #[diagnostic(code(rillflow::operators::zero_step))]
    ZeroStep,
}
