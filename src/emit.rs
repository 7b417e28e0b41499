//! The sentinel contract for element transformations.
//!
//! A transformation function does not return its output value directly; it
//! returns an [`Emit`], which tells the runtime what to append to the output
//! stream for the current input element:
//!
//! - [`Emit::Suppress`] - append nothing,
//! - [`Emit::Single`] - append exactly one value, unchanged,
//! - [`Emit::FanOut`] - append each value of a sequence, in order.
//!
//! Because `Emit<T>` is a distinct type from `T`, any legitimate element value
//! remains appendable as a single output - including `None` when the element
//! type is an `Option`, and whole `Vec`s as one structured element. Suppression
//! is expressed only by the `Suppress` variant, never by a magic in-band value.
//!
//! # Examples
//!
//! ```rust
//! use rillflow::Emit;
//!
//! // Pass odd numbers through, drop even ones.
//! let odd_only = |v: i64| if v % 2 == 0 { Emit::suppress() } else { Emit::one(v) };
//! assert!(odd_only(4).is_suppress());
//! assert_eq!(odd_only(3), Emit::Single(3));
//!
//! // Fan out two values per input.
//! let doubled: Emit<i64> = Emit::many([7, 107]);
//! assert_eq!(doubled.len(), 2);
//!
//! // A Vec returned as a *single* element is one structured value, not fan-out.
//! let pair: Emit<Vec<i64>> = Emit::one(vec![7, 107]);
//! assert_eq!(pair.len(), 1);
//! ```

/// Tagged result of a transformation function, selecting what the runtime
/// appends to the output stream for one input element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Emit<T> {
    /// Append nothing for this input element.
    Suppress,
    /// Append exactly one value for this input element.
    Single(T),
    /// Append each value of the sequence, in order, for this input element.
    /// An empty sequence appends nothing (equivalent to `Suppress` in effect,
    /// distinct in intent).
    FanOut(Vec<T>),
}

impl<T> Emit<T> {
    /// Emit nothing for the current element.
    pub fn suppress() -> Self {
        Emit::Suppress
    }

    /// Emit exactly one value.
    pub fn one(value: T) -> Self {
        Emit::Single(value)
    }

    /// Emit each value of the sequence, in order.
    pub fn many(values: impl IntoIterator<Item = T>) -> Self {
        Emit::FanOut(values.into_iter().collect())
    }

    /// True if this result appends nothing to the output stream.
    #[must_use]
    pub fn is_suppress(&self) -> bool {
        matches!(self, Emit::Suppress)
    }

    /// Number of values this result will append to the output stream.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Emit::Suppress => 0,
            Emit::Single(_) => 1,
            Emit::FanOut(values) => values.len(),
        }
    }

    /// True if this result appends no values (suppressed or empty fan-out).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map the carried value(s), preserving the variant.
    pub fn map<U, F>(self, mut f: F) -> Emit<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            Emit::Suppress => Emit::Suppress,
            Emit::Single(value) => Emit::Single(f(value)),
            Emit::FanOut(values) => Emit::FanOut(values.into_iter().map(f).collect()),
        }
    }

    /// Flatten into the sequence of values that would be appended.
    pub fn into_values(self) -> Vec<T> {
        match self {
            Emit::Suppress => Vec::new(),
            Emit::Single(value) => vec![value],
            Emit::FanOut(values) => values,
        }
    }
}

impl<T> From<T> for Emit<T> {
    /// A bare value converts to a single-output result.
    fn from(value: T) -> Self {
        Emit::Single(value)
    }
}
