use serde::{Deserialize, Serialize};

use crate::Delay;

/// Append-only list of produced delays.
///
/// Insertion order is completion order. Nothing in this type reorders values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSequence {
    values: Vec<Delay>,
}

impl ResultSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, value: Delay) {
        self.values.push(value);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Delay] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<Delay> {
        self.values
    }

    /// Diagnostic check used by callers and tests; the expected outcome for
    /// uniformly drawn delays, but never enforced.
    pub fn is_non_decreasing(&self) -> bool {
        self.values.windows(2).all(|w| w[0] <= w[1])
    }
}

impl From<ResultSequence> for Vec<Delay> {
    fn from(seq: ResultSequence) -> Self {
        seq.values
    }
}
