//! Parameter storage owned by the adapter.

use std::ops::Index;

/// Parameter values substituted into the model equations.
///
/// `derived` holds the common subexpressions of the parameters computed
/// once when the adapter is constructed. There is no mutable access, so the
/// derived values always match the parameters they were computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters<T> {
    values: Vec<T>,
    extra: Vec<T>,
    derived: Vec<T>,
}

impl<T> Parameters<T> {
    pub(crate) fn new(values: Vec<T>, extra: Vec<T>, derived: Vec<T>) -> Self {
        Self {
            values,
            extra,
            derived,
        }
    }

    /// Primary parameters, in model order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Model-specific extra parameters.
    pub fn extra(&self) -> &[T] {
        &self.extra
    }

    /// Cached pure functions of the primary and extra parameters.
    pub fn derived(&self) -> &[T] {
        &self.derived
    }
}

/// Indexes the primary parameters.
impl<T> Index<usize> for Parameters<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}
