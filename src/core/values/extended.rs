use crate::core::errors::AbsentValueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sample that is either present or absent in the current step.
///
/// Absence models "no event this step" for time-aware models of
/// computation. User functions only ever see the unwrapped present values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedValue<T> {
    Present(T),
    Absent,
}

impl<T> ExtendedValue<T> {
    /// Wrap a value as present
    pub fn present(value: T) -> Self {
        ExtendedValue::Present(value)
    }

    /// Create an absent sample
    pub fn absent() -> Self {
        ExtendedValue::Absent
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ExtendedValue::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ExtendedValue::Absent)
    }

    /// Extract the present value, failing on absence.
    pub fn unwrap(self) -> Result<T, AbsentValueError> {
        match self {
            ExtendedValue::Present(value) => Ok(value),
            ExtendedValue::Absent => Err(AbsentValueError),
        }
    }

    /// Extract the present value or fall back to `default`
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            ExtendedValue::Present(value) => value,
            ExtendedValue::Absent => default,
        }
    }

    pub fn as_ref(&self) -> ExtendedValue<&T> {
        match self {
            ExtendedValue::Present(value) => ExtendedValue::Present(value),
            ExtendedValue::Absent => ExtendedValue::Absent,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ExtendedValue<U> {
        match self {
            ExtendedValue::Present(value) => ExtendedValue::Present(f(value)),
            ExtendedValue::Absent => ExtendedValue::Absent,
        }
    }

    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> Default for ExtendedValue<T> {
    fn default() -> Self {
        ExtendedValue::Absent
    }
}

impl<T> From<Option<T>> for ExtendedValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => ExtendedValue::Present(v),
            None => ExtendedValue::Absent,
        }
    }
}

impl<T> From<ExtendedValue<T>> for Option<T> {
    fn from(value: ExtendedValue<T>) -> Self {
        match value {
            ExtendedValue::Present(v) => Some(v),
            ExtendedValue::Absent => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for ExtendedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedValue::Present(value) => write!(f, "{}", value),
            ExtendedValue::Absent => write!(f, "_"),
        }
    }
}

/// Unwrap every sample of a step, or report the first absence.
pub fn unwrap_all<T: Clone>(values: &[ExtendedValue<T>]) -> Option<Vec<T>> {
    values
        .iter()
        .map(|value| value.as_ref().into_option().cloned())
        .collect()
}
