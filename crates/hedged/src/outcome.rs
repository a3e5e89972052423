// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// The result of a hedged call.
///
/// Holds whatever the winning attempt produced, or [`Outcome::Cancelled`] when
/// the caller's context was cancelled before any attempt finished. An error
/// from the first attempt to finish is returned as-is; it is not retried and
/// it does not wait for a slower attempt that might succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The winning attempt completed successfully.
    Value(T),
    /// The winning attempt failed.
    Error(E),
    /// The caller's context was cancelled before any attempt completed.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    /// Returns `true` if the winning attempt produced a value.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns `true` if the winning attempt produced an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns `true` if the caller cancelled before any attempt completed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the value, discarding errors and cancellation.
    #[must_use]
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Error(_) | Self::Cancelled => None,
        }
    }

    /// Converts the outcome into a [`Result`].
    ///
    /// # Errors
    ///
    /// Returns [`HedgeError::Task`] if the winning attempt failed and
    /// [`HedgeError::Cancelled`] if the caller cancelled the call.
    pub fn into_result(self) -> Result<T, HedgeError<E>> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Error(error) => Err(HedgeError::Task(error)),
            Self::Cancelled => Err(HedgeError::Cancelled),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Value(value),
            Err(error) => Self::Error(error),
        }
    }
}

/// Error view of an [`Outcome`], produced by [`Outcome::into_result`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HedgeError<E> {
    /// The winning attempt failed with the wrapped error.
    #[error(transparent)]
    Task(E),
    /// The caller's context was cancelled before any attempt completed.
    #[error("hedged call cancelled by the caller")]
    Cancelled,
}
