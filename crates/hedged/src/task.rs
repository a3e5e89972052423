// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::Context;

/// An idempotent, cancellable operation that can be hedged.
///
/// A [`Hedger`](crate::Hedger) may call [`run`](Task::run) several times
/// concurrently, once per attempt. The first attempt to finish decides the
/// outcome and the context handed to the remaining attempts is cancelled.
/// Implementations should therefore be idempotent and should either watch the
/// context themselves or pass it on to whatever does the actual work.
///
/// Use [`TaskFn`] to turn a closure into a task.
///
/// # Examples
///
/// ```
/// use hedged::{Context, Task};
///
/// struct Lookup {
///     key: String,
/// }
///
/// impl Task for Lookup {
///     type Value = String;
///     type Error = std::io::Error;
///
///     async fn run(&self, context: Context) -> Result<String, std::io::Error> {
///         if context.is_cancelled() {
///             return Err(std::io::Error::other("cancelled"));
///         }
///
///         Ok(format!("value of {}", self.key))
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// The value produced by a successful attempt.
    type Value: Send + 'static;

    /// The error produced by a failed attempt.
    type Error: Send + 'static;

    /// Runs one attempt to completion or until `context` is cancelled.
    fn run(&self, context: Context) -> impl Future<Output = Result<Self::Value, Self::Error>> + Send;
}

impl<K: Task> Task for Arc<K> {
    type Value = K::Value;
    type Error = K::Error;

    fn run(&self, context: Context) -> impl Future<Output = Result<Self::Value, Self::Error>> + Send {
        (**self).run(context)
    }
}

impl<K: Task> Task for Box<K> {
    type Value = K::Value;
    type Error = K::Error;

    fn run(&self, context: Context) -> impl Future<Output = Result<Self::Value, Self::Error>> + Send {
        (**self).run(context)
    }
}

/// Adapts a closure `Fn(Context) -> impl Future<Output = Result<T, E>>` into a [`Task`].
///
/// The closure is called once per attempt and must produce a fresh future each
/// time. State shared between attempts should live behind an `Arc` captured by
/// the closure.
///
/// # Examples
///
/// ```
/// use hedged::{Context, TaskFn};
///
/// let task = TaskFn::new(|context: Context| async move {
///     if context.is_cancelled() {
///         return Err("cancelled");
///     }
///     Ok(42)
/// });
/// ```
#[derive(Clone)]
pub struct TaskFn<F>(F);

impl<F> TaskFn<F> {
    /// Creates a task from a function or closure.
    #[must_use]
    pub fn new<Fut, T, E>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        Self(f)
    }
}

impl<F, Fut, T, E> Task for TaskFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;

    fn run(&self, context: Context) -> impl Future<Output = Result<T, E>> + Send {
        (self.0)(context)
    }
}

impl<F> Debug for TaskFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFn").finish_non_exhaustive()
    }
}
