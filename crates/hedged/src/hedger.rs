// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::pin::pin;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyspawn::Spawner;
use futures_util::FutureExt;
use tick::Clock;
use tokio::sync::{Semaphore, mpsc};

use crate::barrier::{CompletionBarrier, Participant};
use crate::{Context, HedgeOptions, Outcome, Task};

pub(crate) const DEFAULT_HEDGER_NAME: &str = "default";

/// Outcome of one attempt, tagged with the attempt index. `Err` carries the
/// payload of a panicking attempt.
type AttemptResult<K> = (u64, thread::Result<Result<<K as Task>::Value, <K as Task>::Error>>);

/// Runs a [`Task`] as a hedged request.
///
/// The first attempt is launched immediately. Every time the wait interval
/// elapses without a result, another attempt is launched, up to `max_hedges`
/// hedges on top of the original. The first attempt to finish, successfully
/// or not, decides the [`Outcome`]; the context handed to the other attempts
/// is cancelled.
///
/// The hedged call returns as soon as the outcome is known. Losing attempts
/// are awaited by a detached cleanup task, so an attempt that ignores
/// cancellation keeps running in the background without delaying the caller.
///
/// An attempt that panics finishes like any other: if it is the first to
/// finish, the panic is resumed on the caller once the remaining attempts have
/// been cancelled.
///
/// A `Hedger` is cheap to clone and holds no per-call state; every call gets
/// its own cancellation scope, result channel and completion barrier.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hedged::{Context, Hedger, Outcome, TaskFn};
/// use tick::Clock;
///
/// # async fn example() {
/// let hedger = Hedger::new(Clock::new_tokio())
///     .name("inventory")
///     .wait(Duration::from_millis(50))
///     .max_hedges(2);
///
/// let task = TaskFn::new(|_context: Context| async { Ok::<_, std::io::Error>("in stock") });
///
/// match hedger.execute(&Context::new(), task).await {
///     Outcome::Value(value) => println!("{value}"),
///     Outcome::Error(error) => eprintln!("lookup failed: {error}"),
///     Outcome::Cancelled => eprintln!("caller gave up"),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Hedger {
    clock: Clock,
    spawner: Spawner,
    #[cfg_attr(not(any(feature = "logs", test)), expect(dead_code, reason = "only read by log events"))]
    name: Cow<'static, str>,
    options: HedgeOptions,
}

impl Hedger {
    /// Creates a hedger that times launches with `clock` and spawns attempts on Tokio.
    ///
    /// Initializes with `name = "default"` and [`HedgeOptions::default`].
    #[must_use]
    pub fn new(clock: impl AsRef<Clock>) -> Self {
        Self {
            clock: clock.as_ref().clone(),
            spawner: Spawner::new_tokio(),
            name: Cow::Borrowed(DEFAULT_HEDGER_NAME),
            options: HedgeOptions::default(),
        }
    }

    /// Creates a hedger driven entirely by the Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn new_tokio() -> Self {
        Self::new(Clock::new_tokio())
    }

    /// Sets the name reported in log events. Prefer `snake_case`.
    #[must_use]
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the spawner used to launch attempts and the cleanup task.
    #[must_use]
    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = spawner;
        self
    }

    /// Replaces the options used by [`Hedger::execute`].
    #[must_use]
    pub fn options(mut self, options: HedgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the wait interval used by [`Hedger::execute`].
    #[must_use]
    pub fn wait(mut self, wait: Duration) -> Self {
        self.options = self.options.wait(wait);
        self
    }

    /// Sets the hedge count used by [`Hedger::execute`].
    #[must_use]
    pub fn max_hedges(mut self, max_hedges: u32) -> Self {
        self.options = self.options.max_hedges(max_hedges);
        self
    }

    /// Returns the options used by [`Hedger::execute`].
    #[must_use]
    pub fn hedge_options(&self) -> HedgeOptions {
        self.options
    }

    /// Runs `task` with the configured [`HedgeOptions`].
    pub async fn execute<K: Task>(&self, context: &Context, task: K) -> Outcome<K::Value, K::Error> {
        self.run_n(context, task, self.options.wait, self.options.max_hedges).await
    }

    /// Runs `task` with at most one hedge, launched after `wait`.
    pub async fn run<K: Task>(&self, context: &Context, task: K, wait: Duration) -> Outcome<K::Value, K::Error> {
        self.run_n(context, task, wait, 1).await
    }

    /// Runs `task`, launching another attempt every `wait` until one finishes or
    /// `max_hedges` hedges are in flight.
    ///
    /// Returns [`Outcome::Cancelled`] if `context` is cancelled before any
    /// attempt finishes, including when it is already cancelled on entry, and
    /// also when every attempt is dropped unfinished, for example because its
    /// runtime shut down.
    ///
    /// # Panics
    ///
    /// Resumes the panic of an attempt that panicked before any other attempt
    /// finished.
    pub async fn run_n<K: Task>(&self, context: &Context, task: K, wait: Duration, max_hedges: u32) -> Outcome<K::Value, K::Error> {
        let task = Arc::new(task);
        let (scope, revoke) = context.with_cancellation();

        // The winning outcome is taken out of the channel by the race below, so
        // the remaining attempts fit without blocking.
        let capacity = usize::try_from(max_hedges)
            .unwrap_or(usize::MAX)
            .clamp(1, Semaphore::MAX_PERMITS);
        let (sender, mut receiver) = mpsc::channel::<AttemptResult<K>>(capacity);
        let mut sender = Some(sender);
        let barrier = CompletionBarrier::new();

        let total_attempts = u64::from(max_hedges) + 1;
        let mut launched = 0_u64;

        let (winner, result) = loop {
            if let Some(attempt_sender) = &sender {
                let participant = barrier.register();
                self.launch(launched, Arc::clone(&task), scope.clone(), attempt_sender.clone(), participant);
                launched += 1;

                if launched == total_attempts {
                    // From here on only attempts hold senders, so the channel
                    // closes if all of them go away without an outcome.
                    sender = None;
                }
            }

            let more_to_launch = sender.is_some();

            tokio::select! {
                message = receiver.recv() => match message {
                    Some((index, result)) => break (Some(index), Some(result)),
                    None => break (None, None),
                },
                () = context.cancelled() => break (None, None),
                () = self.clock.delay(wait), if more_to_launch => {}
            }
        };

        revoke.cancel();
        drop(sender);

        self.emit_resolved(resolution_kind(result.as_ref()), winner, launched);
        self.release_when_drained(barrier, receiver);

        match result {
            Some(Ok(result)) => Outcome::from(result),
            Some(Err(panic)) => resume_unwind(panic),
            None => Outcome::Cancelled,
        }
    }

    fn launch<K: Task>(&self, index: u64, task: Arc<K>, scope: Context, sender: mpsc::Sender<AttemptResult<K>>, participant: Participant) {
        self.emit_attempt(index);

        let _detached = self.spawner.spawn(async move {
            let result = AssertUnwindSafe(task.run(scope)).catch_unwind().await;

            // The receiver stays open until every participant is released.
            _ = sender.send((index, result)).await;
            drop(participant);
        });
    }

    /// Discards late outcomes until every attempt has finished, then releases the channel.
    fn release_when_drained<T: Send + 'static>(&self, barrier: CompletionBarrier, mut receiver: mpsc::Receiver<T>) {
        #[cfg(any(feature = "logs", test))]
        let name = self.name.clone();

        let _detached = self.spawner.spawn(async move {
            let mut drained = pin!(barrier.wait());

            loop {
                tokio::select! {
                    () = &mut drained => break,
                    Some(_late) = receiver.recv() => {}
                }
            }

            receiver.close();
            drop(receiver);

            #[cfg(any(feature = "logs", test))]
            tracing::event!(name: "hedged.drained", tracing::Level::TRACE, hedger.name = %name);
        });
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_attempt(&self, index: u64) {
        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "hedged.attempt",
            tracing::Level::DEBUG,
            hedger.name = %self.name,
            attempt.index = index,
            attempt.is_hedge = index > 0,
        );
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_resolved(&self, outcome: &'static str, winner: Option<u64>, launched: u64) {
        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "hedged.resolved",
            tracing::Level::DEBUG,
            hedger.name = %self.name,
            outcome = outcome,
            attempt.index = winner,
            attempts.launched = launched,
        );
    }
}

fn resolution_kind<T, E>(result: Option<&thread::Result<Result<T, E>>>) -> &'static str {
    match result {
        Some(Ok(Ok(_))) => "value",
        Some(Ok(Err(_))) => "error",
        Some(Err(_)) => "panicked",
        None => "cancelled",
    }
}

/// Runs `task` with at most one hedge, launched after `wait`.
///
/// Shortcut for [`Hedger::run`] on a Tokio-driven [`Hedger`]. Build and reuse
/// a [`Hedger`] when hedging on a hot path.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime context, or resumes the panic
/// of an attempt that panicked before any other attempt finished.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hedged::{Context, TaskFn};
///
/// # async fn example() {
/// let task = TaskFn::new(|_context: Context| async { Ok::<_, std::io::Error>(204) });
/// let outcome = hedged::run(&Context::new(), task, Duration::from_millis(100)).await;
///
/// assert_eq!(outcome.value(), Some(204));
/// # }
/// ```
pub async fn run<K: Task>(context: &Context, task: K, wait: Duration) -> Outcome<K::Value, K::Error> {
    run_n(context, task, wait, 1).await
}

/// Runs `task`, launching another attempt every `wait` until one finishes or
/// `max_hedges` hedges are in flight.
///
/// Shortcut for [`Hedger::run_n`] on a Tokio-driven [`Hedger`].
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime context, or resumes the panic
/// of an attempt that panicked before any other attempt finished.
pub async fn run_n<K: Task>(context: &Context, task: K, wait: Duration, max_hedges: u32) -> Outcome<K::Value, K::Error> {
    Hedger::new_tokio().run_n(context, task, wait, max_hedges).await
}
