// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Hedged requests for slow, idempotent async operations.
//!
//! A hedged request sends an operation once and, if it has not completed after a
//! fixed wait, sends it again, using whichever copy finishes first and cancelling
//! the rest. When response times have a heavy tail (most calls take 10ms, a few
//! take a second), this trades a small amount of duplicated work for a large cut
//! in tail latency. See [The Tail at Scale] for background.
//!
//! A good starting point for the wait is the p95 latency of the operation, which
//! adds about 5% extra load.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use hedged::{Context, Outcome, TaskFn};
//!
//! # async fn example() {
//! let task = TaskFn::new(|context: Context| async move {
//!     // Pass `context` on to whatever performs the request, or watch it directly.
//!     tokio::select! {
//!         () = context.cancelled() => Err("cancelled"),
//!         () = tokio::time::sleep(Duration::from_millis(5)) => Ok("response"),
//!     }
//! });
//!
//! match hedged::run(&Context::new(), task, Duration::from_millis(100)).await {
//!     Outcome::Value(response) => println!("got {response}"),
//!     Outcome::Error(error) => eprintln!("request failed: {error}"),
//!     Outcome::Cancelled => eprintln!("caller cancelled"),
//! }
//! # }
//! ```
//!
//! # Core Types
//!
//! - [`Task`]: the operation being hedged. Implement it directly or wrap a
//!   closure with [`TaskFn`].
//! - [`Context`]: cancellation and ambient values handed to every attempt.
//! - [`Hedger`]: the executor, configured with a [`Clock`][tick::Clock], a
//!   spawner and [`HedgeOptions`].
//! - [`Outcome`]: the result of the first attempt to finish, or
//!   [`Outcome::Cancelled`].
//!
//! # Cancellation
//!
//! Every call derives a cancellation scope from the caller's [`Context`] and
//! hands it to all of its attempts. Once the race is decided the scope is
//! cancelled, and a detached cleanup task waits for the remaining attempts
//! before releasing the call's resources. Cancellation is cooperative: an
//! attempt that never checks its context runs to completion in the background,
//! but the caller is not kept waiting for it.
//!
//! Errors are not retried. If the first attempt to finish fails, its error is
//! the outcome. If it panics, the panic is resumed on the caller.
//!
//! # Logging
//!
//! With the `logs` feature, attempt launches and race resolutions are reported
//! as `tracing` events at `DEBUG` level, tagged with the name given to
//! [`Hedger::name`]. Release of a call's resources is reported at `TRACE`.
//!
//! # Features
//!
//! - `logs`: emits `tracing` events for attempts and resolutions.
//! - `serde`: implements `Serialize` and `Deserialize` for [`HedgeOptions`].
//!
//! [The Tail at Scale]: https://cacm.acm.org/magazines/2013/2/160173-the-tail-at-scale/fulltext

mod barrier;
mod context;
mod hedger;
mod options;
mod outcome;
mod task;

pub use context::Context;
pub use hedger::{Hedger, run, run_n};
pub use options::{DEFAULT_MAX_HEDGES, DEFAULT_WAIT, HedgeOptions};
pub use outcome::{HedgeError, Outcome};
pub use task::{Task, TaskFn};

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;
