// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shows a caller giving up on a hedged call before any attempt finishes.
//!
//! Every attempt hangs until its context is cancelled. The caller cancels its
//! own token after 300ms, the call resolves as cancelled right away, and the
//! attempts observe the cancellation in the background.

use std::time::{Duration, Instant};

use hedged::{Context, Hedger, Outcome, TaskFn};
use tick::Clock;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let hedger = Hedger::new(Clock::new_tokio())
        .name("stuck_backend")
        .wait(Duration::from_millis(100))
        .max_hedges(2);

    let task = TaskFn::new(|context: Context| async move {
        println!("[attempt] started");
        context.cancelled().await;
        println!("[attempt] cancelled");
        Err::<String, _>("backend never answered")
    });

    let deadline = CancellationToken::new();
    tokio::spawn({
        let deadline = deadline.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            println!("[main] deadline reached, cancelling");
            deadline.cancel();
        }
    });

    let start = Instant::now();
    match hedger.execute(&Context::from_token(deadline), task).await {
        Outcome::Value(value) => println!("[main] got {value}"),
        Outcome::Error(error) => println!("[main] failed: {error}"),
        Outcome::Cancelled => println!("[main] cancelled after {:?}", start.elapsed()),
    }

    // Give the attempts a moment to report their own cancellation.
    tokio::time::sleep(Duration::from_millis(50)).await;
}
