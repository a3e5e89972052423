// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Compares the latency distribution of a heavy-tailed backend with and
//! without hedging.
//!
//! Half of the backend's responses take 5ms, but one in a hundred takes close
//! to a second. Hedging after the p95 latency removes most of that tail at the
//! cost of a few percent extra backend calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use hedged::{Context, Hedger, Outcome, Task};
use tick::Clock;

const REQUESTS: usize = 2_000;

/// Simulated backend whose response times follow a heavy-tailed profile.
#[derive(Debug, Default)]
struct Backend {
    calls: AtomicU64,
}

impl Backend {
    fn latency() -> Duration {
        let millis = match fastrand::f32() {
            x if x >= 0.999 => 1_000,
            x if x >= 0.99 => 800,
            x if x >= 0.95 => 80,
            x if x >= 0.5 => 10,
            _ => 5,
        };
        Duration::from_millis(millis)
    }
}

impl Task for Backend {
    type Value = u16;
    type Error = &'static str;

    async fn run(&self, context: Context) -> Result<u16, &'static str> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        tokio::select! {
            () = context.cancelled() => Err("request abandoned"),
            () = tokio::time::sleep(Self::latency()) => Ok(204),
        }
    }
}

#[tokio::main]
async fn main() {
    // Raise to DEBUG to see every attempt launch.
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let plain = Hedger::new(Clock::new_tokio()).name("plain").max_hedges(0);
    let hedging = Hedger::new(Clock::new_tokio())
        .name("hedged")
        .wait(Duration::from_millis(21))
        .max_hedges(1);

    for (label, hedger) in [("plain", plain), ("hedged", hedging)] {
        let backend = Arc::new(Backend::default());
        let mut latencies = measure(&hedger, &backend).await;
        latencies.sort_unstable();

        println!(
            "[{label:>6}] p50 {:>8.1?}  p95 {:>8.1?}  p99 {:>8.1?}  p999 {:>8.1?}  backend calls {}",
            percentile(&latencies, 0.50),
            percentile(&latencies, 0.95),
            percentile(&latencies, 0.99),
            percentile(&latencies, 0.999),
            backend.calls.load(Ordering::Relaxed),
        );
    }
}

async fn measure(hedger: &Hedger, backend: &Arc<Backend>) -> Vec<Duration> {
    let requests: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let hedger = hedger.clone();
            let backend = Arc::clone(backend);
            tokio::spawn(async move {
                let start = Instant::now();
                let outcome = hedger.execute(&Context::new(), backend).await;
                assert!(matches!(outcome, Outcome::Value(204)), "unexpected outcome {outcome:?}");
                start.elapsed()
            })
        })
        .collect();

    let mut latencies = Vec::with_capacity(REQUESTS);
    for request in requests {
        latencies.push(request.await.expect("request task panicked"));
    }
    latencies
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "percentile index of a small sample"
)]
fn percentile(sorted: &[Duration], quantile: f64) -> Duration {
    let index = ((sorted.len() as f64 - 1.0) * quantile).round() as usize;
    sorted[index]
}
