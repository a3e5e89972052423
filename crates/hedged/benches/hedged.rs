// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Performance benchmarks for hedged.
//!
//! Run with: cargo bench -p hedged
//! Save baseline: cargo bench -p hedged -- --save-baseline main
//! Compare to baseline: cargo bench -p hedged -- --baseline main

#![allow(missing_docs, reason = "benchmark code")]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use hedged::{Context, Hedger, Task};

/// Odd invocations take ten times longer than even ones.
#[derive(Debug, Default)]
struct SlowOdds {
    calls: AtomicU64,
}

impl Task for SlowOdds {
    type Value = u64;
    type Error = ();

    async fn run(&self, context: Context) -> Result<u64, ()> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let delay = if call % 2 == 0 { Duration::from_micros(100) } else { Duration::from_millis(1) };

        tokio::select! {
            () = context.cancelled() => Err(()),
            () = tokio::time::sleep(delay) => Ok(call),
        }
    }
}

/// Baseline: the first attempt finishes immediately, no hedge is launched.
/// This measures the fixed overhead of a hedged call.
fn bench_immediate_value(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let hedger = rt.block_on(async { Hedger::new_tokio() });
    let task = Arc::new(hedged::TaskFn::new(|_context: Context| async { Ok::<_, ()>("howdy") }));

    c.bench_function("immediate_value", |b| {
        b.to_async(&rt).iter(|| {
            let hedger = hedger.clone();
            let task = Arc::clone(&task);
            async move { hedger.run(&Context::new(), task, Duration::from_millis(10)).await }
        });
    });
}

/// Every other call is slow, so half of the calls are won by a hedge.
fn bench_hedge_wins(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let hedger = rt.block_on(async { Hedger::new_tokio() });
    let task = Arc::new(SlowOdds::default());

    c.bench_function("hedge_wins", |b| {
        b.to_async(&rt).iter(|| {
            let hedger = hedger.clone();
            let task = Arc::clone(&task);
            async move { hedger.run(&Context::new(), task, Duration::from_micros(200)).await }
        });
    });
}

/// All attempts are launched together and race each other.
fn bench_concurrent_attempts(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let hedger = rt.block_on(async { Hedger::new_tokio() });
    let task = Arc::new(SlowOdds::default());

    c.bench_function("concurrent_attempts_4", |b| {
        b.to_async(&rt).iter(|| {
            let hedger = hedger.clone();
            let task = Arc::clone(&task);
            async move { hedger.run_n(&Context::new(), task, Duration::ZERO, 3).await }
        });
    });
}

criterion_group!(benches, bench_immediate_value, bench_hedge_wins, bench_concurrent_attempts);
criterion_main!(benches);
