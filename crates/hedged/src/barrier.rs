// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Tracks attempts that may still write to the result channel.
///
/// Each launched attempt holds a [`Participant`]. The barrier completes once
/// every participant has been dropped, at which point nobody can produce
/// another outcome and the channel may be released.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompletionBarrier {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    notify: Notify,
}

impl CompletionBarrier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a participant. Must happen before the attempt it guards is spawned.
    pub(crate) fn register(&self) -> Participant {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);

        Participant {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Completes once no registered participant remains.
    pub(crate) async fn wait(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            // Register interest before checking the counter so a release in
            // between is not missed.
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// Registration of one attempt with a [`CompletionBarrier`], released on drop.
#[derive(Debug)]
pub(crate) struct Participant {
    inner: Arc<Inner>,
}

impl Drop for Participant {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.notify.notify_waiters();
        }
    }
}
