// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Default interval between attempt launches: 100 milliseconds.
///
/// A good starting point is the p95 latency of the hedged operation, which
/// adds roughly 5% extra load.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

/// Default number of hedges launched after the original attempt: 1.
pub const DEFAULT_MAX_HEDGES: u32 = 1;

/// Hedging parameters used by [`Hedger::execute`](crate::Hedger::execute).
///
/// With the `serde` feature enabled the options can be loaded from any serde
/// format; missing fields fall back to their defaults.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hedged::HedgeOptions;
///
/// let options = HedgeOptions::new()
///     .wait(Duration::from_millis(25))
///     .max_hedges(2);
///
/// assert_eq!(options.total_attempts(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
pub struct HedgeOptions {
    /// Interval between attempt launches. Zero launches every attempt at once.
    pub wait: Duration,
    /// Number of hedges launched after the original attempt. Zero disables hedging.
    pub max_hedges: u32,
}

impl HedgeOptions {
    /// Creates options with [`DEFAULT_WAIT`] and [`DEFAULT_MAX_HEDGES`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interval between attempt launches.
    #[must_use]
    pub fn wait(self, wait: Duration) -> Self {
        Self { wait, ..self }
    }

    /// Sets the number of hedges launched after the original attempt.
    #[must_use]
    pub fn max_hedges(self, max_hedges: u32) -> Self {
        Self { max_hedges, ..self }
    }

    /// The original attempt plus every hedge.
    #[must_use]
    pub fn total_attempts(&self) -> u64 {
        u64::from(self.max_hedges) + 1
    }
}

impl Default for HedgeOptions {
    fn default() -> Self {
        Self {
            wait: DEFAULT_WAIT,
            max_hedges: DEFAULT_MAX_HEDGES,
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = HedgeOptions::default();

        assert_eq!(options.wait, Duration::from_millis(100));
        assert_eq!(options.max_hedges, 1);
        assert_eq!(options.total_attempts(), 2);
        assert_eq!(HedgeOptions::new(), options);
    }

    #[test]
    fn setters_keep_other_fields() {
        let options = HedgeOptions::new().max_hedges(0).wait(Duration::ZERO);

        assert_eq!(options.max_hedges, 0);
        assert_eq!(options.wait, Duration::ZERO);
        assert_eq!(options.total_attempts(), 1);
    }

    #[test]
    fn total_attempts_does_not_overflow() {
        let options = HedgeOptions::new().max_hedges(u32::MAX);

        assert_eq!(options.total_attempts(), u64::from(u32::MAX) + 1);
    }
}
