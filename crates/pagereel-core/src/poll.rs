//! Shared bounded-polling primitive.
//!
//! The page is a black box, so both the animation stability sampler and the
//! scroll corrector have to poll it. This module gives both loops one budget
//! shape instead of duplicating raw sleep/while loops: a `Budget` is either
//! time-bounded (sleep an interval between samples until a deadline) or
//! iteration-bounded (count attempts, no sleeping).

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
enum Limit {
    /// Deadline plus inter-sample sleep.
    Timed { deadline: Instant, interval: Duration },
    /// Fixed number of attempts.
    Iterations { max: u32 },
}

/// A bounded polling budget.
///
/// Call `next()` before each attempt; it returns `false` once the budget is
/// exhausted. For timed budgets, `next()` sleeps the interval first, so the
/// caller samples at a steady cadence.
#[derive(Debug)]
pub struct Budget {
    limit: Limit,
    steps: u32,
}

impl Budget {
    /// Budget bounded by wall-clock time, polling at `interval`.
    pub fn timed(timeout: Duration, interval: Duration) -> Self {
        Self {
            limit: Limit::Timed {
                deadline: Instant::now() + timeout,
                interval,
            },
            steps: 0,
        }
    }

    /// Budget bounded by a fixed number of attempts.
    pub fn iterations(max: u32) -> Self {
        Self {
            limit: Limit::Iterations { max },
            steps: 0,
        }
    }

    /// Account one attempt. Returns `false` when the budget is spent.
    pub async fn next(&mut self) -> bool {
        match self.limit {
            Limit::Timed { deadline, interval } => {
                if Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(interval).await;
                if Instant::now() >= deadline {
                    return false;
                }
                self.steps += 1;
                true
            }
            Limit::Iterations { max } => {
                if self.steps >= max {
                    return false;
                }
                self.steps += 1;
                true
            }
        }
    }

    /// Attempts granted so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_iteration_budget_grants_exactly_max() {
        let mut budget = Budget::iterations(3);
        let mut granted = 0;
        while budget.next().await {
            granted += 1;
        }
        assert_eq!(granted, 3);
        assert_eq!(budget.steps(), 3);
    }

    #[tokio::test]
    async fn test_zero_iteration_budget() {
        let mut budget = Budget::iterations(0);
        assert!(!budget.next().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_budget_expires() {
        let mut budget = Budget::timed(Duration::from_millis(350), Duration::from_millis(100));
        let mut granted = 0;
        while budget.next().await {
            granted += 1;
        }
        // 100ms cadence inside a 350ms window grants 3 samples.
        assert_eq!(granted, 3);
    }
}
