use std::time::Duration;

use arbor_runtime::Worker;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::trace;

/// Emits `1, 2, 3, ...` once per `period`.
///
/// Two timers are equivalent when their period and tick limit match, so
/// re-declaring the same timer keeps its count going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerWorker {
  period: Duration,
  ticks: Option<u64>,
}

impl TimerWorker {
  /// A timer that completes after `ticks` ticks.
  pub fn new(period: Duration, ticks: u64) -> Self {
    Self {
      period,
      ticks: Some(ticks),
    }
  }

  /// A timer that ticks until cancelled.
  pub fn forever(period: Duration) -> Self {
    Self {
      period,
      ticks: None,
    }
  }
}

impl Worker for TimerWorker {
  type Output = u64;

  fn run(&self) -> BoxStream<'static, u64> {
    let Self { period, ticks } = *self;
    trace!(period_ms = period.as_millis() as u64, ?ticks, "timer started");

    stream::unfold(0u64, move |tick| async move {
      if ticks.is_some_and(|limit| tick >= limit) {
        return None;
      }
      tokio::time::sleep(period).await;
      Some((tick + 1, tick + 1))
    })
    .boxed()
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    self == other
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_emits_numbered_ticks_then_completes() {
    let ticks: Vec<u64> = TimerWorker::new(Duration::from_secs(1), 3)
      .run()
      .collect()
      .await;

    assert_eq!(ticks, vec![1, 2, 3]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_waits_one_period_per_tick() {
    let start = tokio::time::Instant::now();
    let mut ticks = TimerWorker::forever(Duration::from_millis(250)).run();

    assert_eq!(ticks.next().await, Some(1));
    assert_eq!(ticks.next().await, Some(2));
    assert_eq!(start.elapsed(), Duration::from_millis(500));
  }

  #[test]
  fn test_zero_ticks_is_empty() {
    let timer = TimerWorker::new(Duration::from_secs(1), 0);
    let ticks: Vec<u64> = futures::executor::block_on(timer.run().collect());
    assert!(ticks.is_empty());
  }

  #[test]
  fn test_equivalence() {
    let timer = TimerWorker::new(Duration::from_secs(1), 3);
    assert!(timer.is_equivalent(&TimerWorker::new(Duration::from_secs(1), 3)));
    assert!(!timer.is_equivalent(&TimerWorker::new(Duration::from_secs(2), 3)));
    assert!(!timer.is_equivalent(&TimerWorker::forever(Duration::from_secs(1))));
  }
}
