//! The countdown demo tree: a `Launch` root hosting a `Countdown` child.

use std::time::Duration;

use arbor_runtime::{RenderContext, Workflow, WorkflowAction};
use arbor_workers::TimerWorker;
use serde::Serialize;
use tracing::info;

/// Counts down from `from`, one step per `interval`.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
  pub from: u64,
  pub interval: Duration,
}

/// Emitted by [`Countdown`] when it reaches zero.
pub struct Finished;

struct Tick;

impl WorkflowAction<Countdown> for Tick {
  fn apply(self, remaining: &mut u64) -> Option<Finished> {
    *remaining = remaining.saturating_sub(1);
    (*remaining == 0).then_some(Finished)
  }
}

impl Workflow for Countdown {
  type State = u64;
  type Rendering = u64;
  type Output = Finished;

  fn initial_state(&self) -> u64 {
    self.from
  }

  fn on_props_changed(&self, previous: &Self, remaining: &mut u64) {
    if self.from != previous.from {
      *remaining = self.from;
    }
  }

  fn render(&self, remaining: &u64, context: &mut RenderContext<'_, Self>) -> u64 {
    if *remaining > 0 {
      context.run_worker("tick", TimerWorker::forever(self.interval), |_| Tick);
    }
    *remaining
  }
}

/// Root of the demo: runs a countdown, then reports liftoff.
#[derive(Debug, Clone, PartialEq)]
pub struct Launch {
  pub from: u64,
  pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchScreen {
  pub remaining: u64,
  pub launched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchReport {
  pub counted_from: u64,
}

pub struct LaunchState {
  from: u64,
  launched: bool,
}

struct Liftoff;

impl WorkflowAction<Launch> for Liftoff {
  fn apply(self, state: &mut LaunchState) -> Option<LaunchReport> {
    state.launched = true;
    Some(LaunchReport {
      counted_from: state.from,
    })
  }
}

impl Workflow for Launch {
  type State = LaunchState;
  type Rendering = LaunchScreen;
  type Output = LaunchReport;

  fn initial_state(&self) -> LaunchState {
    LaunchState {
      from: self.from,
      launched: self.from == 0,
    }
  }

  fn render(&self, state: &LaunchState, context: &mut RenderContext<'_, Self>) -> LaunchScreen {
    if state.launched {
      context.run_side_effect("liftoff", |_| info!("liftoff"));
      return LaunchScreen {
        remaining: 0,
        launched: true,
      };
    }

    let countdown = Countdown {
      from: self.from,
      interval: self.interval,
    };
    let remaining = context.render_child_with("countdown", countdown, |Finished| Liftoff);
    LaunchScreen {
      remaining,
      launched: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use arbor_runtime::WorkflowHost;

  fn launch(from: u64) -> Launch {
    Launch {
      from,
      interval: Duration::from_secs(1),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_countdown_reaches_liftoff() {
    let mut host = WorkflowHost::new(launch(3)).unwrap();
    let mut outputs = host.take_outputs().unwrap();
    assert_eq!(
      *host.rendering(),
      LaunchScreen {
        remaining: 3,
        launched: false
      }
    );

    while !host.rendering().launched {
      host.process_next().await;
    }

    assert_eq!(
      outputs.try_recv().unwrap(),
      LaunchReport { counted_from: 3 }
    );
    let subtree = host.root().subtree();
    assert_eq!(subtree.child_count(), 0);
    assert!(subtree.has_side_effect("liftoff"));
  }

  #[tokio::test]
  async fn test_zero_launches_immediately() {
    let host = WorkflowHost::new(launch(0)).unwrap();
    assert!(host.rendering().launched);
    assert_eq!(host.root().subtree().child_count(), 0);
  }
}
