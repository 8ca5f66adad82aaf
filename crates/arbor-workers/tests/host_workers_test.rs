//! Workers driven by a real host.

use std::convert::Infallible;
use std::time::Duration;

use arbor_runtime::{RenderContext, Workflow, WorkflowAction, WorkflowHost};
use arbor_workers::{FutureWorker, TimerWorker};

/// Counts down once per tick and reports when it reaches zero.
struct Countdown {
  from: u64,
}

#[derive(Debug, PartialEq)]
struct Liftoff;

struct Tick(u64);

impl WorkflowAction<Countdown> for Tick {
  fn apply(self, remaining: &mut u64) -> Option<Liftoff> {
    *remaining = remaining.saturating_sub(1);
    (*remaining == 0).then_some(Liftoff)
  }
}

impl Workflow for Countdown {
  type State = u64;
  type Rendering = u64;
  type Output = Liftoff;

  fn initial_state(&self) -> u64 {
    self.from
  }

  fn render(&self, remaining: &u64, context: &mut RenderContext<'_, Self>) -> u64 {
    if *remaining > 0 {
      context.run_worker("tick", TimerWorker::forever(Duration::from_secs(1)), Tick);
    }
    *remaining
  }
}

#[tokio::test(start_paused = true)]
async fn test_timer_drives_countdown() {
  let mut host = WorkflowHost::new(Countdown { from: 3 }).unwrap();
  let mut outputs = host.take_outputs().unwrap();

  while *host.rendering() > 0 {
    host.process_next().await;
  }

  assert_eq!(outputs.try_recv().unwrap(), Liftoff);
  assert_eq!(host.root().subtree().worker_count(), 0);
}

/// Loads a greeting once.
struct Greeter;

struct Greeted(Result<String, String>);

impl WorkflowAction<Greeter> for Greeted {
  fn apply(self, state: &mut Option<Result<String, String>>) -> Option<Infallible> {
    *state = Some(self.0);
    None
  }
}

impl Workflow for Greeter {
  type State = Option<Result<String, String>>;
  type Rendering = Option<Result<String, String>>;
  type Output = Infallible;

  fn initial_state(&self) -> Self::State {
    None
  }

  fn render(&self, state: &Self::State, context: &mut RenderContext<'_, Self>) -> Self::Rendering {
    if state.is_none() {
      let worker = FutureWorker::new("greeting", || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, String>("hello".to_string())
      });
      context.run_worker("greeting", worker, Greeted);
    }
    state.clone()
  }
}

#[tokio::test(start_paused = true)]
async fn test_future_result_becomes_state() {
  let mut host = WorkflowHost::new(Greeter).unwrap();
  assert_eq!(*host.rendering(), None);

  host.process_next().await;

  assert_eq!(*host.rendering(), Some(Ok("hello".to_string())));
  assert_eq!(host.root().subtree().worker_count(), 0);
}
