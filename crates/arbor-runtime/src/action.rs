//! Actions: the only way state changes.

use std::fmt;

use crate::workflow::Workflow;

/// A state mutation for workflow `W`, optionally producing an output.
///
/// Applying an action is synchronous and total. Actions produced by
/// asynchronous work are queued and applied one at a time on the render
/// thread.
pub trait WorkflowAction<W: Workflow>: Send + 'static {
  /// Mutate the state, returning an output to bubble to the parent.
  fn apply(self, state: &mut W::State) -> Option<W::Output>;

  /// Name used in logs and observer events.
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }
}

type ApplyFn<W> =
  Box<dyn FnOnce(&mut <W as Workflow>::State) -> Option<<W as Workflow>::Output> + Send>;

/// A type-erased action.
///
/// Wraps any [`WorkflowAction`] (keeping its name) or a plain closure.
pub struct AnyAction<W: Workflow> {
  name: &'static str,
  apply: ApplyFn<W>,
}

impl<W: Workflow> AnyAction<W> {
  /// Erase a concrete action.
  pub fn new<A: WorkflowAction<W>>(action: A) -> Self {
    Self {
      name: action.name(),
      apply: Box::new(move |state| action.apply(state)),
    }
  }

  /// Build an action from a closure.
  pub fn from_fn<F>(apply: F) -> Self
  where
    F: FnOnce(&mut W::State) -> Option<W::Output> + Send + 'static,
  {
    Self {
      name: std::any::type_name::<F>(),
      apply: Box::new(apply),
    }
  }

  /// Build an action from a named closure.
  pub fn named<F>(name: &'static str, apply: F) -> Self
  where
    F: FnOnce(&mut W::State) -> Option<W::Output> + Send + 'static,
  {
    Self {
      name,
      apply: Box::new(apply),
    }
  }
}

impl<W: Workflow> WorkflowAction<W> for AnyAction<W> {
  fn apply(self, state: &mut W::State) -> Option<W::Output> {
    (self.apply)(state)
  }

  fn name(&self) -> &'static str {
    self.name
  }
}

impl<W: Workflow> fmt::Debug for AnyAction<W> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AnyAction").field("name", &self.name).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::RenderContext;

  struct Counter;

  impl Workflow for Counter {
    type State = i32;
    type Rendering = i32;
    type Output = String;

    fn initial_state(&self) -> i32 {
      0
    }

    fn render(&self, state: &i32, _context: &mut RenderContext<'_, Self>) -> i32 {
      *state
    }
  }

  enum CounterAction {
    Increment,
    Report,
  }

  impl WorkflowAction<Counter> for CounterAction {
    fn apply(self, state: &mut i32) -> Option<String> {
      match self {
        CounterAction::Increment => {
          *state += 1;
          None
        }
        CounterAction::Report => Some(format!("count={}", state)),
      }
    }
  }

  #[test]
  fn test_erased_action_keeps_name() {
    let action = AnyAction::<Counter>::new(CounterAction::Increment);
    assert!(action.name().ends_with("CounterAction"));

    // Re-erasing must not hide the original name
    let twice = AnyAction::<Counter>::new(action);
    assert!(twice.name().ends_with("CounterAction"));
  }

  #[test]
  fn test_erased_action_applies() {
    let mut state = 4;
    assert_eq!(AnyAction::<Counter>::new(CounterAction::Increment).apply(&mut state), None);
    assert_eq!(state, 5);
    assert_eq!(
      AnyAction::<Counter>::new(CounterAction::Report).apply(&mut state),
      Some("count=5".to_string())
    );
  }

  #[test]
  fn test_closure_action() {
    let mut state = 1;
    let action = AnyAction::<Counter>::named("double", |state| {
      *state *= 2;
      None
    });
    assert_eq!(action.name(), "double");
    action.apply(&mut state);
    assert_eq!(state, 2);
  }
}
