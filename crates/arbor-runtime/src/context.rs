//! The per-pass render API.

use std::convert::Infallible;

use crate::action::{AnyAction, WorkflowAction};
use crate::id::NodeId;
use crate::lifetime::Lifetime;
use crate::sink::Sink;
use crate::subtree::{Entries, SubtreeManager};
use crate::worker::Worker;
use crate::workflow::Workflow;

/// Declares children, workers, and side effects for one render pass.
///
/// A context is created for a single call to [`Workflow::render`] and is
/// only borrowed by it, so it cannot be kept or used once render returns.
/// Keys must be unique per declared type within a pass; declaring the same
/// `(type, key)` twice panics.
///
/// Dropping the context ends the pass: every entry it did not claim is torn
/// down, including when render unwinds.
pub struct RenderContext<'a, W: Workflow> {
  subtree: &'a mut SubtreeManager<W>,
  previous: Entries<W>,
}

impl<'a, W: Workflow> RenderContext<'a, W> {
  pub(crate) fn new(subtree: &'a mut SubtreeManager<W>) -> Self {
    let previous = subtree.begin_pass();
    Self { subtree, previous }
  }

  /// Id of the node being rendered.
  pub fn node_id(&self) -> NodeId {
    self.subtree.node_id()
  }

  /// Render a child that produces no output.
  pub fn render_child<C>(&mut self, key: impl Into<String>, child: C) -> C::Rendering
  where
    C: Workflow<Output = Infallible>,
  {
    self.subtree.render_child(
      &mut self.previous,
      key.into(),
      child,
      Box::new(|never: Infallible| -> AnyAction<W> { match never {} }),
    )
  }

  /// Render a child, mapping each of its outputs to an action on this node.
  ///
  /// An existing child of the same type at `key` keeps its state and
  /// receives the new workflow value as props; otherwise a new child is
  /// created.
  pub fn render_child_with<C, A, F>(
    &mut self,
    key: impl Into<String>,
    child: C,
    output_map: F,
  ) -> C::Rendering
  where
    C: Workflow,
    A: WorkflowAction<W>,
    F: Fn(C::Output) -> A + 'static,
  {
    self.subtree.render_child(
      &mut self.previous,
      key.into(),
      child,
      Box::new(move |output: C::Output| AnyAction::new(output_map(output))),
    )
  }

  /// Create a sink that queues actions for this node.
  pub fn make_sink<A: WorkflowAction<W>>(&self) -> Sink<A> {
    self.subtree.make_sink()
  }

  /// Run a worker while `key` keeps being declared.
  ///
  /// An equivalent worker at an existing key keeps the running operation;
  /// a non-equivalent one cancels it and starts afresh.
  pub fn run_worker<K, A, F>(&mut self, key: impl Into<String>, worker: K, output_map: F)
  where
    K: Worker,
    A: WorkflowAction<W>,
    F: Fn(K::Output) -> A + 'static,
  {
    self.subtree.run_worker(
      &mut self.previous,
      key.into(),
      worker,
      Box::new(move |output: K::Output| AnyAction::new(output_map(output))),
    );
  }

  /// Run a worker whose outputs are themselves actions on this node.
  pub fn run_action_worker<K>(&mut self, key: impl Into<String>, worker: K)
  where
    K: Worker,
    K::Output: WorkflowAction<W>,
  {
    self.subtree.run_worker(
      &mut self.previous,
      key.into(),
      worker,
      Box::new(|action: K::Output| AnyAction::new(action)),
    );
  }

  /// Invoke `effect` once for as long as `key` keeps being declared.
  ///
  /// Re-declaring an existing key does nothing. The [`Lifetime`] ends when
  /// the key is dropped or the node is torn down.
  pub fn run_side_effect<F>(&mut self, key: impl Into<String>, effect: F)
  where
    F: FnOnce(&Lifetime),
  {
    self
      .subtree
      .run_side_effect(&mut self.previous, key.into(), effect);
  }
}

impl<W: Workflow> Drop for RenderContext<'_, W> {
  fn drop(&mut self) {
    let stale = std::mem::take(&mut self.previous);
    self.subtree.end_pass(stale);
  }
}
