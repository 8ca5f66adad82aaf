//! The workflow contract.

use crate::context::RenderContext;

/// A composable state machine.
///
/// The workflow value itself is the node's props: a parent supplies a fresh
/// value on every render, and the node keeps its state across those renders.
///
/// `render` must be a pure function of the state, the props, and the
/// context. Asynchronous work and one-shot effects are declared through the
/// [`RenderContext`], never performed directly.
pub trait Workflow: Sized + 'static {
  /// Internal state, owned by the node for as long as it lives.
  type State: 'static;
  /// Value produced by every render pass.
  type Rendering: 'static;
  /// Event bubbled to the parent when an action produces one.
  type Output: Send + 'static;

  /// Build the initial state when a node is first created.
  fn initial_state(&self) -> Self::State;

  /// Called when a parent re-renders this node with a new workflow value,
  /// before the node renders again.
  fn on_props_changed(&self, previous: &Self, state: &mut Self::State) {
    let _ = (previous, state);
  }

  /// Produce a rendering for the current state.
  fn render(&self, state: &Self::State, context: &mut RenderContext<'_, Self>) -> Self::Rendering;
}
