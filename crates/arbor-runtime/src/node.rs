//! Runtime instances of workflows.

use std::any::type_name;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::action::{AnyAction, WorkflowAction};
use crate::context::RenderContext;
use crate::events::{WorkflowEvent, WorkflowObserver};
use crate::id::NodeId;
use crate::sink::{EventSender, Payload};
use crate::subtree::{Delivery, SubtreeManager};
use crate::workflow::Workflow;

/// Resources shared by every node of one host.
pub(crate) struct NodeEnv {
  pub(crate) sender: EventSender,
  pub(crate) runtime: tokio::runtime::Handle,
  pub(crate) observer: Arc<dyn WorkflowObserver>,
}

impl NodeEnv {
  pub(crate) fn notify(&self, event: WorkflowEvent) {
    self.observer.notify(event);
  }
}

/// Lifecycle of a node.
///
/// `Created → Idle ⇄ Rendering`, `Idle ⇄ Applying`, and finally `TornDown`,
/// which is irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
  Created,
  Idle,
  Rendering,
  Applying,
  TornDown,
}

/// One live workflow: its props, its state, and its subtree.
pub struct WorkflowNode<W: Workflow> {
  id: NodeId,
  key: String,
  workflow: W,
  state: W::State,
  subtree: SubtreeManager<W>,
  env: Arc<NodeEnv>,
  phase: NodePhase,
}

impl<W: Workflow> WorkflowNode<W> {
  pub(crate) fn new(workflow: W, key: String, parent: &[NodeId], env: Arc<NodeEnv>) -> Self {
    let id = NodeId::next();
    let path: Arc<[NodeId]> = parent.iter().copied().chain(std::iter::once(id)).collect();
    let state = workflow.initial_state();

    debug!(node_id = %id, workflow = type_name::<W>(), key = %key, "node created");
    env.notify(WorkflowEvent::NodeCreated {
      node_id: id,
      workflow: type_name::<W>().to_string(),
      key: key.clone(),
    });

    Self {
      id,
      key,
      workflow,
      state,
      subtree: SubtreeManager::new(id, path, env.clone()),
      env,
      phase: NodePhase::Created,
    }
  }

  pub fn id(&self) -> NodeId {
    self.id
  }

  /// Key this node was declared at by its parent (empty for the root).
  pub fn key(&self) -> &str {
    &self.key
  }

  /// The most recent props.
  pub fn workflow(&self) -> &W {
    &self.workflow
  }

  pub fn state(&self) -> &W::State {
    &self.state
  }

  pub fn phase(&self) -> NodePhase {
    self.phase
  }

  pub fn subtree(&self) -> &SubtreeManager<W> {
    &self.subtree
  }

  /// Render this node, reconciling its subtree.
  ///
  /// Entries not declared during the pass are torn down before this
  /// returns.
  pub(crate) fn render(&mut self) -> W::Rendering {
    assert!(
      self.phase != NodePhase::TornDown,
      "cannot render torn-down node {} ({})",
      self.id,
      type_name::<W>()
    );

    self.phase = NodePhase::Rendering;
    let mut context = RenderContext::new(&mut self.subtree);
    let rendering = self.workflow.render(&self.state, &mut context);
    // Tears down whatever the pass did not claim
    drop(context);
    self.phase = NodePhase::Idle;

    trace!(node_id = %self.id, workflow = type_name::<W>(), "node rendered");
    self.env.notify(WorkflowEvent::NodeRendered {
      node_id: self.id,
      workflow: type_name::<W>().to_string(),
    });

    rendering
  }

  /// Replace the props, letting the workflow migrate its state.
  pub(crate) fn update(&mut self, workflow: W) {
    let previous = std::mem::replace(&mut self.workflow, workflow);
    self.workflow.on_props_changed(&previous, &mut self.state);
  }

  /// Route an event addressed by `path`, whose first element is this node.
  ///
  /// Outputs of descendants are mapped and applied at each level on the
  /// way back up, so the returned output is this node's.
  pub(crate) fn deliver(&mut self, path: &[NodeId], payload: Payload) -> Delivery<W::Output> {
    if self.phase == NodePhase::TornDown {
      return Delivery::Dropped;
    }

    match path {
      [id, ..] if *id != self.id => Delivery::Dropped,
      [_] => {
        let action = match payload {
          Payload::Action(action) => action.downcast::<AnyAction<W>>().ok().map(|action| *action),
          Payload::WorkerOutput { entry, value } => self.subtree.worker_action(entry, value),
        };
        match action {
          Some(action) => Delivery::Applied(self.handle(action)),
          None => Delivery::Dropped,
        }
      }
      [_, rest @ ..] => match self.subtree.deliver(rest, payload) {
        Delivery::Applied(Some(action)) => Delivery::Applied(self.handle(action)),
        Delivery::Applied(None) => Delivery::Applied(None),
        Delivery::Dropped => Delivery::Dropped,
      },
      [] => Delivery::Dropped,
    }
  }

  fn handle(&mut self, action: AnyAction<W>) -> Option<W::Output> {
    let name = action.name();

    self.phase = NodePhase::Applying;
    let output = action.apply(&mut self.state);
    self.phase = NodePhase::Idle;

    trace!(
      node_id = %self.id,
      action = name,
      produced_output = output.is_some(),
      "action applied"
    );
    self.env.notify(WorkflowEvent::ActionApplied {
      node_id: self.id,
      action: name.to_string(),
      produced_output: output.is_some(),
    });

    output
  }

  /// Tear down the subtree, then the node itself. Idempotent.
  pub(crate) fn tear_down(&mut self) {
    if self.phase == NodePhase::TornDown {
      return;
    }

    self.subtree.tear_down_all();
    self.phase = NodePhase::TornDown;

    debug!(node_id = %self.id, workflow = type_name::<W>(), "node torn down");
    self.env.notify(WorkflowEvent::NodeTornDown {
      node_id: self.id,
      workflow: type_name::<W>().to_string(),
    });
  }
}
