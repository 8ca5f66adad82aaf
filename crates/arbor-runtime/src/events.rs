//! Tree events and observers.
//!
//! Events are emitted while the host reconciles and dispatches, so consumers
//! can trace node lifecycles, assert on reconciliation, stream to a debugger,
//! etc.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::id::NodeId;

/// Events emitted by nodes and the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowEvent {
  /// A node was created and its initial state built.
  NodeCreated {
    node_id: NodeId,
    workflow: String,
    key: String,
  },

  /// A node finished a render, including reconciliation of its subtree.
  NodeRendered { node_id: NodeId, workflow: String },

  /// A node and its whole subtree were torn down.
  NodeTornDown { node_id: NodeId, workflow: String },

  /// A worker operation was started.
  WorkerStarted {
    node_id: NodeId,
    worker: String,
    key: String,
  },

  /// A worker operation was cancelled (key dropped or worker replaced).
  WorkerCancelled {
    node_id: NodeId,
    worker: String,
    key: String,
  },

  /// A side effect was invoked for a new key.
  SideEffectStarted { node_id: NodeId, key: String },

  /// A side effect's lifetime ended.
  SideEffectEnded { node_id: NodeId, key: String },

  /// An action was applied to a node's state.
  ActionApplied {
    node_id: NodeId,
    action: String,
    produced_output: bool,
  },

  /// A queued action targeted a node or worker that no longer exists.
  ActionDropped { node_id: NodeId },

  /// The root node produced an output for the embedder.
  OutputEmitted { node_id: NodeId },

  /// The host finished a render pass and published its rendering.
  RenderPassCompleted { pass: u64, actions_applied: usize },
}

/// Trait for receiving tree events.
///
/// The host calls `notify` for each event on the render thread.
/// Implementations decide what to do with them (log, record, forward, etc.).
pub trait WorkflowObserver: Send + Sync {
  /// Called when a tree event occurs.
  fn notify(&self, event: WorkflowEvent);
}

/// An observer that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {
  fn notify(&self, _event: WorkflowEvent) {}
}

/// An observer that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
  // Unbounded so a slow consumer never stalls a render pass. Volume is a
  // handful of events per node per pass.
  sender: mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelObserver {
  /// Create a new channel observer.
  pub fn new(sender: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
    Self { sender }
  }
}

impl WorkflowObserver for ChannelObserver {
  fn notify(&self, event: WorkflowEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_observer_forwards() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer = ChannelObserver::new(tx);

    observer.notify(WorkflowEvent::RenderPassCompleted {
      pass: 1,
      actions_applied: 2,
    });

    assert_eq!(
      rx.try_recv().unwrap(),
      WorkflowEvent::RenderPassCompleted {
        pass: 1,
        actions_applied: 2,
      }
    );
  }

  #[test]
  fn test_channel_observer_ignores_closed_receiver() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    ChannelObserver::new(tx).notify(WorkflowEvent::SideEffectEnded {
      node_id: NodeId::next(),
      key: "k".to_string(),
    });
  }

  #[test]
  fn test_event_serializes_node_id_as_number() {
    let node_id = NodeId::next();
    let json = serde_json::to_value(WorkflowEvent::OutputEmitted { node_id }).unwrap();
    assert_eq!(json["OutputEmitted"]["node_id"], node_id.as_u64());
  }
}
