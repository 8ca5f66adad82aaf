//! Sinks: thread-safe handles that queue actions for a node.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::action::{AnyAction, WorkflowAction};
use crate::id::{EntryId, NodeId};
use crate::workflow::Workflow;

/// A queued delivery, addressed by the path of node ids from the root.
pub(crate) struct Event {
  pub(crate) path: Arc<[NodeId]>,
  pub(crate) payload: Payload,
}

impl Event {
  /// The node the event is addressed to.
  pub(crate) fn target(&self) -> Option<NodeId> {
    self.path.last().copied()
  }
}

pub(crate) enum Payload {
  /// An `AnyAction<W>` for the target node's workflow.
  Action(Box<dyn Any + Send>),
  /// A raw value from one of the target node's workers.
  WorkerOutput {
    entry: EntryId,
    value: Box<dyn Any + Send>,
  },
}

pub(crate) type EventSender = mpsc::UnboundedSender<Event>;

type EraseFn<A> = Arc<dyn Fn(A) -> Box<dyn Any + Send> + Send + Sync>;

/// A handle that delivers actions to one node.
///
/// Sinks can be cloned, kept, and invoked from any thread. Sending never
/// applies the action inline: it is queued and applied by the host before
/// the next render pass. Sending to a node that has been torn down (or a
/// host that has been dropped) is a no-op.
pub struct Sink<A> {
  target: Arc<[NodeId]>,
  sender: EventSender,
  erase: EraseFn<A>,
}

impl<A> Sink<A> {
  pub(crate) fn new<W>(target: Arc<[NodeId]>, sender: EventSender) -> Self
  where
    W: Workflow,
    A: WorkflowAction<W>,
  {
    Self {
      target,
      sender,
      erase: Arc::new(|action: A| Box::new(AnyAction::<W>::new(action)) as Box<dyn Any + Send>),
    }
  }

  /// Queue an action for the target node.
  pub fn send(&self, action: A) {
    let event = Event {
      path: self.target.clone(),
      payload: Payload::Action((self.erase)(action)),
    };
    if self.sender.send(event).is_err() {
      trace!(node_id = ?self.node_id(), "host is gone, dropping action");
    }
  }

  /// Derive a sink accepting `B`, converted to `A` on send.
  pub fn contramap<B, F>(&self, map: F) -> Sink<B>
  where
    A: 'static,
    B: 'static,
    F: Fn(B) -> A + Send + Sync + 'static,
  {
    let erase = self.erase.clone();
    Sink {
      target: self.target.clone(),
      sender: self.sender.clone(),
      erase: Arc::new(move |value: B| erase(map(value))),
    }
  }

  /// The node this sink delivers to.
  pub fn node_id(&self) -> Option<NodeId> {
    self.target.last().copied()
  }
}

impl<A> Clone for Sink<A> {
  fn clone(&self) -> Self {
    Self {
      target: self.target.clone(),
      sender: self.sender.clone(),
      erase: self.erase.clone(),
    }
  }
}

impl<A> fmt::Debug for Sink<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Sink")
      .field("target", &self.node_id())
      .finish_non_exhaustive()
  }
}
