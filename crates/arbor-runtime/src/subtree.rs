//! Keyed reconciliation of a node's children, workers, and side effects.
//!
//! Each node owns one [`SubtreeManager`] for its whole life. A render pass
//! moves the live entries aside; every declaration made through the
//! [`RenderContext`](crate::RenderContext) either claims its entry back
//! (reuse) or creates a new one. Whatever was not claimed when render
//! returns is torn down before the pass's rendering is published.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::action::{AnyAction, WorkflowAction};
use crate::events::WorkflowEvent;
use crate::id::{EntryId, NodeId};
use crate::lifetime::Lifetime;
use crate::node::{NodeEnv, WorkflowNode};
use crate::sink::{Event, Payload, Sink};
use crate::worker::Worker;
use crate::workflow::Workflow;

/// Entries are unique per `(declared type, caller key)`.
type EntryKey = (TypeId, String);

pub(crate) type OutputMap<O, P> = Box<dyn Fn(O) -> AnyAction<P>>;

/// Result of routing a queued event through the tree.
pub(crate) enum Delivery<T> {
  /// The target node or worker no longer exists.
  Dropped,
  /// An action was applied; carries what it produced for the level above.
  Applied(Option<T>),
}

/// The keyed tables of one node.
pub(crate) struct Entries<W: Workflow> {
  children: HashMap<EntryKey, Box<dyn ChildEntry<W>>>,
  workers: HashMap<EntryKey, Box<dyn WorkerEntry<W>>>,
  side_effects: HashMap<String, Lifetime>,
}

impl<W: Workflow> Default for Entries<W> {
  fn default() -> Self {
    Self {
      children: HashMap::new(),
      workers: HashMap::new(),
      side_effects: HashMap::new(),
    }
  }
}

trait ChildEntry<P: Workflow> {
  fn node_id(&self) -> NodeId;
  fn deliver(&mut self, path: &[NodeId], payload: Payload) -> Delivery<AnyAction<P>>;
  fn tear_down(&mut self);
  fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

struct ChildSlot<P: Workflow, C: Workflow> {
  node: WorkflowNode<C>,
  output_map: OutputMap<C::Output, P>,
}

impl<P: Workflow, C: Workflow> ChildEntry<P> for ChildSlot<P, C> {
  fn node_id(&self) -> NodeId {
    self.node.id()
  }

  fn deliver(&mut self, path: &[NodeId], payload: Payload) -> Delivery<AnyAction<P>> {
    match self.node.deliver(path, payload) {
      Delivery::Applied(Some(output)) => Delivery::Applied(Some((self.output_map)(output))),
      Delivery::Applied(None) => Delivery::Applied(None),
      Delivery::Dropped => Delivery::Dropped,
    }
  }

  fn tear_down(&mut self) {
    self.node.tear_down();
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }
}

trait WorkerEntry<P: Workflow> {
  fn entry_id(&self) -> EntryId;
  fn worker_name(&self) -> &'static str;
  fn map_output(&self, value: Box<dyn Any + Send>) -> Option<AnyAction<P>>;
  fn cancel(&mut self);
  fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

struct WorkerSlot<P: Workflow, K: Worker> {
  entry_id: EntryId,
  worker: K,
  output_map: OutputMap<K::Output, P>,
  cancel: CancellationToken,
  task: JoinHandle<()>,
}

impl<P: Workflow, K: Worker> WorkerEntry<P> for WorkerSlot<P, K> {
  fn entry_id(&self) -> EntryId {
    self.entry_id
  }

  fn worker_name(&self) -> &'static str {
    type_name::<K>()
  }

  fn map_output(&self, value: Box<dyn Any + Send>) -> Option<AnyAction<P>> {
    let value = value.downcast::<K::Output>().ok()?;
    Some((self.output_map)(*value))
  }

  fn cancel(&mut self) {
    self.cancel.cancel();
    self.task.abort();
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }
}

/// Persistent keyed tables for one node.
pub struct SubtreeManager<W: Workflow> {
  node_id: NodeId,
  path: Arc<[NodeId]>,
  env: Arc<NodeEnv>,
  live: Entries<W>,
}

impl<W: Workflow> SubtreeManager<W> {
  pub(crate) fn new(node_id: NodeId, path: Arc<[NodeId]>, env: Arc<NodeEnv>) -> Self {
    Self {
      node_id,
      path,
      env,
      live: Entries::default(),
    }
  }

  /// Id of the owning node.
  pub fn node_id(&self) -> NodeId {
    self.node_id
  }

  pub fn child_count(&self) -> usize {
    self.live.children.len()
  }

  pub fn worker_count(&self) -> usize {
    self.live.workers.len()
  }

  pub fn side_effect_count(&self) -> usize {
    self.live.side_effects.len()
  }

  /// Whether a child of type `C` is live at `key`.
  pub fn has_child<C: Workflow>(&self, key: &str) -> bool {
    self
      .live
      .children
      .contains_key(&(TypeId::of::<C>(), key.to_string()))
  }

  /// Whether a worker of type `K` is live at `key`.
  pub fn has_worker<K: Worker>(&self, key: &str) -> bool {
    self
      .live
      .workers
      .contains_key(&(TypeId::of::<K>(), key.to_string()))
  }

  pub fn has_side_effect(&self, key: &str) -> bool {
    self.live.side_effects.contains_key(key)
  }

  /// Start a pass: the live tables become the previous pass's tables.
  pub(crate) fn begin_pass(&mut self) -> Entries<W> {
    std::mem::take(&mut self.live)
  }

  /// Finish a pass: tear down every entry the pass did not claim.
  pub(crate) fn end_pass(&mut self, stale: Entries<W>) {
    self.tear_down(stale);
  }

  pub(crate) fn make_sink<A: WorkflowAction<W>>(&self) -> Sink<A> {
    Sink::<A>::new::<W>(self.path.clone(), self.env.sender.clone())
  }

  pub(crate) fn render_child<C: Workflow>(
    &mut self,
    previous: &mut Entries<W>,
    key: String,
    workflow: C,
    output_map: OutputMap<C::Output, W>,
  ) -> C::Rendering {
    let entry_key = (TypeId::of::<C>(), key);
    if self.live.children.contains_key(&entry_key) {
      duplicate_key("child", type_name::<C>(), &entry_key.1);
    }

    let mut slot = match previous.children.remove(&entry_key) {
      Some(entry) => {
        let mut slot = downcast::<ChildSlot<W, C>>(entry.into_any(), &entry_key.1);
        slot.node.update(workflow);
        slot.output_map = output_map;
        slot
      }
      None => {
        let node = WorkflowNode::new(workflow, entry_key.1.clone(), &self.path, self.env.clone());
        Box::new(ChildSlot { node, output_map })
      }
    };

    let rendering = slot.node.render();
    self.live.children.insert(entry_key, slot);
    rendering
  }

  pub(crate) fn run_worker<K: Worker>(
    &mut self,
    previous: &mut Entries<W>,
    key: String,
    worker: K,
    output_map: OutputMap<K::Output, W>,
  ) {
    let entry_key = (TypeId::of::<K>(), key);
    if self.live.workers.contains_key(&entry_key) {
      duplicate_key("worker", type_name::<K>(), &entry_key.1);
    }

    let slot = match previous.workers.remove(&entry_key) {
      Some(entry) => {
        let mut slot = downcast::<WorkerSlot<W, K>>(entry.into_any(), &entry_key.1);
        if worker.is_equivalent(&slot.worker) {
          slot.worker = worker;
          slot.output_map = output_map;
          slot
        } else {
          // The old operation is cancelled before its replacement starts
          self.cancel_worker(&entry_key.1, slot.as_mut());
          Box::new(self.start_worker(&entry_key.1, worker, output_map))
        }
      }
      None => Box::new(self.start_worker(&entry_key.1, worker, output_map)),
    };

    self.live.workers.insert(entry_key, slot);
  }

  pub(crate) fn run_side_effect<F>(&mut self, previous: &mut Entries<W>, key: String, effect: F)
  where
    F: FnOnce(&Lifetime),
  {
    if self.live.side_effects.contains_key(&key) {
      duplicate_key("side effect", "side effect", &key);
    }

    let lifetime = match previous.side_effects.remove(&key) {
      Some(lifetime) => lifetime,
      None => {
        let lifetime = Lifetime::new();
        debug!(node_id = %self.node_id, key = %key, "side effect started");
        self.env.notify(WorkflowEvent::SideEffectStarted {
          node_id: self.node_id,
          key: key.clone(),
        });
        effect(&lifetime);
        lifetime
      }
    };

    self.live.side_effects.insert(key, lifetime);
  }

  /// Route an event to the child on `path`, mapping its output into an
  /// action for this node.
  pub(crate) fn deliver(&mut self, path: &[NodeId], payload: Payload) -> Delivery<AnyAction<W>> {
    let Some(child_id) = path.first() else {
      return Delivery::Dropped;
    };

    match self
      .live
      .children
      .values_mut()
      .find(|child| child.node_id() == *child_id)
    {
      Some(child) => child.deliver(path, payload),
      None => Delivery::Dropped,
    }
  }

  /// Turn a worker output into an action, if the worker is still live.
  pub(crate) fn worker_action(
    &self,
    entry: EntryId,
    value: Box<dyn Any + Send>,
  ) -> Option<AnyAction<W>> {
    self
      .live
      .workers
      .values()
      .find(|worker| worker.entry_id() == entry)?
      .map_output(value)
  }

  pub(crate) fn tear_down_all(&mut self) {
    let entries = std::mem::take(&mut self.live);
    self.tear_down(entries);
  }

  fn tear_down(&self, entries: Entries<W>) {
    for (_, mut child) in entries.children {
      child.tear_down();
    }

    for ((_, key), mut worker) in entries.workers {
      self.cancel_worker(&key, worker.as_mut());
    }

    for (key, lifetime) in entries.side_effects {
      lifetime.end();
      debug!(node_id = %self.node_id, key = %key, "side effect ended");
      self.env.notify(WorkflowEvent::SideEffectEnded {
        node_id: self.node_id,
        key,
      });
    }
  }

  fn cancel_worker(&self, key: &str, worker: &mut dyn WorkerEntry<W>) {
    worker.cancel();
    debug!(
      node_id = %self.node_id,
      worker = worker.worker_name(),
      key = %key,
      "worker cancelled"
    );
    self.env.notify(WorkflowEvent::WorkerCancelled {
      node_id: self.node_id,
      worker: worker.worker_name().to_string(),
      key: key.to_string(),
    });
  }

  fn start_worker<K: Worker>(
    &self,
    key: &str,
    worker: K,
    output_map: OutputMap<K::Output, W>,
  ) -> WorkerSlot<W, K> {
    let entry_id = EntryId::next();
    let cancel = CancellationToken::new();
    let mut outputs = worker.run();

    let cancelled = cancel.clone();
    let sender = self.env.sender.clone();
    let path = self.path.clone();
    let task = self.env.runtime.spawn(async move {
      loop {
        tokio::select! {
          biased;
          _ = cancelled.cancelled() => break,
          next = outputs.next() => {
            let Some(value) = next else { break };
            let event = Event {
              path: path.clone(),
              payload: Payload::WorkerOutput {
                entry: entry_id,
                value: Box::new(value),
              },
            };
            if sender.send(event).is_err() {
              break;
            }
          }
        }
      }
    });

    debug!(
      node_id = %self.node_id,
      worker = type_name::<K>(),
      key = %key,
      "worker started"
    );
    self.env.notify(WorkflowEvent::WorkerStarted {
      node_id: self.node_id,
      worker: type_name::<K>().to_string(),
      key: key.to_string(),
    });

    WorkerSlot {
      entry_id,
      worker,
      output_map,
      cancel,
      task,
    }
  }
}

fn duplicate_key(kind: &str, declared: &str, key: &str) -> ! {
  panic!("duplicate {kind} key '{key}' for {declared} within one render pass");
}

fn downcast<T: Any>(entry: Box<dyn Any>, key: &str) -> Box<T> {
  match entry.downcast::<T>() {
    Ok(entry) => entry,
    Err(_) => panic!(
      "reconciliation table holds a mismatched entry at key '{key}', expected {}",
      type_name::<T>()
    ),
  }
}
