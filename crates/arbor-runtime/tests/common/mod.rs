//! Shared helpers for arbor-runtime integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arbor_runtime::{ChannelObserver, Worker, Workflow, WorkflowEvent, WorkflowHost};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

/// Create an observer and the receiving end of its events.
pub fn observer() -> (Arc<ChannelObserver>, mpsc::UnboundedReceiver<WorkflowEvent>) {
  let (tx, rx) = mpsc::unbounded_channel();
  (Arc::new(ChannelObserver::new(tx)), rx)
}

/// Collect every event emitted so far.
pub fn drain(events: &mut mpsc::UnboundedReceiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
  let mut drained = Vec::new();
  while let Ok(event) = events.try_recv() {
    drained.push(event);
  }
  drained
}

pub fn count(events: &[WorkflowEvent], matches: impl Fn(&WorkflowEvent) -> bool) -> usize {
  events.iter().filter(|event| matches(event)).count()
}

pub fn position(events: &[WorkflowEvent], matches: impl Fn(&WorkflowEvent) -> bool) -> usize {
  events
    .iter()
    .position(matches)
    .expect("expected event was not emitted")
}

/// Events that create or destroy keyed entries.
pub fn is_structural(event: &WorkflowEvent) -> bool {
  matches!(
    event,
    WorkflowEvent::NodeCreated { .. }
      | WorkflowEvent::NodeTornDown { .. }
      | WorkflowEvent::WorkerStarted { .. }
      | WorkflowEvent::WorkerCancelled { .. }
      | WorkflowEvent::SideEffectStarted { .. }
      | WorkflowEvent::SideEffectEnded { .. }
  )
}

/// Process actions until `done` holds for the current rendering.
pub async fn settle<W, F>(host: &mut WorkflowHost<W>, mut done: F)
where
  W: Workflow,
  F: FnMut(&W::Rendering) -> bool,
{
  tokio::time::timeout(Duration::from_secs(5), async {
    while !done(&*host.rendering()) {
      host.process_next().await;
    }
  })
  .await
  .expect("tree did not settle");
}

/// Emits a fixed list of values, then completes.
#[derive(Debug, Clone, PartialEq)]
pub struct IterWorker(pub Vec<i32>);

impl Worker for IterWorker {
  type Output = i32;

  fn run(&self) -> BoxStream<'static, i32> {
    stream::iter(self.0.clone()).boxed()
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    self == other
  }
}

/// Emits whatever the test feeds it. Equivalent when ids match.
pub struct ChannelWorker<T> {
  id: String,
  receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<T>>>>,
  starts: Arc<AtomicUsize>,
}

impl<T> Clone for ChannelWorker<T> {
  fn clone(&self) -> Self {
    Self {
      id: self.id.clone(),
      receiver: self.receiver.clone(),
      starts: self.starts.clone(),
    }
  }
}

pub fn channel_worker<T>(id: &str) -> (mpsc::UnboundedSender<T>, ChannelWorker<T>) {
  let (tx, rx) = mpsc::unbounded_channel();
  let worker = ChannelWorker {
    id: id.to_string(),
    receiver: Arc::new(Mutex::new(Some(rx))),
    starts: Arc::new(AtomicUsize::new(0)),
  };
  (tx, worker)
}

impl<T> ChannelWorker<T> {
  /// Same feed and start counter under a different identity.
  pub fn with_id(&self, id: &str) -> Self {
    Self {
      id: id.to_string(),
      ..self.clone()
    }
  }

  pub fn starts(&self) -> usize {
    self.starts.load(Ordering::SeqCst)
  }
}

impl<T: Send + 'static> Worker for ChannelWorker<T> {
  type Output = T;

  fn run(&self) -> BoxStream<'static, T> {
    self.starts.fetch_add(1, Ordering::SeqCst);
    match self.receiver.lock().unwrap().take() {
      Some(receiver) => stream::unfold(receiver, |mut receiver| async move {
        let value = receiver.recv().await?;
        Some((value, receiver))
      })
      .boxed(),
      None => stream::empty().boxed(),
    }
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    self.id == other.id
  }
}
