//! The root driver.
//!
//! The [`WorkflowHost`] owns the root node and the queue every [`Sink`]
//! and worker delivers into. Actions are applied one at a time, in arrival
//! order, on whichever task drives the host; a render pass only starts once
//! the current batch of queued actions has been applied.
//!
//! [`Sink`]: crate::Sink

use std::any::type_name;
use std::sync::Arc;

use arbor_config::HostConfig;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::error::HostError;
use crate::events::{NoopObserver, WorkflowEvent, WorkflowObserver};
use crate::node::{NodeEnv, NodePhase, WorkflowNode};
use crate::sink::Event;
use crate::subtree::Delivery;
use crate::workflow::Workflow;

/// Hosts a workflow tree and publishes its renderings and outputs.
///
/// # Usage
///
/// ```ignore
/// let mut host = WorkflowHost::new(Checkout { cart })?;
///
/// // Observe renderings and root outputs
/// let mut renderings = host.renderings();
/// let mut outputs = host.take_outputs().expect("outputs already taken");
///
/// // Drive the tree until cancelled
/// let cancel = CancellationToken::new();
/// host.run(cancel).await;
/// ```
pub struct WorkflowHost<W: Workflow> {
  root: WorkflowNode<W>,
  env: Arc<NodeEnv>,
  events: mpsc::UnboundedReceiver<Event>,
  rendering: watch::Sender<W::Rendering>,
  outputs: mpsc::UnboundedSender<W::Output>,
  outputs_rx: Option<mpsc::UnboundedReceiver<W::Output>>,
  config: HostConfig,
  passes: u64,
}

impl<W: Workflow> WorkflowHost<W> {
  /// Create a host with default configuration and no observer.
  ///
  /// Must be called from within a tokio runtime, which workers run on.
  pub fn new(workflow: W) -> Result<Self, HostError> {
    Self::with_config(workflow, HostConfig::default())
  }

  /// Create a host with the given configuration.
  pub fn with_config(workflow: W, config: HostConfig) -> Result<Self, HostError> {
    Self::with_observer(workflow, config, Arc::new(NoopObserver))
  }

  /// Create a host that reports tree events to `observer`.
  ///
  /// Builds the root node, renders it once, and publishes the rendering.
  #[instrument(
    name = "host_new",
    skip(workflow, config, observer),
    fields(label = %config.label, root = type_name::<W>())
  )]
  pub fn with_observer(
    workflow: W,
    config: HostConfig,
    observer: Arc<dyn WorkflowObserver>,
  ) -> Result<Self, HostError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(HostError::NoRuntime)?;
    let (sender, events) = mpsc::unbounded_channel();
    let env = Arc::new(NodeEnv {
      sender,
      runtime,
      observer,
    });

    let mut root = WorkflowNode::new(workflow, String::new(), &[], env.clone());
    let rendering = root.render();
    let (rendering, _) = watch::channel(rendering);
    let (outputs, outputs_rx) = mpsc::unbounded_channel();

    let host = Self {
      root,
      env,
      events,
      rendering,
      outputs,
      outputs_rx: Some(outputs_rx),
      config,
      passes: 0,
    };
    host.pass_completed(0);

    info!(root_id = %host.root.id(), "workflow host started");
    Ok(host)
  }

  /// The current rendering.
  pub fn rendering(&self) -> watch::Ref<'_, W::Rendering> {
    self.rendering.borrow()
  }

  /// Subscribe to renderings. The receiver always holds the latest one.
  pub fn renderings(&self) -> watch::Receiver<W::Rendering> {
    self.rendering.subscribe()
  }

  /// Take the stream of root outputs.
  ///
  /// Outputs produced before this call are buffered. Returns `None` once
  /// taken.
  pub fn take_outputs(&mut self) -> Option<mpsc::UnboundedReceiver<W::Output>> {
    self.outputs_rx.take()
  }

  pub fn root(&self) -> &WorkflowNode<W> {
    &self.root
  }

  pub fn config(&self) -> &HostConfig {
    &self.config
  }

  /// Number of render passes completed, including the initial one.
  pub fn render_passes(&self) -> u64 {
    self.passes + 1
  }

  /// Give the root new props and render.
  ///
  /// Actions already queued are applied before the props change, so the
  /// pass sees them.
  #[instrument(name = "host_update", skip(self, workflow), fields(label = %self.config.label))]
  pub fn update(&mut self, workflow: W) {
    let applied = self.apply_queued(self.config.batch_limit());
    self.root.update(workflow);
    self.render_pass(applied);
  }

  /// Apply queued actions without waiting, rendering if any were applied.
  ///
  /// Returns the number of actions applied.
  #[instrument(name = "host_process_pending", skip(self), fields(label = %self.config.label))]
  pub fn process_pending(&mut self) -> usize {
    let applied = self.apply_queued(self.config.batch_limit());
    if applied > 0 {
      self.render_pass(applied);
    }
    applied
  }

  /// Wait for at least one action to apply, then apply the rest of the
  /// batch and render once.
  ///
  /// Returns the number of actions applied. Cancel-safe: nothing is
  /// dequeued until the wait completes.
  #[instrument(name = "host_process_next", skip(self), fields(label = %self.config.label))]
  pub async fn process_next(&mut self) -> usize {
    loop {
      // The env holds a sender, so the queue never closes while we run
      let Some(event) = self.events.recv().await else {
        return 0;
      };

      let mut applied = usize::from(self.dispatch(event));
      applied += self.apply_queued(self.config.batch_limit().saturating_sub(1));

      if applied > 0 {
        self.render_pass(applied);
        return applied;
      }
    }
  }

  /// Drive the tree until `cancel` fires, then tear it down.
  #[instrument(name = "host_run", skip(self, cancel), fields(label = %self.config.label))]
  pub async fn run(mut self, cancel: CancellationToken) {
    let root_id = self.root.id();
    info!(root_id = %root_id, "workflow host running");

    loop {
      tokio::select! {
          _ = cancel.cancelled() => {
              info!(root_id = %root_id, "workflow host cancelled");
              break;
          }
          _ = self.process_next() => {}
      }
    }

    self.shutdown();
  }

  /// Tear down the whole tree, cancelling every worker and ending every
  /// side-effect lifetime.
  pub fn shutdown(mut self) {
    self.tear_down();
  }

  fn tear_down(&mut self) {
    if self.root.phase() == NodePhase::TornDown {
      return;
    }
    self.root.tear_down();
    info!(
      root_id = %self.root.id(),
      render_passes = self.render_passes(),
      "workflow host stopped"
    );
  }

  /// Apply up to `limit` queued actions without waiting.
  fn apply_queued(&mut self, limit: usize) -> usize {
    let mut applied = 0;
    let mut received = 0;

    while received < limit {
      let Ok(event) = self.events.try_recv() else {
        break;
      };
      received += 1;
      if self.dispatch(event) {
        applied += 1;
      }
    }

    applied
  }

  /// Apply one queued event. Returns whether an action was applied.
  fn dispatch(&mut self, event: Event) -> bool {
    let target = event.target();

    match self.root.deliver(&event.path, event.payload) {
      Delivery::Applied(output) => {
        if let Some(output) = output {
          debug!(root_id = %self.root.id(), "root output emitted");
          self.env.notify(WorkflowEvent::OutputEmitted {
            node_id: self.root.id(),
          });
          // Embedder may have dropped the receiver
          let _ = self.outputs.send(output);
        }
        true
      }
      Delivery::Dropped => {
        if let Some(node_id) = target {
          trace!(node_id = %node_id, "dropping action for torn-down target");
          self.env.notify(WorkflowEvent::ActionDropped { node_id });
        }
        false
      }
    }
  }

  fn render_pass(&mut self, actions_applied: usize) {
    let rendering = self.root.render();
    self.rendering.send_replace(rendering);
    self.passes += 1;
    self.pass_completed(actions_applied);
  }

  fn pass_completed(&self, actions_applied: usize) {
    debug!(pass = self.passes, actions_applied, "render pass completed");
    self.env.notify(WorkflowEvent::RenderPassCompleted {
      pass: self.passes,
      actions_applied,
    });
  }
}

impl<W: Workflow> Drop for WorkflowHost<W> {
  fn drop(&mut self) {
    self.tear_down();
  }
}
