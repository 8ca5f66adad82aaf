//! Arbor Runtime
//!
//! This crate provides the execution engine for trees of composable state
//! machines ("workflows"). Workflows render declaratively, declare
//! asynchronous work and one-shot effects by stable keys, and bubble typed
//! outputs to their parents.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       WorkflowHost                          │
//! │  - owns the root node and the action queue                  │
//! │  - process_next() / run(cancel) apply actions, then render  │
//! │  - publishes renderings (watch) and root outputs (mpsc)     │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowNode                           │
//! │  - state + latest props                                     │
//! │  - applies actions, maps child outputs on the way up        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │           SubtreeManager / RenderContext                    │
//! │  - keyed children, workers, side effects                    │
//! │  - reuse on match, create on miss, tear down the rest       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use arbor_runtime::{RenderContext, Workflow, WorkflowAction, WorkflowHost};
//!
//! struct Counter;
//!
//! impl Workflow for Counter {
//!   type State = u32;
//!   type Rendering = String;
//!   type Output = std::convert::Infallible;
//!
//!   fn initial_state(&self) -> u32 {
//!     0
//!   }
//!
//!   fn render(&self, state: &u32, context: &mut RenderContext<'_, Self>) -> String {
//!     context.run_worker("ticks", TimerWorker::new(period, 3), |_| Tick);
//!     format!("count: {}", state)
//!   }
//! }
//!
//! let mut host = WorkflowHost::new(Counter)?;
//! host.process_next().await;
//! ```

mod action;
mod context;
mod error;
mod events;
mod host;
mod id;
mod lifetime;
mod node;
mod sink;
mod subtree;
mod worker;
mod workflow;

pub use action::{AnyAction, WorkflowAction};
pub use context::RenderContext;
pub use error::HostError;
pub use events::{ChannelObserver, NoopObserver, WorkflowEvent, WorkflowObserver};
pub use host::WorkflowHost;
pub use id::NodeId;
pub use lifetime::Lifetime;
pub use node::{NodePhase, WorkflowNode};
pub use sink::Sink;
pub use subtree::SubtreeManager;
pub use worker::Worker;
pub use workflow::Workflow;

// Re-exported so embedders configure hosts without a direct dependency
pub use arbor_config::{HostConfig, RenderPolicy};
