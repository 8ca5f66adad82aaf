//! Identifiers for nodes and keyed entries.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
  NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a workflow node.
///
/// Ids are never reused within a process, so a [`Sink`](crate::Sink) that
/// outlives its node can never reach a node created later at the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
  pub(crate) fn next() -> Self {
    Self(next_id())
  }

  pub fn as_u64(self) -> u64 {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "node-{}", self.0)
  }
}

/// Identity of one started worker operation.
///
/// A worker restarted at the same key gets a fresh id; outputs still queued
/// for the old id are dropped on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(u64);

impl EntryId {
  pub(crate) fn next() -> Self {
    Self(next_id())
  }
}
