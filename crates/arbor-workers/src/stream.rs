use std::fmt;
use std::sync::Arc;

use arbor_runtime::Worker;
use futures::Stream;
use futures::stream::{BoxStream, StreamExt};

type Factory<T> = Arc<dyn Fn() -> BoxStream<'static, T> + Send + Sync>;

/// Runs a stream built by a factory, identified by `id`.
///
/// The factory is called each time the worker starts. Workers with the same
/// id are equivalent, so the running stream survives re-renders; change the
/// id to restart it.
pub struct StreamWorker<T> {
  id: String,
  factory: Factory<T>,
}

impl<T: Send + 'static> StreamWorker<T> {
  pub fn new<F, S>(id: impl Into<String>, factory: F) -> Self
  where
    F: Fn() -> S + Send + Sync + 'static,
    S: Stream<Item = T> + Send + 'static,
  {
    Self {
      id: id.into(),
      factory: Arc::new(move || factory().boxed()),
    }
  }
}

impl<T> Clone for StreamWorker<T> {
  fn clone(&self) -> Self {
    Self {
      id: self.id.clone(),
      factory: self.factory.clone(),
    }
  }
}

impl<T> fmt::Debug for StreamWorker<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StreamWorker")
      .field("id", &self.id)
      .finish_non_exhaustive()
  }
}

impl<T: Send + 'static> Worker for StreamWorker<T> {
  type Output = T;

  fn run(&self) -> BoxStream<'static, T> {
    (self.factory)()
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    self.id == other.id
  }
}
