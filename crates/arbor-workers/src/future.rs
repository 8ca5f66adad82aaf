use std::fmt;
use std::future::Future;
use std::sync::Arc;

use arbor_runtime::Worker;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};

type Factory<T> = Arc<dyn Fn() -> BoxFuture<'static, T> + Send + Sync>;

/// Runs one future and emits its result, identified by `id`.
///
/// Encode failures in `T` (typically a `Result`) so the declaring workflow
/// can turn them into state.
pub struct FutureWorker<T> {
  id: String,
  factory: Factory<T>,
}

impl<T: Send + 'static> FutureWorker<T> {
  pub fn new<F, Fut>(id: impl Into<String>, factory: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
  {
    Self {
      id: id.into(),
      factory: Arc::new(move || factory().boxed()),
    }
  }
}

impl<T> Clone for FutureWorker<T> {
  fn clone(&self) -> Self {
    Self {
      id: self.id.clone(),
      factory: self.factory.clone(),
    }
  }
}

impl<T> fmt::Debug for FutureWorker<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FutureWorker")
      .field("id", &self.id)
      .finish_non_exhaustive()
  }
}

impl<T: Send + 'static> Worker for FutureWorker<T> {
  type Output = T;

  fn run(&self) -> BoxStream<'static, T> {
    stream::once((self.factory)()).boxed()
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    self.id == other.id
  }
}
