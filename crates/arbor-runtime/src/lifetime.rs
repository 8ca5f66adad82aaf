//! Side-effect lifetimes.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

type Callback = Box<dyn FnOnce() + Send>;

/// Cancellation registration handed to a side effect.
///
/// A lifetime ends when the side effect's key disappears from a render pass
/// or its node is torn down. Callbacks registered with [`on_ended`] run
/// exactly once, in registration order.
///
/// [`on_ended`]: Lifetime::on_ended
#[derive(Clone)]
pub struct Lifetime {
  inner: Arc<Inner>,
}

struct Inner {
  token: CancellationToken,
  // None once ended
  callbacks: Mutex<Option<Vec<Callback>>>,
}

impl Lifetime {
  pub(crate) fn new() -> Self {
    Self {
      inner: Arc::new(Inner {
        token: CancellationToken::new(),
        callbacks: Mutex::new(Some(Vec::new())),
      }),
    }
  }

  /// Register a callback for when the lifetime ends.
  ///
  /// Runs immediately if the lifetime has already ended.
  pub fn on_ended<F>(&self, callback: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let mut callbacks = self.inner.callbacks.lock();
    if let Some(pending) = callbacks.as_mut() {
      pending.push(Box::new(callback));
      return;
    }
    drop(callbacks);
    callback();
  }

  /// A token cancelled when the lifetime ends, for tasks the effect spawns.
  pub fn token(&self) -> CancellationToken {
    self.inner.token.child_token()
  }

  /// Whether the lifetime has ended.
  pub fn is_ended(&self) -> bool {
    self.inner.token.is_cancelled()
  }

  pub(crate) fn end(&self) {
    let callbacks = self.inner.callbacks.lock().take();
    self.inner.token.cancel();
    for callback in callbacks.into_iter().flatten() {
      callback();
    }
  }
}

impl fmt::Debug for Lifetime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Lifetime")
      .field("ended", &self.is_ended())
      .finish()
  }
}
