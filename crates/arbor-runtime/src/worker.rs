//! The worker contract.

use futures::stream::BoxStream;

/// An asynchronous operation declared by key during render.
///
/// The host starts the worker the first time its key appears, keeps it
/// running while the key persists and each new declaration is equivalent to
/// the running one, and cancels it (dropping the stream) when the key
/// disappears or a non-equivalent worker replaces it.
///
/// Failures are not interpreted by the host: encode them in `Output`.
pub trait Worker: 'static {
  /// Values delivered back to the declaring node.
  type Output: Send + 'static;

  /// Start the operation.
  ///
  /// Dropping the returned stream is the cancellation signal.
  fn run(&self) -> BoxStream<'static, Self::Output>;

  /// Whether `self` can stand in for an already-running `other`.
  fn is_equivalent(&self, other: &Self) -> bool;
}
