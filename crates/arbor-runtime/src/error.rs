//! Host error types.

/// Errors that can occur while setting up a host.
///
/// Structural mistakes in a workflow tree (duplicate keys, rendering a
/// torn-down node) are not errors: they panic, since the tree cannot be
/// safely reconciled afterwards.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
  /// No tokio runtime is available to run workers on.
  #[error("no tokio runtime available to run workers")]
  NoRuntime(#[source] tokio::runtime::TryCurrentError),
}
