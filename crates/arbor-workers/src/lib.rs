//! Arbor Workers
//!
//! Common [`Worker`](arbor_runtime::Worker) implementations:
//!
//! - [`TimerWorker`]: emits numbered ticks at a fixed period
//! - [`StreamWorker`]: wraps a stream factory under a stable identity
//! - [`FutureWorker`]: runs one future and emits its result

mod future;
mod stream;
mod timer;

pub use future::FutureWorker;
pub use stream::StreamWorker;
pub use timer::TimerWorker;
