//! Collection of generator runtimes.
//!
//! A runtime is responsible for driving a [generator] until it
//! finishes, answering every value it emits.
//!
//! If you miss a runtime matching your requirements, you can easily
//! implement your own by taking example on the existing ones. PRs are
//! welcomed!
//!
//! [generator]: crate::generator::Generator

#[cfg(feature = "std")]
pub mod std;
#[cfg(feature = "tokio")]
pub mod tokio;

use thiserror::Error;

use crate::generator::GeneratorError;

/// Errors that can occur while a runtime drives a generator.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// The other end of a channel was dropped.
    #[error("Generator channel disconnected")]
    Disconnected,
}
