//! Generator bodies, written as explicit state machines.

use std::{any, fmt};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::co::Co;

/// The body of a generator.
///
/// A body is a plain, serializable state machine: usually an enum
/// whose tag tells which suspension point comes next, and whose
/// variants hold the locals that are live across that point. Since
/// the whole body is data, a suspended generator can be captured into
/// a [`Snapshot`] and restored later on.
///
/// [`Snapshot`]: crate::snapshot::Snapshot
pub trait Body: Serialize + DeserializeOwned {
    /// The type of values emitted at suspension points.
    type Yield: Clone + Serialize + DeserializeOwned;

    /// The type of values sent back by the driver.
    type Resume;

    /// Revision of the body implementation.
    ///
    /// Bump it whenever the layout or the meaning of the body changes,
    /// so that snapshots taken from older revisions are rejected
    /// instead of being resumed into undefined behaviour.
    const REVISION: u32 = 0;

    /// Makes the body progress by one step.
    ///
    /// The given argument is `Some` when the step was triggered by the
    /// driver, including the very first step where it holds the
    /// body's initial input. It is `None` when the body is resumed
    /// after an exhausted [`Co::yield_all`] delegation.
    ///
    /// The step ends either with the [`Flow`] returned by the
    /// suspension primitives of `co`, or with [`Flow::complete`].
    fn resume(&mut self, co: &mut Co<Self>, arg: Option<Self::Resume>) -> Result<Flow, Fault>;

    /// Identifies the body implementation inside snapshots.
    fn fingerprint() -> String {
        format!("{}@{}", any::type_name::<Self>(), Self::REVISION)
    }
}

/// How a body step ended.
///
/// Suspending flows can only be obtained from [`Co`], which makes the
/// suspension primitives unreachable from outside a body.
#[derive(Debug, Eq, PartialEq)]
#[must_use = "a flow must be returned from the body step"]
pub struct Flow(pub(crate) FlowKind);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum FlowKind {
    Suspended,
    Complete,
}

impl Flow {
    /// The body ran to completion.
    pub fn complete() -> Self {
        Self(FlowKind::Complete)
    }

    pub(crate) fn suspended() -> Self {
        Self(FlowKind::Suspended)
    }
}

/// Unhandled error raised by a body between two suspension points.
#[derive(Clone, Debug, Eq, PartialEq, Error, Serialize, Deserialize)]
#[error("Generator fault: {message}")]
pub struct Fault {
    message: String,
}

impl Fault {
    pub fn new(msg: impl fmt::Display) -> Self {
        let message = msg.to_string();
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
