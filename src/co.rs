//! The suspension capability handed to generator bodies.

use log::{debug, trace};
use thiserror::Error;

use crate::{
    body::{Body, Fault, Flow, FlowKind},
    generator::Generator,
};

/// Protocol misuses of the suspension capability.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Misuse {
    /// The body suspended more than once in a single step.
    #[error("body suspended twice in a single step")]
    DoubleSuspend,

    /// The body suspended, then returned [`Flow::complete`].
    #[error("body completed after suspending")]
    DroppedSuspension,

    /// The body returned a suspending flow minted by another
    /// capability.
    #[error("body suspended without reaching a suspension point")]
    ForeignFlow,
}

/// Value emitted by a step, together with the delegate frames to push
/// on top of the resumption stack.
pub(crate) struct Pending<B: Body> {
    pub(crate) value: B::Yield,
    pub(crate) frames: Vec<B>,
}

/// Suspension capability of a generator body.
///
/// A fresh capability is lent to the body for every step. It is the
/// only way for a body to suspend, either by yielding a value with
/// [`Co::yield_`] or by delegating to another generator with
/// [`Co::yield_all`].
pub struct Co<B: Body> {
    pending: Option<Pending<B>>,
    misuse: Option<Misuse>,
}

impl<B: Body> Co<B> {
    pub(crate) fn new() -> Self {
        Self {
            pending: None,
            misuse: None,
        }
    }

    /// Suspends the body, emitting the given value to the driver.
    ///
    /// The returned flow must be returned from the current step. The
    /// value sent back by the driver is received as the argument of
    /// the next step.
    pub fn yield_(&mut self, value: B::Yield) -> Flow {
        if self.pending.is_some() {
            self.misuse = Some(Misuse::DoubleSuspend);
            return Flow::suspended();
        }

        trace!("break: suspend body");
        let frames = Vec::new();
        self.pending = Some(Pending { value, frames });
        Flow::suspended()
    }

    /// Delegates to the given generator, starting or resuming it with
    /// the given parameter.
    ///
    /// Returns `None` when the inner generator has nothing to emit: the
    /// body should then carry on within the same step. Otherwise the
    /// returned flow must be returned from the current step, and the
    /// following driver calls are forwarded to the inner generator
    /// until it is exhausted. The body is then resumed with a `None`
    /// argument.
    ///
    /// A fault raised by the inner generator when it is started here is
    /// returned as is: the body can either handle it or propagate it
    /// with `?`. Once the delegation is in progress, a fault raised by
    /// the inner generator while the driver calls are forwarded fails
    /// the outer generator directly, the body cannot recover from it.
    pub fn yield_all<I>(
        &mut self,
        mut inner: Generator<I>,
        param: B::Resume,
    ) -> Result<Option<Flow>, Fault>
    where
        I: Body<Yield = B::Yield, Resume = B::Resume> + Into<B>,
    {
        if self.pending.is_some() {
            self.misuse = Some(Misuse::DoubleSuspend);
            return Ok(Some(Flow::suspended()));
        }

        trace!("delegate to inner generator");

        let Some(value) = inner.next(param)? else {
            debug!("inner generator exhausted, pass through");
            return Ok(None);
        };

        let frames: Vec<B> = inner.into_frames().into_iter().map(Into::into).collect();
        debug!("break: suspend body, delegating to {} frame(s)", frames.len());
        self.pending = Some(Pending { value, frames });
        Ok(Some(Flow::suspended()))
    }

    /// Checks the flow returned by the body against what happened to
    /// the capability during the step.
    pub(crate) fn finish(self, flow: Flow) -> Result<Option<Pending<B>>, Misuse> {
        if let Some(misuse) = self.misuse {
            return Err(misuse);
        }

        match (flow.0, self.pending) {
            (FlowKind::Suspended, Some(pending)) => Ok(Some(pending)),
            (FlowKind::Complete, None) => Ok(None),
            (FlowKind::Complete, Some(_)) => Err(Misuse::DroppedSuspension),
            (FlowKind::Suspended, None) => Err(Misuse::ForeignFlow),
        }
    }
}
