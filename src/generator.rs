//! The generator handle and its state machine.

use std::{fmt, mem};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    body::{Body, Fault},
    co::{Co, Misuse, Pending},
};

/// Errors that can occur when driving a generator.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum GeneratorError {
    /// The body faulted during the step.
    #[error(transparent)]
    Fault(#[from] Fault),

    /// The body misused its suspension capability during the step.
    #[error("Generator body misused its suspension capability: {0}")]
    Misuse(#[from] Misuse),

    /// A previous step never finished, most likely because the body
    /// panicked.
    #[error("Generator was interrupted in the middle of a step")]
    Poisoned,
}

impl From<GeneratorError> for Fault {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Fault(fault) => fault,
            err => Fault::new(err),
        }
    }
}

/// Observable status of a generator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// The body has not been started yet.
    NotStarted,

    /// The body is paused at a suspension point, waiting for the next
    /// driver call.
    Suspended,

    /// The body ran to completion.
    Completed,

    /// The body faulted or misused its suspension capability.
    Failed,

    /// A step was entered but never finished, most likely because the
    /// body panicked. The generator cannot be driven nor captured
    /// anymore.
    Poisoned,
}

/// Internal state of a generator.
///
/// The resumption stack of a suspended generator holds the root body
/// first and the active delegate last. It is never empty.
#[derive(Serialize, Deserialize)]
#[serde(bound = "B: Body")]
pub(crate) enum State<B: Body> {
    NotStarted(B),
    Suspended(Vec<B>),
    Completed,
    Failed(Fault),
    /// A step is in progress. Never part of a snapshot.
    #[serde(skip)]
    Running,
}

/// Bidirectional generator driven by one caller at a time.
///
/// Each call to [`Generator::next`] sends a value into the body and
/// runs it until it emits a value at its next suspension point, or
/// until it finishes.
pub struct Generator<B: Body> {
    pub(crate) state: State<B>,
    pub(crate) last_emitted: Option<B::Yield>,
}

impl<B: Body> Generator<B> {
    /// Creates a new, not started generator from the given body.
    pub fn new(body: B) -> Self {
        trace!("init generator");
        Self {
            state: State::NotStarted(body),
            last_emitted: None,
        }
    }

    /// Makes the generator progress.
    ///
    /// The first call starts the body with the given parameter as its
    /// initial input, following calls resume the body from its last
    /// suspension point. Returns the emitted value, or `None` once the
    /// body has finished.
    ///
    /// A body fault is returned exactly once; the generator then stays
    /// failed and every following call returns `None`.
    pub fn next(&mut self, param: B::Resume) -> Result<Option<B::Yield>, GeneratorError> {
        let mut frames = match mem::replace(&mut self.state, State::Running) {
            State::NotStarted(body) => {
                debug!("start generator body");
                vec![body]
            }
            State::Suspended(frames) => {
                trace!("resume generator at depth {}", frames.len() - 1);
                frames
            }
            State::Running => return Err(GeneratorError::Poisoned),
            state => {
                trace!("generator already terminated");
                self.state = state;
                return Ok(None);
            }
        };

        self.last_emitted = None;
        let mut arg = Some(param);

        loop {
            let Some(body) = frames.last_mut() else {
                debug!("generator body completed");
                self.state = State::Completed;
                return Ok(None);
            };

            let mut co = Co::new();

            let flow = match body.resume(&mut co, arg.take()) {
                Ok(flow) => flow,
                Err(fault) => {
                    debug!("generator body faulted: {fault}");
                    self.state = State::Failed(fault.clone());
                    return Err(GeneratorError::Fault(fault));
                }
            };

            match co.finish(flow) {
                Ok(Some(Pending { value, frames: delegate })) => {
                    frames.extend(delegate);
                    trace!("generator suspended at depth {}", frames.len() - 1);
                    self.last_emitted = Some(value.clone());
                    self.state = State::Suspended(frames);
                    return Ok(Some(value));
                }
                Ok(None) => {
                    frames.pop();
                    if !frames.is_empty() {
                        trace!("delegation exhausted, resume depth {}", frames.len() - 1);
                    }
                }
                Err(misuse) => {
                    debug!("generator body misuse: {misuse}");
                    self.state = State::Failed(Fault::new(misuse));
                    return Err(GeneratorError::Misuse(misuse));
                }
            }
        }
    }

    /// Returns the status of the generator.
    pub fn status(&self) -> Status {
        match self.state {
            State::NotStarted(_) => Status::NotStarted,
            State::Suspended(_) => Status::Suspended,
            State::Completed => Status::Completed,
            State::Failed(_) => Status::Failed,
            State::Running => Status::Poisoned,
        }
    }

    /// Returns the value emitted at the current suspension point.
    pub fn last_emitted(&self) -> Option<&B::Yield> {
        self.last_emitted.as_ref()
    }

    /// Returns the fault that made the generator fail, if any.
    pub fn failure(&self) -> Option<&Fault> {
        match &self.state {
            State::Failed(fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns the amount of delegations currently in progress.
    pub fn depth(&self) -> usize {
        match &self.state {
            State::Suspended(frames) => frames.len().saturating_sub(1),
            _ => 0,
        }
    }

    /// Consumes the generator, returning its resumption stack.
    pub(crate) fn into_frames(self) -> Vec<B> {
        match self.state {
            State::Suspended(frames) => frames,
            _ => Vec::new(),
        }
    }
}

impl<B: Body> fmt::Debug for Generator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("status", &self.status())
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        panic::{self, AssertUnwindSafe},
    };

    use serde::{Deserialize, Serialize};

    use crate::{
        body::{Body, Fault, Flow},
        co::{Co, Misuse},
    };

    use super::{Generator, GeneratorError, Status};

    #[derive(Debug, Serialize, Deserialize)]
    enum Letters {
        Start,
        AfterA,
        AfterB,
    }

    impl Body for Letters {
        type Yield = char;
        type Resume = u8;

        fn resume(&mut self, co: &mut Co<Self>, _: Option<u8>) -> Result<Flow, Fault> {
            match self {
                Letters::Start => {
                    *self = Letters::AfterA;
                    Ok(co.yield_('A'))
                }
                Letters::AfterA => {
                    *self = Letters::AfterB;
                    Ok(co.yield_('B'))
                }
                Letters::AfterB => Ok(Flow::complete()),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct FaultAfterFirst {
        started: bool,
    }

    impl Body for FaultAfterFirst {
        type Yield = u8;
        type Resume = u8;

        fn resume(&mut self, co: &mut Co<Self>, _: Option<u8>) -> Result<Flow, Fault> {
            if self.started {
                return Err(Fault::new("boom"));
            }

            self.started = true;
            Ok(co.yield_(1))
        }
    }

    /// Emits the running sum of its inputs, `remaining` times.
    #[derive(Debug, Serialize, Deserialize)]
    struct Sum {
        total: i64,
        remaining: u8,
    }

    impl Body for Sum {
        type Yield = i64;
        type Resume = i64;

        fn resume(&mut self, co: &mut Co<Self>, arg: Option<i64>) -> Result<Flow, Fault> {
            self.total += arg.unwrap_or_default();

            if self.remaining == 0 {
                return Ok(Flow::complete());
            }

            self.remaining -= 1;
            Ok(co.yield_(self.total))
        }
    }

    thread_local! {
        static LEAKED: RefCell<Option<Flow>> = RefCell::new(None);
    }

    #[derive(Debug, Serialize, Deserialize)]
    enum Misbehaving {
        DoubleYield,
        CompleteAfterYield,
        YieldThenDelegate,
        /// Suspends, leaks the flow, then faults.
        Leak,
        /// Returns the flow leaked by another generator.
        Foreign,
        Panic,
    }

    impl Body for Misbehaving {
        type Yield = u8;
        type Resume = ();

        fn resume(&mut self, co: &mut Co<Self>, _: Option<()>) -> Result<Flow, Fault> {
            match self {
                Misbehaving::DoubleYield => {
                    let _ = co.yield_(1);
                    Ok(co.yield_(2))
                }
                Misbehaving::CompleteAfterYield => {
                    let _ = co.yield_(1);
                    Ok(Flow::complete())
                }
                Misbehaving::YieldThenDelegate => {
                    let _ = co.yield_(1);
                    let inner = Generator::new(Misbehaving::DoubleYield);
                    Ok(co.yield_all(inner, ())?.unwrap_or_else(Flow::complete))
                }
                Misbehaving::Leak => {
                    let flow = co.yield_(1);
                    LEAKED.with(|leaked| *leaked.borrow_mut() = Some(flow));
                    Err(Fault::new("leak"))
                }
                Misbehaving::Foreign => {
                    let mut leaky = Generator::new(Misbehaving::Leak);
                    assert!(leaky.next(()).is_err());
                    let flow = LEAKED.with(|leaked| leaked.borrow_mut().take());
                    flow.ok_or_else(|| Fault::new("nothing leaked"))
                }
                Misbehaving::Panic => panic!("body panicked"),
            }
        }
    }

    #[test]
    fn yield_twice_then_complete() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(Letters::Start);
        assert_eq!(gen.status(), Status::NotStarted);

        assert_eq!(gen.next(0), Ok(Some('A')));
        assert_eq!(gen.status(), Status::Suspended);
        assert_eq!(gen.last_emitted(), Some(&'A'));

        assert_eq!(gen.next(1), Ok(Some('B')));
        assert_eq!(gen.next(2), Ok(None));
        assert_eq!(gen.status(), Status::Completed);
        assert_eq!(gen.last_emitted(), None);

        assert_eq!(gen.next(3), Ok(None));
        assert_eq!(gen.status(), Status::Completed);
    }

    #[test]
    fn fault_is_propagated_once() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(FaultAfterFirst { started: false });

        assert_eq!(gen.next(0), Ok(Some(1)));

        let err = GeneratorError::Fault(Fault::new("boom"));
        assert_eq!(gen.next(1), Err(err));
        assert_eq!(gen.status(), Status::Failed);
        assert_eq!(gen.failure(), Some(&Fault::new("boom")));

        assert_eq!(gen.next(2), Ok(None));
        assert_eq!(gen.next(3), Ok(None));
    }

    #[test]
    fn first_param_is_body_input() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(Sum {
            total: 0,
            remaining: 3,
        });

        assert_eq!(gen.next(1), Ok(Some(1)));
        assert_eq!(gen.next(2), Ok(Some(3)));
        assert_eq!(gen.next(3), Ok(Some(6)));
        assert_eq!(gen.next(4), Ok(None));
    }

    #[test]
    fn same_inputs_same_outputs() {
        let _ = env_logger::try_init();

        let inputs = [4, -2, 9, 0, 7, 1];

        let run = || {
            let mut gen = Generator::new(Sum {
                total: 10,
                remaining: 4,
            });

            inputs.iter().map(|n| gen.next(*n)).collect::<Vec<_>>()
        };

        let outputs = run();
        assert_eq!(outputs, run());
        assert_eq!(outputs[3], Ok(Some(21)));
        assert_eq!(outputs[4..], [Ok(None), Ok(None)]);
    }

    #[test]
    fn double_yield_is_misuse() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(Misbehaving::DoubleYield);

        let err = GeneratorError::Misuse(Misuse::DoubleSuspend);
        assert_eq!(gen.next(()), Err(err));
        assert_eq!(gen.status(), Status::Failed);
        assert_eq!(gen.next(()), Ok(None));
    }

    #[test]
    fn complete_after_yield_is_misuse() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(Misbehaving::CompleteAfterYield);

        let err = GeneratorError::Misuse(Misuse::DroppedSuspension);
        assert_eq!(gen.next(()), Err(err));
        assert_eq!(gen.next(()), Ok(None));
    }

    #[test]
    fn delegate_after_yield_is_misuse() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(Misbehaving::YieldThenDelegate);

        let err = GeneratorError::Misuse(Misuse::DoubleSuspend);
        assert_eq!(gen.next(()), Err(err));
        assert_eq!(gen.status(), Status::Failed);
        assert_eq!(gen.next(()), Ok(None));
    }

    #[test]
    fn foreign_flow_is_misuse() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(Misbehaving::Foreign);

        let err = GeneratorError::Misuse(Misuse::ForeignFlow);
        assert_eq!(gen.next(()), Err(err));
        assert_eq!(gen.status(), Status::Failed);
        assert_eq!(gen.next(()), Ok(None));
    }

    #[test]
    fn panic_poisons_generator() {
        let _ = env_logger::try_init();

        let mut gen = Generator::new(Misbehaving::Panic);

        let res = panic::catch_unwind(AssertUnwindSafe(|| gen.next(())));
        assert!(res.is_err());

        assert_eq!(gen.status(), Status::Poisoned);
        assert_eq!(gen.next(()), Err(GeneratorError::Poisoned));
    }
}
