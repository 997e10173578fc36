//! The standard, blocking generator runtime.

use std::sync::mpsc::{Receiver, Sender};

use log::{debug, trace};

use crate::{body::Body, generator::Generator};

use super::RuntimeError;

/// Drives the given generator until it finishes, answering every
/// emitted value with the given handler.
///
/// The first parameter is the initial input of the body. Returns the
/// amount of values emitted by the generator.
pub fn drive<B: Body>(
    gen: &mut Generator<B>,
    first: B::Resume,
    mut handle: impl FnMut(B::Yield) -> B::Resume,
) -> Result<usize, RuntimeError> {
    drive_fallible(gen, first, |value| Ok(handle(value)))
}

/// Drives the given generator until it finishes, sending every
/// emitted value through `tx` and waiting for the answer on `rx`.
pub fn serve<B: Body>(
    gen: &mut Generator<B>,
    first: B::Resume,
    tx: &Sender<B::Yield>,
    rx: &Receiver<B::Resume>,
) -> Result<usize, RuntimeError> {
    drive_fallible(gen, first, |value| {
        tx.send(value).map_err(|_| RuntimeError::Disconnected)?;
        rx.recv().map_err(|_| RuntimeError::Disconnected)
    })
}

fn drive_fallible<B: Body>(
    gen: &mut Generator<B>,
    first: B::Resume,
    mut handle: impl FnMut(B::Yield) -> Result<B::Resume, RuntimeError>,
) -> Result<usize, RuntimeError> {
    let mut count = 0;
    let mut param = first;

    while let Some(value) = gen.next(param)? {
        count += 1;
        trace!("handling emitted value #{count} synchronously");
        param = handle(value)?;
    }

    debug!("generator finished after {count} emitted values");
    Ok(count)
}
