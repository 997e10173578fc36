//! The Tokio-based, async generator runtime.

use std::future::Future;

use log::{debug, trace};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::{body::Body, generator::Generator};

use super::RuntimeError;

/// Drives the given generator until it finishes, answering every
/// emitted value with the given async handler.
///
/// The generator itself runs synchronously between two suspension
/// points, only the handler is awaited.
pub async fn drive<B, F, Fut>(
    gen: &mut Generator<B>,
    first: B::Resume,
    mut handle: F,
) -> Result<usize, RuntimeError>
where
    B: Body,
    F: FnMut(B::Yield) -> Fut,
    Fut: Future<Output = B::Resume>,
{
    let mut count = 0;
    let mut param = first;

    while let Some(value) = gen.next(param)? {
        count += 1;
        trace!("handling emitted value #{count} asynchronously");
        param = handle(value).await;
    }

    debug!("generator finished after {count} emitted values");
    Ok(count)
}

/// Drives the given generator until it finishes, sending every
/// emitted value through `tx` and awaiting the answer on `rx`.
pub async fn serve<B: Body>(
    gen: &mut Generator<B>,
    first: B::Resume,
    tx: &Sender<B::Yield>,
    rx: &mut Receiver<B::Resume>,
) -> Result<usize, RuntimeError> {
    let mut count = 0;
    let mut param = first;

    while let Some(value) = gen.next(param)? {
        count += 1;
        trace!("sending emitted value #{count} asynchronously");
        tx.send(value).await.map_err(|_| RuntimeError::Disconnected)?;
        param = rx.recv().await.ok_or(RuntimeError::Disconnected)?;
    }

    debug!("generator finished after {count} emitted values");
    Ok(count)
}
