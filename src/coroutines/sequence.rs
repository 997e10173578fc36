//! Generator body emitting a fixed sequence of values.

use std::{collections::VecDeque, fmt, marker::PhantomData};

use log::trace;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    body::{Body, Fault, Flow},
    co::Co,
};

/// Generator body emitting the given items in order.
///
/// Values sent back by the driver are ignored. An empty sequence is
/// exhausted right away, which makes it a no-op target for
/// [`Co::yield_all`].
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct Sequence<T, R> {
    /// The items left to emit.
    items: VecDeque<T>,

    #[serde(skip)]
    resume: PhantomData<fn(R)>,
}

impl<T, R> Sequence<T, R> {
    /// Creates a new body emitting the given items.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let items: VecDeque<T> = items.into_iter().collect();
        trace!("init sequence of {} items", items.len());
        let resume = PhantomData;
        Self { items, resume }
    }

    /// Creates a new, already exhausted body.
    pub fn empty() -> Self {
        Self::new([])
    }

    /// Returns the amount of items left to emit.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    /// Makes the sequence progress on behalf of any body emitting the
    /// same type of values.
    ///
    /// This allows sequences to be embedded in bigger bodies.
    pub fn step<B>(&mut self, co: &mut Co<B>) -> Flow
    where
        B: Body<Yield = T>,
    {
        match self.items.pop_front() {
            Some(item) => {
                trace!("break: emit sequence item ({} left)", self.items.len());
                co.yield_(item)
            }
            None => {
                trace!("sequence exhausted");
                Flow::complete()
            }
        }
    }
}

impl<T, R> Body for Sequence<T, R>
where
    T: Clone + Serialize + DeserializeOwned,
{
    type Yield = T;
    type Resume = R;

    fn resume(&mut self, co: &mut Co<Self>, _: Option<R>) -> Result<Flow, Fault> {
        Ok(self.step(co))
    }
}

impl<T: fmt::Debug, R> fmt::Debug for Sequence<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("items", &self.items)
            .finish()
    }
}

impl<T: Clone, R> Clone for Sequence<T, R> {
    fn clone(&self) -> Self {
        Self::new(self.items.iter().cloned())
    }
}
