#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![doc = include_str!("../README.md")]

pub mod body;
pub mod co;
pub mod coroutines;
pub mod generator;
pub mod runtimes;
pub mod snapshot;

#[doc(inline)]
pub use self::{
    body::{Body, Fault, Flow},
    co::{Co, Misuse},
    generator::{Generator, GeneratorError, Status},
    snapshot::{Snapshot, SnapshotError},
};
