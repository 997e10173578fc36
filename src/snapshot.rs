//! Capture and restoration of generators.
//!
//! A snapshot holds the whole coroutine state of a generator: its
//! status, its resumption stack of body frames and the value emitted
//! at the current suspension point. It can be restored in another
//! process, as long as the body implementation is the same.
//!
//! The snapshot layout is the following:
//!
//! - the [`MAGIC`] bytes
//! - a bincode header containing the format version and the body
//!   fingerprint (see [`Body::fingerprint`])
//! - the bincode coroutine state and emitted value

use bincode::Options;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    body::Body,
    generator::{Generator, State},
};

/// Bytes every snapshot starts with.
pub const MAGIC: [u8; 4] = *b"IOGS";

/// Errors that can occur while capturing or restoring a generator.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The generator was interrupted in the middle of a step.
    #[error("Cannot snapshot a generator interrupted in the middle of a step")]
    Poisoned,

    #[error("Cannot encode generator snapshot")]
    Encode(#[source] bincode::Error),

    #[error("Invalid generator snapshot: missing magic bytes")]
    BadMagic,

    #[error("Unsupported generator snapshot format {0}")]
    UnsupportedFormat(u32),

    /// The snapshot was taken from another body implementation.
    #[error("Generator snapshot belongs to body {found}, expected {expected}")]
    BodyMismatch { expected: String, found: String },

    #[error("Cannot decode generator snapshot")]
    Decode(#[source] bincode::Error),

    #[error("Invalid generator snapshot: {0} trailing bytes")]
    TrailingBytes(usize),

    #[error("Inconsistent generator snapshot: {0}")]
    Inconsistent(&'static str),
}

/// Bincode options shared by capture and restoration, matching the
/// bincode defaults.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: u32,
    body: String,
}

/// Opaque, owned serialized form of a generator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    bytes: Vec<u8>,
}

impl Snapshot {
    /// The current snapshot format version.
    pub const FORMAT_VERSION: u32 = 1;

    /// The default snapshot buffer capacity.
    pub const DEFAULT_CAPACITY: usize = 4 * 1024;

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for Snapshot {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl AsRef<[u8]> for Snapshot {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<B: Body> Generator<B> {
    /// Captures the generator into a snapshot, using a buffer with
    /// [`Snapshot::DEFAULT_CAPACITY`] capacity.
    ///
    /// See [`Self::snapshot_with_capacity`] for a custom buffer
    /// capacity.
    pub fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        self.snapshot_with_capacity(Snapshot::DEFAULT_CAPACITY)
    }

    /// Captures the generator into a snapshot, using a buffer with the
    /// given capacity.
    pub fn snapshot_with_capacity(&self, capacity: usize) -> Result<Snapshot, SnapshotError> {
        if let State::Running = self.state {
            return Err(SnapshotError::Poisoned);
        }

        let header = Header {
            format: Snapshot::FORMAT_VERSION,
            body: B::fingerprint(),
        };

        trace!("capture generator of body {}", header.body);

        let mut bytes = Vec::with_capacity(capacity);
        bytes.extend_from_slice(&MAGIC);
        let records: (&State<B>, &Option<B::Yield>) = (&self.state, &self.last_emitted);
        options().serialize_into(&mut bytes, &header).map_err(SnapshotError::Encode)?;
        options().serialize_into(&mut bytes, &records).map_err(SnapshotError::Encode)?;

        debug!("captured generator snapshot of {} bytes", bytes.len());
        Ok(Snapshot { bytes })
    }

    /// Restores a generator from the given snapshot.
    ///
    /// The restored generator behaves exactly like the captured one
    /// would have.
    pub fn restore(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        let Some(input) = snapshot.bytes.strip_prefix(&MAGIC) else {
            return Err(SnapshotError::BadMagic);
        };

        // slice decoding never reads past the input, the limit bounds
        // the overall amount of decoded bytes
        let limit = input.len() as u64;

        let header: Header = options()
            .with_limit(limit)
            .deserialize(input)
            .map_err(SnapshotError::Decode)?;

        if header.format != Snapshot::FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedFormat(header.format));
        }

        let expected = B::fingerprint();

        if header.body != expected {
            let found = header.body;
            return Err(SnapshotError::BodyMismatch { expected, found });
        }

        trace!("restore generator of body {expected}");

        let offset = options()
            .serialized_size(&header)
            .map_err(SnapshotError::Decode)?;
        let input = input.get(offset as usize..).unwrap_or_default();

        let (state, last_emitted): (State<B>, Option<B::Yield>) = options()
            .with_limit(limit)
            .deserialize(input)
            .map_err(SnapshotError::Decode)?;

        let size = options()
            .serialized_size(&(&state, &last_emitted))
            .map_err(SnapshotError::Decode)?;

        if (size as usize) < input.len() {
            return Err(SnapshotError::TrailingBytes(input.len() - size as usize));
        }

        match (&state, &last_emitted) {
            (State::Suspended(frames), _) if frames.is_empty() => {
                return Err(SnapshotError::Inconsistent("suspended without resumption point"));
            }
            (State::Suspended(_), None) => {
                return Err(SnapshotError::Inconsistent("suspended without emitted value"));
            }
            (State::Suspended(_), Some(_)) => (),
            (State::Running, _) => {
                return Err(SnapshotError::Inconsistent("interrupted in the middle of a step"));
            }
            (_, Some(_)) => {
                return Err(SnapshotError::Inconsistent("emitted value outside of a suspension"));
            }
            (_, None) => (),
        }

        debug!("restored generator from snapshot of {} bytes", snapshot.len());
        Ok(Self {
            state,
            last_emitted,
        })
    }
}

/// Captures the given generator into a snapshot.
pub fn snapshot<B: Body>(gen: &Generator<B>) -> Result<Snapshot, SnapshotError> {
    gen.snapshot()
}

/// Restores a generator from the given snapshot.
pub fn restore<B: Body>(snapshot: &Snapshot) -> Result<Generator<B>, SnapshotError> {
    Generator::restore(snapshot)
}
