//! Error types for the JDI panel hardware library.

use embedded_hal::digital::ErrorKind;
use std::collections::TryReserveError;
use thiserror::Error;

/// Boxed error reported by an external collaborator (regulator, DSI host).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by the panel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A regulator or GPIO line could not be acquired.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A power rail or control line failed to switch.
    #[error(transparent)]
    Power(#[from] PowerError),

    /// A command frame could not be transmitted.
    #[error(transparent)]
    Tx(#[from] TxError),

    /// The mode list could not be built.
    #[error(transparent)]
    Mode(#[from] ModeError),

    /// The DSI host refused the link parameters.
    #[error("failed to attach to DSI host: {0}")]
    Attach(#[source] BoxError),

    /// No registered driver claims the compatible string.
    #[error("no driver matches compatible \"{0}\"")]
    NoDriver(String),

    /// A driver already claims the compatible string.
    #[error("compatible \"{0}\" is already registered")]
    DuplicateCompatible(String),
}

/// Failure to acquire one of the named panel resources.
#[derive(Error, Debug)]
#[error("cannot get {resource}: {source}")]
pub struct ResourceError {
    /// Name the resource was requested under (e.g. `vddp`, `dcdc-en`).
    pub resource: &'static str,
    #[source]
    pub source: BoxError,
}

/// Power rail and control line failures.
#[derive(Error, Debug)]
pub enum PowerError {
    /// Enabling a supply failed.
    #[error("regulator {supply} enable failed: {source}")]
    RegulatorEnable {
        supply: String,
        #[source]
        source: BoxError,
    },

    /// Disabling a supply failed.
    #[error("regulator {supply} disable failed: {source}")]
    RegulatorDisable {
        supply: String,
        #[source]
        source: BoxError,
    },

    /// Driving a GPIO line failed.
    #[error("gpio {line} could not be driven {level}: {kind:?}")]
    Gpio {
        line: &'static str,
        level: &'static str,
        kind: ErrorKind,
    },
}

/// Command transmission failures.
#[derive(Error, Debug)]
pub enum TxError {
    /// The host rejected or failed to deliver a frame.
    ///
    /// `index` is the 0-based position inside the replayed sequence, `None`
    /// for frames sent outside a replay.
    #[error("failed to send frame{}: {source}", fmt_index(.index))]
    Transfer {
        index: Option<usize>,
        #[source]
        source: BoxError,
    },

    /// Frames must carry at least one byte.
    #[error("empty payload")]
    EmptyPayload,

    /// Payload does not fit the 16-bit length field.
    #[error("payload too long: {0} bytes")]
    PayloadTooLong(usize),

    /// DSI supports virtual channels 0-3 only.
    #[error("invalid virtual channel {0}")]
    InvalidChannel(u8),
}

impl TxError {
    /// Index of the failing frame within a replayed sequence, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            TxError::Transfer { index, .. } => *index,
            _ => None,
        }
    }

    pub(crate) fn at(self, position: usize) -> Self {
        match self {
            TxError::Transfer { source, .. } => TxError::Transfer {
                index: Some(position),
                source,
            },
            other => other,
        }
    }
}

fn fmt_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" {}", i),
        None => String::new(),
    }
}

/// Mode reporting failures.
#[derive(Error, Debug)]
pub enum ModeError {
    /// Storage for the mode copy could not be reserved.
    #[error("failed to add mode {hdisplay}x{vdisplay}@{vrefresh}: {source}")]
    Alloc {
        hdisplay: u16,
        vdisplay: u16,
        vrefresh: u32,
        #[source]
        source: TryReserveError,
    },
}
