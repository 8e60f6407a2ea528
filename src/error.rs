//! Unified error type for the GPIO event layer.
//!
//! Follows embedded practice: a single `Copy` enum that every constructor
//! can return, keeping application setup code uniform. Errors only occur at
//! construction time — the debounce and quadrature state machines absorb
//! invalid input instead of signalling (a sample that never settles simply
//! never commits a transition).

use crate::ports::PinId;
use core::fmt;

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Pin is outside the platform's valid range.
    InvalidPin(PinId),
    /// The same pin was assigned to two roles of one device
    /// (e.g. both lines of an encoder).
    DuplicatePin(PinId),
    /// A configuration field failed range validation.
    /// The `&'static str` describes which field and why.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "pin {pin} is not valid on this platform"),
            Self::DuplicatePin(pin) => write!(f, "pin {pin} assigned twice"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
