//! Crate-wide error type.
//!
//! Every fallible operation in this crate returns [`Result`]. The variants
//! mirror the way failures actually differ for the caller: a failed
//! bring-up leaves no usable context, a failed bus transfer leaves the
//! context usable for the next call, and an out-of-range argument never
//! touches the hardware at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Hardware bring-up (reset/configuration) failed. Fatal to the
    /// context being initialized; the init sequence is not resumable.
    #[error("display initialization failed: {0}")]
    Init(String),

    /// A single SPI or GPIO operation failed. The context remains usable
    /// for subsequent calls.
    #[error("transport error: {0}")]
    Transport(String),

    /// Out-of-bounds coordinates or dimensions. No hardware access was
    /// attempted.
    #[error("invalid argument: coordinates or dimensions out of range")]
    InvalidArgument,

    /// Pixel buffer allocation failed at init. Fatal to the context.
    #[error("framebuffer allocation failed")]
    Memory,

    /// The requested operation is not available on this backend.
    #[error("operation not supported by this backend")]
    NotSupported,
}

impl Error {
    /// Wrap a bus- or pin-level error as a transport failure.
    pub(crate) fn transport(err: impl core::fmt::Debug) -> Self {
        Error::Transport(format!("{err:?}"))
    }

    /// Wrap an error that occurred during bring-up.
    pub(crate) fn init(err: impl core::fmt::Debug) -> Self {
        Error::Init(format!("{err:?}"))
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
