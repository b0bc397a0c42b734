use labjack_types::{ProductId, TransferKind};
use log::warn;
use std::cell::Cell;
use strum::Display;

/// The failure taxonomy every public operation reports through, both in its
/// returned error and in the out-of-band [`last_error`] slot.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidHandle,
    InvalidParameter,
    Unsupported,
    Io,
    AccessDenied,
    DeviceGone,
    NotFound,
    Busy,
    Timeout,
    Overflow,
    Halted,
    Interrupted,
    OutOfMemory,
    IncompatibleFirmware,
    Other,
}

impl ErrorKind {
    #[cfg(unix)]
    pub fn errno(&self) -> nix::errno::Errno {
        use nix::errno::Errno;

        match self {
            ErrorKind::InvalidHandle => Errno::EINVAL,
            ErrorKind::InvalidParameter => Errno::EINVAL,
            ErrorKind::Unsupported => Errno::ENOSYS,
            ErrorKind::Io => Errno::EIO,
            ErrorKind::AccessDenied => Errno::EACCES,
            ErrorKind::DeviceGone => Errno::ENXIO,
            ErrorKind::NotFound => Errno::ENOENT,
            ErrorKind::Busy => Errno::EBUSY,
            ErrorKind::Timeout => Errno::ETIMEDOUT,
            ErrorKind::Overflow => Errno::EOVERFLOW,
            ErrorKind::Halted => Errno::EPIPE,
            ErrorKind::Interrupted => Errno::EINTR,
            ErrorKind::OutOfMemory => Errno::ENOMEM,
            ErrorKind::IncompatibleFirmware => Errno::EPROTO,
            ErrorKind::Other => Errno::ENOSYS,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TransportError {
    #[error("Device handle is closed or no longer connected")]
    InvalidHandle,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{product} has no {kind} endpoint")]
    UnsupportedOperation {
        product: ProductId,
        kind: TransferKind,
    },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("No {product} found at position {ordinal}")]
    DeviceNotFound { product: ProductId, ordinal: u32 },

    #[error("No data arrived on interrupt endpoint {endpoint:#04x}")]
    NoData { endpoint: u8 },

    #[error("Device {product_id:#06x} failed the firmware check: {reason}")]
    IncompatibleFirmware { product_id: u16, reason: String },

    #[error("USB error: {source}")]
    Usb {
        kind: ErrorKind,
        source: rusb::Error,
    },
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::InvalidHandle => ErrorKind::InvalidHandle,
            TransportError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            TransportError::UnsupportedOperation { .. } => ErrorKind::Unsupported,
            TransportError::Unsupported(_) => ErrorKind::Unsupported,
            TransportError::DeviceNotFound { .. } => ErrorKind::NotFound,
            TransportError::NoData { .. } => ErrorKind::Timeout,
            TransportError::IncompatibleFirmware { .. } => ErrorKind::IncompatibleFirmware,
            TransportError::Usb { kind, .. } => *kind,
        }
    }

    /// An interrupt endpoint that had nothing to say. Callers polling a U12 or
    /// a bridge should simply try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::NoData { .. })
    }
}

/// Translates a libusb status into the transport taxonomy, logging the
/// original code on the way through.
pub fn translate(error: rusb::Error) -> TransportError {
    let kind = match error {
        rusb::Error::Io => ErrorKind::Io,
        rusb::Error::InvalidParam => ErrorKind::InvalidParameter,
        rusb::Error::Access => ErrorKind::AccessDenied,
        rusb::Error::NoDevice => ErrorKind::DeviceGone,
        rusb::Error::NotFound => ErrorKind::NotFound,
        rusb::Error::Busy => ErrorKind::Busy,
        rusb::Error::Timeout => ErrorKind::Timeout,
        rusb::Error::Overflow => ErrorKind::Overflow,
        rusb::Error::Pipe => ErrorKind::Halted,
        rusb::Error::Interrupted => ErrorKind::Interrupted,
        rusb::Error::NoMem => ErrorKind::OutOfMemory,
        rusb::Error::NotSupported => ErrorKind::Unsupported,
        rusb::Error::Other => ErrorKind::Other,
        _ => {
            warn!("libusb error: unexpected status {:?}", error);
            return TransportError::Usb {
                kind: ErrorKind::Other,
                source: error,
            };
        }
    };

    warn!("libusb error: {:?} ({})", error, kind);
    TransportError::Usb {
        kind,
        source: error,
    }
}

thread_local! {
    static LAST_ERROR: Cell<Option<ErrorKind>> = const { Cell::new(None) };
}

/// The kind of the most recent failure on this thread, errno style. A
/// successful call leaves the previous value in place.
pub fn last_error() -> Option<ErrorKind> {
    LAST_ERROR.with(|slot| slot.get())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|slot| slot.set(None));
}

pub(crate) fn set_last_error(kind: ErrorKind) {
    LAST_ERROR.with(|slot| slot.set(Some(kind)));
}

/// Stores the kind of a failing result before handing it back.
pub(crate) fn record<T>(result: Result<T, TransportError>) -> Result<T, TransportError> {
    if let Err(error) = &result {
        set_last_error(error.kind());
    }
    result
}
