//! Host-side USB transport for LabJack U3, U6, UE9, U12 and Wireless Bridge
//! devices: finding them on the bus, opening and claiming them, gating them on
//! firmware, and moving command and stream data over the right endpoints.
//!
//! The free functions share one process-wide [`DeviceRegistry`] over libusb.
//! Build a registry directly to use other [`TransportOptions`].

pub use rusb;

pub mod config;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod handle;
pub mod kernel;
pub mod probe;
pub mod protocol;
pub mod registry;

mod session;
mod transfer;

pub use crate::config::{KernelCheck, TransportOptions, DEFAULT_TIMEOUT};
pub use crate::device::base::DeviceLocation;
pub use crate::error::{clear_last_error, last_error, ErrorKind, TransportError};
pub use crate::handle::DeviceHandle;
pub use crate::registry::{DeviceRegistry, ProductCount};
pub use labjack_types::{FirmwareVersions, ProductId, TransferKind, TransferMechanism, VersionPair};

use crate::device::libusb::{LibUsbBackend, LibUsbHandle};
use lazy_static::lazy_static;
use strum::EnumCount;

pub const VID_LABJACK: u16 = 0x0CD5;

/// A handle opened through the process-wide registry.
pub type LabJackHandle = DeviceHandle<LibUsbHandle>;

lazy_static! {
    static ref REGISTRY: DeviceRegistry<LibUsbBackend> =
        DeviceRegistry::new(LibUsbBackend::new, TransportOptions::default());
}

pub fn library_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Opens the `ordinal`-th device of `product`, counting from 1. On failure the
/// kind is also available from [`last_error`], and is
/// [`ErrorKind::Busy`] when that device is already open elsewhere.
pub fn open_device(ordinal: u32, product: ProductId) -> Result<LabJackHandle, TransportError> {
    REGISTRY.open_device(ordinal, product)
}

pub fn open_all(max: usize) -> Result<Vec<LabJackHandle>, TransportError> {
    REGISTRY.open_all(max)
}

/// The number of `product` devices attached, or 0 if the bus can't be read.
pub fn count(product: ProductId) -> u32 {
    REGISTRY.count(product).unwrap_or(0)
}

/// Counts for every family, in the order U3, U6, UE9, U12, Wireless Bridge.
pub fn count_all() -> Result<[ProductCount; ProductId::COUNT], TransportError> {
    REGISTRY.count_all()
}
