use crate::device::base::{DeviceLocation, UsbHandle, CONTROL_INTERFACE};
use crate::error::{record, set_last_error, ErrorKind, TransportError};
use crate::probe::{check_compatibility, ProbeOutcome};
use crate::transfer::{is_alive, transfer, transfer_to, TransferBuffer};
use labjack_types::{ProductId, TransferKind};
use log::{debug, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One claimed LabJack interface. Transfers on a handle are serialised, so it
/// can be shared between threads, and every call after [`close`] fails with
/// [`TransportError::InvalidHandle`] instead of reaching the bus.
///
/// Dropping the handle closes it.
///
/// [`close`]: DeviceHandle::close
pub struct DeviceHandle<H: UsbHandle> {
    inner: Mutex<Option<H>>,
    product_id: u16,
    location: DeviceLocation,
    timeout: Duration,
}

impl<H: UsbHandle> DeviceHandle<H> {
    pub(crate) fn new(
        handle: H,
        product_id: u16,
        location: DeviceLocation,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(Some(handle)),
            product_id,
            location,
            timeout,
        }
    }

    /// The product identity read from the device descriptor at open time.
    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn product(&self) -> Option<ProductId> {
        ProductId::from_id(self.product_id)
    }

    pub fn location(&self) -> DeviceLocation {
        self.location
    }

    fn lock(&self) -> MutexGuard<'_, Option<H>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_handle<T>(
        &self,
        task: impl FnOnce(&H) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        match self.lock().as_ref() {
            Some(handle) => task(handle),
            None => Err(TransportError::InvalidHandle),
        }
    }

    fn transfer(
        &self,
        kind: TransferKind,
        buffer: TransferBuffer<'_>,
    ) -> Result<usize, TransportError> {
        record(self.with_handle(|handle| {
            transfer(handle, self.product_id, kind, buffer, self.timeout)
        }))
    }

    /// Sends `data` to the product's command endpoint, returning the number of
    /// bytes the device accepted.
    pub fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        self.transfer(TransferKind::Write, TransferBuffer::Outbound(data))
    }

    /// Reads a command response into `buf`, returning the number of bytes
    /// received.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.transfer(TransferKind::Read, TransferBuffer::Inbound(buf))
    }

    /// Reads stream data. The U12 and the Wireless Bridge have no stream
    /// endpoint and always fail with [`ErrorKind::InvalidParameter`].
    pub fn stream(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.transfer(TransferKind::Stream, TransferBuffer::Inbound(buf))
    }

    #[deprecated(note = "use `read` or `stream`, which pick the endpoint for the product")]
    pub fn bulk_read(&self, endpoint: u8, buf: &mut [u8]) -> Result<usize, TransportError> {
        record(self.with_handle(|handle| {
            transfer_to(handle, endpoint, TransferBuffer::Inbound(buf), self.timeout)
        }))
    }

    #[deprecated(note = "use `write`, which picks the endpoint for the product")]
    pub fn bulk_write(&self, endpoint: u8, data: &[u8]) -> Result<usize, TransportError> {
        record(self.with_handle(|handle| {
            transfer_to(
                handle,
                endpoint,
                TransferBuffer::Outbound(data),
                self.timeout,
            )
        }))
    }

    /// Whether the handle is open and the device still answers a control
    /// request. A device that was unplugged goes stale without being closed.
    pub fn is_valid(&self) -> bool {
        match self.lock().as_ref() {
            Some(handle) => is_alive(handle, self.timeout),
            None => false,
        }
    }

    /// Cancelling an in-flight transfer isn't possible through libusb's
    /// synchronous calls, so this always returns `false`.
    pub fn abort_pipe(&self, pipe: u8) -> bool {
        debug!("Abort requested on pipe {:#04x}, not supported", pipe);
        set_last_error(ErrorKind::Unsupported);
        false
    }

    pub(crate) fn check_compatibility(
        &self,
        kernel_recent: bool,
    ) -> Result<ProbeOutcome, TransportError> {
        self.with_handle(|handle| {
            check_compatibility(handle, self.product_id, kernel_recent, self.timeout)
        })
    }

    /// Releases the interface and closes the device. Closing twice is a no-op.
    pub fn close(&self) {
        let Some(mut handle) = self.lock().take() else {
            return;
        };

        if let Err(e) = handle.release_interface(CONTROL_INTERFACE) {
            warn!(
                "Unable to release interface on device {:?}: {}",
                self.location, e
            );
        }
        debug!(
            "Closed device {:#06x} at {:?}",
            self.product_id, self.location
        );
    }
}

impl<H: UsbHandle> Drop for DeviceHandle<H> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<H: UsbHandle> std::fmt::Debug for DeviceHandle<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("product_id", &format_args!("{:#06x}", self.product_id))
            .field("location", &self.location)
            .finish()
    }
}
