use crate::device::base::UsbHandle;
use crate::endpoint::{is_known_endpoint, resolve_id, Endpoint};
use crate::error::{translate, TransportError};
use labjack_types::{TransferKind, TransferMechanism};
use log::{debug, warn};
use std::time::Duration;

pub(crate) enum TransferBuffer<'a> {
    Outbound(&'a [u8]),
    Inbound(&'a mut [u8]),
}

impl TransferBuffer<'_> {
    fn len(&self) -> usize {
        match self {
            TransferBuffer::Outbound(data) => data.len(),
            TransferBuffer::Inbound(buf) => buf.len(),
        }
    }
}

/// A handle is alive if the device still answers a real control request.
pub(crate) fn is_alive<H: UsbHandle>(handle: &H, timeout: Duration) -> bool {
    match handle.read_configuration(timeout) {
        Ok(_) => true,
        Err(e) => {
            debug!("Handle failed the liveness check: {}", e);
            false
        }
    }
}

/// Routes a transfer to the endpoint and mechanism the product uses for
/// `kind`. A short transfer is a success carrying the real byte count.
pub(crate) fn transfer<H: UsbHandle>(
    handle: &H,
    product_id: u16,
    kind: TransferKind,
    buffer: TransferBuffer<'_>,
    timeout: Duration,
) -> Result<usize, TransportError> {
    if !is_alive(handle, timeout) {
        return Err(TransportError::InvalidHandle);
    }

    let endpoint = resolve_id(product_id, kind).map_err(|e| match e {
        TransportError::InvalidParameter(_) => e,
        other => TransportError::InvalidParameter(other.to_string()),
    })?;

    perform(handle, endpoint, buffer, timeout)
}

/// The older calling convention, where the caller names a bulk endpoint
/// directly and product-based routing is skipped.
pub(crate) fn transfer_to<H: UsbHandle>(
    handle: &H,
    address: u8,
    buffer: TransferBuffer<'_>,
    timeout: Duration,
) -> Result<usize, TransportError> {
    if !is_alive(handle, timeout) {
        return Err(TransportError::InvalidHandle);
    }

    if !is_known_endpoint(address) {
        warn!(
            "Endpoint {:#04x} is not a known LabJack endpoint, check the endpoint constants in use",
            address
        );
    }

    let endpoint = Endpoint {
        address,
        mechanism: TransferMechanism::Bulk,
    };
    perform(handle, endpoint, buffer, timeout)
}

fn perform<H: UsbHandle>(
    handle: &H,
    endpoint: Endpoint,
    buffer: TransferBuffer<'_>,
    timeout: Duration,
) -> Result<usize, TransportError> {
    debug!(
        "{} transfer on endpoint {:#04x}, {} bytes",
        endpoint.mechanism,
        endpoint.address,
        buffer.len()
    );

    let address = endpoint.address;
    let result = match (endpoint.mechanism, buffer) {
        (TransferMechanism::Bulk, TransferBuffer::Outbound(data)) => {
            handle.write_bulk(address, data, timeout)
        }
        (TransferMechanism::Bulk, TransferBuffer::Inbound(buf)) => {
            handle.read_bulk(address, buf, timeout)
        }
        (TransferMechanism::Interrupt, TransferBuffer::Outbound(data)) => {
            handle.write_interrupt(address, data, timeout)
        }
        (TransferMechanism::Interrupt, TransferBuffer::Inbound(buf)) => {
            handle.read_interrupt(address, buf, timeout)
        }
    };

    match result {
        Ok(transferred) => {
            debug!("Transferred {} bytes on {:#04x}", transferred, address);
            Ok(transferred)
        }
        // Interrupt pipes go quiet whenever the device has nothing to report
        Err(rusb::Error::Timeout) if endpoint.mechanism == TransferMechanism::Interrupt => {
            Err(TransportError::NoData { endpoint: address })
        }
        Err(e) => Err(translate(e)),
    }
}
