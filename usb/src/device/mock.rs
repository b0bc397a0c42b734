// An in-memory bus for exercising the transport without hardware attached.
use crate::device::base::{UsbBackend, UsbDevice, UsbHandle};
use labjack_types::{ProductId, TransferMechanism, VersionPair};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MockTransfer {
    pub endpoint: u8,
    pub mechanism: TransferMechanism,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    vendor_id: u16,
    product_id: u16,
    address: u8,
    descriptor_error: Option<rusb::Error>,
    open_error: Option<rusb::Error>,

    kernel_driver: AtomicBool,
    claimed: AtomicBool,
    disconnected: AtomicBool,

    opens: AtomicUsize,
    closes: AtomicUsize,
    detaches: AtomicUsize,

    transfers: Mutex<Vec<MockTransfer>>,
    replies: Mutex<VecDeque<rusb::Result<Vec<u8>>>>,
    write_limit: Mutex<Option<usize>>,
    write_error: Mutex<Option<rusb::Error>>,
}

#[derive(Clone)]
pub(crate) struct MockDevice {
    state: Arc<MockState>,
}

impl MockDevice {
    pub fn new(vendor_id: u16, product_id: u16, address: u8) -> Self {
        Self {
            state: Arc::new(MockState {
                vendor_id,
                product_id,
                address,
                ..Default::default()
            }),
        }
    }

    pub fn labjack(product_id: u16, address: u8) -> Self {
        Self::new(crate::VID_LABJACK, product_id, address)
    }

    fn configure(mut self, change: impl FnOnce(&mut MockState)) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.state) {
            change(state);
        }
        self
    }

    pub fn with_descriptor_error(self, error: rusb::Error) -> Self {
        self.configure(|state| state.descriptor_error = Some(error))
    }

    pub fn with_open_error(self, error: rusb::Error) -> Self {
        self.configure(|state| state.open_error = Some(error))
    }

    pub fn with_kernel_driver(self) -> Self {
        self.state.kernel_driver.store(true, Ordering::SeqCst);
        self
    }

    pub fn reply(&self, data: &[u8]) -> &Self {
        self.lock_replies().push_back(Ok(data.to_vec()));
        self
    }

    pub fn reply_error(&self, error: rusb::Error) -> &Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    pub fn limit_writes(&self, limit: usize) {
        *lock(&self.state.write_limit) = Some(limit);
    }

    pub fn fail_writes(&self, error: rusb::Error) {
        *lock(&self.state.write_error) = Some(error);
    }

    pub fn unplug(&self) {
        self.state.disconnected.store(true, Ordering::SeqCst);
    }

    /// Marks the interface as claimed by some other process.
    pub fn claim_elsewhere(&self) {
        self.state.claimed.store(true, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn detaches(&self) -> usize {
        self.state.detaches.load(Ordering::SeqCst)
    }

    pub fn is_claimed(&self) -> bool {
        self.state.claimed.load(Ordering::SeqCst)
    }

    pub fn transfers(&self) -> Vec<MockTransfer> {
        lock(&self.state.transfers).clone()
    }

    pub fn writes(&self) -> Vec<MockTransfer> {
        self.transfers()
            .into_iter()
            .filter(|transfer| transfer.endpoint & 0x80 == 0)
            .collect()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<rusb::Result<Vec<u8>>>> {
        lock(&self.state.replies)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl UsbDevice for MockDevice {
    type Handle = MockHandle;

    fn bus_number(&self) -> u8 {
        1
    }

    fn address(&self) -> u8 {
        self.state.address
    }

    fn ids(&self) -> rusb::Result<(u16, u16)> {
        match self.state.descriptor_error {
            Some(error) => Err(error),
            None => Ok((self.state.vendor_id, self.state.product_id)),
        }
    }

    fn open(&self) -> rusb::Result<MockHandle> {
        if let Some(error) = self.state.open_error {
            return Err(error);
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle {
            state: self.state.clone(),
            claimed: false,
        })
    }
}

#[derive(Default)]
pub(crate) struct MockBackend {
    devices: Vec<MockDevice>,
    list_error: Option<rusb::Error>,
}

impl MockBackend {
    pub fn with_devices(devices: &[MockDevice]) -> Self {
        Self {
            devices: devices.to_vec(),
            list_error: None,
        }
    }

    pub fn failing(error: rusb::Error) -> Self {
        Self {
            devices: Vec::new(),
            list_error: Some(error),
        }
    }
}

impl UsbBackend for MockBackend {
    type Device = MockDevice;
    type Handle = MockHandle;

    fn devices(&self) -> rusb::Result<Vec<MockDevice>> {
        match self.list_error {
            Some(error) => Err(error),
            None => Ok(self.devices.clone()),
        }
    }
}

pub(crate) struct MockHandle {
    state: Arc<MockState>,
    claimed: bool,
}

impl MockHandle {
    fn check_connected(&self) -> rusb::Result<()> {
        if self.state.disconnected.load(Ordering::SeqCst) {
            return Err(rusb::Error::NoDevice);
        }
        Ok(())
    }

    fn read(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        mechanism: TransferMechanism,
    ) -> rusb::Result<usize> {
        self.check_connected()?;
        lock(&self.state.transfers).push(MockTransfer {
            endpoint,
            mechanism,
            data: Vec::new(),
        });

        match lock(&self.state.replies).pop_front() {
            None => Err(rusb::Error::Timeout),
            Some(Err(error)) => Err(error),
            Some(Ok(data)) => {
                let length = data.len().min(buf.len());
                buf[..length].copy_from_slice(&data[..length]);
                Ok(length)
            }
        }
    }

    fn write(&self, endpoint: u8, buf: &[u8], mechanism: TransferMechanism) -> rusb::Result<usize> {
        self.check_connected()?;
        if let Some(error) = *lock(&self.state.write_error) {
            return Err(error);
        }

        let limit = *lock(&self.state.write_limit);
        let length = limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        lock(&self.state.transfers).push(MockTransfer {
            endpoint,
            mechanism,
            data: buf[..length].to_vec(),
        });
        Ok(length)
    }
}

impl UsbHandle for MockHandle {
    fn kernel_driver_active(&self, _interface: u8) -> rusb::Result<bool> {
        Ok(self.state.kernel_driver.load(Ordering::SeqCst))
    }

    fn detach_kernel_driver(&mut self, _interface: u8) -> rusb::Result<()> {
        self.state.detaches.fetch_add(1, Ordering::SeqCst);
        self.state.kernel_driver.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn claim_interface(&mut self, _interface: u8) -> rusb::Result<()> {
        if self.state.kernel_driver.load(Ordering::SeqCst)
            || self.state.claimed.swap(true, Ordering::SeqCst)
        {
            return Err(rusb::Error::Busy);
        }
        self.claimed = true;
        Ok(())
    }

    fn release_interface(&mut self, _interface: u8) -> rusb::Result<()> {
        if !self.claimed {
            return Err(rusb::Error::NotFound);
        }
        self.claimed = false;
        self.state.claimed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], _timeout: Duration) -> rusb::Result<usize> {
        self.read(endpoint, buf, TransferMechanism::Bulk)
    }

    fn write_bulk(&self, endpoint: u8, buf: &[u8], _timeout: Duration) -> rusb::Result<usize> {
        self.write(endpoint, buf, TransferMechanism::Bulk)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        self.read(endpoint, buf, TransferMechanism::Interrupt)
    }

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], _timeout: Duration) -> rusb::Result<usize> {
        self.write(endpoint, buf, TransferMechanism::Interrupt)
    }

    fn read_configuration(&self, _timeout: Duration) -> rusb::Result<u8> {
        self.check_connected()?;
        Ok(1)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        if self.claimed {
            self.state.claimed.store(false, Ordering::SeqCst);
        }
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A well-formed reply to the version query of `product`.
pub(crate) fn version_reply(
    product: ProductId,
    firmware: VersionPair,
    hardware: VersionPair,
) -> Vec<u8> {
    let mut response = vec![0u8; 38];
    match product {
        ProductId::Ue9 => {
            response[1..4].copy_from_slice(&[0x78, 0x10, 0x01]);
            response[36] = firmware.minor();
            response[37] = firmware.major();
        }
        _ => {
            response[1..4].copy_from_slice(&[0xf8, 0x10, 0x08]);
            response[9] = firmware.minor();
            response[10] = firmware.major();
            response[13] = hardware.minor();
            response[14] = hardware.major();
        }
    }
    response
}
