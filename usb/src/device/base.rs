use std::time::Duration;

/// The interface LabJack devices expose their command pipes on.
pub const CONTROL_INTERFACE: u8 = 0;

/// A live connection to the host USB stack. One of these backs every
/// enumeration and open call in the process.
pub trait UsbBackend: Send + Sync {
    type Device: UsbDevice<Handle = Self::Handle>;
    type Handle: UsbHandle;

    fn devices(&self) -> rusb::Result<Vec<Self::Device>>;
}

/// A device as seen during enumeration, before it has been opened.
pub trait UsbDevice {
    type Handle: UsbHandle;

    fn bus_number(&self) -> u8;
    fn address(&self) -> u8;

    /// Vendor and product identity, from the device descriptor.
    fn ids(&self) -> rusb::Result<(u16, u16)>;

    fn open(&self) -> rusb::Result<Self::Handle>;
}

/// An opened device. Dropping the handle closes it.
pub trait UsbHandle: Send {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool>;
    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;
    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()>;
    fn release_interface(&mut self, interface: u8) -> rusb::Result<()>;

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;
    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize>;
    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;
    fn write_interrupt(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize>;

    /// Issues a real GET_CONFIGURATION request rather than returning a cached
    /// value, so a device that has gone away is noticed.
    fn read_configuration(&self, timeout: Duration) -> rusb::Result<u8>;
}

// We primarily need the bus number, and address for comparison..
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceLocation {
    pub(crate) bus_number: u8,
    pub(crate) address: u8,
}

impl DeviceLocation {
    pub fn of<D: UsbDevice>(device: &D) -> Self {
        Self {
            bus_number: device.bus_number(),
            address: device.address(),
        }
    }

    pub fn bus_number(&self) -> u8 {
        self.bus_number
    }

    pub fn address(&self) -> u8 {
        self.address
    }
}
