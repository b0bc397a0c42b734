use crate::device::base::{UsbBackend, UsbDevice, UsbHandle};
use log::debug;
use rusb::{Context, Device, DeviceHandle, Direction, Recipient, RequestType, UsbContext};
use std::time::Duration;

const REQUEST_GET_CONFIGURATION: u8 = 0x08;

/// libusb, through a private context rather than the global default one.
pub struct LibUsbBackend {
    context: Context,
}

impl LibUsbBackend {
    pub fn new() -> rusb::Result<Self> {
        let context = Context::new()?;
        debug!("Created libusb context");
        Ok(Self { context })
    }
}

impl UsbBackend for LibUsbBackend {
    type Device = LibUsbDevice;
    type Handle = LibUsbHandle;

    fn devices(&self) -> rusb::Result<Vec<LibUsbDevice>> {
        Ok(self
            .context
            .devices()?
            .iter()
            .map(|device| LibUsbDevice { device })
            .collect())
    }
}

pub struct LibUsbDevice {
    device: Device<Context>,
}

impl UsbDevice for LibUsbDevice {
    type Handle = LibUsbHandle;

    fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    fn address(&self) -> u8 {
        self.device.address()
    }

    fn ids(&self) -> rusb::Result<(u16, u16)> {
        let descriptor = self.device.device_descriptor()?;
        Ok((descriptor.vendor_id(), descriptor.product_id()))
    }

    fn open(&self) -> rusb::Result<LibUsbHandle> {
        let handle = self.device.open()?;
        Ok(LibUsbHandle { handle })
    }
}

pub struct LibUsbHandle {
    handle: DeviceHandle<Context>,
}

impl UsbHandle for LibUsbHandle {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool> {
        self.handle.kernel_driver_active(interface)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        self.handle.detach_kernel_driver(interface)
    }

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()> {
        self.handle.claim_interface(interface)
    }

    fn release_interface(&mut self, interface: u8) -> rusb::Result<()> {
        self.handle.release_interface(interface)
    }

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.read_bulk(endpoint, buf, timeout)
    }

    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.write_bulk(endpoint, buf, timeout)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        self.handle.read_interrupt(endpoint, buf, timeout)
    }

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.write_interrupt(endpoint, buf, timeout)
    }

    fn read_configuration(&self, timeout: Duration) -> rusb::Result<u8> {
        let mut config = [0u8; 1];
        self.handle.read_control(
            rusb::request_type(Direction::In, RequestType::Standard, Recipient::Device),
            REQUEST_GET_CONFIGURATION,
            0,
            0,
            &mut config,
            timeout,
        )?;
        Ok(config[0])
    }
}
