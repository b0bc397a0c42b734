use crate::config::TransportOptions;
use crate::device::base::{DeviceLocation, UsbBackend, UsbDevice, UsbHandle, CONTROL_INTERFACE};
use crate::error::{record, translate, TransportError};
use crate::handle::DeviceHandle;
use crate::session::SessionManager;
use crate::VID_LABJACK;
use enum_map::{Enum, EnumMap};
use labjack_types::ProductId;
use log::{debug, error, info, warn};
use strum::EnumCount;

/// How many devices of one family were on the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProductCount {
    pub product: ProductId,
    pub count: u32,
}

/// A LabJack found on the bus, before it has been opened.
struct Candidate<D> {
    device: D,
    product_id: u16,
}

/// Finds, opens and counts LabJack devices over one shared USB session.
pub struct DeviceRegistry<B: UsbBackend> {
    session: SessionManager<B>,
    options: TransportOptions,
}

impl<B: UsbBackend> DeviceRegistry<B> {
    pub fn new(
        factory: impl Fn() -> rusb::Result<B> + Send + Sync + 'static,
        options: TransportOptions,
    ) -> Self {
        Self {
            session: SessionManager::new(factory),
            options,
        }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &SessionManager<B> {
        &self.session
    }

    /// Opens the `ordinal`-th (counting from 1) device of `product` in bus
    /// order. The position is worked out again on every call, so it only keeps
    /// pointing at the same device while nothing is plugged in or removed.
    pub fn open_device(
        &self,
        ordinal: u32,
        product: ProductId,
    ) -> Result<DeviceHandle<B::Handle>, TransportError> {
        record(self.open_nth(ordinal, product))
    }

    fn open_nth(
        &self,
        ordinal: u32,
        product: ProductId,
    ) -> Result<DeviceHandle<B::Handle>, TransportError> {
        if ordinal == 0 {
            return Err(TransportError::InvalidParameter(
                "device ordinals start at 1".to_string(),
            ));
        }

        let candidate = self
            .candidates(Some(product.id()))?
            .into_iter()
            .nth((ordinal - 1) as usize)
            .ok_or(TransportError::DeviceNotFound { product, ordinal })?;

        let kernel_recent = self.options.kernel_check.is_recent();
        self.open_candidate(&candidate, kernel_recent)
    }

    /// Opens every LabJack on the bus, whatever its product, up to `max`
    /// handles. Devices that fail to open or fail the firmware check are
    /// skipped, and the bus isn't walked past the cap.
    pub fn open_all(&self, max: usize) -> Result<Vec<DeviceHandle<B::Handle>>, TransportError> {
        record(self.open_every(max))
    }

    fn open_every(&self, max: usize) -> Result<Vec<DeviceHandle<B::Handle>>, TransportError> {
        let candidates = self.candidates(None)?;
        let kernel_recent = self.options.kernel_check.is_recent();

        let mut handles = Vec::new();
        for candidate in &candidates {
            if handles.len() >= max {
                debug!("Reached the limit of {} devices", max);
                break;
            }

            match self.open_candidate(candidate, kernel_recent) {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(
                    "Skipping device {:#06x} at {:?}: {}",
                    candidate.product_id,
                    DeviceLocation::of(&candidate.device),
                    e
                ),
            }
        }

        info!("Opened {} LabJack device(s)", handles.len());
        Ok(handles)
    }

    /// The number of `product` devices on the bus. Nothing is opened.
    pub fn count(&self, product: ProductId) -> Result<u32, TransportError> {
        let found = record(self.candidates(Some(product.id())))?;
        Ok(found.len() as u32)
    }

    /// Per-family counts from a single walk of the bus, in the order U3, U6,
    /// UE9, U12, Wireless Bridge. Devices with an unknown product id aren't
    /// counted.
    pub fn count_all(&self) -> Result<[ProductCount; ProductId::COUNT], TransportError> {
        let candidates = record(self.candidates(None))?;

        let mut counts: EnumMap<ProductId, u32> = EnumMap::default();
        for candidate in &candidates {
            if let Some(product) = ProductId::from_id(candidate.product_id) {
                counts[product] += 1;
            }
        }

        Ok(std::array::from_fn(|index| {
            let product = ProductId::from_usize(index);
            ProductCount {
                product,
                count: counts[product],
            }
        }))
    }

    /// Walks the bus for LabJack devices, optionally of one product. A bus
    /// that can't be listed takes the session down with it, so the next call
    /// starts over.
    fn candidates(
        &self,
        product_id: Option<u16>,
    ) -> Result<Vec<Candidate<B::Device>>, TransportError> {
        let backend = self.session.acquire()?;

        let devices = backend.devices().map_err(|e| {
            error!("Unable to list USB devices: {}", e);
            self.session.discard();
            translate(e)
        })?;

        let mut found = Vec::new();
        for device in devices {
            let (vendor_id, device_product) = device.ids().map_err(|e| {
                error!(
                    "Unable to read the descriptor of {:?}: {}",
                    DeviceLocation::of(&device),
                    e
                );
                self.session.discard();
                translate(e)
            })?;

            if vendor_id != VID_LABJACK {
                continue;
            }
            if product_id.is_some_and(|wanted| wanted != device_product) {
                continue;
            }

            debug!(
                "Found LabJack {:#06x} at {:?}",
                device_product,
                DeviceLocation::of(&device)
            );
            found.push(Candidate {
                device,
                product_id: device_product,
            });
        }
        Ok(found)
    }

    /// Opens and claims one device, then gates it on its firmware. A device
    /// that fails the gate is closed before the error is returned.
    fn open_candidate(
        &self,
        candidate: &Candidate<B::Device>,
        kernel_recent: bool,
    ) -> Result<DeviceHandle<B::Handle>, TransportError> {
        let location = DeviceLocation::of(&candidate.device);
        let mut handle = candidate.device.open().map_err(|e| {
            warn!("Unable to open device at {:?}: {}", location, e);
            translate(e)
        })?;

        match handle.kernel_driver_active(CONTROL_INTERFACE) {
            Ok(true) => {
                debug!("Detaching kernel driver from {:?}", location);
                handle
                    .detach_kernel_driver(CONTROL_INTERFACE)
                    .map_err(translate)?;
            }
            Ok(false) => {}
            Err(e) => debug!("Kernel driver state unavailable for {:?}: {}", location, e),
        }

        handle.claim_interface(CONTROL_INTERFACE).map_err(|e| {
            warn!("Unable to claim interface on {:?}: {}", location, e);
            translate(e)
        })?;

        let handle = DeviceHandle::new(
            handle,
            candidate.product_id,
            location,
            self.options.timeout,
        );

        if let Err(e) = handle.check_compatibility(kernel_recent) {
            handle.close();
            return Err(e);
        }

        debug!("Opened {:?}", handle);
        Ok(handle)
    }
}
