use crate::device::base::UsbBackend;
use crate::error::{translate, TransportError};
use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Factory<B> = Box<dyn Fn() -> rusb::Result<B> + Send + Sync>;

/// Owns the single connection to the USB stack. The backend is created on the
/// first call that needs it and then shared by every later one; handles keep
/// their own reference, so discarding the session never strands an open
/// device.
pub(crate) struct SessionManager<B: UsbBackend> {
    factory: Factory<B>,
    session: Mutex<Option<Arc<B>>>,
}

impl<B: UsbBackend> SessionManager<B> {
    pub(crate) fn new(factory: impl Fn() -> rusb::Result<B> + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            session: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<B>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the live session, creating it if this is the first use. The
    /// lock is held across creation so racing callers share one backend.
    pub(crate) fn acquire(&self) -> Result<Arc<B>, TransportError> {
        let mut session = self.lock();
        if let Some(backend) = session.as_ref() {
            return Ok(backend.clone());
        }

        match (self.factory)() {
            Ok(backend) => {
                debug!("USB session started");
                let backend = Arc::new(backend);
                *session = Some(backend.clone());
                Ok(backend)
            }
            Err(e) => {
                error!("Failed to initialise libusb: {}", e);
                Err(translate(e))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_started(&self) -> bool {
        self.lock().is_some()
    }

    /// Drops the shared session after the bus stopped answering, so the next
    /// call starts from a fresh one.
    pub(crate) fn discard(&self) {
        if self.lock().take().is_some() {
            debug!("USB session discarded");
        }
    }
}
