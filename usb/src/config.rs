#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bound on every bulk, interrupt and control transfer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// How the open sequence decides whether the host kernel is new enough to skip
/// the firmware gate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KernelCheck {
    #[default]
    Detect,
    AssumeRecent,
    AssumeOutdated,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransportOptions {
    pub timeout: Duration,
    pub kernel_check: KernelCheck,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            kernel_check: KernelCheck::Detect,
        }
    }
}

impl TransportOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_kernel_check(mut self, kernel_check: KernelCheck) -> Self {
        self.kernel_check = kernel_check;
        self
    }
}
