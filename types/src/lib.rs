use enum_map::Enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Formatter;
use strum::{Display, EnumCount, EnumIter};

/// The LabJack device families reachable over USB. Declaration order is the
/// order used when reporting per-family counts.
#[derive(Copy, Clone, Debug, Display, Enum, EnumIter, EnumCount, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u16)]
pub enum ProductId {
    U3 = 3,
    U6 = 6,
    #[strum(to_string = "UE9")]
    Ue9 = 9,
    U12 = 1,
    #[strum(to_string = "Wireless Bridge")]
    Bridge = 0x0501,
}

impl ProductId {
    pub fn id(&self) -> u16 {
        *self as u16
    }

    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            3 => Some(ProductId::U3),
            6 => Some(ProductId::U6),
            9 => Some(ProductId::Ue9),
            1 => Some(ProductId::U12),
            0x0501 => Some(ProductId::Bridge),
            _ => None,
        }
    }

    /// The U12 and the Wireless Bridge predate the current command set.
    pub fn is_legacy(&self) -> bool {
        matches!(self, ProductId::U12 | ProductId::Bridge)
    }
}

impl TryFrom<u16> for ProductId {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ProductId::from_id(value).ok_or(value)
    }
}

#[derive(Copy, Clone, Debug, Display, Enum, EnumIter, EnumCount, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferKind {
    Write,
    Read,
    Stream,
}

impl TransferKind {
    /// Reads and streams move data from the device to the host.
    pub fn is_inbound(&self) -> bool {
        !matches!(self, TransferKind::Write)
    }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferMechanism {
    Bulk,
    Interrupt,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VersionPair(pub u8, pub u8);

impl VersionPair {
    pub fn major(&self) -> u8 {
        self.0
    }

    pub fn minor(&self) -> u8 {
        self.1
    }
}

// LabJack reports minor versions in hundredths, so 1.5 is written 1.05
impl std::fmt::Display for VersionPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0, self.1)
    }
}

impl std::fmt::Debug for VersionPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0, self.1)
    }
}

/// Versions read back from a device during the open-time compatibility probe.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FirmwareVersions {
    pub firmware: VersionPair,
    pub hardware: Option<VersionPair>,
}
