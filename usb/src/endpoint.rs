use crate::error::TransportError;
use enum_map::{enum_map, EnumMap};
use labjack_types::{ProductId, TransferKind, TransferMechanism};
use lazy_static::lazy_static;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub address: u8,
    pub mechanism: TransferMechanism,
}

impl Endpoint {
    pub fn is_inbound(&self) -> bool {
        self.address & 0x80 != 0
    }
}

/// The pipes one product family exposes. Every pipe on a device shares the
/// same mechanism.
#[derive(Clone, Debug)]
pub struct EndpointMap {
    mechanism: TransferMechanism,
    pipes: EnumMap<TransferKind, Option<u8>>,
}

impl EndpointMap {
    fn bulk(write: u8, read: u8, stream: u8) -> Self {
        Self {
            mechanism: TransferMechanism::Bulk,
            pipes: enum_map! {
                TransferKind::Write => Some(write),
                TransferKind::Read => Some(read),
                TransferKind::Stream => Some(stream),
            },
        }
    }

    // The interrupt-driven families have no stream interface
    fn interrupt(write: u8, read: u8) -> Self {
        Self {
            mechanism: TransferMechanism::Interrupt,
            pipes: enum_map! {
                TransferKind::Write => Some(write),
                TransferKind::Read => Some(read),
                TransferKind::Stream => None,
            },
        }
    }

    pub fn mechanism(&self) -> TransferMechanism {
        self.mechanism
    }

    pub fn get(&self, kind: TransferKind) -> Option<Endpoint> {
        self.pipes[kind]
            .filter(|address| *address != 0)
            .map(|address| Endpoint {
                address,
                mechanism: self.mechanism,
            })
    }
}

lazy_static! {
    static ref ENDPOINT_MAPS: EnumMap<ProductId, EndpointMap> = enum_map! {
        ProductId::U3 => EndpointMap::bulk(0x01, 0x82, 0x83),
        ProductId::U6 => EndpointMap::bulk(0x01, 0x82, 0x83),
        ProductId::Ue9 => EndpointMap::bulk(0x01, 0x81, 0x82),
        ProductId::U12 => EndpointMap::interrupt(0x02, 0x81),
        ProductId::Bridge => EndpointMap::interrupt(0x01, 0x81),
    };
}

pub fn endpoint_map(product: ProductId) -> &'static EndpointMap {
    &ENDPOINT_MAPS[product]
}

pub fn resolve(product: ProductId, kind: TransferKind) -> Result<Endpoint, TransportError> {
    endpoint_map(product)
        .get(kind)
        .ok_or(TransportError::UnsupportedOperation { product, kind })
}

/// Resolves against the raw product identity read from a device descriptor.
pub fn resolve_id(product_id: u16, kind: TransferKind) -> Result<Endpoint, TransportError> {
    let product = ProductId::from_id(product_id).ok_or_else(|| {
        TransportError::InvalidParameter(format!(
            "{:#06x} is not a known LabJack product",
            product_id
        ))
    })?;
    resolve(product, kind)
}

/// Endpoints that appear in any current endpoint map. Anything else handed to
/// the explicit-endpoint calls most likely came from an outdated header.
pub fn is_known_endpoint(address: u8) -> bool {
    address == 0x01 || address >= 0x81
}
