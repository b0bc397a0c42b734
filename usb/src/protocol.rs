// Just enough of the LabJack low-level command format to ask a device for its
// firmware and hardware versions. Everything above this (register maps,
// calibration, feedback commands) is opaque payload as far as the transport is
// concerned.
use byteorder::{ByteOrder, LittleEndian};
use enum_map::{enum_map, EnumMap};
use labjack_types::{FirmwareVersions, ProductId, VersionPair};
use lazy_static::lazy_static;

const EXTENDED_HEADER_LENGTH: usize = 6;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ResponseError {
    #[error("{command} response too short, expected {expected} bytes, received {received}")]
    Short {
        command: &'static str,
        expected: usize,
        received: usize,
    },

    #[error("{command} response has command bytes {received:02x?}, expected {expected:02x?}")]
    Echo {
        command: &'static str,
        expected: [u8; 3],
        received: [u8; 3],
    },
}

/// Describes the configuration command a product family answers with its
/// version numbers, and where those numbers sit in the reply.
#[derive(Clone, Debug)]
pub struct VersionQuery {
    name: &'static str,
    header: [u8; 3],
    command_length: usize,
    response_length: usize,
    echo: [u8; 3],
    firmware: (usize, usize),
    hardware: Option<(usize, usize)>,
}

impl VersionQuery {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn response_length(&self) -> usize {
        self.response_length
    }

    /// Builds the read-only form of the command: every write mask is zero, so
    /// the device reports its configuration without changing it.
    pub fn command(&self) -> Vec<u8> {
        let mut packet = vec![0; self.command_length];
        packet[1..4].copy_from_slice(&self.header);
        extended_checksum(&mut packet);
        packet
    }

    pub fn parse(&self, response: &[u8]) -> Result<FirmwareVersions, ResponseError> {
        if response.len() < self.response_length {
            return Err(ResponseError::Short {
                command: self.name,
                expected: self.response_length,
                received: response.len(),
            });
        }

        let received = [response[1], response[2], response[3]];
        if received != self.echo {
            return Err(ResponseError::Echo {
                command: self.name,
                expected: self.echo,
                received,
            });
        }

        let (major, minor) = self.firmware;
        Ok(FirmwareVersions {
            firmware: VersionPair(response[major], response[minor]),
            hardware: self
                .hardware
                .map(|(major, minor)| VersionPair(response[major], response[minor])),
        })
    }
}

lazy_static! {
    static ref VERSION_QUERIES: EnumMap<ProductId, Option<VersionQuery>> = enum_map! {
        ProductId::U3 => Some(VersionQuery {
            name: "ConfigU3",
            header: [0xf8, 0x0a, 0x08],
            command_length: 26,
            response_length: 38,
            echo: [0xf8, 0x10, 0x08],
            firmware: (10, 9),
            hardware: Some((14, 13)),
        }),
        ProductId::U6 => Some(VersionQuery {
            name: "ConfigU6",
            header: [0xf8, 0x0a, 0x08],
            command_length: 26,
            response_length: 38,
            echo: [0xf8, 0x10, 0x08],
            firmware: (10, 9),
            hardware: None,
        }),
        ProductId::Ue9 => Some(VersionQuery {
            name: "CommConfig",
            header: [0x78, 0x10, 0x01],
            command_length: 38,
            response_length: 38,
            echo: [0x78, 0x10, 0x01],
            firmware: (37, 36),
            hardware: None,
        }),
        ProductId::U12 => None,
        ProductId::Bridge => None,
    };
}

/// The version query for a product family, if it has one.
pub fn version_query(product: ProductId) -> Option<&'static VersionQuery> {
    VERSION_QUERIES[product].as_ref()
}

/// One-byte checksum over the header bytes following the checksum itself,
/// with the carry folded back in twice.
pub fn checksum8(bytes: &[u8]) -> u8 {
    let mut sum: u32 = bytes.iter().map(|b| *b as u32).sum();
    for _ in 0..2 {
        sum = (sum >> 8) + (sum & 0xff);
    }
    sum as u8
}

pub fn checksum16(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(*byte as u16))
}

/// Fills in both checksums of an extended-format packet in place. Packets
/// shorter than the extended header are left untouched.
pub fn extended_checksum(packet: &mut [u8]) {
    if packet.len() < EXTENDED_HEADER_LENGTH {
        return;
    }

    let sum = checksum16(&packet[EXTENDED_HEADER_LENGTH..]);
    LittleEndian::write_u16(&mut packet[4..6], sum);
    packet[0] = checksum8(&packet[1..EXTENDED_HEADER_LENGTH]);
}
