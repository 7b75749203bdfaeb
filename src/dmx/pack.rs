use packed_struct::prelude::*;
use thiserror::Error;

use crate::controls::ControlValues;

/// Every Art-Net packet starts with this.
pub const ART_NET_ID: [u8; 8] = *b"Art-Net\0";
/// OpDmx / OpOutput, a packet of DMX channel data.
pub const OP_DMX: u16 = 0x5000;
pub const HEADER_SIZE: usize = 18;
/// A full DMX universe. Packets carrying fewer slots are ignored.
pub const UNIVERSE_SLOTS: usize = 512;

pub const INTENSITY_CHANNEL: usize = 0;
pub const RATE_CHANNEL: usize = 1;
pub const SCALE_CHANNEL: usize = 2;

// ArtDmx header (18 bytes):
// Byte #  | Definition
// 0..=7   | "Art-Net\0"
// 8..=9   | OpCode, little endian (0x5000)
// 10..=11 | Protocol version, big endian
// 12      | Sequence
// 13      | Physical input port
// 14..=15 | Port address (SubUni, Net), little endian
// 16..=17 | Data length, big endian
// 18..    | DMX channel data
#[derive(PackedStruct, Default, Debug, PartialEq, Clone)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "18")]
pub struct ArtDmxHeaderPack {
    #[packed_field(bytes = "0..=7")]
    pub id: [u8; 8],
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub opcode: u16,
    #[packed_field(bytes = "10..=11", endian = "msb")]
    pub protocol_version: u16,
    #[packed_field(bytes = "12")]
    pub sequence: u8,
    #[packed_field(bytes = "13")]
    pub physical: u8,
    #[packed_field(bytes = "14..=15", endian = "lsb")]
    pub port_address: u16,
    #[packed_field(bytes = "16..=17", endian = "msb")]
    pub length: u16,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("Packet of {0} bytes is too short")]
    TooShort(usize),

    #[error("Not an Art-Net packet")]
    BadSignature,

    #[error("Ignoring opcode 0x{0:04X}")]
    UnsupportedOpcode(u16),

    #[error("{0} channels is less than a full universe of 512")]
    NotEnoughChannels(usize),
}

/// A parsed ArtDmx packet, borrowing its channel data from the datagram.
#[derive(Debug, PartialEq)]
pub struct ArtDmxPacket<'a> {
    pub header: ArtDmxHeaderPack,
    pub channels: &'a [u8],
}

impl<'a> ArtDmxPacket<'a> {
    pub fn parse(datagram: &'a [u8]) -> Result<Self, PacketError> {
        if datagram.len() < HEADER_SIZE {
            return Err(PacketError::TooShort(datagram.len()));
        }

        let mut header_bytes = [0u8; HEADER_SIZE];
        header_bytes.copy_from_slice(&datagram[..HEADER_SIZE]);
        let header =
            ArtDmxHeaderPack::unpack(&header_bytes).map_err(|_| PacketError::BadSignature)?;

        if header.id != ART_NET_ID {
            return Err(PacketError::BadSignature);
        }
        if header.opcode != OP_DMX {
            return Err(PacketError::UnsupportedOpcode(header.opcode));
        }

        let channels = &datagram[HEADER_SIZE..];
        if channels.len() < UNIVERSE_SLOTS {
            return Err(PacketError::NotEnoughChannels(channels.len()));
        }

        Ok(ArtDmxPacket { header, channels })
    }

    pub fn control_values(&self) -> ControlValues {
        ControlValues {
            intensity: self.channels[INTENSITY_CHANNEL],
            rate: self.channels[RATE_CHANNEL],
            scale: self.channels[SCALE_CHANNEL],
        }
    }
}

impl ArtDmxHeaderPack {
    pub fn dmx(sequence: u8, length: u16) -> Self {
        ArtDmxHeaderPack {
            id: ART_NET_ID,
            opcode: OP_DMX,
            protocol_version: 14,
            sequence,
            physical: 0,
            port_address: 0,
            length,
        }
    }

    /// Build a full datagram around `channels`, as a lighting desk would send it.
    pub fn datagram(&self, channels: &[u8]) -> Result<Vec<u8>, PackingError> {
        let mut bytes = self.pack()?.to_vec();
        bytes.extend_from_slice(channels);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe(first: &[u8]) -> Vec<u8> {
        let mut channels = vec![0u8; UNIVERSE_SLOTS];
        channels[..first.len()].copy_from_slice(first);
        channels
    }

    #[test]
    fn test_header_layout() -> Result<(), PackingError> {
        let header = ArtDmxHeaderPack::dmx(7, 512).pack()?;

        assert_eq!(b"Art-Net\0", &header[0..8]);
        assert_eq!([0x00, 0x50], header[8..10]);
        assert_eq!([0x00, 14], header[10..12]);
        assert_eq!(7, header[12]);
        assert_eq!([0x02, 0x00], header[16..18]);

        Ok(())
    }

    #[test]
    fn test_parse_full_universe() -> Result<(), PackingError> {
        let datagram = ArtDmxHeaderPack::dmx(1, 512).datagram(&universe(&[200, 100, 50]))?;

        let packet = ArtDmxPacket::parse(&datagram).unwrap();
        assert_eq!(512, packet.header.length);
        assert_eq!(
            ControlValues {
                intensity: 200,
                rate: 100,
                scale: 50
            },
            packet.control_values()
        );

        Ok(())
    }

    #[test]
    fn test_reject_bad_signature() -> Result<(), PackingError> {
        let mut datagram = ArtDmxHeaderPack::dmx(1, 512).datagram(&universe(&[1, 2, 3]))?;
        datagram[0] = b'X';

        assert_eq!(
            Err(PacketError::BadSignature),
            ArtDmxPacket::parse(&datagram)
        );

        Ok(())
    }

    #[test]
    fn test_reject_other_opcodes() -> Result<(), PackingError> {
        // OpPoll
        let header = ArtDmxHeaderPack {
            opcode: 0x2000,
            ..ArtDmxHeaderPack::dmx(1, 512)
        };
        let datagram = header.datagram(&universe(&[1, 2, 3]))?;

        assert_eq!(
            Err(PacketError::UnsupportedOpcode(0x2000)),
            ArtDmxPacket::parse(&datagram)
        );

        Ok(())
    }

    #[test]
    fn test_reject_short_universe() -> Result<(), PackingError> {
        let datagram = ArtDmxHeaderPack::dmx(1, 24).datagram(&[9; 24])?;
        assert_eq!(
            Err(PacketError::NotEnoughChannels(24)),
            ArtDmxPacket::parse(&datagram)
        );

        assert_eq!(
            Err(PacketError::TooShort(4)),
            ArtDmxPacket::parse(b"Art-")
        );

        Ok(())
    }
}
