//! Ethernet frame construction and parsing
//!
//! Decoding is header-only: the switch never needs to look past the
//! EtherType, so [`EthernetHeader::decode`] borrows the frame and reports where
//! the payload starts instead of copying it.

use bytes::{Buf, BufMut, BytesMut};
use l2switch_core::{ethertypes, Error, MacAddr, Result, VlanId, MAX_VLAN_ID};
use std::fmt;

/// Common EtherType values used in Ethernet II frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// IPv6 (0x86DD)
    IPv6,
    /// Switch VLAN tag marker (0x8200)
    VlanTag,
    /// 802.3 length field (values up to 1500)
    Length(u16),
    /// Custom EtherType
    Custom(u16),
}

impl EtherType {
    /// Convert EtherType to u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => ethertypes::IPV4,
            EtherType::ARP => ethertypes::ARP,
            EtherType::IPv6 => ethertypes::IPV6,
            EtherType::VlanTag => ethertypes::SWITCH_VLAN_TPID,
            EtherType::Length(len) => len,
            EtherType::Custom(val) => val,
        }
    }

    /// Create EtherType from u16 value
    pub fn from_u16(value: u16) -> Self {
        match value {
            ethertypes::IPV4 => EtherType::IPv4,
            ethertypes::ARP => EtherType::ARP,
            ethertypes::IPV6 => EtherType::IPv6,
            ethertypes::SWITCH_VLAN_TPID => EtherType::VlanTag,
            len if len <= 1500 => EtherType::Length(len),
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::VlanTag => write!(f, "VLAN"),
            EtherType::Length(len) => write!(f, "802.3 len {}", len),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// Decoded Ethernet header, with the VLAN tag lifted out when present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination MAC address
    pub destination: MacAddr,
    /// Source MAC address
    pub source: MacAddr,
    /// EtherType following the tag (or the only one, untagged)
    pub ethertype: EtherType,
    /// VLAN id carried by the tag
    pub vlan: Option<VlanId>,
    /// Offset of the first payload byte
    pub payload_offset: usize,
}

impl EthernetHeader {
    /// Destination + source addresses
    pub const ADDRESSES_SIZE: usize = 12;

    /// Untagged header size (dst + src + type)
    pub const SIZE: usize = 14;

    /// Header size with a VLAN tag between source and type
    pub const TAGGED_SIZE: usize = 18;

    /// Parse the header of a raw frame
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::too_short(Self::SIZE, data.len()));
        }

        let destination = MacAddr::from_slice(&data[0..6])
            .ok_or_else(|| Error::too_short(Self::SIZE, data.len()))?;
        let source = MacAddr::from_slice(&data[6..12])
            .ok_or_else(|| Error::too_short(Self::SIZE, data.len()))?;

        let mut buf = &data[Self::ADDRESSES_SIZE..];
        let type_or_tpid = buf.get_u16();

        if type_or_tpid != ethertypes::SWITCH_VLAN_TPID {
            return Ok(Self {
                destination,
                source,
                ethertype: EtherType::from_u16(type_or_tpid),
                vlan: None,
                payload_offset: Self::SIZE,
            });
        }

        if data.len() < Self::TAGGED_SIZE {
            return Err(Error::too_short(Self::TAGGED_SIZE, data.len()));
        }

        let tci = buf.get_u16();
        let ethertype = EtherType::from_u16(buf.get_u16());

        Ok(Self {
            destination,
            source,
            ethertype,
            vlan: Some(tci & MAX_VLAN_ID),
            payload_offset: Self::TAGGED_SIZE,
        })
    }

    pub fn is_tagged(&self) -> bool {
        self.vlan.is_some()
    }

    /// Payload part of the frame this header was decoded from
    pub fn payload<'a>(&self, frame: &'a [u8]) -> &'a [u8] {
        frame.get(self.payload_offset..).unwrap_or_default()
    }
}

impl fmt::Display for EthernetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.destination, self.ethertype)?;
        if let Some(vlan) = self.vlan {
            write!(f, " vlan {}", vlan)?;
        }
        Ok(())
    }
}

/// Ethernet II frame
#[derive(Debug, Clone)]
pub struct EthernetFrame {
    /// Destination MAC address
    pub destination: MacAddr,
    /// Source MAC address
    pub source: MacAddr,
    /// EtherType or length field
    pub ethertype: EtherType,
    /// Payload data
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    /// Minimum Ethernet frame size (without FCS)
    pub const MIN_FRAME_SIZE: usize = 60;

    /// Maximum Ethernet frame size (without FCS)
    pub const MAX_FRAME_SIZE: usize = 1514;

    /// Create a new Ethernet frame
    pub fn new(
        destination: MacAddr,
        source: MacAddr,
        ethertype: EtherType,
        payload: Vec<u8>,
    ) -> Self {
        EthernetFrame {
            destination,
            source,
            ethertype,
            payload,
        }
    }

    /// Convert the frame to bytes, padded to the minimum frame size
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(Self::MAX_FRAME_SIZE);

        buffer.put_slice(self.destination.as_bytes());
        buffer.put_slice(self.source.as_bytes());
        buffer.put_u16(self.ethertype.to_u16());
        buffer.put_slice(&self.payload);

        if buffer.len() < Self::MIN_FRAME_SIZE {
            buffer.resize(Self::MIN_FRAME_SIZE, 0);
        }

        buffer.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DST: MacAddr = MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    const SRC: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

    #[test]
    fn test_ethertype_conversion() {
        assert_eq!(EtherType::IPv4.to_u16(), 0x0800);
        assert_eq!(EtherType::VlanTag.to_u16(), 0x8200);
        assert_eq!(EtherType::from_u16(0x0806), EtherType::ARP);
        assert_eq!(EtherType::from_u16(0x0026), EtherType::Length(0x26));
        assert_eq!(EtherType::from_u16(0x88CC), EtherType::Custom(0x88CC));
    }

    #[test]
    fn test_decode_untagged() {
        let data = vec![
            0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, // dst
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src
            0x08, 0x00, // IPv4
            0x01, 0x02, 0x03, 0x04, // payload
        ];

        let header = EthernetHeader::decode(&data).unwrap();
        assert_eq!(header.destination, DST);
        assert_eq!(header.source, SRC);
        assert_eq!(header.ethertype, EtherType::IPv4);
        assert_eq!(header.vlan, None);
        assert_eq!(header.payload_offset, 14);
        assert_eq!(header.payload(&data), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_decode_tagged() {
        let data = vec![
            0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, // dst
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src
            0x82, 0x00, // tag marker
            0xA0, 0x0A, // priority bits set, VLAN 10
            0x08, 0x06, // ARP
            0xDE, 0xAD,
        ];

        let header = EthernetHeader::decode(&data).unwrap();
        assert_eq!(header.vlan, Some(10));
        assert_eq!(header.ethertype, EtherType::ARP);
        assert_eq!(header.payload_offset, 18);
        assert!(header.is_tagged());
        assert_eq!(header.payload(&data), &[0xDE, 0xAD]);
    }

    #[test]
    fn test_standard_dot1q_is_not_a_tag() {
        let mut data = vec![0u8; 20];
        data[12] = 0x81;
        data[13] = 0x00;

        let header = EthernetHeader::decode(&data).unwrap();
        assert_eq!(header.vlan, None);
        assert_eq!(header.ethertype, EtherType::Custom(0x8100));
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            EthernetHeader::decode(&[0u8; 13]),
            Err(Error::FrameTooShort { needed: 14, actual: 13 })
        ));

        let mut tagged = vec![0u8; 17];
        tagged[12] = 0x82;
        assert!(matches!(
            EthernetHeader::decode(&tagged),
            Err(Error::FrameTooShort { needed: 18, actual: 17 })
        ));
    }

    #[test]
    fn test_unknown_ethertype_inside_tag() {
        let mut data = vec![0u8; 18];
        data[12] = 0x82;
        data[15] = 20;
        data[16] = 0x12;
        data[17] = 0x34;

        let header = EthernetHeader::decode(&data).unwrap();
        assert_eq!(header.vlan, Some(20));
        assert_eq!(header.ethertype, EtherType::Custom(0x1234));
        assert!(header.payload(&data).is_empty());
    }

    #[test]
    fn test_frame_to_bytes_pads() {
        let frame = EthernetFrame::new(DST, SRC, EtherType::IPv4, vec![1, 2, 3, 4]);
        let bytes = frame.to_bytes();

        assert_eq!(bytes.len(), EthernetFrame::MIN_FRAME_SIZE);
        assert_eq!(&bytes[0..6], DST.as_bytes());
        assert_eq!(&bytes[6..12], SRC.as_bytes());
        assert_eq!(&bytes[12..14], &[0x08, 0x00]);

        let header = EthernetHeader::decode(&bytes).unwrap();
        assert_eq!(header.payload(&bytes)[..4], [1, 2, 3, 4]);
    }
}
