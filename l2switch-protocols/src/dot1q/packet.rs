//! VLAN tag parsing and building
//!
//! The switch tags frames with its own marker (`0x8200`) instead of the IEEE
//! 802.1Q TPID, so that end hosts never try to interpret the tag themselves.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use l2switch_core::{ethertypes, Error, Result, VlanId, MAX_VLAN_ID};
use std::fmt;

/// Tag Protocol Identifier used on trunk links
pub const VLAN_TPID: u16 = ethertypes::SWITCH_VLAN_TPID;

/// Size of the tag in bytes (2 TPID + 2 TCI)
pub const VLAN_TAG_SIZE: usize = 4;

/// Offset of the tag inside a frame (directly after the MAC pair)
pub const VLAN_TAG_OFFSET: usize = 12;

/// VLAN ID mask (12 bits)
const VLAN_ID_MASK: u16 = MAX_VLAN_ID;

/// Priority mask (3 bits, shifted left 13)
const PRIORITY_MASK: u16 = 0xE000;

/// Switch VLAN tag
///
/// TCI layout follows 802.1Q:
/// ```text
/// | PCP (3 bits) | DEI (1 bit) | VID (12 bits) |
/// ```
/// The switch only ever writes the VID; priority bits are preserved on parse
/// but ignored by forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    /// VLAN Identifier (0-4095)
    pub vlan_id: VlanId,
    /// Priority Code Point (0-7)
    pub priority: u8,
}

impl VlanTag {
    /// Create a tag for `vlan_id` with priority 0
    ///
    /// # Example
    ///
    /// ```
    /// use l2switch_protocols::dot1q::VlanTag;
    ///
    /// let tag = VlanTag::new(100).unwrap();
    /// assert_eq!(tag.vlan_id, 100);
    /// assert!(VlanTag::new(4096).is_err());
    /// ```
    pub fn new(vlan_id: VlanId) -> Result<Self> {
        if vlan_id > MAX_VLAN_ID {
            return Err(Error::MalformedTag(format!(
                "VLAN id {} does not fit in 12 bits",
                vlan_id
            )));
        }

        Ok(Self {
            vlan_id,
            priority: 0,
        })
    }

    /// Parse a tag from 4 bytes (TPID + TCI)
    ///
    /// # Example
    ///
    /// ```
    /// use l2switch_protocols::dot1q::VlanTag;
    ///
    /// // 0x8200 marker + 0xA064 (PCP=5, VID=100)
    /// let tag = VlanTag::parse(&[0x82, 0x00, 0xA0, 0x64]).unwrap();
    /// assert_eq!(tag.vlan_id, 100);
    /// assert_eq!(tag.priority, 5);
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < VLAN_TAG_SIZE {
            return Err(Error::too_short(VLAN_TAG_SIZE, data.len()));
        }

        let mut buf = Bytes::copy_from_slice(&data[..VLAN_TAG_SIZE]);

        let tpid = buf.get_u16();
        if tpid != VLAN_TPID {
            return Err(Error::MalformedTag(format!(
                "invalid TPID 0x{:04X}, expected 0x{:04X}",
                tpid, VLAN_TPID
            )));
        }

        let tci = buf.get_u16();

        Ok(Self {
            vlan_id: tci & VLAN_ID_MASK,
            priority: ((tci & PRIORITY_MASK) >> 13) as u8,
        })
    }

    /// Build the 4 tag bytes
    pub fn build(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(VLAN_TAG_SIZE);
        buf.put_u16(VLAN_TPID);
        buf.put_u16(self.tci());
        buf.to_vec()
    }

    /// Tag Control Information field
    pub fn tci(&self) -> u16 {
        ((self.priority as u16) << 13) & PRIORITY_MASK | (self.vlan_id & VLAN_ID_MASK)
    }
}

impl fmt::Display for VlanTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VLAN {} (PCP={})", self.vlan_id, self.priority)
    }
}

/// Check whether `frame` carries a switch VLAN tag
pub fn has_vlan_tag(frame: &[u8]) -> bool {
    frame.len() >= VLAN_TAG_OFFSET + 2
        && u16::from_be_bytes([frame[VLAN_TAG_OFFSET], frame[VLAN_TAG_OFFSET + 1]]) == VLAN_TPID
}

/// Insert a tag for `vlan_id` directly after the MAC pair
///
/// The frame must hold at least the two addresses. Anything after them is
/// moved back by four bytes untouched, which is what makes
/// [`strip_vlan_tag`] an exact inverse.
///
/// # Example
///
/// ```
/// use l2switch_protocols::dot1q::{insert_vlan_tag, strip_vlan_tag};
///
/// let frame = vec![0xAAu8; 20];
/// let tagged = insert_vlan_tag(&frame, 30).unwrap();
/// assert_eq!(tagged.len(), 24);
/// assert_eq!(&tagged[12..16], &[0x82, 0x00, 0x00, 30]);
/// assert_eq!(strip_vlan_tag(&tagged).unwrap(), frame);
/// ```
pub fn insert_vlan_tag(frame: &[u8], vlan_id: VlanId) -> Result<Vec<u8>> {
    if frame.len() < VLAN_TAG_OFFSET {
        return Err(Error::too_short(VLAN_TAG_OFFSET, frame.len()));
    }

    let tag = VlanTag::new(vlan_id)?;

    let mut buf = BytesMut::with_capacity(frame.len() + VLAN_TAG_SIZE);
    buf.put_slice(&frame[..VLAN_TAG_OFFSET]);
    buf.put_u16(VLAN_TPID);
    buf.put_u16(tag.tci());
    buf.put_slice(&frame[VLAN_TAG_OFFSET..]);

    Ok(buf.to_vec())
}

/// Remove the tag that sits directly after the MAC pair
pub fn strip_vlan_tag(frame: &[u8]) -> Result<Vec<u8>> {
    let tagged_len = VLAN_TAG_OFFSET + VLAN_TAG_SIZE;
    if frame.len() < tagged_len {
        return Err(Error::too_short(tagged_len, frame.len()));
    }

    if !has_vlan_tag(frame) {
        return Err(Error::MalformedTag("frame carries no VLAN tag".to_string()));
    }

    let mut buf = BytesMut::with_capacity(frame.len() - VLAN_TAG_SIZE);
    buf.put_slice(&frame[..VLAN_TAG_OFFSET]);
    buf.put_slice(&frame[tagged_len..]);

    Ok(buf.to_vec())
}
