//! Access/trunk VLAN membership rules
//!
//! Access ports carry untagged traffic for exactly one VLAN. Trunk ports
//! carry tagged traffic for any VLAN. [`VlanPolicy`] turns an
//! ingress/egress pair into the rewrite the frame needs before it leaves.

use l2switch_core::{PortMode, VlanId};
use std::fmt;

/// Why a frame was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Ingress and egress belong to different VLANs
    VlanMismatch,
    /// Untagged on a trunk, or tagged on an access port
    MalformedTag,
    /// Frame could not be decoded
    Undecodable,
    /// Ingress trunk is blocked by spanning tree
    Blocked,
    /// Destination was learned on the ingress port
    SameSegment,
    /// No port left to send on
    NoEgress,
    /// Ingress port index the switch does not have
    UnknownPort,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::VlanMismatch => "vlan mismatch",
            DropReason::MalformedTag => "malformed tag",
            DropReason::Undecodable => "undecodable",
            DropReason::Blocked => "blocked port",
            DropReason::SameSegment => "same segment",
            DropReason::NoEgress => "no egress",
            DropReason::UnknownPort => "unknown port",
        };
        f.write_str(s)
    }
}

/// What to do with a frame on one egress port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlanDecision {
    /// Send the frame as received
    Forward,
    /// Insert a tag for this VLAN
    Tag(VlanId),
    /// Remove the tag
    Strip,
    /// Do not send
    Drop(DropReason),
}

/// Stateless VLAN rules
pub struct VlanPolicy;

impl VlanPolicy {
    /// Ingress check, run once per frame before any egress evaluation
    ///
    /// Returns the VLAN the frame belongs to.
    ///
    /// # Example
    ///
    /// ```
    /// use l2switch_core::PortMode;
    /// use l2switch_protocols::dot1q::{DropReason, VlanPolicy};
    ///
    /// assert_eq!(VlanPolicy::admit(PortMode::Access(10), None), Ok(10));
    /// assert_eq!(VlanPolicy::admit(PortMode::Trunk, Some(20)), Ok(20));
    /// assert_eq!(
    ///     VlanPolicy::admit(PortMode::Trunk, None),
    ///     Err(DropReason::MalformedTag)
    /// );
    /// ```
    pub fn admit(ingress: PortMode, frame_vlan: Option<VlanId>) -> Result<VlanId, DropReason> {
        match (ingress, frame_vlan) {
            (PortMode::Access(vlan), None) => Ok(vlan),
            (PortMode::Trunk, Some(vlan)) => Ok(vlan),
            _ => Err(DropReason::MalformedTag),
        }
    }

    /// Egress rewrite for a frame moving from `ingress` to `egress`
    ///
    /// `frame_vlan` is the tag the frame carried on arrival (trunk ingress
    /// only). Frames that [`admit`](Self::admit) would reject are dropped
    /// here as well.
    pub fn decide(ingress: PortMode, egress: PortMode, frame_vlan: Option<VlanId>) -> VlanDecision {
        match (ingress, egress) {
            (PortMode::Access(_), _) if frame_vlan.is_some() => {
                VlanDecision::Drop(DropReason::MalformedTag)
            }
            (PortMode::Trunk, _) if frame_vlan.is_none() => {
                VlanDecision::Drop(DropReason::MalformedTag)
            }
            (PortMode::Access(src), PortMode::Access(dst)) => {
                if src == dst {
                    VlanDecision::Forward
                } else {
                    VlanDecision::Drop(DropReason::VlanMismatch)
                }
            }
            (PortMode::Access(src), PortMode::Trunk) => VlanDecision::Tag(src),
            (PortMode::Trunk, PortMode::Access(dst)) => {
                if frame_vlan == Some(dst) {
                    VlanDecision::Strip
                } else {
                    VlanDecision::Drop(DropReason::VlanMismatch)
                }
            }
            (PortMode::Trunk, PortMode::Trunk) => VlanDecision::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_to_access_same_vlan() {
        assert_eq!(
            VlanPolicy::decide(PortMode::Access(10), PortMode::Access(10), None),
            VlanDecision::Forward
        );
    }

    #[test]
    fn test_access_to_access_other_vlan() {
        assert_eq!(
            VlanPolicy::decide(PortMode::Access(10), PortMode::Access(20), None),
            VlanDecision::Drop(DropReason::VlanMismatch)
        );
    }

    #[test]
    fn test_access_to_trunk_tags() {
        assert_eq!(
            VlanPolicy::decide(PortMode::Access(30), PortMode::Trunk, None),
            VlanDecision::Tag(30)
        );
    }

    #[test]
    fn test_trunk_to_access() {
        assert_eq!(
            VlanPolicy::decide(PortMode::Trunk, PortMode::Access(10), Some(10)),
            VlanDecision::Strip
        );
        assert_eq!(
            VlanPolicy::decide(PortMode::Trunk, PortMode::Access(10), Some(20)),
            VlanDecision::Drop(DropReason::VlanMismatch)
        );
    }

    #[test]
    fn test_trunk_to_trunk_forwards_any_vlan() {
        for vlan in [0, 1, 10, 4095] {
            assert_eq!(
                VlanPolicy::decide(PortMode::Trunk, PortMode::Trunk, Some(vlan)),
                VlanDecision::Forward
            );
        }
    }

    #[test]
    fn test_malformed_ingress() {
        assert_eq!(
            VlanPolicy::decide(PortMode::Trunk, PortMode::Trunk, None),
            VlanDecision::Drop(DropReason::MalformedTag)
        );
        assert_eq!(
            VlanPolicy::decide(PortMode::Access(10), PortMode::Access(10), Some(10)),
            VlanDecision::Drop(DropReason::MalformedTag)
        );
        assert_eq!(
            VlanPolicy::admit(PortMode::Access(10), Some(10)),
            Err(DropReason::MalformedTag)
        );
    }

    #[test]
    fn test_admit_agrees_with_decide() {
        let modes = [PortMode::Access(10), PortMode::Access(20), PortMode::Trunk];
        let tags = [None, Some(10), Some(20)];

        for ingress in modes {
            for tag in tags {
                if VlanPolicy::admit(ingress, tag).is_err() {
                    for egress in modes {
                        let decision = VlanPolicy::decide(ingress, egress, tag);
                        assert!(matches!(decision, VlanDecision::Drop(_)));
                    }
                }
            }
        }
    }
}
