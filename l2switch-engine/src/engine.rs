//! Forwarding decision engine
//!
//! [`Switch::handle_frame`] runs one received frame through learning,
//! spanning tree, VLAN policy and transmission. [`Switch::run`] is the
//! receive loop around it.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use l2switch_core::{LinkDriver, MacAddr, PortId, PortMode, Result, SwitchConfig};
use l2switch_packet::EthernetHeader;
use l2switch_protocols::cam::ForwardingTable;
use l2switch_protocols::dot1q::{
    insert_vlan_tag, strip_vlan_tag, DropReason, VlanDecision, VlanPolicy,
};
use l2switch_protocols::stp::constants::STP_MULTICAST_MAC;
use l2switch_protocols::stp::{Bpdu, StpBridge};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::stats::SwitchStats;

/// How long the receive loop waits before re-checking its stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum time between two aging sweeps
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Spanning tree traffic, consumed by the switch
    Control,
    /// Not sent anywhere
    Dropped(DropReason),
    /// Sent on these ports, in port order
    Forwarded { ports: Vec<PortId> },
}

impl Disposition {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Disposition::Forwarded { .. })
    }

    /// Egress ports, empty unless forwarded
    pub fn ports(&self) -> &[PortId] {
        match self {
            Disposition::Forwarded { ports } => ports,
            _ => &[],
        }
    }
}

/// One switch: learning table, port modes and spanning tree bridge
pub struct Switch {
    bridge: Arc<StpBridge>,
    modes: Vec<PortMode>,
    table: ForwardingTable,
    stats: SwitchStats,
    config: EngineConfig,
    last_sweep: Instant,
}

impl Switch {
    pub fn new(priority: u16, mac: MacAddr, modes: Vec<PortMode>, config: EngineConfig) -> Self {
        let mut bridge = StpBridge::new(priority, mac, modes.clone());
        if let Some(hellos) = config.max_age {
            bridge = bridge.with_max_age(hellos);
        }

        let table = match config.mac_aging {
            Some(aging) => ForwardingTable::with_aging(aging),
            None => ForwardingTable::new(),
        };

        Self {
            bridge: Arc::new(bridge),
            modes,
            table,
            stats: SwitchStats::new(),
            config,
            last_sweep: Instant::now(),
        }
    }

    /// Build a switch from a parsed configuration file
    pub fn from_config(switch_config: &SwitchConfig, mac: MacAddr, config: EngineConfig) -> Self {
        Self::new(switch_config.priority, mac, switch_config.modes(), config)
    }

    /// Spanning tree state, shared with the hello scheduler
    pub fn bridge(&self) -> &Arc<StpBridge> {
        &self.bridge
    }

    pub fn table(&self) -> &ForwardingTable {
        &self.table
    }

    pub fn stats(&self) -> &SwitchStats {
        &self.stats
    }

    pub fn modes(&self) -> &[PortMode] {
        &self.modes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one frame received on `ingress`
    pub fn handle_frame(
        &mut self,
        ingress: PortId,
        frame: &[u8],
        link: &dyn LinkDriver,
    ) -> Disposition {
        self.stats.record_received();

        let disposition = self.process(ingress, frame, link);
        if let Disposition::Dropped(reason) = &disposition {
            debug!(port = ingress, len = frame.len(), %reason, "frame dropped");
            self.stats.record_dropped();
        }
        disposition
    }

    fn process(&mut self, ingress: PortId, frame: &[u8], link: &dyn LinkDriver) -> Disposition {
        let Some(ingress_mode) = self.modes.get(ingress).copied() else {
            warn!(port = ingress, "frame from unknown port");
            return Disposition::Dropped(DropReason::UnknownPort);
        };

        let header = match EthernetHeader::decode(frame) {
            Ok(header) => header,
            Err(e) => {
                debug!(port = ingress, error = %e, "undecodable frame");
                return Disposition::Dropped(DropReason::Undecodable);
            }
        };
        debug!(port = ingress, %header, "frame received");

        self.table.learn(header.source, ingress);

        if header.destination == STP_MULTICAST_MAC {
            return self.handle_bpdu(ingress, frame, link);
        }

        if let Err(reason) = VlanPolicy::admit(ingress_mode, header.vlan) {
            return Disposition::Dropped(reason);
        }

        if self.bridge.is_blocked(ingress) {
            return Disposition::Dropped(DropReason::Blocked);
        }

        let candidates = match self.egress_candidates(ingress, &header) {
            Ok(candidates) => candidates,
            Err(reason) => return Disposition::Dropped(reason),
        };

        let mut ports = Vec::with_capacity(candidates.len());
        let mut last_drop = None;

        for egress in candidates {
            let egress_mode = self.modes[egress];
            let out: Cow<'_, [u8]> =
                match VlanPolicy::decide(ingress_mode, egress_mode, header.vlan) {
                    VlanDecision::Forward => Cow::Borrowed(frame),
                    VlanDecision::Tag(vlan) => match insert_vlan_tag(frame, vlan) {
                        Ok(tagged) => Cow::Owned(tagged),
                        Err(e) => {
                            warn!(port = egress, error = %e, "failed to tag frame");
                            continue;
                        }
                    },
                    VlanDecision::Strip => match strip_vlan_tag(frame) {
                        Ok(stripped) => Cow::Owned(stripped),
                        Err(e) => {
                            warn!(port = egress, error = %e, "failed to strip tag");
                            continue;
                        }
                    },
                    VlanDecision::Drop(reason) => {
                        last_drop = Some(reason);
                        continue;
                    }
                };

            match link.transmit(egress, &out) {
                Ok(()) => {
                    self.stats.record_forwarded();
                    ports.push(egress);
                }
                Err(e) => {
                    warn!(port = egress, error = %e, "transmit failed");
                    self.stats.record_tx_error();
                }
            }
        }

        if ports.is_empty() {
            return Disposition::Dropped(last_drop.unwrap_or(DropReason::NoEgress));
        }
        Disposition::Forwarded { ports }
    }

    /// Learned port for known unicast, every other forwarding port otherwise
    fn egress_candidates(
        &self,
        ingress: PortId,
        header: &EthernetHeader,
    ) -> std::result::Result<Vec<PortId>, DropReason> {
        if header.destination.is_unicast() {
            if let Some(port) = self.table.lookup(&header.destination) {
                if port == ingress {
                    return Err(DropReason::SameSegment);
                }
                if self.bridge.is_blocked(port) {
                    return Err(DropReason::Blocked);
                }
                return Ok(vec![port]);
            }
        }

        let ports: Vec<PortId> = (0..self.modes.len())
            .filter(|&port| port != ingress && !self.bridge.is_blocked(port))
            .collect();
        if ports.is_empty() {
            return Err(DropReason::NoEgress);
        }
        Ok(ports)
    }

    fn handle_bpdu(&mut self, ingress: PortId, frame: &[u8], link: &dyn LinkDriver) -> Disposition {
        self.stats.record_bpdu_received();

        let bpdu = match Bpdu::decode(frame) {
            Ok(bpdu) => bpdu,
            Err(e) => {
                warn!(port = ingress, error = %e, "malformed BPDU");
                return Disposition::Dropped(DropReason::Undecodable);
            }
        };

        match self.bridge.receive_bpdu(ingress, &bpdu, link) {
            Ok(report) => self.stats.record_bpdus_sent(report.sent, report.failed),
            Err(e) => warn!(port = ingress, error = %e, "BPDU not processed"),
        }
        Disposition::Control
    }

    /// Drop aged-out stations, at most once per sweep interval
    pub fn sweep(&mut self, now: Instant) -> usize {
        if self.table.aging().is_none()
            || now.saturating_duration_since(self.last_sweep) < SWEEP_INTERVAL
        {
            return 0;
        }
        self.last_sweep = now;
        self.table.sweep(now)
    }

    /// Receive loop: one frame at a time until `stop` is set
    ///
    /// Per-frame problems are logged and the loop carries on. A failing
    /// driver ends the loop with its error.
    pub fn run(&mut self, link: &dyn LinkDriver, stop: &AtomicBool) -> Result<()> {
        info!(
            bridge = self.bridge.priority(),
            ports = self.modes.len(),
            "receive loop started"
        );

        while !stop.load(Ordering::Relaxed) {
            if let Some(packet) = link.receive_timeout(POLL_INTERVAL)? {
                let disposition = self.handle_frame(packet.port, packet.data(), link);
                debug!(port = packet.port, ?disposition, "frame handled");
            }
            self.sweep(Instant::now());
        }

        info!(
            bridge = self.bridge.priority(),
            stats = %self.stats.snapshot(),
            "receive loop stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2switch_link::MemoryLink;
    use l2switch_packet::{EtherType, EthernetFrame};
    use l2switch_protocols::stp::PortRole;

    const SWITCH_MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x14]);

    fn host(n: u8) -> MacAddr {
        MacAddr([0x00, 0x00, 0x00, 0x00, 0x00, n])
    }

    fn frame(dst: MacAddr, src: MacAddr) -> Vec<u8> {
        EthernetFrame::new(dst, src, EtherType::IPv4, vec![0x45; 20]).to_bytes()
    }

    fn tagged(dst: MacAddr, src: MacAddr, vlan: u16) -> Vec<u8> {
        insert_vlan_tag(&frame(dst, src), vlan).unwrap()
    }

    /// Ports: 0 access 10, 1 access 10, 2 access 20, 3 trunk
    fn switch() -> (Switch, MemoryLink) {
        let modes = vec![
            PortMode::Access(10),
            PortMode::Access(10),
            PortMode::Access(20),
            PortMode::Trunk,
        ];
        (
            Switch::new(20, SWITCH_MAC, modes, EngineConfig::default()),
            MemoryLink::new(SWITCH_MAC, 4),
        )
    }

    #[test]
    fn test_broadcast_floods_same_vlan_and_trunk() {
        let (mut sw, link) = switch();

        let d = sw.handle_frame(0, &frame(MacAddr::BROADCAST, host(1)), &link);

        assert_eq!(d, Disposition::Forwarded { ports: vec![1, 3] });
        let sent = link.transmitted();
        assert_eq!(sent.len(), 2);
        let (port, trunk_copy) = &sent[1];
        assert_eq!(*port, 3);
        assert_eq!(EthernetHeader::decode(trunk_copy).unwrap().vlan, Some(10));
    }

    #[test]
    fn test_learned_unicast_goes_to_one_port() {
        let (mut sw, link) = switch();
        sw.handle_frame(1, &frame(MacAddr::BROADCAST, host(2)), &link);
        link.take_transmitted();

        let d = sw.handle_frame(0, &frame(host(2), host(1)), &link);

        assert_eq!(d, Disposition::Forwarded { ports: vec![1] });
        assert_eq!(sw.table().lookup(&host(1)), Some(0));
    }

    #[test]
    fn test_unknown_unicast_floods() {
        let (mut sw, link) = switch();
        let d = sw.handle_frame(0, &frame(host(9), host(1)), &link);
        assert_eq!(d.ports(), &[1, 3]);
    }

    #[test]
    fn test_vlan_isolation() {
        let (mut sw, link) = switch();
        sw.handle_frame(2, &frame(MacAddr::BROADCAST, host(3)), &link);
        link.take_transmitted();

        let d = sw.handle_frame(0, &frame(host(3), host(1)), &link);

        assert_eq!(d, Disposition::Dropped(DropReason::VlanMismatch));
        assert!(link.transmitted().is_empty());
    }

    #[test]
    fn test_trunk_to_access_strips() {
        let (mut sw, link) = switch();
        let original = frame(MacAddr::BROADCAST, host(7));

        let d = sw.handle_frame(3, &insert_vlan_tag(&original, 20).unwrap(), &link);

        assert_eq!(d, Disposition::Forwarded { ports: vec![2] });
        assert_eq!(link.transmitted(), vec![(2, original)]);
    }

    #[test]
    fn test_malformed_tags_dropped() {
        let (mut sw, link) = switch();

        let d = sw.handle_frame(3, &frame(MacAddr::BROADCAST, host(7)), &link);
        assert_eq!(d, Disposition::Dropped(DropReason::MalformedTag));

        let d = sw.handle_frame(0, &tagged(MacAddr::BROADCAST, host(1), 10), &link);
        assert_eq!(d, Disposition::Dropped(DropReason::MalformedTag));

        // Still learned
        assert_eq!(sw.table().lookup(&host(7)), Some(3));
        assert_eq!(sw.stats().snapshot().frames_dropped, 2);
    }

    #[test]
    fn test_same_segment_dropped() {
        let (mut sw, link) = switch();
        sw.handle_frame(0, &frame(MacAddr::BROADCAST, host(2)), &link);

        let d = sw.handle_frame(0, &frame(host(2), host(1)), &link);
        assert_eq!(d, Disposition::Dropped(DropReason::SameSegment));
    }

    #[test]
    fn test_short_frame_dropped() {
        let (mut sw, link) = switch();
        let d = sw.handle_frame(0, &[0u8; 10], &link);
        assert_eq!(d, Disposition::Dropped(DropReason::Undecodable));
        assert!(sw.table().is_empty());
    }

    #[test]
    fn test_unknown_port() {
        let (mut sw, link) = switch();
        let d = sw.handle_frame(7, &frame(MacAddr::BROADCAST, host(1)), &link);
        assert_eq!(d, Disposition::Dropped(DropReason::UnknownPort));
    }

    #[test]
    fn test_bpdu_consumed() {
        let (mut sw, link) = switch();
        let bpdu = Bpdu::new(10, 0, 10).encode(MacAddr([0x02, 0, 0, 0, 0, 0x0A]));

        let d = sw.handle_frame(3, &bpdu, &link);

        assert_eq!(d, Disposition::Control);
        assert_eq!(sw.bridge().root_id(), 10);
        assert_eq!(sw.bridge().role(3), Some(PortRole::RootPort));
        assert_eq!(sw.stats().snapshot().bpdus_received, 1);
        // Never flooded to hosts
        assert!(link.transmitted().iter().all(|(port, _)| *port == 3));
    }

    #[test]
    fn test_short_bpdu_dropped() {
        let (mut sw, link) = switch();
        let bpdu = Bpdu::new(10, 0, 10).encode(SWITCH_MAC);

        let d = sw.handle_frame(3, &bpdu[..16], &link);

        assert_eq!(d, Disposition::Dropped(DropReason::Undecodable));
        assert!(sw.bridge().is_root());
    }

    #[test]
    fn test_blocked_trunk_neither_receives_nor_sends() {
        let modes = vec![PortMode::Access(10), PortMode::Trunk, PortMode::Trunk];
        let mut sw = Switch::new(30, SWITCH_MAC, modes, EngineConfig::default());
        let link = MemoryLink::new(SWITCH_MAC, 3);

        // Root via port 1, an equally close neighbour on port 2
        sw.handle_frame(1, &Bpdu::new(10, 0, 10).encode(host(10)), &link);
        sw.handle_frame(2, &Bpdu::new(10, 10, 20).encode(host(11)), &link);
        assert!(sw.bridge().is_blocked(2));
        link.take_transmitted();

        let d = sw.handle_frame(2, &tagged(MacAddr::BROADCAST, host(5), 10), &link);
        assert_eq!(d, Disposition::Dropped(DropReason::Blocked));
        assert_eq!(sw.table().lookup(&host(5)), Some(2));

        let d = sw.handle_frame(0, &frame(MacAddr::BROADCAST, host(1)), &link);
        assert_eq!(d.ports(), &[1]);
    }

    #[test]
    fn test_transmit_failure_serves_other_ports() {
        let (mut sw, link) = switch();
        link.set_port_down(1, true);

        let d = sw.handle_frame(0, &frame(MacAddr::BROADCAST, host(1)), &link);

        assert_eq!(d, Disposition::Forwarded { ports: vec![3] });
        assert_eq!(sw.stats().snapshot().tx_errors, 1);
    }

    #[test]
    fn test_aging_sweep() {
        let modes = vec![PortMode::Access(10), PortMode::Access(10)];
        let config = EngineConfig::default().with_mac_aging(Duration::from_secs(5));
        let mut sw = Switch::new(1, SWITCH_MAC, modes, config);
        let link = MemoryLink::new(SWITCH_MAC, 2);

        sw.handle_frame(0, &frame(MacAddr::BROADCAST, host(1)), &link);
        assert_eq!(sw.table().len(), 1);

        assert_eq!(sw.sweep(Instant::now() + Duration::from_secs(10)), 1);
        assert!(sw.table().is_empty());
    }

    #[test]
    fn test_run_stops_on_flag() {
        let (mut sw, link) = switch();
        link.inject(0, frame(MacAddr::BROADCAST, host(1)));
        let stop = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while link.pending() > 0 {
                    std::thread::sleep(Duration::from_millis(5));
                }
                std::thread::sleep(Duration::from_millis(50));
                stop.store(true, Ordering::Relaxed);
            });
            sw.run(&link, &stop).unwrap();
        });

        assert_eq!(sw.stats().snapshot().frames_received, 1);
        assert_eq!(sw.table().lookup(&host(1)), Some(0));
    }
}
