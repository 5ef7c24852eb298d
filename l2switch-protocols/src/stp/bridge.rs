//! Bridge state machine
//!
//! [`StpBridge`] owns the only state shared between the receive path and the
//! hello scheduler. Every transition (and every origination pass, including
//! the transmissions it triggers) runs as a single critical section.

use l2switch_core::{Error, LinkDriver, MacAddr, PortId, PortMode, Result};
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, info, warn};

use super::constants::PATH_COST_PER_HOP;
use super::{Bpdu, BridgeId};

/// Role of a trunk port in the spanning tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRole {
    /// Forwarding, advertises the root downstream
    Designated,
    /// Forwarding, the port toward the root
    RootPort,
    /// Redundant link, neither forwards nor advertises
    Blocked,
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRole::Designated => write!(f, "designated"),
            PortRole::RootPort => write!(f, "root"),
            PortRole::Blocked => write!(f, "blocked"),
        }
    }
}

/// Consistent copy of the bridge state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSnapshot {
    pub root_id: BridgeId,
    pub root_path_cost: u16,
    pub root_port: Option<PortId>,
    /// One entry per port, `None` for access ports
    pub roles: Vec<Option<PortRole>>,
}

impl BridgeSnapshot {
    /// Ports currently holding `role`
    pub fn ports_with(&self, role: PortRole) -> Vec<PortId> {
        self.roles
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == Some(role))
            .map(|(port, _)| port)
            .collect()
    }
}

/// BPDUs sent by one transition or origination pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug)]
struct BridgeState {
    root_id: BridgeId,
    root_path_cost: u16,
    root_port: Option<PortId>,
    roles: Vec<Option<PortRole>>,
    /// Ports that received our own BPDU back
    looped: Vec<bool>,
    /// Last foreign BPDU heard on each port
    heard: Vec<Option<Bpdu>>,
    /// Last BPDU handed to the driver on each port
    told: Vec<Option<Bpdu>>,
    missed_hellos: u32,
}

/// Spanning tree participant for one switch
///
/// The root, root port and every role are recomputed from the last BPDU
/// heard on each trunk, so the tree depends only on port costs, bridge ids
/// and port indices. Any change to what this bridge advertises is sent once
/// on every trunk, blocked ones included, and a neighbour that tells us
/// something new gets our current view back once.
pub struct StpBridge {
    priority: BridgeId,
    mac: MacAddr,
    modes: Vec<PortMode>,
    max_age: Option<u32>,
    state: Mutex<BridgeState>,
}

impl StpBridge {
    /// Create a bridge that considers itself root
    ///
    /// # Example
    ///
    /// ```
    /// use l2switch_core::{MacAddr, PortMode};
    /// use l2switch_protocols::stp::{PortRole, StpBridge};
    ///
    /// let modes = vec![PortMode::Access(10), PortMode::Trunk];
    /// let bridge = StpBridge::new(20, MacAddr::ZERO, modes);
    ///
    /// assert!(bridge.is_root());
    /// assert_eq!(bridge.role(0), None);
    /// assert_eq!(bridge.role(1), Some(PortRole::Designated));
    /// ```
    pub fn new(priority: BridgeId, mac: MacAddr, modes: Vec<PortMode>) -> Self {
        let roles = modes
            .iter()
            .map(|mode| mode.is_trunk().then_some(PortRole::Designated))
            .collect();
        let ports = modes.len();

        Self {
            priority,
            mac,
            modes,
            max_age: None,
            state: Mutex::new(BridgeState {
                root_id: priority,
                root_path_cost: 0,
                root_port: None,
                roles,
                looped: vec![false; ports],
                heard: vec![None; ports],
                told: vec![None; ports],
                missed_hellos: 0,
            }),
        }
    }

    /// Reclaim root after `hellos` origination passes without hearing the root
    pub fn with_max_age(mut self, hellos: u32) -> Self {
        self.max_age = Some(hellos);
        self
    }

    pub fn priority(&self) -> BridgeId {
        self.priority
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn modes(&self) -> &[PortMode] {
        &self.modes
    }

    pub fn is_root(&self) -> bool {
        self.state.lock().root_id == self.priority
    }

    pub fn root_id(&self) -> BridgeId {
        self.state.lock().root_id
    }

    pub fn root_path_cost(&self) -> u16 {
        self.state.lock().root_path_cost
    }

    /// Role of `port`, `None` for access ports or unknown indices
    pub fn role(&self, port: PortId) -> Option<PortRole> {
        self.state.lock().roles.get(port).copied().flatten()
    }

    /// Whether `port` is a trunk that spanning tree has blocked
    pub fn is_blocked(&self, port: PortId) -> bool {
        self.role(port) == Some(PortRole::Blocked)
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        let state = self.state.lock();
        BridgeSnapshot {
            root_id: state.root_id,
            root_path_cost: state.root_path_cost,
            root_port: state.root_port,
            roles: state.roles.clone(),
        }
    }

    /// Process a BPDU received on `port`
    ///
    /// Announcements triggered by the BPDU are sent before returning.
    pub fn receive_bpdu(
        &self,
        port: PortId,
        bpdu: &Bpdu,
        link: &dyn LinkDriver,
    ) -> Result<TxReport> {
        let mode = self
            .modes
            .get(port)
            .copied()
            .ok_or(Error::PortOutOfRange(port))?;

        if !mode.is_trunk() {
            warn!(port, %bpdu, "BPDU on access port dropped");
            return Ok(TxReport::default());
        }

        let mut state = self.state.lock();
        debug!(bridge = self.priority, port, %bpdu, "BPDU received");

        if bpdu.sender_id == self.priority && state.root_port != Some(port) {
            if !state.looped[port] {
                info!(bridge = self.priority, port, "own BPDU looped back");
            }
            state.looped[port] = true;
            state.heard[port] = None;
            self.recompute(&mut state);
            return Ok(self.advertise(&mut state, link, false));
        }
        state.looped[port] = false;

        // The root port only ever moves to a cheaper path to the same root
        let stored = match state.heard[port] {
            Some(prev)
                if state.root_port == Some(port)
                    && prev.root_id == bpdu.root_id
                    && bpdu.sender_path_cost > prev.sender_path_cost =>
            {
                Bpdu {
                    sender_id: bpdu.sender_id,
                    ..prev
                }
            }
            _ => *bpdu,
        };
        if state.heard[port].replace(stored) != Some(stored) {
            state.told[port] = None;
        }

        self.recompute(&mut state);
        if state.root_port == Some(port) && bpdu.root_id == state.root_id {
            state.missed_hellos = 0;
        }

        Ok(self.advertise(&mut state, link, false))
    }

    /// Periodic hello: send the current view on every designated trunk
    ///
    /// Trunks that have not yet been told the current view get it too. With
    /// a max age configured this also ages the root; after too many passes
    /// without hearing from it, everything learned about that root is
    /// forgotten and the tree is recomputed without it.
    pub fn originate(&self, link: &dyn LinkDriver) -> TxReport {
        let mut state = self.state.lock();

        if let Some(max_age) = self.max_age {
            if state.root_id != self.priority {
                state.missed_hellos = state.missed_hellos.saturating_add(1);
                if state.missed_hellos > max_age {
                    let lost = state.root_id;
                    info!(
                        bridge = self.priority,
                        lost_root = lost,
                        missed = state.missed_hellos,
                        "root expired"
                    );
                    for heard in state.heard.iter_mut() {
                        if matches!(heard, Some(b) if b.root_id == lost) {
                            *heard = None;
                        }
                    }
                    self.recompute(&mut state);
                }
            }
        }

        self.advertise(&mut state, link, true)
    }

    fn trunk_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.modes
            .iter()
            .enumerate()
            .filter(|(_, mode)| mode.is_trunk())
            .map(|(port, _)| port)
    }

    /// Pick the root port and assign every trunk role from what was heard
    ///
    /// Candidates order on `(root id, cost, sender id, port index)`. Roots
    /// no better than this bridge are ignored.
    fn recompute(&self, state: &mut BridgeState) {
        let best = self
            .trunk_ports()
            .filter(|&port| !state.looped[port])
            .filter_map(|port| {
                let heard = state.heard[port]?;
                let cost = heard.sender_path_cost.saturating_add(PATH_COST_PER_HOP);
                Some((heard.root_id, cost, heard.sender_id, port))
            })
            .filter(|&(root_id, ..)| root_id < self.priority)
            .min();

        let (root_id, cost, root_port) = match best {
            Some((root_id, cost, _, port)) => (root_id, cost, Some(port)),
            None => (self.priority, 0, None),
        };

        if root_id != state.root_id {
            info!(
                bridge = self.priority,
                root = root_id,
                cost,
                port = ?root_port,
                "new root bridge"
            );
            state.missed_hellos = 0;
        } else if root_port != state.root_port {
            info!(bridge = self.priority, port = ?root_port, cost, "root port changed");
        } else if cost != state.root_path_cost {
            debug!(bridge = self.priority, cost, "root path cost changed");
        }

        state.root_id = root_id;
        state.root_path_cost = cost;
        state.root_port = root_port;

        for port in self.trunk_ports() {
            let role = self.role_for(state, port);
            self.set_role(state, port, role);
        }
    }

    fn role_for(&self, state: &BridgeState, port: PortId) -> PortRole {
        if state.looped[port] {
            return PortRole::Blocked;
        }
        match state.root_port {
            None => PortRole::Designated,
            Some(root_port) if root_port == port => PortRole::RootPort,
            Some(_) => match state.heard[port] {
                // A neighbour at least as close to our root already serves the segment
                Some(peer)
                    if peer.root_id == state.root_id
                        && peer.sender_path_cost <= state.root_path_cost =>
                {
                    PortRole::Blocked
                }
                _ => PortRole::Designated,
            },
        }
    }

    fn set_role(&self, state: &mut BridgeState, port: PortId, role: PortRole) {
        let previous = state.roles[port].replace(role);
        if previous != Some(role) {
            info!(
                bridge = self.priority,
                port,
                from = ?previous,
                to = %role,
                "port role changed"
            );
        }
    }

    fn advertised(&self, state: &BridgeState) -> Bpdu {
        Bpdu::new(state.root_id, state.root_path_cost, self.priority)
    }

    /// Send the current view where it is news, plus on designated ports for a hello
    fn advertise(
        &self,
        state: &mut BridgeState,
        link: &dyn LinkDriver,
        hello: bool,
    ) -> TxReport {
        let bpdu = self.advertised(state);
        let frame = bpdu.encode(self.mac);
        let mut report = TxReport::default();

        for port in self.trunk_ports() {
            if state.looped[port] {
                continue;
            }
            let designated = state.roles[port] == Some(PortRole::Designated);
            if state.told[port] == Some(bpdu) && !(hello && designated) {
                continue;
            }
            match link.transmit(port, &frame) {
                Ok(()) => {
                    state.told[port] = Some(bpdu);
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(bridge = self.priority, port, error = %e, "failed to send BPDU");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl fmt::Debug for StpBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StpBridge")
            .field("priority", &self.priority)
            .field("mac", &self.mac)
            .field("modes", &self.modes)
            .field("state", &self.snapshot())
            .finish()
    }
}
