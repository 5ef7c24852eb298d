//! Raw datalink channels
//!
//! One pnet Ethernet channel per interface. Each receive half is drained by
//! its own reader thread into a shared queue, so [`LinkDriver::receive_timeout`]
//! sees frames from every port in arrival order.

use l2switch_core::{Error, LinkDriver, MacAddr, Packet, PortId, Result};
use parking_lot::Mutex;
use pnet_datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long a reader blocks before re-checking the running flag
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Transmitted frames remembered per port for echo suppression
const ECHO_WINDOW: usize = 32;

/// Frames we sent ourselves, which the kernel also hands back to the
/// packet socket bound to the same interface
type EchoWindow = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// Look up an interface by name
pub fn find_interface(name: &str) -> Result<NetworkInterface> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}

/// MAC of a pnet interface, if it has one
pub fn interface_mac(iface: &NetworkInterface) -> Option<MacAddr> {
    iface
        .mac
        .map(|mac| MacAddr([mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]))
}

struct Port {
    name: String,
    sender: Mutex<Box<dyn DataLinkSender>>,
    echoes: EchoWindow,
}

/// [`LinkDriver`] over raw pnet channels
pub struct DatalinkDriver {
    ports: Vec<Port>,
    inbound: Mutex<mpsc::Receiver<Packet>>,
    mac: MacAddr,
    running: Arc<AtomicBool>,
    readers: Mutex<Vec<JoinHandle<()>>>,
}

impl DatalinkDriver {
    /// Open every named interface, in port order
    ///
    /// The switch MAC is taken from the second interface when there is one,
    /// otherwise from the first.
    pub fn open<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let interfaces = names
            .iter()
            .map(|name| find_interface(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mac = interfaces
            .get(1)
            .or(interfaces.first())
            .and_then(interface_mac)
            .unwrap_or(MacAddr::ZERO);

        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel();
        let mut ports = Vec::with_capacity(interfaces.len());
        let mut readers = Vec::with_capacity(interfaces.len());

        for (port, iface) in interfaces.iter().enumerate() {
            let config = pnet_datalink::Config {
                read_timeout: Some(READ_TIMEOUT),
                ..Default::default()
            };

            let (sender, receiver) = match pnet_datalink::channel(iface, config) {
                Ok(Channel::Ethernet(sender, receiver)) => (sender, receiver),
                Ok(_) => return Err(Error::link(port, "unsupported channel type")),
                Err(e) => {
                    return Err(Error::link(port, format!("failed to open channel: {}", e)))
                }
            };

            let echoes: EchoWindow = Arc::new(Mutex::new(VecDeque::with_capacity(ECHO_WINDOW)));

            let reader = spawn_reader(
                port,
                iface.name.clone(),
                receiver,
                tx.clone(),
                Arc::clone(&echoes),
                Arc::clone(&running),
            )?;
            readers.push(reader);

            debug!(port, interface = %iface.name, "opened datalink channel");
            ports.push(Port {
                name: iface.name.clone(),
                sender: Mutex::new(sender),
                echoes,
            });
        }

        info!(ports = ports.len(), mac = %mac, "datalink driver ready");

        Ok(Self {
            ports,
            inbound: Mutex::new(rx),
            mac,
            running,
            readers: Mutex::new(readers),
        })
    }

    /// Stop the reader threads and wait for them
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for reader in self.readers.lock().drain(..) {
            if reader.join().is_err() {
                warn!("datalink reader thread panicked");
            }
        }
        info!("datalink driver stopped");
    }
}

fn spawn_reader(
    port: PortId,
    name: String,
    mut receiver: Box<dyn DataLinkReceiver>,
    queue: mpsc::Sender<Packet>,
    echoes: EchoWindow,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let thread_name = format!("rx-{}", name);

    let handle = thread::Builder::new().name(thread_name).spawn(move || {
        while running.load(Ordering::Relaxed) {
            match receiver.next() {
                Ok(frame) => {
                    if is_echo(&echoes, frame) {
                        continue;
                    }
                    if queue.send(Packet::new(port, frame.to_vec())).is_err() {
                        debug!(port, "receive queue closed");
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) => {
                    error!(port, interface = %name, error = %e, "datalink receive failed");
                    break;
                }
            }
        }
        debug!(port, "reader thread finished");
    })?;

    Ok(handle)
}

fn is_echo(echoes: &EchoWindow, frame: &[u8]) -> bool {
    let mut window = echoes.lock();
    match window.iter().position(|sent| sent.as_slice() == frame) {
        Some(index) => {
            window.remove(index);
            true
        }
        None => false,
    }
}

impl LinkDriver for DatalinkDriver {
    fn receive_timeout(&self, timeout: Duration) -> Result<Option<Packet>> {
        match self.inbound.lock().recv_timeout(timeout) {
            Ok(packet) => Ok(Some(packet)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::link(0, "all datalink readers have stopped"))
            }
        }
    }

    fn transmit(&self, port: PortId, frame: &[u8]) -> Result<()> {
        let entry = self.ports.get(port).ok_or(Error::PortOutOfRange(port))?;

        {
            let mut window = entry.echoes.lock();
            if window.len() == ECHO_WINDOW {
                window.pop_front();
            }
            window.push_back(frame.to_vec());
        }

        entry
            .sender
            .lock()
            .send_to(frame, None)
            .ok_or_else(|| Error::link(port, "send queue unavailable"))?
            .map_err(|e| Error::link(port, format!("send error: {}", e)))
    }

    fn mac_address(&self) -> MacAddr {
        self.mac
    }

    fn interface_name(&self, port: PortId) -> Option<&str> {
        self.ports.get(port).map(|p| p.name.as_str())
    }

    fn port_count(&self) -> usize {
        self.ports.len()
    }
}

impl Drop for DatalinkDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
