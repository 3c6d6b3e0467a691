//! Execution shim: the only surface the code under test talks to.
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use vaktprov_config::RunnerConfig;
use vaktprov_core::{Delivery, Interface, MacAddr, Packet, ReceiveOutcome, Scenario};

use crate::engine::error::RecvError;

/// A packet handed to the implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// Virtual time at which the packet arrived.
    pub timestamp: Duration,
    pub interface: String,
    pub packet: Packet,
}

impl From<Delivery> for Received {
    fn from(d: Delivery) -> Self {
        Self {
            timestamp: d.timestamp,
            interface: d.interface,
            packet: d.packet,
        }
    }
}

/// Driver-side switch telling the implementation its test window is over.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Cloneable handle given to the implementation under test. Every call is
/// matched against the scenario it was created for.
#[derive(Clone)]
pub struct Shim {
    scenario: Arc<Mutex<Scenario>>,
    shutdown: ShutdownHandle,
    config: Arc<RunnerConfig>,
}

impl Shim {
    pub fn new(
        scenario: Arc<Mutex<Scenario>>,
        shutdown: ShutdownHandle,
        config: Arc<RunnerConfig>,
    ) -> Self {
        Self {
            scenario,
            shutdown,
            config,
        }
    }

    /// Waits for the next packet on any interface.
    pub async fn recv_packet(&self, timeout: Option<Duration>) -> Result<Received, RecvError> {
        self.receive(None, timeout).await
    }

    /// Waits for the next packet on `interface` only.
    pub async fn recv_packet_on(
        &self,
        interface: &str,
        timeout: Option<Duration>,
    ) -> Result<Received, RecvError> {
        self.receive(Some(interface), timeout).await
    }

    async fn receive(
        &self,
        interface: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Received, RecvError> {
        tokio::task::yield_now().await;
        if self.shutdown.is_shutdown() {
            return Err(RecvError::Shutdown);
        }

        let timeout = timeout.or_else(|| self.config.default_recv_timeout());
        let mut scenario = self.scenario.lock();
        if scenario.done() && self.config.shutdown_on_done {
            trace!("script exhausted, signalling shutdown");
            return Err(RecvError::Shutdown);
        }
        match scenario.on_receive_attempt(interface, timeout) {
            ReceiveOutcome::Delivered(delivery) => Ok(delivery.into()),
            ReceiveOutcome::NoPackets(_) => Err(RecvError::NoPackets),
        }
    }

    /// Emits a packet. Never blocks.
    pub fn send_packet(&self, interface: &str, packet: impl Into<Packet>) {
        let packet = packet.into();
        self.scenario.lock().on_send_attempt(interface, &packet);
    }

    /// Makes every later receive return `RecvError::Shutdown`.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    pub fn interfaces(&self) -> Vec<Interface> {
        self.scenario.lock().interfaces().iter().cloned().collect()
    }

    pub fn interface_by_name(&self, name: &str) -> Option<Interface> {
        self.scenario.lock().interfaces().get(name).cloned()
    }

    pub fn interface_by_ipaddr(&self, ip: Ipv4Addr) -> Option<Interface> {
        self.scenario.lock().interfaces().by_ip(ip).cloned()
    }

    pub fn interface_by_macaddr(&self, mac: MacAddr) -> Option<Interface> {
        self.scenario.lock().interfaces().by_mac(mac).cloned()
    }

    /// Contents of a file attached to the scenario.
    pub fn file(&self, name: &str) -> Option<String> {
        self.scenario.lock().file(name).map(str::to_string)
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scenario.lock().elapsed()
    }
}
