//! Warning traffic: an echo client on the mountain pinging a city server.
//!
//! The client sends fixed-size packets at a fixed interval; the server
//! echoes each one back. Packets die in flight when a node on their path
//! has been disposed, which is how the landslide becomes visible on the
//! network side.

use landslide_env::{virtual_time, EntityId, Scheduler};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SimError;
use crate::registry::NodeRegistry;
use crate::topology::{Segment, Topology};

/// Echo application parameters (times in seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub port: u16,
    pub max_packets: u32,
    pub interval_secs: f64,
    pub packet_size: u32,
    pub server_start_secs: f64,
    pub server_stop_secs: f64,
    pub client_start_secs: f64,
    pub client_stop_secs: f64,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            port: 9,
            max_packets: 15,
            interval_secs: 0.1,
            packet_size: 1024,
            server_start_secs: 1.0,
            server_stop_secs: 10.0,
            client_start_secs: 2.0,
            client_stop_secs: 5.0,
        }
    }
}

/// Traffic events queued on the simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficAction {
    /// Client emits packet `seq`
    ClientSend { seq: u32 },

    /// Packet `seq` arrives at the server
    ServerReceive { seq: u32 },

    /// Echo of packet `seq` arrives back at the client
    ClientReceive { seq: u32 },
}

/// Packet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub sent: u32,
    pub received_by_server: u32,
    pub echoed: u32,
    pub dropped: u32,
}

/// Half-open activity window.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: Duration,
    stop: Duration,
}

impl Window {
    fn contains(&self, t: Duration) -> bool {
        self.start <= t && t < self.stop
    }
}

/// The echo client/server pair.
#[derive(Debug, Clone)]
pub struct EchoTraffic {
    config: EchoConfig,
    client: EntityId,
    server: EntityId,
    interval: Duration,
    client_window: Window,
    server_window: Window,
    stats: TrafficStats,
}

impl EchoTraffic {
    /// Creates the pair, validating the timing parameters.
    pub fn new(config: EchoConfig, client: EntityId, server: EntityId) -> Result<Self, SimError> {
        let interval = virtual_time(config.interval_secs)?;
        if interval.is_zero() && config.max_packets > 1 {
            return Err(SimError::config("echo interval must be positive"));
        }
        let client_window = Window {
            start: virtual_time(config.client_start_secs)?,
            stop: virtual_time(config.client_stop_secs)?,
        };
        let server_window = Window {
            start: virtual_time(config.server_start_secs)?,
            stop: virtual_time(config.server_stop_secs)?,
        };

        Ok(Self {
            config,
            client,
            server,
            interval,
            client_window,
            server_window,
            stats: TrafficStats::default(),
        })
    }

    pub fn client(&self) -> EntityId {
        self.client
    }

    pub fn server(&self) -> EntityId {
        self.server
    }

    pub fn stats(&self) -> TrafficStats {
        self.stats
    }

    /// Queues the first client send.
    pub fn install<S>(&self, scheduler: &mut S) -> Result<(), SimError>
    where
        S: Scheduler,
        S::Action: From<TrafficAction>,
    {
        if self.config.max_packets == 0 || self.client_window.start >= self.client_window.stop {
            debug!("Echo client has nothing to send");
            return Ok(());
        }
        scheduler.schedule(self.client_window.start, TrafficAction::ClientSend { seq: 0 }.into())?;
        Ok(())
    }

    /// Handles a traffic event that has come due at `now`.
    pub fn handle<S>(
        &mut self,
        action: TrafficAction,
        now: Duration,
        registry: &NodeRegistry,
        topology: &Topology,
        scheduler: &mut S,
    ) -> Result<(), SimError>
    where
        S: Scheduler,
        S::Action: From<TrafficAction>,
    {
        match action {
            TrafficAction::ClientSend { seq } => {
                if !self.client_window.contains(now) {
                    return Ok(());
                }
                if !registry.is_active(self.client) {
                    info!("Echo client {} is gone, stopping after {} packets", self.client, seq);
                    return Ok(());
                }

                self.stats.sent += 1;
                info!(
                    "Client sent {} bytes to {} port {} (seq {})",
                    self.config.packet_size,
                    self.server_address(topology),
                    self.config.port,
                    seq
                );
                match topology.path_delay(registry, self.client, self.server, self.config.packet_size, now) {
                    Some(delay) => {
                        scheduler.schedule(now + delay, TrafficAction::ServerReceive { seq }.into())?;
                    }
                    None => self.drop_packet(seq, "no route to server"),
                }

                if seq + 1 < self.config.max_packets {
                    let next = now + self.interval;
                    if self.client_window.contains(next) {
                        scheduler.schedule(next, TrafficAction::ClientSend { seq: seq + 1 }.into())?;
                    }
                }
            }
            TrafficAction::ServerReceive { seq } => {
                if !self.server_window.contains(now) || !registry.is_active(self.server) {
                    self.drop_packet(seq, "server down");
                    return Ok(());
                }
                self.stats.received_by_server += 1;
                info!("Server received {} bytes (seq {}), echoing", self.config.packet_size, seq);
                match topology.path_delay(registry, self.server, self.client, self.config.packet_size, now) {
                    Some(delay) => {
                        scheduler.schedule(now + delay, TrafficAction::ClientReceive { seq }.into())?;
                    }
                    None => self.drop_packet(seq, "no route back to client"),
                }
            }
            TrafficAction::ClientReceive { seq } => {
                if !self.client_window.contains(now) || !registry.is_active(self.client) {
                    self.drop_packet(seq, "client down");
                    return Ok(());
                }
                self.stats.echoed += 1;
                info!("Client received echo (seq {})", seq);
            }
        }
        Ok(())
    }

    fn server_address(&self, topology: &Topology) -> String {
        topology
            .address(self.server, Segment::CityLan)
            .map(|a| a.to_string())
            .unwrap_or_else(|| self.server.to_string())
    }

    fn drop_packet(&mut self, seq: u32, reason: &str) {
        self.stats.dropped += 1;
        debug!("Dropped packet seq {}: {}", seq, reason);
    }
}
