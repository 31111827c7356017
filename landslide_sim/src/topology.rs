//! Network topology: three segments joined by a point-to-point backbone.
//!
//! ```text
//!  mountain Wi-Fi (10.1.1.0/24)     backbone (10.1.3.0/24)     city LAN (10.1.2.0/24)
//!  stations ~~~~ access point ======================== gateway ---- city hosts
//! ```
//!
//! The access point and the gateway are the two ends of the backbone. A
//! disposed node takes every hop it terminates down with it.

use landslide_env::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::error::SimError;
use crate::registry::NodeRegistry;

/// Propagation speed on the wireless segment (m/s).
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Hosts per /24 segment.
const MAX_HOSTS: usize = 254;

/// A layer-2 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    MountainWifi,
    Backbone,
    CityLan,
}

impl Segment {
    /// Network address of the segment's /24.
    pub fn network(&self) -> Ipv4Addr {
        match self {
            Segment::MountainWifi => Ipv4Addr::new(10, 1, 1, 0),
            Segment::CityLan => Ipv4Addr::new(10, 1, 2, 0),
            Segment::Backbone => Ipv4Addr::new(10, 1, 3, 0),
        }
    }
}

/// Rate and fixed delay of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub data_rate_bps: u64,

    /// Fixed propagation delay; 0 on Wi-Fi, where distance decides
    pub delay_ns: u64,
}

impl LinkSpec {
    /// 5 Mbps, 2 ms.
    pub fn point_to_point() -> Self {
        Self {
            data_rate_bps: 5_000_000,
            delay_ns: 2_000_000,
        }
    }

    /// 100 Mbps, 6560 ns.
    pub fn csma() -> Self {
        Self {
            data_rate_bps: 100_000_000,
            delay_ns: 6_560,
        }
    }

    /// 54 Mbps, distance-based propagation.
    pub fn wifi() -> Self {
        Self {
            data_rate_bps: 54_000_000,
            delay_ns: 0,
        }
    }

    /// Time to push `bytes` onto the link.
    pub fn serialization(&self, bytes: u32) -> Duration {
        let bits = bytes as u128 * 8;
        let nanos = bits * 1_000_000_000 / self.data_rate_bps.max(1) as u128;
        Duration::from_nanos(nanos as u64)
    }

    /// Serialization plus the fixed delay.
    pub fn transit(&self, bytes: u32) -> Duration {
        self.serialization(bytes) + Duration::from_nanos(self.delay_ns)
    }
}

/// Link parameters for the three segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub backbone: LinkSpec,
    pub city_lan: LinkSpec,
    pub wifi: LinkSpec,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            backbone: LinkSpec::point_to_point(),
            city_lan: LinkSpec::csma(),
            wifi: LinkSpec::wifi(),
        }
    }
}

/// One hop of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub from: EntityId,
    pub to: EntityId,
    pub segment: Segment,
}

/// Segment membership and address plan.
#[derive(Debug, Clone)]
pub struct Topology {
    links: NetworkConfig,
    gateway: EntityId,
    access_point: EntityId,

    /// Access point first, then stations
    mountain: Vec<EntityId>,

    /// Gateway first, then hosts
    city: Vec<EntityId>,

    addresses: HashMap<(EntityId, Segment), Ipv4Addr>,
}

impl Topology {
    /// Wires up the segments and assigns addresses in member order.
    pub fn new(
        links: NetworkConfig,
        gateway: EntityId,
        access_point: EntityId,
        stations: &[EntityId],
        city_hosts: &[EntityId],
    ) -> Result<Self, SimError> {
        let mountain: Vec<EntityId> = std::iter::once(access_point).chain(stations.iter().copied()).collect();
        let city: Vec<EntityId> = std::iter::once(gateway).chain(city_hosts.iter().copied()).collect();

        let mut addresses = HashMap::new();
        for (segment, members) in [
            (Segment::MountainWifi, mountain.as_slice()),
            (Segment::CityLan, city.as_slice()),
            (Segment::Backbone, &[gateway, access_point][..]),
        ] {
            if members.len() > MAX_HOSTS {
                return Err(SimError::config(format!(
                    "{:?} has {} members, a /24 holds at most {}",
                    segment,
                    members.len(),
                    MAX_HOSTS
                )));
            }
            let base = u32::from(segment.network());
            for (host, id) in members.iter().enumerate() {
                addresses.insert((*id, segment), Ipv4Addr::from(base + host as u32 + 1));
            }
        }

        Ok(Self {
            links,
            gateway,
            access_point,
            mountain,
            city,
            addresses,
        })
    }

    pub fn gateway(&self) -> EntityId {
        self.gateway
    }

    pub fn access_point(&self) -> EntityId {
        self.access_point
    }

    /// Access point and stations.
    pub fn mountain(&self) -> &[EntityId] {
        &self.mountain
    }

    /// Gateway and city hosts.
    pub fn city(&self) -> &[EntityId] {
        &self.city
    }

    /// Address of `id` on `segment`, if it is attached there.
    pub fn address(&self, id: EntityId, segment: Segment) -> Option<Ipv4Addr> {
        self.addresses.get(&(id, segment)).copied()
    }

    /// Hops from `from` to `to`. `None` if either node is not attached.
    pub fn route(&self, from: EntityId, to: EntityId) -> Option<Vec<Hop>> {
        let in_mountain = |id: EntityId| self.mountain.contains(&id);
        let in_city = |id: EntityId| self.city.contains(&id);
        if !(in_mountain(from) || in_city(from)) || !(in_mountain(to) || in_city(to)) {
            return None;
        }

        // Stations talk through the AP; city hosts share one LAN
        let mut waypoints = vec![from];
        if in_mountain(from) {
            waypoints.push(self.access_point);
            if in_city(to) {
                waypoints.push(self.gateway);
            }
        } else if in_mountain(to) {
            waypoints.push(self.gateway);
            waypoints.push(self.access_point);
        }
        waypoints.push(to);
        waypoints.dedup();

        let hops = waypoints
            .windows(2)
            .map(|w| {
                let segment = if (w[0], w[1]) == (self.gateway, self.access_point)
                    || (w[0], w[1]) == (self.access_point, self.gateway)
                {
                    Segment::Backbone
                } else if in_mountain(w[0]) && in_mountain(w[1]) {
                    Segment::MountainWifi
                } else {
                    Segment::CityLan
                };
                Hop {
                    from: w[0],
                    to: w[1],
                    segment,
                }
            })
            .collect();
        Some(hops)
    }

    /// One-way delay for a `bytes`-sized packet at time `now`.
    ///
    /// `None` when there is no route or a hop endpoint has been disposed.
    pub fn path_delay(
        &self,
        registry: &NodeRegistry,
        from: EntityId,
        to: EntityId,
        bytes: u32,
        now: Duration,
    ) -> Option<Duration> {
        let mut total = Duration::ZERO;
        for hop in self.route(from, to)? {
            if !registry.is_active(hop.from) || !registry.is_active(hop.to) {
                return None;
            }
            total += match hop.segment {
                Segment::Backbone => self.links.backbone.transit(bytes),
                Segment::CityLan => self.links.city_lan.transit(bytes),
                Segment::MountainWifi => {
                    let distance = (registry.position(hop.to, now)? - registry.position(hop.from, now)?).norm();
                    self.links.wifi.transit(bytes) + Duration::from_secs_f64(distance / SPEED_OF_LIGHT)
                }
            };
        }
        Some(total)
    }
}
