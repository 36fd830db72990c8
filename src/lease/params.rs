use core::fmt;

use crate::time::{Duration, Instant};
use crate::wire::{AddressList, DhcpMessageType, DhcpPacket, DhcpRepr, Ipv4Address};
use crate::Result;

/// Longest host or domain name kept from a reply.
pub const MAX_NAME_LEN: usize = 64;

// RFC 1122 host requirements, used when a reply leaves a value out.
const DEFAULT_IP_TTL: u8 = 64;
const DEFAULT_MTU: u16 = 576;
const DEFAULT_ARP_CACHE_TIMEOUT: u32 = 60;
const DEFAULT_TCP_TTL: u8 = 64;
const DEFAULT_TCP_KEEPALIVE: u32 = 7200;

/// The length of a lease.
///
/// Ordered so that any finite lease is shorter than an infinite one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeaseTime {
    Finite(u32),
    Infinite,
}

impl LeaseTime {
    /// Decode the lease time option, where all ones means infinity.
    pub fn from_secs(secs: u32) -> LeaseTime {
        if secs == u32::MAX {
            LeaseTime::Infinite
        } else {
            LeaseTime::Finite(secs)
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match *self {
            LeaseTime::Finite(secs) => Some(Duration::from_secs(secs as u64)),
            LeaseTime::Infinite => None,
        }
    }
}

impl fmt::Display for LeaseTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LeaseTime::Finite(secs) => write!(f, "{}s", secs),
            LeaseTime::Infinite => write!(f, "infinite"),
        }
    }
}

/// A decoded parameter set: an offer while negotiating, the committed
/// configuration once bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    /// `None` for a BOOTP reply.
    pub message_type: Option<DhcpMessageType>,
    /// Unspecified if the reply named no server.
    pub server_identifier: Ipv4Address,
    pub your_ip: Ipv4Address,
    pub server_ip: Ipv4Address,
    pub lease_duration: LeaseTime,
    pub renewal_time: Option<u32>,
    pub rebinding_time: Option<u32>,
    pub subnet_mask: Option<Ipv4Address>,
    pub broadcast_address: Option<Ipv4Address>,
    pub routers: AddressList,
    pub dns_servers: AddressList,
    pub host_name: Option<heapless::String<MAX_NAME_LEN>>,
    pub domain_name: Option<heapless::String<MAX_NAME_LEN>>,
    pub ip_ttl: u8,
    pub mtu: u16,
    pub arp_cache_timeout: u32,
    pub tcp_ttl: u8,
    pub tcp_keepalive: u32,
    /// Start of the exchange this lease was obtained in; lease times count from here.
    pub lease_origin: Option<Instant>,
}

fn name(value: Option<&str>) -> Option<heapless::String<MAX_NAME_LEN>> {
    let mut name = heapless::String::new();
    name.push_str(value?).ok()?;
    Some(name)
}

impl Parameters {
    /// Decode a received reply, filling in host-requirements defaults.
    pub fn decode<T: AsRef<[u8]> + ?Sized>(packet: &DhcpPacket<&T>) -> Result<Parameters> {
        let repr = DhcpRepr::parse(packet)?;
        Ok(Parameters::from_repr(&repr))
    }

    pub fn from_repr(repr: &DhcpRepr) -> Parameters {
        let lease_duration = match (repr.message_type, repr.lease_time) {
            (_, Some(secs)) => LeaseTime::from_secs(secs),
            (None, None) => LeaseTime::Infinite,
            (Some(_), None) => LeaseTime::Finite(0),
        };
        Parameters {
            message_type: repr.message_type,
            server_identifier: repr.server_identifier.unwrap_or(Ipv4Address::UNSPECIFIED),
            your_ip: repr.your_ip,
            server_ip: repr.server_ip,
            lease_duration,
            renewal_time: repr.renewal_time,
            rebinding_time: repr.rebinding_time,
            subnet_mask: repr.subnet_mask,
            broadcast_address: repr.broadcast_address,
            routers: repr.router.clone(),
            dns_servers: repr.dns_servers.clone(),
            host_name: name(repr.host_name),
            domain_name: name(repr.domain_name),
            ip_ttl: repr.default_ttl.unwrap_or(DEFAULT_IP_TTL),
            mtu: repr.interface_mtu.unwrap_or(DEFAULT_MTU),
            arp_cache_timeout: repr.arp_cache_timeout.unwrap_or(DEFAULT_ARP_CACHE_TIMEOUT),
            tcp_ttl: repr.tcp_default_ttl.unwrap_or(DEFAULT_TCP_TTL),
            tcp_keepalive: repr.tcp_keepalive_interval.unwrap_or(DEFAULT_TCP_KEEPALIVE),
            lease_origin: None,
        }
    }

    /// Whether these parameters came from a BOOTP reply.
    pub fn is_bootp(&self) -> bool {
        self.message_type.is_none()
    }

    /// When the lease runs out, if it is finite and stamped.
    pub fn expires_at(&self) -> Option<Instant> {
        Some(self.lease_origin? + self.lease_duration.as_duration()?)
    }
}
