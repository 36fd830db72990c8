//! Outgoing message construction and the owned message buffer.
//!
//! Every builder returns a fresh, immutable [Message]; nothing is staged in shared
//! buffers between calls.

use core::fmt;

use heapless::Vec;

use super::{Binding, Config, Parameters};
use crate::config::MAX_MESSAGE_LEN;
use crate::wire::{
    DhcpFlags, DhcpMessageType, DhcpPacket, DhcpRepr, Ipv4Address, DHCP_LEGACY_MESSAGE_LEN,
};
use crate::{Error, Result};

/// An owned DHCP message, received or built for sending.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Vec<u8, MAX_MESSAGE_LEN>,
}

impl Message {
    /// Copy `bytes` into a message. Returns `Err(Error::Exhausted)` if they do not fit.
    pub fn new(bytes: &[u8]) -> Result<Message> {
        Ok(Message {
            bytes: Vec::from_slice(bytes).map_err(|_| Error::Exhausted)?,
        })
    }

    /// Emit `repr` into a message of `len` octets, padding after the options.
    fn emit(repr: &DhcpRepr, len: usize) -> Result<Message> {
        let mut bytes = Vec::new();
        bytes.resize(len, 0).map_err(|_| Error::Exhausted)?;
        repr.emit(&mut DhcpPacket::new_unchecked(&mut bytes[..]))?;
        Ok(Message { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// View the message as a DHCP packet. Returns `Err(Error::Truncated)` if it is too
    /// short to be one.
    pub fn packet(&self) -> Result<DhcpPacket<&[u8]>> {
        DhcpPacket::new_checked(&self.bytes[..])
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Message({} octets)", self.bytes.len())
    }
}

/// What stays the same across all messages of one exchange.
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    pub binding: &'a Binding,
    pub config: &'a Config,
    pub transaction_id: u32,
    /// Seconds since the exchange began, for the `secs` field.
    pub secs: u16,
    /// Pad to the classic fixed-size layout for old servers.
    pub legacy_format: bool,
}

impl<'a> Exchange<'a> {
    /// The fields every client message shares.
    fn repr(&self, message_type: DhcpMessageType) -> DhcpRepr<'a> {
        DhcpRepr {
            transaction_id: self.transaction_id,
            secs: self.secs,
            client_hardware_address: self.binding.hardware_address,
            client_identifier: Some(self.binding.hardware_address),
            ..DhcpRepr::request(message_type)
        }
    }

    /// `repr` plus what a client asking for configuration adds.
    fn asking(&self, message_type: DhcpMessageType) -> DhcpRepr<'a> {
        let flags = if self.config.broadcast_flag {
            DhcpFlags::BROADCAST
        } else {
            DhcpFlags::empty()
        };
        DhcpRepr {
            flags,
            parameter_request_list: Some(&self.config.request_list[..]),
            max_message_size: Some(self.config.max_message_size),
            ..self.repr(message_type)
        }
    }

    fn finish(&self, repr: &DhcpRepr) -> Result<Message> {
        let mut len = repr.buffer_len();
        if self.legacy_format {
            len = len.max(DHCP_LEGACY_MESSAGE_LEN);
        }
        Message::emit(repr, len)
    }
}

/// DHCPDISCOVER, broadcast to find servers.
pub fn build_discover(exchange: &Exchange) -> Result<Message> {
    let repr = DhcpRepr {
        lease_time: exchange.config.requested_lease,
        ..exchange.asking(DhcpMessageType::Discover)
    };
    exchange.finish(&repr)
}

/// DHCPREQUEST selecting `offer`, or DHCPINFORM for the address of the binding.
///
/// Returns `Err(Error::Illegal)` for any other message type, for a request without
/// an offer, and for an inform without an address.
pub fn build_request_or_inform(
    exchange: &Exchange,
    message_type: DhcpMessageType,
    offer: Option<&Parameters>,
) -> Result<Message> {
    let repr = match message_type {
        DhcpMessageType::Request => {
            let offer = offer.ok_or(Error::Illegal)?;
            DhcpRepr {
                requested_ip: Some(offer.your_ip),
                server_identifier: Some(offer.server_identifier),
                lease_time: exchange.config.requested_lease,
                ..exchange.asking(message_type)
            }
        }
        DhcpMessageType::Inform => DhcpRepr {
            client_ip: exchange.binding.address.ok_or(Error::Illegal)?,
            ..exchange.asking(message_type)
        },
        _ => return Err(Error::Illegal),
    };
    exchange.finish(&repr)
}

/// DHCPREQUEST confirming a previously held `address` after a reboot.
pub fn build_reboot_request(exchange: &Exchange, address: Ipv4Address) -> Result<Message> {
    let repr = DhcpRepr {
        requested_ip: Some(address),
        ..exchange.asking(DhcpMessageType::Request)
    };
    exchange.finish(&repr)
}

/// DHCPDECLINE for the address in `offer`, explaining why in `reason`.
pub fn build_decline(exchange: &Exchange, offer: &Parameters, reason: &str) -> Result<Message> {
    let repr = DhcpRepr {
        requested_ip: Some(offer.your_ip),
        server_identifier: Some(offer.server_identifier),
        message: Some(reason),
        ..exchange.repr(DhcpMessageType::Decline)
    };
    exchange.finish(&repr)
}

/// DHCPRELEASE giving back the bound address in `params`.
pub fn build_release(exchange: &Exchange, params: &Parameters) -> Result<Message> {
    let repr = DhcpRepr {
        client_ip: params.your_ip,
        server_identifier: Some(params.server_identifier),
        ..exchange.repr(DhcpMessageType::Release)
    };
    exchange.finish(&repr)
}
