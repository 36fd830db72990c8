// See https://tools.ietf.org/html/rfc2131 for the DHCP specification
// and https://tools.ietf.org/html/rfc2132 for the option formats.

use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};
use heapless::Vec;

use super::{EthernetAddress, Ipv4Address};
use crate::config::MAX_ADDRESS_LIST;
use crate::{Error, Result};

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;

const DHCP_MAGIC_NUMBER: u32 = 0x63825363;

/// Length of a message in the classic fixed layout: the 236-octet header followed by
/// a 312-octet options field, magic cookie included.
pub const LEGACY_MESSAGE_LEN: usize = 548;

/// A list of addresses carried by one option, e.g. routers or DNS servers.
///
/// Entries beyond the list capacity are dropped when parsing.
pub type AddressList = Vec<Ipv4Address, MAX_ADDRESS_LIST>;

enum_with_unknown! {
    /// The possible opcodes of a DHCP packet.
    pub enum OpCode(u8) {
        Request = 1,
        Reply = 2,
    }
}

enum_with_unknown! {
    /// The possible message types of a DHCP packet.
    pub enum MessageType(u8) {
        Discover = 1,
        Offer = 2,
        Request = 3,
        Decline = 4,
        Ack = 5,
        Nak = 6,
        Release = 7,
        Inform = 8,
    }
}

impl MessageType {
    /// The BOOTP opcode a message of this type travels under.
    pub fn opcode(&self) -> OpCode {
        match *self {
            MessageType::Discover
            | MessageType::Inform
            | MessageType::Request
            | MessageType::Decline
            | MessageType::Release => OpCode::Request,
            MessageType::Offer | MessageType::Ack | MessageType::Nak => OpCode::Reply,
            MessageType::Unknown(_) => OpCode::Unknown(0),
        }
    }
}

enum_with_unknown! {
    /// Hardware address types; only Ethernet is understood.
    pub enum Hardware(u8) {
        Ethernet = 1,
    }
}

bitflags! {
    /// The `flags` field of a DHCP message.
    #[derive(Default)]
    pub struct Flags: u16 {
        /// Ask the server to broadcast its reply, for clients that cannot receive
        /// unicast before their address is configured.
        const BROADCAST = 0b1000_0000_0000_0000;
    }
}

/// A representation of a single DHCP option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DhcpOption<'a> {
    EndOfList,
    Pad,
    MessageType(MessageType),
    RequestedIp(Ipv4Address),
    ServerIdentifier(Ipv4Address),
    ClientIdentifier(EthernetAddress),
    IpLeaseTime(u32),
    RenewalTime(u32),
    RebindingTime(u32),
    SubnetMask(Ipv4Address),
    BroadcastAddress(Ipv4Address),
    /// One or more router addresses, four octets each.
    Router(&'a [u8]),
    /// One or more DNS server addresses, four octets each.
    DomainNameServer(&'a [u8]),
    HostName(&'a [u8]),
    DomainName(&'a [u8]),
    DefaultTtl(u8),
    InterfaceMtu(u16),
    ArpCacheTimeout(u32),
    TcpDefaultTtl(u8),
    TcpKeepaliveInterval(u32),
    Message(&'a [u8]),
    ParameterRequestList(&'a [u8]),
    MaximumMessageSize(u16),
    Other { kind: u8, data: &'a [u8] },
}

fn fixed(data: &[u8], len: usize) -> Result<&[u8]> {
    if data.len() == len {
        Ok(data)
    } else {
        Err(Error::Malformed)
    }
}

fn address(data: &[u8]) -> Result<Ipv4Address> {
    Ok(Ipv4Address::from_bytes(fixed(data, 4)?))
}

fn seconds(data: &[u8]) -> Result<u32> {
    Ok(NetworkEndian::read_u32(fixed(data, 4)?))
}

fn address_list(data: &[u8]) -> Result<&[u8]> {
    if data.is_empty() || data.len() % 4 != 0 {
        Err(Error::Malformed)
    } else {
        Ok(data)
    }
}

impl<'a> DhcpOption<'a> {
    /// Parse one option, returning it and the rest of the options field.
    ///
    /// Options whose length contradicts their type are `Malformed`; unknown options are
    /// returned as `Other`.
    pub fn parse(buffer: &'a [u8]) -> Result<(&'a [u8], DhcpOption<'a>)> {
        let (skip_len, option);
        match *buffer.first().ok_or(Error::Truncated)? {
            field::OPT_END => {
                skip_len = 1;
                option = DhcpOption::EndOfList;
            }
            field::OPT_PAD => {
                skip_len = 1;
                option = DhcpOption::Pad;
            }
            kind => {
                let length = *buffer.get(1).ok_or(Error::Truncated)? as usize;
                skip_len = length + 2;
                let data = buffer.get(2..skip_len).ok_or(Error::Truncated)?;
                option = match kind {
                    field::OPT_DHCP_MESSAGE_TYPE => {
                        DhcpOption::MessageType(MessageType::from(fixed(data, 1)?[0]))
                    }
                    field::OPT_REQUESTED_IP => DhcpOption::RequestedIp(address(data)?),
                    field::OPT_SERVER_IDENTIFIER => DhcpOption::ServerIdentifier(address(data)?),
                    field::OPT_CLIENT_ID
                        if length == 7 && Hardware::from(data[0]) == Hardware::Ethernet =>
                    {
                        DhcpOption::ClientIdentifier(EthernetAddress::from_bytes(&data[1..]))
                    }
                    field::OPT_IP_LEASE_TIME => DhcpOption::IpLeaseTime(seconds(data)?),
                    field::OPT_RENEWAL_TIME_VALUE => DhcpOption::RenewalTime(seconds(data)?),
                    field::OPT_REBINDING_TIME_VALUE => DhcpOption::RebindingTime(seconds(data)?),
                    field::OPT_SUBNET_MASK => DhcpOption::SubnetMask(address(data)?),
                    field::OPT_BROADCAST_ADDRESS => DhcpOption::BroadcastAddress(address(data)?),
                    field::OPT_ROUTER => DhcpOption::Router(address_list(data)?),
                    field::OPT_DOMAIN_NAME_SERVER => {
                        DhcpOption::DomainNameServer(address_list(data)?)
                    }
                    field::OPT_HOST_NAME => DhcpOption::HostName(data),
                    field::OPT_DOMAIN_NAME => DhcpOption::DomainName(data),
                    field::OPT_DEFAULT_TTL => DhcpOption::DefaultTtl(fixed(data, 1)?[0]),
                    field::OPT_INTERFACE_MTU => {
                        DhcpOption::InterfaceMtu(NetworkEndian::read_u16(fixed(data, 2)?))
                    }
                    field::OPT_ARP_CACHE_TIMEOUT => DhcpOption::ArpCacheTimeout(seconds(data)?),
                    field::OPT_TCP_DEFAULT_TTL => DhcpOption::TcpDefaultTtl(fixed(data, 1)?[0]),
                    field::OPT_TCP_KEEPALIVE_INTERVAL => {
                        DhcpOption::TcpKeepaliveInterval(seconds(data)?)
                    }
                    field::OPT_MESSAGE => DhcpOption::Message(data),
                    field::OPT_PARAMETER_REQUEST_LIST => DhcpOption::ParameterRequestList(data),
                    field::OPT_MAX_DHCP_MESSAGE_SIZE => {
                        DhcpOption::MaximumMessageSize(NetworkEndian::read_u16(fixed(data, 2)?))
                    }
                    kind => DhcpOption::Other { kind, data },
                };
            }
        }
        Ok((&buffer[skip_len..], option))
    }

    /// The option code.
    pub fn kind(&self) -> u8 {
        match *self {
            DhcpOption::EndOfList => field::OPT_END,
            DhcpOption::Pad => field::OPT_PAD,
            DhcpOption::MessageType(_) => field::OPT_DHCP_MESSAGE_TYPE,
            DhcpOption::RequestedIp(_) => field::OPT_REQUESTED_IP,
            DhcpOption::ServerIdentifier(_) => field::OPT_SERVER_IDENTIFIER,
            DhcpOption::ClientIdentifier(_) => field::OPT_CLIENT_ID,
            DhcpOption::IpLeaseTime(_) => field::OPT_IP_LEASE_TIME,
            DhcpOption::RenewalTime(_) => field::OPT_RENEWAL_TIME_VALUE,
            DhcpOption::RebindingTime(_) => field::OPT_REBINDING_TIME_VALUE,
            DhcpOption::SubnetMask(_) => field::OPT_SUBNET_MASK,
            DhcpOption::BroadcastAddress(_) => field::OPT_BROADCAST_ADDRESS,
            DhcpOption::Router(_) => field::OPT_ROUTER,
            DhcpOption::DomainNameServer(_) => field::OPT_DOMAIN_NAME_SERVER,
            DhcpOption::HostName(_) => field::OPT_HOST_NAME,
            DhcpOption::DomainName(_) => field::OPT_DOMAIN_NAME,
            DhcpOption::DefaultTtl(_) => field::OPT_DEFAULT_TTL,
            DhcpOption::InterfaceMtu(_) => field::OPT_INTERFACE_MTU,
            DhcpOption::ArpCacheTimeout(_) => field::OPT_ARP_CACHE_TIMEOUT,
            DhcpOption::TcpDefaultTtl(_) => field::OPT_TCP_DEFAULT_TTL,
            DhcpOption::TcpKeepaliveInterval(_) => field::OPT_TCP_KEEPALIVE_INTERVAL,
            DhcpOption::Message(_) => field::OPT_MESSAGE,
            DhcpOption::ParameterRequestList(_) => field::OPT_PARAMETER_REQUEST_LIST,
            DhcpOption::MaximumMessageSize(_) => field::OPT_MAX_DHCP_MESSAGE_SIZE,
            DhcpOption::Other { kind, .. } => kind,
        }
    }

    pub fn buffer_len(&self) -> usize {
        match *self {
            DhcpOption::EndOfList | DhcpOption::Pad => 1,
            DhcpOption::MessageType(_) | DhcpOption::DefaultTtl(_) | DhcpOption::TcpDefaultTtl(_) => 3,
            DhcpOption::InterfaceMtu(_) | DhcpOption::MaximumMessageSize(_) => 4,
            DhcpOption::RequestedIp(_)
            | DhcpOption::ServerIdentifier(_)
            | DhcpOption::SubnetMask(_)
            | DhcpOption::BroadcastAddress(_)
            | DhcpOption::IpLeaseTime(_)
            | DhcpOption::RenewalTime(_)
            | DhcpOption::RebindingTime(_)
            | DhcpOption::ArpCacheTimeout(_)
            | DhcpOption::TcpKeepaliveInterval(_) => 6,
            DhcpOption::ClientIdentifier(eth_addr) => 3 + eth_addr.as_bytes().len(),
            DhcpOption::Router(data)
            | DhcpOption::DomainNameServer(data)
            | DhcpOption::HostName(data)
            | DhcpOption::DomainName(data)
            | DhcpOption::Message(data)
            | DhcpOption::ParameterRequestList(data)
            | DhcpOption::Other { data, .. } => 2 + data.len(),
        }
    }

    /// Emit the option at the start of `buffer`, returning the rest of it.
    ///
    /// # Panics
    /// This function panics if `buffer` is shorter than `self.buffer_len()`.
    /// Payloads longer than 255 octets produce a corrupt length octet.
    pub fn emit<'b>(&self, buffer: &'b mut [u8]) -> &'b mut [u8] {
        let skip_length = self.buffer_len();
        buffer[0] = self.kind();
        if skip_length > 1 {
            buffer[1] = (skip_length - 2) as u8;
            let data = &mut buffer[2..skip_length];
            match *self {
                DhcpOption::EndOfList | DhcpOption::Pad => (),
                DhcpOption::MessageType(value) => data[0] = value.into(),
                DhcpOption::DefaultTtl(value) | DhcpOption::TcpDefaultTtl(value) => data[0] = value,
                DhcpOption::InterfaceMtu(value) | DhcpOption::MaximumMessageSize(value) => {
                    NetworkEndian::write_u16(data, value)
                }
                DhcpOption::RequestedIp(ip)
                | DhcpOption::ServerIdentifier(ip)
                | DhcpOption::SubnetMask(ip)
                | DhcpOption::BroadcastAddress(ip) => data.copy_from_slice(ip.as_bytes()),
                DhcpOption::IpLeaseTime(value)
                | DhcpOption::RenewalTime(value)
                | DhcpOption::RebindingTime(value)
                | DhcpOption::ArpCacheTimeout(value)
                | DhcpOption::TcpKeepaliveInterval(value) => NetworkEndian::write_u32(data, value),
                DhcpOption::ClientIdentifier(eth_addr) => {
                    data[0] = Hardware::Ethernet.into();
                    data[1..].copy_from_slice(eth_addr.as_bytes());
                }
                DhcpOption::Router(provided)
                | DhcpOption::DomainNameServer(provided)
                | DhcpOption::HostName(provided)
                | DhcpOption::DomainName(provided)
                | DhcpOption::Message(provided)
                | DhcpOption::ParameterRequestList(provided)
                | DhcpOption::Other { data: provided, .. } => data.copy_from_slice(provided),
            }
        }
        &mut buffer[skip_length..]
    }
}

/// A read/write wrapper around a Dynamic Host Configuration Protocol packet buffer.
#[derive(Debug, PartialEq)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

pub(crate) mod field {
    #![allow(non_snake_case)]
    #![allow(unused)]

    use crate::wire::field::*;

    pub const OP: usize = 0;
    pub const HTYPE: usize = 1;
    pub const HLEN: usize = 2;
    pub const HOPS: usize = 3;
    pub const XID: Field = 4..8;
    pub const SECS: Field = 8..10;
    pub const FLAGS: Field = 10..12;
    pub const CIADDR: Field = 12..16;
    pub const YIADDR: Field = 16..20;
    pub const SIADDR: Field = 20..24;
    pub const GIADDR: Field = 24..28;
    pub const CHADDR: Field = 28..44;
    pub const SNAME: Field = 44..108;
    pub const FILE: Field = 108..236;
    pub const MAGIC_NUMBER: Field = 236..240;
    pub const OPTIONS: Rest = 240..;

    pub const OPT_PAD: u8 = 0;
    pub const OPT_SUBNET_MASK: u8 = 1;
    pub const OPT_ROUTER: u8 = 3;
    pub const OPT_DOMAIN_NAME_SERVER: u8 = 6;
    pub const OPT_HOST_NAME: u8 = 12;
    pub const OPT_DOMAIN_NAME: u8 = 15;
    pub const OPT_DEFAULT_TTL: u8 = 23;
    pub const OPT_INTERFACE_MTU: u8 = 26;
    pub const OPT_BROADCAST_ADDRESS: u8 = 28;
    pub const OPT_ARP_CACHE_TIMEOUT: u8 = 35;
    pub const OPT_TCP_DEFAULT_TTL: u8 = 37;
    pub const OPT_TCP_KEEPALIVE_INTERVAL: u8 = 38;
    pub const OPT_REQUESTED_IP: u8 = 50;
    pub const OPT_IP_LEASE_TIME: u8 = 51;
    pub const OPT_DHCP_MESSAGE_TYPE: u8 = 53;
    pub const OPT_SERVER_IDENTIFIER: u8 = 54;
    pub const OPT_PARAMETER_REQUEST_LIST: u8 = 55;
    pub const OPT_MESSAGE: u8 = 56;
    pub const OPT_MAX_DHCP_MESSAGE_SIZE: u8 = 57;
    pub const OPT_RENEWAL_TIME_VALUE: u8 = 58;
    pub const OPT_REBINDING_TIME_VALUE: u8 = 59;
    pub const OPT_CLIENT_ID: u8 = 61;
    pub const OPT_END: u8 = 255;
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with DHCP packet structure.
    pub fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < field::MAGIC_NUMBER.end {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Returns the operation code of this packet.
    pub fn opcode(&self) -> OpCode {
        OpCode::from(self.buffer.as_ref()[field::OP])
    }

    /// Returns the hardware protocol type (e.g. ethernet).
    pub fn hardware_type(&self) -> Hardware {
        Hardware::from(self.buffer.as_ref()[field::HTYPE])
    }

    /// Returns the length of a hardware address in bytes (e.g. 6 for ethernet).
    pub fn hardware_len(&self) -> u8 {
        self.buffer.as_ref()[field::HLEN]
    }

    /// Returns the value of the `hops` field.
    pub fn hops(&self) -> u8 {
        self.buffer.as_ref()[field::HOPS]
    }

    /// Returns the transaction ID (`xid`).
    ///
    /// The client picks it and every reply echoes it, which is how replies are
    /// matched to the exchange in progress.
    pub fn transaction_id(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::XID])
    }

    /// Returns the value of the `secs` field, the seconds elapsed since the client
    /// began the exchange.
    pub fn secs(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::SECS])
    }

    pub fn flags(&self) -> Flags {
        Flags::from_bits_truncate(NetworkEndian::read_u16(&self.buffer.as_ref()[field::FLAGS]))
    }

    /// Returns the `ciaddr` field, zero if not set.
    pub fn client_ip(&self) -> Ipv4Address {
        Ipv4Address::from_bytes(&self.buffer.as_ref()[field::CIADDR])
    }

    /// Returns the `yiaddr` field, zero if not set.
    pub fn your_ip(&self) -> Ipv4Address {
        Ipv4Address::from_bytes(&self.buffer.as_ref()[field::YIADDR])
    }

    /// Returns the `siaddr` field, zero if not set.
    pub fn server_ip(&self) -> Ipv4Address {
        Ipv4Address::from_bytes(&self.buffer.as_ref()[field::SIADDR])
    }

    /// Returns the `giaddr` field, zero if not set.
    pub fn relay_agent_ip(&self) -> Ipv4Address {
        Ipv4Address::from_bytes(&self.buffer.as_ref()[field::GIADDR])
    }

    /// Returns the hardware address of the client (`chaddr`).
    ///
    /// Only the first six octets are meaningful for Ethernet.
    pub fn client_hardware_address(&self) -> EthernetAddress {
        EthernetAddress::from_bytes(&self.buffer.as_ref()[field::CHADDR][..6])
    }

    /// Returns the value of the magic cookie that precedes the options.
    pub fn magic_number(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::MAGIC_NUMBER])
    }

    /// Find the DHCP message type option without decoding anything else.
    ///
    /// Returns `Ok(None)` for messages without one, i.e. BOOTP messages. A message
    /// without the magic cookie carries no options at all.
    pub fn message_type(&self) -> Result<Option<MessageType>> {
        if self.magic_number() != DHCP_MAGIC_NUMBER {
            return Ok(None);
        }
        let mut options = &self.buffer.as_ref()[field::OPTIONS];
        while let Some(&kind) = options.first() {
            match kind {
                field::OPT_END => break,
                field::OPT_PAD => options = &options[1..],
                _ => {
                    let length = *options.get(1).ok_or(Error::Truncated)? as usize;
                    let data = options.get(2..2 + length).ok_or(Error::Truncated)?;
                    if kind == field::OPT_DHCP_MESSAGE_TYPE {
                        return match *data {
                            [value] => Ok(Some(MessageType::from(value))),
                            _ => Err(Error::Malformed),
                        };
                    }
                    options = &options[2 + length..];
                }
            }
        }
        Ok(None)
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Packet<&'a T> {
    /// Return a pointer to the options, or an empty slice if the magic cookie
    /// is missing.
    #[inline]
    pub fn options(&self) -> &'a [u8] {
        let data = self.buffer.as_ref();
        if self.magic_number() != DHCP_MAGIC_NUMBER {
            return &[];
        }
        &data[field::OPTIONS]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Sets the `sname` (“server name”) and `file` (“boot file name”) fields to zero.
    pub fn set_sname_and_boot_file_to_zero(&mut self) {
        let data = self.buffer.as_mut();
        data[field::SNAME].fill(0);
        data[field::FILE].fill(0);
    }

    /// Sets the `OpCode` for the packet.
    pub fn set_opcode(&mut self, value: OpCode) {
        self.buffer.as_mut()[field::OP] = value.into();
    }

    /// Sets the hardware address type.
    pub fn set_hardware_type(&mut self, value: Hardware) {
        self.buffer.as_mut()[field::HTYPE] = value.into();
    }

    /// Sets the hardware address length.
    pub fn set_hardware_len(&mut self, value: u8) {
        self.buffer.as_mut()[field::HLEN] = value;
    }

    /// Sets the hops field.
    pub fn set_hops(&mut self, value: u8) {
        self.buffer.as_mut()[field::HOPS] = value;
    }

    /// Sets the transaction ID (`xid`).
    pub fn set_transaction_id(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::XID], value)
    }

    /// Sets the `secs` field.
    pub fn set_secs(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::SECS], value);
    }

    pub fn set_flags(&mut self, value: Flags) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::FLAGS], value.bits());
    }

    /// Sets the `ciaddr` field.
    pub fn set_client_ip(&mut self, value: Ipv4Address) {
        self.buffer.as_mut()[field::CIADDR].copy_from_slice(value.as_bytes());
    }

    /// Sets the `yiaddr` field.
    pub fn set_your_ip(&mut self, value: Ipv4Address) {
        self.buffer.as_mut()[field::YIADDR].copy_from_slice(value.as_bytes());
    }

    /// Sets the `siaddr` field.
    pub fn set_server_ip(&mut self, value: Ipv4Address) {
        self.buffer.as_mut()[field::SIADDR].copy_from_slice(value.as_bytes());
    }

    /// Sets the `giaddr` field.
    pub fn set_relay_agent_ip(&mut self, value: Ipv4Address) {
        self.buffer.as_mut()[field::GIADDR].copy_from_slice(value.as_bytes());
    }

    /// Sets the client hardware address, zeroing the unused tail of `chaddr`.
    pub fn set_client_hardware_address(&mut self, value: EthernetAddress) {
        let field = &mut self.buffer.as_mut()[field::CHADDR];
        field.fill(0);
        field[..6].copy_from_slice(value.as_bytes());
    }

    /// Sets the magic cookie that precedes the options.
    pub fn set_magic_number(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::MAGIC_NUMBER], value);
    }

    /// Return a mutable pointer to the options.
    #[inline]
    pub fn options_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[field::OPTIONS]
    }
}

/// A high-level representation of a Dynamic Host Configuration Protocol packet.
///
/// The access layer is assumed to be Ethernet, so `htype` is always `1` and `hlen`
/// is always `6`.
///
/// `message_type` is `None` for BOOTP messages, which carry no DHCP message type
/// option. Absent address lists are empty.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Repr<'a> {
    pub opcode: OpCode,
    pub message_type: Option<MessageType>,
    /// `xid` in the RFC.
    pub transaction_id: u32,
    pub secs: u16,
    pub flags: Flags,
    /// `chaddr` in the RFC.
    pub client_hardware_address: EthernetAddress,
    /// `ciaddr` in the RFC.
    pub client_ip: Ipv4Address,
    /// `yiaddr` in the RFC, the address being offered or assigned.
    pub your_ip: Ipv4Address,
    /// `siaddr` in the RFC, the next server to use in bootstrap.
    pub server_ip: Ipv4Address,
    /// `giaddr` in the RFC.
    pub relay_agent_ip: Ipv4Address,
    pub requested_ip: Option<Ipv4Address>,
    pub server_identifier: Option<Ipv4Address>,
    pub client_identifier: Option<EthernetAddress>,
    pub lease_time: Option<u32>,
    pub renewal_time: Option<u32>,
    pub rebinding_time: Option<u32>,
    pub subnet_mask: Option<Ipv4Address>,
    pub broadcast_address: Option<Ipv4Address>,
    pub router: AddressList,
    pub dns_servers: AddressList,
    pub host_name: Option<&'a str>,
    pub domain_name: Option<&'a str>,
    pub default_ttl: Option<u8>,
    pub interface_mtu: Option<u16>,
    pub arp_cache_timeout: Option<u32>,
    pub tcp_default_ttl: Option<u8>,
    pub tcp_keepalive_interval: Option<u32>,
    /// The message option; servers use it to explain a NAK, clients a DECLINE.
    pub message: Option<&'a str>,
    pub parameter_request_list: Option<&'a [u8]>,
    pub max_message_size: Option<u16>,
}

impl<'a> Default for Repr<'a> {
    fn default() -> Self {
        Self {
            opcode: OpCode::Request,
            message_type: None,
            transaction_id: 0,
            secs: 0,
            flags: Flags::empty(),
            client_hardware_address: EthernetAddress::default(),
            client_ip: Ipv4Address::UNSPECIFIED,
            your_ip: Ipv4Address::UNSPECIFIED,
            server_ip: Ipv4Address::UNSPECIFIED,
            relay_agent_ip: Ipv4Address::UNSPECIFIED,
            requested_ip: None,
            server_identifier: None,
            client_identifier: None,
            lease_time: None,
            renewal_time: None,
            rebinding_time: None,
            subnet_mask: None,
            broadcast_address: None,
            router: Vec::new(),
            dns_servers: Vec::new(),
            host_name: None,
            domain_name: None,
            default_ttl: None,
            interface_mtu: None,
            arp_cache_timeout: None,
            tcp_default_ttl: None,
            tcp_keepalive_interval: None,
            message: None,
            parameter_request_list: None,
            max_message_size: None,
        }
    }
}

fn collect_addresses(data: &[u8]) -> AddressList {
    data.chunks_exact(4)
        .map(Ipv4Address::from_bytes)
        .take(MAX_ADDRESS_LIST)
        .collect()
}

fn pack_addresses<'b>(raw: &'b mut [u8; 4 * MAX_ADDRESS_LIST], list: &AddressList) -> &'b [u8] {
    for (chunk, addr) in raw.chunks_exact_mut(4).zip(list.iter()) {
        chunk.copy_from_slice(addr.as_bytes());
    }
    &raw[..4 * list.len()]
}

impl<'a> Repr<'a> {
    /// An otherwise empty message of the given type, with the opcode to match.
    pub fn request(message_type: MessageType) -> Self {
        Repr {
            opcode: message_type.opcode(),
            message_type: Some(message_type),
            ..Repr::default()
        }
    }

    /// Calls `f` with every option this representation emits, in emission order,
    /// the end-of-list marker excluded.
    fn visit_options<F: FnMut(&DhcpOption)>(&self, mut f: F) {
        let mut raw = [0; 4 * MAX_ADDRESS_LIST];
        if let Some(value) = self.message_type {
            f(&DhcpOption::MessageType(value));
        }
        if let Some(eth_addr) = self.client_identifier {
            f(&DhcpOption::ClientIdentifier(eth_addr));
        }
        if let Some(ip) = self.requested_ip {
            f(&DhcpOption::RequestedIp(ip));
        }
        if let Some(ip) = self.server_identifier {
            f(&DhcpOption::ServerIdentifier(ip));
        }
        if let Some(value) = self.lease_time {
            f(&DhcpOption::IpLeaseTime(value));
        }
        if let Some(value) = self.renewal_time {
            f(&DhcpOption::RenewalTime(value));
        }
        if let Some(value) = self.rebinding_time {
            f(&DhcpOption::RebindingTime(value));
        }
        if let Some(mask) = self.subnet_mask {
            f(&DhcpOption::SubnetMask(mask));
        }
        if let Some(ip) = self.broadcast_address {
            f(&DhcpOption::BroadcastAddress(ip));
        }
        if !self.router.is_empty() {
            f(&DhcpOption::Router(pack_addresses(&mut raw, &self.router)));
        }
        if !self.dns_servers.is_empty() {
            f(&DhcpOption::DomainNameServer(pack_addresses(&mut raw, &self.dns_servers)));
        }
        if let Some(name) = self.host_name {
            f(&DhcpOption::HostName(name.as_bytes()));
        }
        if let Some(name) = self.domain_name {
            f(&DhcpOption::DomainName(name.as_bytes()));
        }
        if let Some(value) = self.default_ttl {
            f(&DhcpOption::DefaultTtl(value));
        }
        if let Some(value) = self.interface_mtu {
            f(&DhcpOption::InterfaceMtu(value));
        }
        if let Some(value) = self.arp_cache_timeout {
            f(&DhcpOption::ArpCacheTimeout(value));
        }
        if let Some(value) = self.tcp_default_ttl {
            f(&DhcpOption::TcpDefaultTtl(value));
        }
        if let Some(value) = self.tcp_keepalive_interval {
            f(&DhcpOption::TcpKeepaliveInterval(value));
        }
        if let Some(text) = self.message {
            f(&DhcpOption::Message(text.as_bytes()));
        }
        if let Some(list) = self.parameter_request_list {
            f(&DhcpOption::ParameterRequestList(list));
        }
        if let Some(value) = self.max_message_size {
            f(&DhcpOption::MaximumMessageSize(value));
        }
    }

    /// Return the length of a packet that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        let mut len = field::OPTIONS.start;
        self.visit_options(|option| len += option.buffer_len());
        // end-of-options
        len + 1
    }

    /// Parse a DHCP packet and return a high-level representation.
    pub fn parse<T>(packet: &Packet<&'a T>) -> Result<Self>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        // only ethernet is supported right now
        match packet.hardware_type() {
            Hardware::Ethernet => {
                if packet.hardware_len() != 6 {
                    return Err(Error::Malformed);
                }
            }
            Hardware::Unknown(_) => return Err(Error::Unrecognized),
        }
        let opcode = packet.opcode();
        if let OpCode::Unknown(_) = opcode {
            return Err(Error::Unrecognized);
        }

        let mut repr = Repr {
            opcode,
            transaction_id: packet.transaction_id(),
            secs: packet.secs(),
            flags: packet.flags(),
            client_hardware_address: packet.client_hardware_address(),
            client_ip: packet.client_ip(),
            your_ip: packet.your_ip(),
            server_ip: packet.server_ip(),
            relay_agent_ip: packet.relay_agent_ip(),
            ..Repr::default()
        };

        let mut options = packet.options();
        while !options.is_empty() {
            let (next_options, option) = DhcpOption::parse(options)?;
            match option {
                DhcpOption::EndOfList => break,
                DhcpOption::Pad => {}
                DhcpOption::MessageType(value) => {
                    if value.opcode() != opcode {
                        return Err(Error::Malformed);
                    }
                    repr.message_type = Some(value);
                }
                DhcpOption::RequestedIp(ip) => repr.requested_ip = Some(ip),
                DhcpOption::ServerIdentifier(ip) => repr.server_identifier = Some(ip),
                DhcpOption::ClientIdentifier(eth_addr) => repr.client_identifier = Some(eth_addr),
                DhcpOption::IpLeaseTime(value) => repr.lease_time = Some(value),
                DhcpOption::RenewalTime(value) => repr.renewal_time = Some(value),
                DhcpOption::RebindingTime(value) => repr.rebinding_time = Some(value),
                DhcpOption::SubnetMask(mask) => repr.subnet_mask = Some(mask),
                DhcpOption::BroadcastAddress(ip) => repr.broadcast_address = Some(ip),
                DhcpOption::Router(data) => repr.router = collect_addresses(data),
                DhcpOption::DomainNameServer(data) => repr.dns_servers = collect_addresses(data),
                DhcpOption::HostName(data) => repr.host_name = core::str::from_utf8(data).ok(),
                DhcpOption::DomainName(data) => {
                    repr.domain_name = core::str::from_utf8(data).ok()
                }
                DhcpOption::DefaultTtl(value) => repr.default_ttl = Some(value),
                DhcpOption::InterfaceMtu(value) => repr.interface_mtu = Some(value),
                DhcpOption::ArpCacheTimeout(value) => repr.arp_cache_timeout = Some(value),
                DhcpOption::TcpDefaultTtl(value) => repr.tcp_default_ttl = Some(value),
                DhcpOption::TcpKeepaliveInterval(value) => {
                    repr.tcp_keepalive_interval = Some(value)
                }
                DhcpOption::Message(data) => repr.message = core::str::from_utf8(data).ok(),
                DhcpOption::ParameterRequestList(data) => repr.parameter_request_list = Some(data),
                DhcpOption::MaximumMessageSize(value) => repr.max_message_size = Some(value),
                DhcpOption::Other { .. } => {}
            }
            options = next_options;
        }

        Ok(repr)
    }

    /// Emit a high-level representation into a Dynamic Host
    /// Configuration Protocol packet.
    ///
    /// Octets between the end-of-options marker and the end of the buffer are filled
    /// with PAD, so a buffer longer than `buffer_len()` yields a padded message.
    pub fn emit<T>(&self, packet: &mut Packet<&mut T>) -> Result<()>
    where
        T: AsRef<[u8]> + AsMut<[u8]> + ?Sized,
    {
        let mut oversized = false;
        self.visit_options(|option| oversized |= option.buffer_len() > 2 + u8::MAX as usize);
        if oversized {
            return Err(Error::Malformed);
        }
        if packet.buffer.as_ref().len() < self.buffer_len() {
            return Err(Error::Exhausted);
        }

        packet.set_sname_and_boot_file_to_zero();
        packet.set_opcode(self.opcode);
        packet.set_hardware_type(Hardware::Ethernet);
        packet.set_hardware_len(6);
        packet.set_hops(0);
        packet.set_transaction_id(self.transaction_id);
        packet.set_secs(self.secs);
        packet.set_flags(self.flags);
        packet.set_client_ip(self.client_ip);
        packet.set_your_ip(self.your_ip);
        packet.set_server_ip(self.server_ip);
        packet.set_relay_agent_ip(self.relay_agent_ip);
        packet.set_client_hardware_address(self.client_hardware_address);
        packet.set_magic_number(DHCP_MAGIC_NUMBER);

        let mut options = packet.options_mut();
        self.visit_options(|option| {
            let tmp = core::mem::take(&mut options);
            options = option.emit(tmp);
        });
        let rest = DhcpOption::EndOfList.emit(options);
        rest.fill(field::OPT_PAD);

        Ok(())
    }
}
