/*! Low-level message access and construction.

The `wire` module deals with the DHCP message *representation*. It provides two levels
of functionality.

 * First, it provides functions to extract fields from sequences of octets,
   and to insert fields into sequences of octets. This happens through the
   [DhcpPacket] structure.
 * Second, it provides a compact, high-level representation of a message that can be
   parsed from and emitted into a sequence of octets. This happens through [DhcpRepr].

[DhcpPacket]: struct.DhcpPacket.html
[DhcpRepr]: struct.DhcpRepr.html

The `Packet::new_checked` method is a shorthand for a combination of `Packet::new_unchecked`
and `Packet::check_len`. When parsing untrusted input, it is *necessary* to use
`Packet::new_checked()`; so long as the buffer is not modified, no accessor will fail.

In the `Repr` family of data structures, the `Repr::parse()` method never panics
as long as `Packet::new_checked()` (or `Packet::check_len()`) has succeeded, and
the `Repr::emit()` method never panics as long as the underlying buffer is at least
`Repr::buffer_len()` octets long.

# Examples

To emit a DHCPDISCOVER into an octet buffer, and then parse it back:

```rust
use dhcpc::wire::*;
let repr = DhcpRepr {
    transaction_id: 0x3903f326,
    client_hardware_address: EthernetAddress([0x02, 0, 0, 0, 0, 0x01]),
    ..DhcpRepr::request(DhcpMessageType::Discover)
};
let mut buffer = vec![0; repr.buffer_len()];
{ // emission
    let mut packet = DhcpPacket::new_unchecked(&mut buffer);
    repr.emit(&mut packet).expect("buffer too small");
}
{ // parsing
    let packet = DhcpPacket::new_checked(&buffer)
                            .expect("truncated message");
    let parsed = DhcpRepr::parse(&packet)
                          .expect("malformed message");
    assert_eq!(repr, parsed);
}
```
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod dhcpv4;
mod ethernet;
mod ipv4;

pub use self::ethernet::Address as EthernetAddress;
pub use self::ipv4::Address as Ipv4Address;

pub use self::dhcpv4::{
    AddressList, DhcpOption, Flags as DhcpFlags, Hardware as DhcpHardware,
    MessageType as DhcpMessageType, OpCode as DhcpOpCode, Packet as DhcpPacket, Repr as DhcpRepr,
    CLIENT_PORT as DHCP_CLIENT_PORT, LEGACY_MESSAGE_LEN as DHCP_LEGACY_MESSAGE_LEN,
    SERVER_PORT as DHCP_SERVER_PORT,
};
