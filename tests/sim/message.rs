use dhcpc::time::Instant;
use dhcpc::wire::{DhcpMessageType, DhcpPacket, DhcpRepr, Ipv4Address, DHCP_LEGACY_MESSAGE_LEN};

/// One DHCP payload seen on the simulated segment.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub at: Instant,
    pub dst: Ipv4Address,
    pub broadcast: bool,
    pub data: Vec<u8>,
}

impl Datagram {
    pub fn repr(&self) -> DhcpRepr<'_> {
        let packet = DhcpPacket::new_checked(&self.data[..]).unwrap();
        DhcpRepr::parse(&packet).unwrap()
    }

    pub fn message_type(&self) -> Option<DhcpMessageType> {
        self.repr().message_type
    }

    pub fn is(&self, message_type: DhcpMessageType) -> bool {
        self.message_type() == Some(message_type)
    }

    pub fn is_legacy(&self) -> bool {
        self.data.len() == DHCP_LEGACY_MESSAGE_LEN
    }

    pub fn transaction_id(&self) -> u32 {
        self.repr().transaction_id
    }
}
