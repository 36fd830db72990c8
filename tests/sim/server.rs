use std::collections::BTreeMap;

use dhcpc::time::Duration;
use dhcpc::wire::{
    AddressList, DhcpMessageType, DhcpOpCode, DhcpPacket, DhcpRepr, EthernetAddress, Ipv4Address,
};

use super::Datagram;

/// A scripted DHCP (or plain BOOTP) server.
#[derive(Debug)]
pub struct Server {
    pub id: Ipv4Address,
    pub enabled: bool,
    /// `None` makes this a BOOTP server: untyped replies, no lease time.
    pub lease_secs: Option<u32>,
    pub latency: Duration,
    /// Only answer messages in the padded legacy format.
    pub legacy_only: bool,
    /// NAK every REQUEST.
    pub refuse_requests: bool,
    pool: Vec<Ipv4Address>,
    offered: BTreeMap<EthernetAddress, Ipv4Address>,
    bound: BTreeMap<EthernetAddress, Ipv4Address>,
    declined: Vec<Ipv4Address>,
    released: Vec<Ipv4Address>,
}

impl Server {
    pub fn new(id: Ipv4Address, first: Ipv4Address, size: u8) -> Server {
        let [a, b, c, d] = first.0;
        let pool = (0..size).map(|i| Ipv4Address::new(a, b, c, d + i)).collect();
        Server {
            id,
            enabled: true,
            lease_secs: Some(3600),
            latency: Duration::from_millis(10),
            legacy_only: false,
            refuse_requests: false,
            pool,
            offered: BTreeMap::new(),
            bound: BTreeMap::new(),
            declined: Vec::new(),
            released: Vec::new(),
        }
    }

    pub fn lease_secs(mut self, secs: Option<u32>) -> Self {
        self.lease_secs = secs;
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn legacy_only(mut self) -> Self {
        self.legacy_only = true;
        self
    }

    pub fn refuse_requests(mut self) -> Self {
        self.refuse_requests = true;
        self
    }

    pub fn bound(&self, client: EthernetAddress) -> Option<Ipv4Address> {
        self.bound.get(&client).copied()
    }

    pub fn declined(&self) -> &[Ipv4Address] {
        &self.declined
    }

    pub fn released(&self) -> &[Ipv4Address] {
        &self.released
    }

    fn is_bootp(&self) -> bool {
        self.lease_secs.is_none()
    }

    fn in_use(&self, address: Ipv4Address, client: EthernetAddress) -> bool {
        self.bound
            .iter()
            .chain(self.offered.iter())
            .any(|(owner, bound)| *bound == address && *owner != client)
    }

    fn pick(&self, client: EthernetAddress) -> Option<Ipv4Address> {
        if let Some(address) = self.bound.get(&client).or(self.offered.get(&client)) {
            return Some(*address);
        }
        self.pool
            .iter()
            .copied()
            .find(|address| !self.declined.contains(address) && !self.in_use(*address, client))
    }

    /// Answer one client message, if this server has anything to say.
    pub fn handle(&mut self, datagram: &Datagram) -> Option<Vec<u8>> {
        if !self.enabled || !(datagram.broadcast || datagram.dst == self.id) {
            return None;
        }
        if self.legacy_only && !datagram.is_legacy() {
            return None;
        }
        let request = datagram.repr();
        if request.opcode != DhcpOpCode::Request {
            return None;
        }
        let client = request.client_hardware_address;

        if self.is_bootp() {
            if request.message_type != Some(DhcpMessageType::Discover) {
                return None;
            }
            let address = self.pick(client)?;
            self.bound.insert(client, address);
            return Some(self.reply(&request, None, address));
        }

        match request.message_type? {
            DhcpMessageType::Discover => {
                let address = self.pick(client)?;
                self.offered.insert(client, address);
                Some(self.reply(&request, Some(DhcpMessageType::Offer), address))
            }
            DhcpMessageType::Request => match request.server_identifier {
                Some(id) if id != self.id => {
                    // The client chose another server.
                    self.offered.remove(&client);
                    None
                }
                Some(_) => {
                    let address = request.requested_ip?;
                    if self.refuse_requests || self.offered.get(&client) != Some(&address) {
                        return Some(self.nak(&request));
                    }
                    self.offered.remove(&client);
                    self.bound.insert(client, address);
                    Some(self.reply(&request, Some(DhcpMessageType::Ack), address))
                }
                None => {
                    let address = request.requested_ip?;
                    if self.refuse_requests
                        || !self.pool.contains(&address)
                        || self.in_use(address, client)
                    {
                        return Some(self.nak(&request));
                    }
                    self.bound.insert(client, address);
                    Some(self.reply(&request, Some(DhcpMessageType::Ack), address))
                }
            },
            DhcpMessageType::Inform => Some(self.reply(
                &request,
                Some(DhcpMessageType::Ack),
                Ipv4Address::UNSPECIFIED,
            )),
            DhcpMessageType::Decline => {
                if let Some(address) = request.requested_ip {
                    self.declined.push(address);
                }
                self.offered.remove(&client);
                self.bound.remove(&client);
                None
            }
            DhcpMessageType::Release => {
                if let Some(address) = self.bound.remove(&client) {
                    self.released.push(address);
                }
                None
            }
            _ => None,
        }
    }

    fn nak(&self, request: &DhcpRepr) -> Vec<u8> {
        self.reply(request, Some(DhcpMessageType::Nak), Ipv4Address::UNSPECIFIED)
    }

    fn reply(
        &self,
        request: &DhcpRepr,
        message_type: Option<DhcpMessageType>,
        your_ip: Ipv4Address,
    ) -> Vec<u8> {
        let mut routers = AddressList::new();
        routers.push(self.id).unwrap();
        let lease_time = match message_type {
            Some(DhcpMessageType::Offer) => self.lease_secs,
            Some(DhcpMessageType::Ack) if request.message_type != Some(DhcpMessageType::Inform) => {
                self.lease_secs
            }
            _ => None,
        };
        let repr = DhcpRepr {
            opcode: DhcpOpCode::Reply,
            message_type,
            transaction_id: request.transaction_id,
            flags: request.flags,
            client_hardware_address: request.client_hardware_address,
            your_ip,
            server_ip: self.id,
            server_identifier: message_type.map(|_| self.id),
            lease_time,
            subnet_mask: Some(Ipv4Address::new(255, 255, 255, 0)),
            router: routers.clone(),
            dns_servers: routers,
            domain_name: Some("sim.test"),
            ..DhcpRepr::default()
        };
        let mut data = vec![0; repr.buffer_len()];
        repr.emit(&mut DhcpPacket::new_unchecked(&mut data[..]))
            .unwrap();
        data
    }
}
