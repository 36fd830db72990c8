mod utils;

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use log::{debug, info};

use dhcpc::lease::{
    AddressProbe, Binding, Config, Configurator, Handle, LeaseEvent, LeaseHook, Parameters,
    ProbeOutcome, StatusIndicator, Transport,
};
use dhcpc::monitor::Monitor;
use dhcpc::time::{Duration, Instant};
use dhcpc::wire::{
    AddressList, DhcpMessageType, DhcpOpCode, DhcpPacket, DhcpRepr, EthernetAddress, Ipv4Address,
};
use dhcpc::Result;

const CLIENT_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const SERVER: Ipv4Address = Ipv4Address::new(192, 168, 69, 1);
const OFFERED: Ipv4Address = Ipv4Address::new(192, 168, 69, 100);

/// A link with a single in-process server behind it.
struct Link {
    lease_secs: Option<u32>,
    ignore_discovers: usize,
    replies: VecDeque<Vec<u8>>,
}

impl Link {
    fn answer(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let packet = DhcpPacket::new_checked(payload).ok()?;
        let request = DhcpRepr::parse(&packet).ok()?;
        let message_type = match request.message_type? {
            DhcpMessageType::Discover if self.ignore_discovers > 0 => {
                self.ignore_discovers -= 1;
                debug!("server: ignoring DISCOVER");
                return None;
            }
            DhcpMessageType::Discover if self.lease_secs.is_none() => None,
            DhcpMessageType::Discover => Some(DhcpMessageType::Offer),
            DhcpMessageType::Request if request.requested_ip == Some(OFFERED) => {
                Some(DhcpMessageType::Ack)
            }
            DhcpMessageType::Request => Some(DhcpMessageType::Nak),
            DhcpMessageType::Release => {
                info!("server: {} released", OFFERED);
                return None;
            }
            _ => return None,
        };

        let mut routers = AddressList::new();
        routers.push(SERVER).ok()?;
        let repr = DhcpRepr {
            opcode: DhcpOpCode::Reply,
            message_type,
            transaction_id: request.transaction_id,
            flags: request.flags,
            client_hardware_address: request.client_hardware_address,
            your_ip: OFFERED,
            server_ip: SERVER,
            server_identifier: message_type.map(|_| SERVER),
            lease_time: self.lease_secs,
            subnet_mask: Some(Ipv4Address::new(255, 255, 255, 0)),
            router: routers.clone(),
            dns_servers: routers,
            ..DhcpRepr::default()
        };
        let mut buffer = vec![0; repr.buffer_len()];
        repr.emit(&mut DhcpPacket::new_unchecked(&mut buffer[..]))
            .ok()?;
        Some(buffer)
    }
}

impl Transport for Link {
    fn transmit(
        &mut self,
        _binding: &Binding,
        dst: Ipv4Address,
        payload: &[u8],
        _broadcast: bool,
    ) -> Result<()> {
        debug!("link: {} octets to {}", payload.len(), dst);
        if let Some(reply) = self.answer(payload) {
            self.replies.push_back(reply);
        }
        Ok(())
    }
}

impl AddressProbe for Link {
    fn probe(&mut self, _address: Ipv4Address, _binding: &Binding) -> ProbeOutcome {
        ProbeOutcome::Free
    }
}

impl Configurator for Link {
    fn apply(&mut self, binding: &Binding, params: &Parameters) -> Result<()> {
        info!("{}: address {}", binding.interface, params.your_ip);
        if let Some(mask) = params.subnet_mask {
            info!("{}: netmask {}", binding.interface, mask);
        }
        for router in params.routers.iter() {
            info!("{}: router {}", binding.interface, router);
        }
        for server in params.dns_servers.iter() {
            info!("{}: DNS server {}", binding.interface, server);
        }
        info!("{}: lease {}", binding.interface, params.lease_duration);
        Ok(())
    }

    fn revert(&mut self, binding: &Binding) {
        info!("{}: configuration removed", binding.interface);
    }

    fn reset(&mut self, binding: &Binding) {
        info!("{}: address reset", binding.interface);
    }
}

struct Printer;

impl LeaseHook for Printer {
    fn on_lease_event(&self, event: LeaseEvent, lease: Handle) {
        info!("{}: {:?}", lease, event);
    }
}

fn main() {
    let start = Arc::new(std::sync::Mutex::new(Instant::ZERO));
    let clock = start.clone();
    utils::setup_logging_with_clock("", move || {
        clock
            .lock()
            .map(|now| *now)
            .unwrap_or(Instant::ZERO)
    });

    let (mut opts, free) = utils::create_options();
    opts.optopt("", "lease", "lease time offered by the server, in seconds", "SECS");
    opts.optflag("", "bootp", "answer with BOOTP replies instead of DHCP");
    opts.optopt("", "ignore", "number of DISCOVERs the server ignores", "COUNT");
    opts.optopt("", "run", "simulated run time, in seconds", "SECS");
    let matches = utils::parse_options(&opts, free);

    let lease_secs = utils::parse_opt(&matches, "lease", 120u32);
    let link = Link {
        lease_secs: if matches.opt_present("bootp") {
            None
        } else {
            Some(lease_secs)
        },
        ignore_discovers: utils::parse_opt(&matches, "ignore", 0usize),
        replies: VecDeque::new(),
    };
    let run = Duration::from_secs(utils::parse_opt(&matches, "run", 300u64));

    let config = Config::default().offer_window(Duration::from_secs(2));
    let mut monitor = Monitor::new(config, link, 0x5eed, vec![], BTreeMap::new());
    let binding = Binding::new("eth0", CLIENT_MAC).expect("interface name");
    let handle = monitor
        .bind_with_hook(binding, Some(Arc::new(Printer)))
        .expect("bind");
    let status = monitor.status();

    let mut now = Instant::ZERO;
    while now < Instant::ZERO + run {
        if let Ok(mut clock) = start.lock() {
            *clock = now;
        }
        while let Some(reply) = monitor.device_mut().replies.pop_front() {
            monitor.receive(&reply).expect("queue full");
        }
        monitor.poll(now);
        if !monitor.device().replies.is_empty() {
            continue;
        }

        // Nothing on the wire: skip ahead to the next timer.
        let step = monitor
            .poll_delay(now)
            .unwrap_or(Duration::from_secs(1))
            .max(Duration::from_millis(1));
        now += step;
    }

    info!("lease good: {}", status.is_lease_good(handle));
    monitor.release(handle).expect("release");
    monitor.poll(now);
}
