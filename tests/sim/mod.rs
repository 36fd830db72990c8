//! A simulated broadcast segment with scripted DHCP servers, driving a real
//! `Monitor` end to end.

#![allow(dead_code)]

use std::collections::BTreeMap;

use dhcpc::lease::{
    AddressProbe, Binding, Config, Configurator, Parameters, ProbeOutcome, Transport,
};
use dhcpc::monitor::Monitor;
use dhcpc::time::*;
use dhcpc::wire::{EthernetAddress, Ipv4Address};
use dhcpc::Result;

mod message;
mod server;

pub use self::message::Datagram;
pub use self::server::Server;

pub const CLIENT_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const HOST_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x42]);

/// The client side of the segment: records what the monitor sends and which
/// configuration it applies.
#[derive(Debug, Default)]
pub struct SimDevice {
    outbox: Vec<Datagram>,
    /// Addresses some other host on the segment answers ARP for.
    pub in_use: Vec<Ipv4Address>,
    pub configured: BTreeMap<String, Parameters>,
    pub resets: usize,
}

impl Transport for SimDevice {
    fn transmit(
        &mut self,
        _binding: &Binding,
        dst: Ipv4Address,
        payload: &[u8],
        broadcast: bool,
    ) -> Result<()> {
        self.outbox.push(Datagram {
            at: Instant::ZERO,
            dst,
            broadcast,
            data: payload.to_vec(),
        });
        Ok(())
    }
}

impl AddressProbe for SimDevice {
    fn probe(&mut self, address: Ipv4Address, _binding: &Binding) -> ProbeOutcome {
        if self.in_use.contains(&address) {
            ProbeOutcome::Conflict { owner: HOST_MAC }
        } else {
            ProbeOutcome::Free
        }
    }
}

impl Configurator for SimDevice {
    fn apply(&mut self, binding: &Binding, params: &Parameters) -> Result<()> {
        self.configured
            .insert(binding.interface.as_str().to_owned(), params.clone());
        Ok(())
    }

    fn revert(&mut self, binding: &Binding) {
        self.configured.remove(binding.interface.as_str());
    }

    fn reset(&mut self, binding: &Binding) {
        self.resets += 1;
        self.configured.remove(binding.interface.as_str());
    }
}

pub struct NetworkSim {
    pub now: Instant,
    pub monitor: Monitor<'static, SimDevice>,
    pub servers: Vec<Server>,
    in_flight: Vec<(Instant, Vec<u8>)>,
    msgs: Vec<Datagram>,
}

impl NetworkSim {
    /// Create a new network simulation without servers.
    pub fn new(config: Config) -> Self {
        setup_logging();
        let monitor = Monitor::new(
            config,
            SimDevice::default(),
            rand::random(),
            Vec::new(),
            BTreeMap::new(),
        );
        Self {
            now: Instant::ZERO,
            monitor,
            servers: vec![],
            in_flight: vec![],
            msgs: vec![],
        }
    }

    pub fn add_server(&mut self, server: Server) -> &mut Self {
        self.servers.push(server);
        self
    }

    /// Every message the client sent so far.
    pub fn msgs(&self) -> &[Datagram] {
        &self.msgs
    }

    pub fn device(&self) -> &SimDevice {
        self.monitor.device()
    }

    pub fn device_mut(&mut self) -> &mut SimDevice {
        self.monitor.device_mut()
    }

    /// Advance the simulation by `duration` in increments of `step`.
    pub fn run(&mut self, step: Duration, duration: Duration) {
        let end = self.now + duration;
        while self.now < end {
            self.tick();
            self.now += step;
        }
    }

    fn tick(&mut self) {
        let now = self.now;

        let mut due = Vec::new();
        self.in_flight.retain(|(at, data)| {
            if *at <= now {
                due.push(data.clone());
                false
            } else {
                true
            }
        });
        for data in due {
            self.monitor.receive(&data).unwrap();
        }

        self.monitor.poll(now);

        let sent: Vec<Datagram> = self.monitor.device_mut().outbox.drain(..).collect();
        for mut datagram in sent {
            datagram.at = now;
            for server in &mut self.servers {
                if let Some(reply) = server.handle(&datagram) {
                    self.in_flight.push((now + server.latency, reply));
                }
            }
            self.msgs.push(datagram);
        }
    }
}

fn setup_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
