mod sim;

use rstest::rstest;

use dhcpc::lease::{Binding, Config, LeaseState, LeaseTime, StatusIndicator};
use dhcpc::time::*;
use dhcpc::wire::{DhcpMessageType, Ipv4Address};

use sim::{NetworkSim, Server, CLIENT_MAC};

const STEP: Duration = Duration::from_millis(10);

const SERVER_A: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
const SERVER_B: Ipv4Address = Ipv4Address::new(10, 0, 1, 1);
const POOL_A: Ipv4Address = Ipv4Address::new(10, 0, 0, 100);
const POOL_B: Ipv4Address = Ipv4Address::new(10, 0, 1, 100);

fn config() -> Config {
    Config::default()
        .max_startup_delay(0)
        .offer_window(Duration::from_secs(1))
}

fn binding() -> Binding {
    Binding::new("eth0", CLIENT_MAC).unwrap()
}

fn configured_ip(sim: &NetworkSim) -> Option<Ipv4Address> {
    sim.device()
        .configured
        .get("eth0")
        .map(|params| params.your_ip)
}

fn count(sim: &NetworkSim, message_type: DhcpMessageType) -> usize {
    sim.msgs().iter().filter(|msg| msg.is(message_type)).count()
}

#[test]
fn single_server() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10));

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(5));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_eq!(lease.state(), LeaseState::Bound);
    assert_eq!(configured_ip(&sim), Some(POOL_A));
    assert_eq!(sim.servers[0].bound(CLIENT_MAC), Some(POOL_A));
    assert!(sim.monitor.status().is_lease_good(handle));

    let params = lease.offer().unwrap();
    assert_eq!(params.server_identifier, SERVER_A);
    assert_eq!(params.lease_duration, LeaseTime::Finite(3600));
    assert_eq!(params.routers.as_slice(), &[SERVER_A]);
    assert_eq!(params.domain_name.as_deref(), Some("sim.test"));

    assert_eq!(count(&sim, DhcpMessageType::Discover), 1);
    assert_eq!(count(&sim, DhcpMessageType::Request), 1);
    // Nothing goes out while the lease is good.
    let sent = sim.msgs().len();
    sim.run(STEP, Duration::from_secs(60));
    assert_eq!(sim.msgs().len(), sent);
}

#[rstest]
#[case::longer_wins(3600, 7200, SERVER_B)]
#[case::tie_keeps_first(3600, 3600, SERVER_A)]
#[case::shorter_ignored(7200, 3600, SERVER_A)]
fn two_servers(#[case] lease_a: u32, #[case] lease_b: u32, #[case] winner: Ipv4Address) {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10).lease_secs(Some(lease_a)));
    sim.add_server(
        Server::new(SERVER_B, POOL_B, 10)
            .lease_secs(Some(lease_b))
            .latency(Duration::from_millis(100)),
    );

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(5));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_eq!(lease.state(), LeaseState::Bound);
    assert_eq!(lease.offer().unwrap().server_identifier, winner);

    let (chosen, other) = if winner == SERVER_A { (0, 1) } else { (1, 0) };
    assert!(sim.servers[chosen].bound(CLIENT_MAC).is_some());
    assert_eq!(sim.servers[other].bound(CLIENT_MAC), None);
}

#[test]
fn bootp_only() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10).lease_secs(None));

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(5));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_eq!(lease.state(), LeaseState::Bound);
    assert!(lease.offer().unwrap().is_bootp());
    assert_eq!(lease.offer().unwrap().lease_duration, LeaseTime::Infinite);
    assert_eq!(configured_ip(&sim), Some(POOL_A));
    assert_eq!(count(&sim, DhcpMessageType::Request), 0);
}

#[test]
fn dhcp_beats_bootp() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10).lease_secs(None));
    sim.add_server(Server::new(SERVER_B, POOL_B, 10).latency(Duration::from_millis(200)));

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(5));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_eq!(lease.state(), LeaseState::Bound);
    assert!(!lease.offer().unwrap().is_bootp());
    assert_eq!(configured_ip(&sim), Some(POOL_B));
    assert_eq!(sim.servers[1].bound(CLIENT_MAC), Some(POOL_B));
}

#[test]
fn no_servers() {
    let mut sim = NetworkSim::new(config());

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(Duration::from_millis(100), Duration::from_secs(400));

    let lease = sim.monitor.lease(handle).unwrap();
    assert!(lease.is_parked());
    assert!(!sim.monitor.status().is_lease_good(handle));
    assert_eq!(sim.monitor.poll_delay(sim.now), None);

    let discovers: Vec<_> = sim
        .msgs()
        .iter()
        .filter(|msg| msg.is(DhcpMessageType::Discover))
        .collect();
    assert_eq!(discovers.len(), 8);
    assert!(discovers[..4].iter().all(|msg| !msg.is_legacy()));
    assert!(discovers[4..].iter().all(|msg| msg.is_legacy()));
    assert!(discovers.iter().all(|msg| msg.broadcast));
}

#[test]
fn parked_lease_rebinds() {
    let mut sim = NetworkSim::new(config());
    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(Duration::from_millis(100), Duration::from_secs(400));
    assert!(sim.monitor.lease(handle).unwrap().is_parked());

    sim.add_server(Server::new(SERVER_A, POOL_A, 10));
    sim.monitor.rebind(handle).unwrap();
    sim.run(STEP, Duration::from_secs(5));

    assert_eq!(sim.monitor.lease(handle).unwrap().state(), LeaseState::Bound);
    assert_eq!(configured_ip(&sim), Some(POOL_A));
}

#[test]
fn legacy_only_server() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10).legacy_only());

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(Duration::from_millis(100), Duration::from_secs(200));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_eq!(lease.state(), LeaseState::Bound);
    assert!(lease.legacy_format());
    assert_eq!(configured_ip(&sim), Some(POOL_A));

    let requests: Vec<_> = sim
        .msgs()
        .iter()
        .filter(|msg| msg.is(DhcpMessageType::Request))
        .collect();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|msg| msg.is_legacy()));
}

#[test]
fn refusing_server() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10).refuse_requests());

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(30));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_ne!(lease.state(), LeaseState::Bound);
    assert!(!sim.monitor.status().is_lease_good(handle));
    assert_eq!(configured_ip(&sim), None);
    // Every NAK sends the lease back to discovery.
    assert!(count(&sim, DhcpMessageType::Request) > 1);
    assert!(count(&sim, DhcpMessageType::Discover) > 1);
}

#[test]
fn release_frees_binding() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10));

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(5));
    assert_eq!(sim.servers[0].bound(CLIENT_MAC), Some(POOL_A));

    sim.monitor.release(handle).unwrap();
    sim.run(STEP, Duration::from_secs(1));

    assert!(sim.monitor.lease(handle).is_none());
    assert_eq!(sim.servers[0].released(), &[POOL_A]);
    assert_eq!(sim.servers[0].bound(CLIENT_MAC), None);
    assert_eq!(configured_ip(&sim), None);

    let release = sim.msgs().last().unwrap();
    assert!(release.is(DhcpMessageType::Release));
    assert!(!release.broadcast);
    assert_eq!(release.dst, SERVER_A);
}

#[test]
fn inform() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10));

    let address = Ipv4Address::new(10, 0, 0, 7);
    let (_handle, completion) = sim.monitor.inform(binding().with_address(address)).unwrap();
    assert!(!completion.is_complete());
    sim.run(STEP, Duration::from_secs(2));

    let params = completion.wait_timeout(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(params.server_identifier, SERVER_A);
    assert_eq!(params.routers.as_slice(), &[SERVER_A]);
    assert_eq!(params.dns_servers.as_slice(), &[SERVER_A]);
    assert_eq!(count(&sim, DhcpMessageType::Inform), 1);
    assert_eq!(sim.servers[0].bound(CLIENT_MAC), None);

    let inform = sim
        .msgs()
        .iter()
        .find(|msg| msg.is(DhcpMessageType::Inform))
        .unwrap();
    assert_eq!(inform.repr().client_ip, address);
}

#[rstest]
#[case::known(POOL_A, POOL_A, 0)]
#[case::unknown(Ipv4Address::new(192, 168, 0, 5), POOL_A, 1)]
fn reboot(#[case] remembered: Ipv4Address, #[case] bound: Ipv4Address, #[case] discovers: usize) {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10));

    let handle = sim
        .monitor
        .reboot(binding().with_address(remembered))
        .unwrap();
    sim.run(STEP, Duration::from_secs(5));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_eq!(lease.state(), LeaseState::Bound);
    assert_eq!(configured_ip(&sim), Some(bound));

    let first = &sim.msgs()[0];
    assert!(first.is(DhcpMessageType::Request));
    assert_eq!(first.repr().requested_ip, Some(remembered));
    assert_eq!(first.repr().server_identifier, None);
    assert_eq!(count(&sim, DhcpMessageType::Discover), discovers);
}

#[test]
fn conflict_declines() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10));
    sim.device_mut().in_use.push(POOL_A);

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(10));

    let next = Ipv4Address::new(10, 0, 0, 101);
    assert_eq!(sim.monitor.lease(handle).unwrap().state(), LeaseState::Bound);
    assert_eq!(sim.servers[0].declined(), &[POOL_A]);
    assert_eq!(configured_ip(&sim), Some(next));
    assert_eq!(count(&sim, DhcpMessageType::Decline), 1);
}

#[test]
fn verify_bound_lease() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10));

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(STEP, Duration::from_secs(5));
    let sent = sim.msgs().len();

    sim.monitor.verify(handle).unwrap();
    sim.run(STEP, Duration::from_secs(2));

    let lease = sim.monitor.lease(handle).unwrap();
    assert_eq!(lease.state(), LeaseState::Bound);
    assert_eq!(lease.previous_state(), LeaseState::Rebooting);
    assert_eq!(configured_ip(&sim), Some(POOL_A));

    let verify = &sim.msgs()[sent..];
    assert_eq!(verify.len(), 1);
    assert!(verify[0].is(DhcpMessageType::Request));
    assert_eq!(verify[0].repr().requested_ip, Some(POOL_A));
}

#[test]
fn lease_expiry_reacquires() {
    let mut sim = NetworkSim::new(config());
    sim.add_server(Server::new(SERVER_A, POOL_A, 10).lease_secs(Some(60)));

    let handle = sim.monitor.bind(binding()).unwrap();
    sim.run(Duration::from_millis(100), Duration::from_secs(65));

    assert_eq!(sim.monitor.lease(handle).unwrap().state(), LeaseState::Bound);
    assert_eq!(count(&sim, DhcpMessageType::Discover), 2);
    assert_eq!(sim.device().resets, 1);
}
