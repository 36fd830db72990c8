/*! The lease monitor.

A [Monitor] owns a set of leases on top of one [Device], the timer table and the
event queue. Every event, whatever produced it, is posted to the queue and handled
by [Monitor::poll], one at a time, so that no two handlers of the same lease set
ever run concurrently.

User requests (`bind`, `release`, ...) only post events and return immediately.
Replies from the network are handed to [Monitor::receive], which routes them to the
lease whose exchange they belong to. The owner drives the monitor like this:

```rust,ignore
loop {
    let now = Instant::now();
    monitor.poll(now);
    match monitor.poll_delay(now) {
        Some(delay) => wait_for_traffic(delay),
        None => wait_for_traffic(Duration::from_secs(1)),
    }
}
```
*/

use alloc::sync::Arc;

use managed::{ManagedMap, ManagedSlice};

use crate::completion::InformCompletion;
use crate::event::{EventQueue, EventSender};
use crate::lease::{
    Binding, Config, Context, Device, Event, EventKind, Handle, InformWaiter, Lease, LeaseHook,
    Message, Outcome, FIRST_TIMER,
};
use crate::rand::Rand;
use crate::status::StatusBoard;
use crate::time::{Duration, Instant};
use crate::timer::{Entry, Timers};
use crate::wire::{DhcpOpCode, DhcpPacket};
use crate::{Error, Result};

/// How many times one event may send a lease back to INIT before the monitor
/// gives the lease a breather.
const MAX_RESTARTS: usize = 3;

/// A set of leases driven by one event loop.
///
/// The lifetime `'a` is used when the lease and timer storage is borrowed.
#[derive(Debug)]
pub struct Monitor<'a, D: Device> {
    config: Config,
    device: D,
    rand: Rand,
    leases: ManagedSlice<'a, Option<Lease>>,
    timers: Timers<'a>,
    queue: EventQueue,
    status: StatusBoard,
}

impl<'a, D: Device> Monitor<'a, D> {
    /// Create a monitor using the provided storage.
    ///
    /// `seed` initializes the generator for transaction identifiers and timer
    /// jitter; it should differ between runs.
    pub fn new<LeasesT, TimersT>(
        config: Config,
        device: D,
        seed: u64,
        leases: LeasesT,
        timers: TimersT,
    ) -> Monitor<'a, D>
    where
        LeasesT: Into<ManagedSlice<'a, Option<Lease>>>,
        TimersT: Into<ManagedMap<'a, Handle, Entry>>,
    {
        Monitor {
            config,
            device,
            rand: Rand::new(seed),
            leases: leases.into(),
            timers: Timers::new(timers),
            queue: EventQueue::new(),
            status: StatusBoard::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// A handle for posting events from other threads.
    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// The "lease good" board shared with readers on other threads.
    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn lease(&self, handle: Handle) -> Option<&Lease> {
        self.leases.get(handle.index()).and_then(|slot| slot.as_ref())
    }

    /// Iterate every lease in this monitor.
    pub fn leases(&self) -> impl Iterator<Item = &Lease> + '_ {
        self.leases.iter().filter_map(|slot| slot.as_ref())
    }

    fn add(&mut self, make: impl FnOnce(Handle) -> Result<Lease>) -> Result<Handle> {
        let index = match self.leases.iter().position(|slot| slot.is_none()) {
            Some(index) => index,
            None => match self.leases {
                ManagedSlice::Borrowed(_) => return Err(Error::Exhausted),
                #[cfg(any(feature = "std", feature = "alloc"))]
                ManagedSlice::Owned(ref mut leases) => {
                    leases.push(None);
                    leases.len() - 1
                }
            },
        };
        let handle = Handle::new(index);
        let lease = make(handle)?;
        self.timers.register(handle)?;
        net_trace!("{}: adding for {}", handle, lease.binding().interface);
        self.leases[index] = Some(lease);
        Ok(handle)
    }

    fn request(&self, handle: Handle, kind: EventKind) -> Result<()> {
        if self.lease(handle).is_none() {
            return Err(Error::Illegal);
        }
        self.queue.sender().post(Event::user(handle, kind))
    }

    fn add_and_request(
        &mut self,
        kind: EventKind,
        make: impl FnOnce(Handle) -> Result<Lease>,
    ) -> Result<Handle> {
        let handle = self.add(make)?;
        if let Err(err) = self.request(handle, kind) {
            self.discard(handle);
            return Err(err);
        }
        Ok(handle)
    }

    /// Start acquiring a lease on the interface of `binding`.
    ///
    /// Returns `Err(Error::Exhausted)` if the lease storage or the event queue is full.
    pub fn bind(&mut self, binding: Binding) -> Result<Handle> {
        self.bind_with_hook(binding, None)
    }

    /// Like [bind](Monitor::bind), reporting lease notifications to `hook`.
    pub fn bind_with_hook(
        &mut self,
        binding: Binding,
        hook: Option<Arc<dyn LeaseHook + Send + Sync>>,
    ) -> Result<Handle> {
        self.add_and_request(EventKind::UserBind, |handle| {
            let mut lease = Lease::new(handle, binding);
            lease.set_hook(hook);
            Ok(lease)
        })
    }

    /// Start a lease that first tries to confirm the address in `binding`,
    /// falling back to a full acquisition if the server refuses it.
    pub fn reboot(&mut self, binding: Binding) -> Result<Handle> {
        self.add_and_request(EventKind::UserBind, |handle| Lease::rebooting(handle, binding))
    }

    /// Ask for configuration parameters for the address already configured in
    /// `binding`. The returned completion is signalled when the exchange is over.
    pub fn inform(&mut self, binding: Binding) -> Result<(Handle, Arc<InformCompletion>)> {
        let completion = Arc::new(InformCompletion::new());
        let waiter: Arc<dyn InformWaiter + Send + Sync> = completion.clone();
        let handle = self.add_and_request(EventKind::UserInform, |handle| {
            Lease::informing(handle, binding, Some(waiter))
        })?;
        Ok((handle, completion))
    }

    /// Release a lease. It is discarded once the release is processed.
    pub fn release(&self, handle: Handle) -> Result<()> {
        self.request(handle, EventKind::UserRelease)
    }

    /// Confirm that a bound lease is still valid with its server.
    pub fn verify(&self, handle: Handle) -> Result<()> {
        self.request(handle, EventKind::UserVerify)
    }

    /// Start over with a lease that was parked after a failure.
    pub fn rebind(&self, handle: Handle) -> Result<()> {
        self.request(handle, EventKind::UserBind)
    }

    /// Hand a received DHCP reply to the lease whose exchange it belongs to.
    ///
    /// Replies that are not addressed to any lease, or that are too long to
    /// keep, are dropped. Returns
    /// `Err(Error::Exhausted)` if the event queue is full.
    pub fn receive(&self, payload: &[u8]) -> Result<()> {
        let packet = match DhcpPacket::new_checked(payload) {
            Ok(packet) => packet,
            Err(err) => {
                net_trace!("dropping reply: {}", err);
                return Ok(());
            }
        };
        let target = self
            .leases()
            .find(|lease| addressed_to(&packet, lease))
            .map(|lease| lease.handle());
        let handle = match target {
            Some(handle) => handle,
            None => {
                net_trace!("dropping reply for xid {:#010x}", packet.transaction_id());
                return Ok(());
            }
        };
        let message = match Message::new(payload) {
            Ok(message) => message,
            Err(err) => {
                net_debug!("{}: dropping {} octet reply: {}", handle, payload.len(), err);
                return Ok(());
            }
        };
        self.queue.sender().post(Event::message(handle, message))
    }

    /// Turn expired timers into events, then handle every queued event.
    ///
    /// Returns whether any event was handled.
    pub fn poll(&mut self, now: Instant) -> bool {
        let sender = self.queue.sender();
        while let Some((handle, generation)) = self.timers.next_expired(now) {
            if sender.post(Event::timeout(handle, generation)).is_err() {
                // Stays armed; it is posted again on the next poll.
                break;
            }
            self.timers.fired(handle);
        }

        let mut handled = false;
        while let Some(event) = self.queue.try_next() {
            self.process(now, &event);
            handled = true;
        }
        handled
    }

    /// How long the owner may wait before calling [poll](Monitor::poll) again,
    /// if nothing arrives from the network in between. `None` means no timer is
    /// armed.
    pub fn poll_delay(&self, now: Instant) -> Option<Duration> {
        if !self.queue.is_empty() {
            return Some(Duration::ZERO);
        }
        self.timers.poll_delay(now)
    }

    fn discard(&mut self, handle: Handle) {
        net_trace!("{}: removing", handle);
        if let Some(slot) = self.leases.get_mut(handle.index()) {
            *slot = None;
        }
        self.timers.forget(handle);
        self.status.forget(handle);
    }

    fn process(&mut self, now: Instant, event: &Event) {
        let handle = event.lease;
        let Monitor {
            config,
            device,
            rand,
            leases,
            timers,
            status,
            ..
        } = self;

        let lease = match leases.get_mut(handle.index()).and_then(|slot| slot.as_mut()) {
            Some(lease) => lease,
            None => {
                net_trace!("{}: event for a discarded lease", handle);
                return;
            }
        };
        match &event.kind {
            EventKind::Timeout { generation } if !timers.is_current(handle, *generation) => {
                net_trace!("{}: stale timeout", handle);
                return;
            }
            EventKind::MessageArrived(message) => {
                let current = match message.packet() {
                    Ok(packet) => addressed_to(&packet, lease),
                    Err(_) => false,
                };
                if !current {
                    net_trace!("{}: reply for another exchange", handle);
                    return;
                }
            }
            _ => (),
        }

        let mut cx = Context {
            now,
            config: &*config,
            rand: &mut *rand,
            device: &mut *device,
            timers: &mut *timers,
            status: &*status,
        };
        let mut outcome = lease.dispatch(&mut cx, event);
        let mut restarts = 0;
        while outcome == Outcome::Restart && restarts < MAX_RESTARTS {
            restarts += 1;
            outcome = lease.dispatch(&mut cx, event);
        }

        match outcome {
            Outcome::Continue => (),
            Outcome::Restart => {
                net_debug!("{}: restarting too often, retrying later", handle);
                let at = now + Duration::from_secs(FIRST_TIMER as u64);
                cx.timers.arm(handle, at);
            }
            Outcome::Bound => {
                if let Some(offer) = lease.offer() {
                    net_debug!("{}: bound to {}", handle, offer.your_ip);
                }
            }
            Outcome::Failed(err) => lease.park(&mut cx, err),
            Outcome::Done => {
                net_trace!("{}: removing", handle);
                if let Some(slot) = leases.get_mut(handle.index()) {
                    *slot = None;
                }
                timers.forget(handle);
                status.forget(handle);
            }
        }
    }
}

/// Whether `packet` is a server reply to the current exchange of `lease`.
fn addressed_to(packet: &DhcpPacket<&[u8]>, lease: &Lease) -> bool {
    packet.opcode() == DhcpOpCode::Reply
        && packet.transaction_id() == lease.transaction_id()
        && packet.client_hardware_address() == lease.binding().hardware_address
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lease::{
        AddressProbe, Configurator, LeaseState, Parameters, ProbeOutcome, StatusIndicator,
        Transport,
    };
    use crate::wire::{
        DhcpMessageType, DhcpRepr, EthernetAddress, Ipv4Address, DHCP_LEGACY_MESSAGE_LEN,
    };
    use std::vec::Vec;

    const MAC: EthernetAddress = EthernetAddress([0x02, 0, 0, 0, 0, 0x01]);
    const SERVER: Ipv4Address = Ipv4Address::new(192, 168, 1, 1);
    const OFFERED: Ipv4Address = Ipv4Address::new(192, 168, 1, 100);

    #[derive(Debug, Default)]
    struct Loopback {
        sent: Vec<Vec<u8>>,
        applied: Option<Parameters>,
    }

    impl Transport for Loopback {
        fn transmit(
            &mut self,
            _binding: &Binding,
            _dst: Ipv4Address,
            payload: &[u8],
            _broadcast: bool,
        ) -> Result<()> {
            self.sent.push(payload.to_vec());
            Ok(())
        }
    }

    impl AddressProbe for Loopback {
        fn probe(&mut self, _address: Ipv4Address, _binding: &Binding) -> ProbeOutcome {
            ProbeOutcome::Free
        }
    }

    impl Configurator for Loopback {
        fn apply(&mut self, _binding: &Binding, params: &Parameters) -> Result<()> {
            self.applied = Some(params.clone());
            Ok(())
        }

        fn revert(&mut self, _binding: &Binding) {
            self.applied = None;
        }

        fn reset(&mut self, _binding: &Binding) {}
    }

    fn monitor() -> Monitor<'static, Loopback> {
        let config = Config::default().max_startup_delay(0);
        Monitor::new(config, Loopback::default(), 1, Vec::new(), std::collections::BTreeMap::new())
    }

    fn last_sent<'m>(monitor: &'m Monitor<'static, Loopback>) -> DhcpRepr<'m> {
        let bytes = monitor.device().sent.last().unwrap();
        DhcpRepr::parse(&DhcpPacket::new_checked(&bytes[..]).unwrap()).unwrap()
    }

    fn reply(xid: u32, message_type: DhcpMessageType) -> Vec<u8> {
        let repr = DhcpRepr {
            transaction_id: xid,
            client_hardware_address: MAC,
            your_ip: OFFERED,
            server_identifier: Some(SERVER),
            lease_time: Some(3600),
            subnet_mask: Some(Ipv4Address::new(255, 255, 255, 0)),
            ..DhcpRepr::request(message_type)
        };
        let mut bytes = vec![0; repr.buffer_len()];
        repr.emit(&mut DhcpPacket::new_unchecked(&mut bytes[..])).unwrap();
        bytes
    }

    #[test]
    fn test_bind_and_release() {
        let mut monitor = monitor();
        let status = monitor.status();
        let handle = monitor.bind(Binding::new("eth0", MAC).unwrap()).unwrap();

        let mut now = Instant::from_secs(0);
        assert!(monitor.poll(now));
        let discover = last_sent(&monitor);
        assert_eq!(discover.message_type, Some(DhcpMessageType::Discover));
        let xid = discover.transaction_id;

        monitor.receive(&reply(xid, DhcpMessageType::Offer)).unwrap();
        monitor.poll(now);
        assert_eq!(monitor.lease(handle).unwrap().state(), LeaseState::Selecting);

        now += Duration::from_secs(10);
        monitor.poll(now);
        assert_eq!(last_sent(&monitor).message_type, Some(DhcpMessageType::Request));

        monitor.receive(&reply(xid, DhcpMessageType::Ack)).unwrap();
        monitor.poll(now);
        assert_eq!(monitor.lease(handle).unwrap().state(), LeaseState::Bound);
        assert!(status.is_lease_good(handle));
        assert_eq!(monitor.device().applied.as_ref().unwrap().your_ip, OFFERED);

        monitor.release(handle).unwrap();
        monitor.poll(now);
        assert_eq!(last_sent(&monitor).message_type, Some(DhcpMessageType::Release));
        assert!(monitor.lease(handle).is_none());
        assert!(!status.is_lease_good(handle));
        assert!(monitor.device().applied.is_none());
        assert_eq!(monitor.release(handle), Err(Error::Illegal));
    }

    #[test]
    fn test_foreign_replies_dropped() {
        let mut monitor = monitor();
        let handle = monitor.bind(Binding::new("eth0", MAC).unwrap()).unwrap();
        monitor.poll(Instant::from_secs(0));
        let xid = last_sent(&monitor).transaction_id;

        monitor
            .receive(&reply(xid.wrapping_add(1), DhcpMessageType::Offer))
            .unwrap();
        monitor.receive(&[0u8; 10]).unwrap();
        assert!(!monitor.poll(Instant::from_secs(0)));
        assert_eq!(monitor.lease(handle).unwrap().state(), LeaseState::WaitOffer);
    }

    #[test]
    fn test_oversized_reply_dropped() {
        let mut monitor = monitor();
        let handle = monitor.bind(Binding::new("eth0", MAC).unwrap()).unwrap();
        monitor.poll(Instant::from_secs(0));
        let xid = last_sent(&monitor).transaction_id;

        let mut bytes = reply(xid, DhcpMessageType::Offer);
        bytes.resize(crate::config::MAX_MESSAGE_LEN + 1, 0);
        assert_eq!(monitor.receive(&bytes), Ok(()));
        assert!(!monitor.poll(Instant::from_secs(0)));
        assert_eq!(monitor.lease(handle).unwrap().state(), LeaseState::WaitOffer);
    }

    #[test]
    fn test_timeouts_drive_retransmission() {
        let mut monitor = monitor();
        let handle = monitor.bind(Binding::new("eth0", MAC).unwrap()).unwrap();
        let mut now = Instant::from_secs(0);
        monitor.poll(now);
        assert_eq!(monitor.device().sent.len(), 1);

        let delay = monitor.poll_delay(now).unwrap();
        assert!(delay >= Duration::from_secs(3) && delay <= Duration::from_secs(5));
        now += delay;
        monitor.poll(now);
        assert_eq!(monitor.device().sent.len(), 2);
        assert_eq!(monitor.lease(handle).unwrap().retry_count(), 1);
    }

    #[test]
    fn test_exhaustion_parks_lease() {
        let mut monitor = monitor();
        let handle = monitor.bind(Binding::new("eth0", MAC).unwrap()).unwrap();
        let mut now = Instant::from_secs(0);
        monitor.poll(now);
        while let Some(delay) = monitor.poll_delay(now) {
            now += delay;
            monitor.poll(now);
        }
        let lease = monitor.lease(handle).unwrap();
        assert!(lease.is_parked());
        let legacy = monitor
            .device()
            .sent
            .iter()
            .filter(|bytes| bytes.len() == DHCP_LEGACY_MESSAGE_LEN)
            .count();
        assert_eq!(legacy, 4);

        monitor.rebind(handle).unwrap();
        monitor.poll(now);
        assert_eq!(monitor.lease(handle).unwrap().state(), LeaseState::WaitOffer);
    }

    #[test]
    fn test_inform_completes() {
        let mut monitor = monitor();
        let binding = Binding::new("eth0", MAC).unwrap().with_address(OFFERED);
        let (handle, completion) = monitor.inform(binding).unwrap();
        monitor.poll(Instant::from_secs(0));
        let inform = last_sent(&monitor);
        assert_eq!(inform.message_type, Some(DhcpMessageType::Inform));

        monitor
            .receive(&reply(inform.transaction_id, DhcpMessageType::Ack))
            .unwrap();
        monitor.poll(Instant::from_secs(1));
        let params = completion.wait_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(params.server_identifier, SERVER);
        assert!(monitor.device().applied.is_none());

        monitor.release(handle).unwrap();
        monitor.poll(Instant::from_secs(2));
        assert!(monitor.lease(handle).is_none());
    }

    #[test]
    fn test_inform_needs_address() {
        let mut monitor = monitor();
        let result = monitor.inform(Binding::new("eth0", MAC).unwrap());
        assert!(matches!(result, Err(Error::Illegal)));
        assert_eq!(monitor.leases().count(), 0);
    }

    #[test]
    fn test_borrowed_storage_full() {
        let mut lease_storage = [None];
        let mut timer_storage = [None; 1];
        let mut monitor = Monitor::new(
            Config::default(),
            Loopback::default(),
            7,
            &mut lease_storage[..],
            &mut timer_storage[..],
        );
        monitor.bind(Binding::new("eth0", MAC).unwrap()).unwrap();
        assert_eq!(
            monitor.bind(Binding::new("eth1", MAC).unwrap()),
            Err(Error::Exhausted)
        );
    }
}
