/*! The lease state machine.

A [Lease] is one managed address binding on one interface. It moves through
INIT → WAIT_OFFER → SELECTING → REQUESTING → BOUND (or INFORMING → REQUESTING for
a DHCPINFORM exchange, or INIT-REBOOT → REBOOTING → BOUND to confirm a remembered
address), consuming one [Event] per [Lease::dispatch] call.

A dispatch never blocks and never performs I/O itself. Everything it does to the
outside world goes through the capabilities bundled in a [Context]: the [Device]
that sends messages, probes addresses and configures the interface, the
[TimerService] that owns the single-shot retransmission timer, and the
[StatusIndicator] that publishes whether the lease is usable.

The caller acts on the returned [Outcome]; see its documentation.
*/

use alloc::sync::Arc;
use core::fmt;

use crate::time::{Duration, Instant};
use crate::wire::{EthernetAddress, Ipv4Address};
use crate::{Error, Result};

mod backoff;
mod bound;
mod config;
mod context;
mod discover;
mod inform;
pub mod message;
mod params;
mod reboot;
mod request;
mod select;


pub use self::config::Config;
pub use self::context::{
    AddressProbe, Configurator, Context, Device, ProbeOutcome, StatusIndicator, TimerService,
    Transport,
};
pub use self::message::Message;
pub use self::params::{LeaseTime, Parameters};

/// Initial retransmission interval, in seconds.
pub const FIRST_TIMER: u32 = 4;
/// Retransmission interval ceiling, in seconds.
pub const MAX_TIMER: u32 = 64;
/// DISCOVER transmissions per message format before giving up on it.
pub const DISCOVER_RETRANS: u32 = 4;
/// REQUEST retransmissions after the first transmission before restarting.
pub const REQUEST_RETRANS: u32 = 4;
/// Untyped replies up to this length are accepted as BOOTP replies.
pub const BOOTP_REPLY_MAX_LEN: usize = 300;

/// Spread of the uniform jitter applied to every backoff timer, in milliseconds.
const JITTER_MILLIS: u32 = 1000;

/// A handle, identifying a lease in a lease set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(usize);

impl Handle {
    pub const fn new(index: usize) -> Handle {
        Handle(index)
    }

    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lease#{}", self.0)
    }
}

/// The state of a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaseState {
    Init,
    WaitOffer,
    Selecting,
    Requesting,
    Informing,
    InitReboot,
    Rebooting,
    Bound,
    /// Only ever a previous state: a lease that failed is parked in `Init`
    /// with `Error` as its previous state until it is bound again.
    Error,
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            LeaseState::Init => "INIT",
            LeaseState::WaitOffer => "WAIT_OFFER",
            LeaseState::Selecting => "SELECTING",
            LeaseState::Requesting => "REQUESTING",
            LeaseState::Informing => "INFORMING",
            LeaseState::InitReboot => "INIT_REBOOT",
            LeaseState::Rebooting => "REBOOTING",
            LeaseState::Bound => "BOUND",
            LeaseState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// The result of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event was handled (or ignored); keep the lease.
    Continue,
    /// The lease was freshly bound and its configuration applied.
    Bound,
    /// The lease went back to INIT to retry from scratch. The caller dispatches
    /// the same event again so the new state runs right away.
    Restart,
    /// The lease was released; the caller discards it.
    Done,
    /// The exchange failed and the lease cannot heal itself; the caller reports
    /// the error and usually [parks](Lease::park) the lease.
    Failed(Error),
}

/// Who produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A timer expiry or a received message.
    Automatic,
    /// A request made through the user API.
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The lease timer expired. `generation` identifies the arming it belongs to.
    Timeout { generation: u32 },
    MessageArrived(Message),
    UserRelease,
    UserBind,
    UserVerify,
    UserInform,
}

/// One occurrence delivered to a lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub lease: Handle,
    pub source: Source,
    pub kind: EventKind,
}

impl Event {
    pub fn timeout(lease: Handle, generation: u32) -> Event {
        Event {
            lease,
            source: Source::Automatic,
            kind: EventKind::Timeout { generation },
        }
    }

    pub fn message(lease: Handle, message: Message) -> Event {
        Event {
            lease,
            source: Source::Automatic,
            kind: EventKind::MessageArrived(message),
        }
    }

    pub fn user(lease: Handle, kind: EventKind) -> Event {
        Event {
            lease,
            source: Source::User,
            kind,
        }
    }
}

/// Lease notifications delivered to a [LeaseHook].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseEvent {
    /// The previous configuration of the lease is no longer valid.
    Invalid,
    /// New parameters were obtained.
    New,
}

/// An observer of lease notifications.
///
/// Called synchronously from inside a dispatch; implementations must not block.
pub trait LeaseHook {
    fn on_lease_event(&self, event: LeaseEvent, lease: Handle);
}

/// The receiving end of a synchronous DHCPINFORM request.
pub trait InformWaiter {
    /// Called at most once with the outcome of the exchange.
    fn complete(&self, result: Result<Parameters>);
}

/// The interface a lease is negotiated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub interface: heapless::String<16>,
    pub hardware_address: EthernetAddress,
    /// An address the client already holds: the address to confirm when
    /// rebooting, or the configured address reported in a DHCPINFORM.
    pub address: Option<Ipv4Address>,
}

impl Binding {
    /// Returns `Err(Error::Exhausted)` if the interface name does not fit.
    pub fn new(interface: &str, hardware_address: EthernetAddress) -> Result<Binding> {
        let mut name = heapless::String::new();
        name.push_str(interface).map_err(|_| Error::Exhausted)?;
        Ok(Binding {
            interface: name,
            hardware_address,
            address: None,
        })
    }

    pub fn with_address(mut self, address: Ipv4Address) -> Binding {
        self.address = Some(address);
        self
    }
}

/// A lease record.
pub struct Lease {
    handle: Handle,
    binding: Binding,
    state: LeaseState,
    prev_state: LeaseState,
    retry: u32,
    backoff: u32,
    xid: u32,
    epoch: Instant,
    offer: Option<Parameters>,
    legacy_format: bool,
    hook: Option<Arc<dyn LeaseHook + Send + Sync>>,
    waiter: Option<Arc<dyn InformWaiter + Send + Sync>>,
    configured: bool,
    start_pending: bool,
    inform_done: bool,
}

impl Lease {
    fn with_state(handle: Handle, binding: Binding, state: LeaseState) -> Lease {
        Lease {
            handle,
            binding,
            state,
            prev_state: LeaseState::Init,
            retry: 0,
            backoff: FIRST_TIMER,
            xid: 0,
            epoch: Instant::ZERO,
            offer: None,
            legacy_format: false,
            hook: None,
            waiter: None,
            configured: false,
            start_pending: false,
            inform_done: false,
        }
    }

    /// A lease that acquires an address from scratch.
    pub fn new(handle: Handle, binding: Binding) -> Lease {
        Lease::with_state(handle, binding, LeaseState::Init)
    }

    /// A lease that first tries to confirm `binding.address`.
    ///
    /// Returns `Err(Error::Illegal)` if the binding carries no address.
    pub fn rebooting(handle: Handle, binding: Binding) -> Result<Lease> {
        if binding.address.is_none() {
            return Err(Error::Illegal);
        }
        Ok(Lease::with_state(handle, binding, LeaseState::InitReboot))
    }

    /// A lease that only asks for configuration parameters for the address
    /// in `binding.address`, signalling `waiter` when done.
    ///
    /// Returns `Err(Error::Illegal)` if the binding carries no address.
    pub fn informing(
        handle: Handle,
        binding: Binding,
        waiter: Option<Arc<dyn InformWaiter + Send + Sync>>,
    ) -> Result<Lease> {
        if binding.address.is_none() {
            return Err(Error::Illegal);
        }
        let mut lease = Lease::with_state(handle, binding, LeaseState::Informing);
        lease.waiter = waiter;
        Ok(lease)
    }

    pub fn set_hook(&mut self, hook: Option<Arc<dyn LeaseHook + Send + Sync>>) {
        self.hook = hook;
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn state(&self) -> LeaseState {
        self.state
    }

    pub fn previous_state(&self) -> LeaseState {
        self.prev_state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry
    }

    /// The current retransmission interval, in seconds, before jitter.
    pub fn backoff_secs(&self) -> u32 {
        self.backoff
    }

    pub fn transaction_id(&self) -> u32 {
        self.xid
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// The chosen offer, or the committed parameters once bound.
    pub fn offer(&self) -> Option<&Parameters> {
        self.offer.as_ref()
    }

    pub fn legacy_format(&self) -> bool {
        self.legacy_format
    }

    /// Whether the interface currently carries this lease's configuration.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Whether the lease is parked after a failure, waiting for a new bind request.
    pub fn is_parked(&self) -> bool {
        self.state == LeaseState::Init && self.prev_state == LeaseState::Error
    }

    /// Process one event in the current state.
    pub fn dispatch(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        net_trace!(
            "{}: {} event {:?} in {} (previous {})",
            self.handle,
            match event.source {
                Source::Automatic => "automatic",
                Source::User => "user",
            },
            event.kind,
            self.state,
            self.prev_state
        );
        match self.state {
            LeaseState::Init => self.process_init(cx, event),
            LeaseState::WaitOffer => self.process_wait_offer(cx, event),
            LeaseState::Selecting => self.process_selecting(cx, event),
            LeaseState::Requesting => self.process_requesting(cx, event),
            LeaseState::Informing => self.process_informing(cx, event),
            LeaseState::InitReboot => self.process_init_reboot(cx, event),
            LeaseState::Rebooting => self.process_rebooting(cx, event),
            LeaseState::Bound => self.process_bound(cx, event),
            LeaseState::Error => match event.kind {
                EventKind::UserRelease => self.release(cx),
                _ => Outcome::Continue,
            },
        }
    }

    /// Park the lease after a `Failed` outcome: stop its timer, mark it not good,
    /// hand the error to a waiting inform caller and wait in INIT for a new bind
    /// request.
    pub fn park(&mut self, cx: &mut Context, error: Error) {
        net_debug!("{}: {} failed: {}, parking", self.handle, self.state, error);
        cx.timers.cancel(self.handle);
        cx.status.set_lease_good(self.handle, false);
        if let Some(waiter) = self.waiter.take() {
            waiter.complete(Err(error));
        }
        self.start_pending = false;
        self.state = LeaseState::Init;
        self.prev_state = LeaseState::Error;
    }

    fn set_state(&mut self, state: LeaseState) {
        net_debug!("{}: {} -> {}", self.handle, self.state, state);
        self.prev_state = self.state;
        self.state = state;
    }

    /// Drop back to INIT, recording `from` as the previous state.
    fn restart(&mut self, from: LeaseState) -> Outcome {
        net_debug!("{}: {} -> INIT, retrying from scratch", self.handle, self.state);
        self.state = LeaseState::Init;
        self.prev_state = from;
        self.start_pending = false;
        Outcome::Restart
    }

    fn notify(&self, event: LeaseEvent) {
        if let Some(hook) = &self.hook {
            hook.on_lease_event(event, self.handle);
        }
    }

    /// Release everything the lease holds. Checked first in every state.
    fn release(&mut self, cx: &mut Context) -> Outcome {
        net_debug!("{}: released in {}", self.handle, self.state);
        cx.timers.cancel(self.handle);
        cx.status.set_lease_good(self.handle, false);
        if self.state == LeaseState::Bound {
            self.send_release(cx);
        }
        if self.configured {
            cx.device.revert(&self.binding);
            self.configured = false;
        }
        self.offer = None;
        if let Some(waiter) = self.waiter.take() {
            waiter.complete(Err(Error::Released));
        }
        Outcome::Done
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Lease")
            .field("handle", &self.handle)
            .field("binding", &self.binding)
            .field("state", &self.state)
            .field("prev_state", &self.prev_state)
            .field("retry", &self.retry)
            .field("backoff", &self.backoff)
            .field("xid", &self.xid)
            .field("offer", &self.offer)
            .field("legacy_format", &self.legacy_format)
            .field("configured", &self.configured)
            .finish()
    }
}

/// `backoff` seconds with the uniform jitter applied, never negative.
fn jittered(cx: &mut Context, backoff: u32) -> Duration {
    let millis = backoff as i64 * 1000 + cx.rand.jitter_millis(JITTER_MILLIS);
    Duration::from_millis(millis.max(0) as u64)
}
