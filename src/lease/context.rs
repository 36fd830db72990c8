use super::{Binding, Config, Handle, Parameters};
use crate::rand::Rand;
use crate::time::Instant;
use crate::wire::{EthernetAddress, Ipv4Address};
use crate::Result;

/// Sends DHCP messages on an interface.
pub trait Transport {
    /// Send `payload` as the UDP payload of a datagram from the client port to the
    /// server port of `dst`. `broadcast` is set when the message must go out as a
    /// link-layer broadcast because the client has no usable address yet.
    fn transmit(
        &mut self,
        binding: &Binding,
        dst: Ipv4Address,
        payload: &[u8],
        broadcast: bool,
    ) -> Result<()>;
}

/// The result of checking whether an address is already in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Nobody answered for the address.
    Free,
    /// Another host answered for the address.
    Conflict { owner: EthernetAddress },
    /// The probe could not be performed.
    Error,
}

/// Checks an offered address before it is used, e.g. with ARP.
pub trait AddressProbe {
    fn probe(&mut self, address: Ipv4Address, binding: &Binding) -> ProbeOutcome;
}

/// Applies network configuration to an interface.
pub trait Configurator {
    /// Configure the interface with a bound lease.
    fn apply(&mut self, binding: &Binding, params: &Parameters) -> Result<()>;
    /// Undo the configuration applied by `apply`.
    fn revert(&mut self, binding: &Binding);
    /// Remove whatever address configuration the interface had before a new
    /// acquisition starts.
    fn reset(&mut self, binding: &Binding);
}

/// Everything a lease needs from the network side.
pub trait Device: Transport + AddressProbe + Configurator {}

impl<T: Transport + AddressProbe + Configurator + ?Sized> Device for T {}

/// A single-shot timer per lease. An expiry turns into a `Timeout` event for the lease.
pub trait TimerService {
    /// (Re)arm the timer of `lease` to expire at `at`, replacing any pending expiry.
    fn arm(&mut self, lease: Handle, at: Instant);
    /// Cancel the timer of `lease`. No timeout for an earlier arming may be
    /// processed afterwards.
    fn cancel(&mut self, lease: Handle);
}

/// The externally readable "lease good" flag.
///
/// Implementations guard the flag with their own lock, held only for the update.
pub trait StatusIndicator {
    fn set_lease_good(&self, lease: Handle, good: bool);
    fn is_lease_good(&self, lease: Handle) -> bool;
}

/// The capabilities and shared state one dispatch runs with.
pub struct Context<'c> {
    pub now: Instant,
    pub config: &'c Config,
    pub rand: &'c mut Rand,
    pub device: &'c mut dyn Device,
    pub timers: &'c mut dyn TimerService,
    pub status: &'c dyn StatusIndicator,
}
