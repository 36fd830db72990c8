/*! The per-lease retransmission timers.

[Timers] is a deadline table with one single-shot timer per lease. It does no
waiting of its own: the owner asks it for [expired](Timers::next_expired) timers
and for the [delay](Timers::poll_delay) until the next one, and turns expiries into
`Timeout` events.

Every arming gets a new generation number. A timeout event carries the generation
it was raised for, and is only acted upon while that arming is still
[current](Timers::is_current). Re-arming or cancelling a timer thus invalidates any
timeout already on its way.
*/

use managed::ManagedMap;

use crate::lease::{Handle, TimerService};
use crate::time::{Duration, Instant};
use crate::{Error, Result};

/// The timer slot of one lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    deadline: Option<Instant>,
    generation: u32,
}

/// A table of lease timers backed by a map.
///
/// # Examples
///
/// On systems with heap, the table can be created with:
///
/// ```rust
/// use std::collections::BTreeMap;
/// use dhcpc::timer::Timers;
/// let mut timers = Timers::new(BTreeMap::new());
/// ```
///
/// On systems without heap, use:
///
/// ```rust
/// use dhcpc::timer::Timers;
/// let mut timer_storage = [None; 4];
/// let mut timers = Timers::new(&mut timer_storage[..]);
/// ```
#[derive(Debug)]
pub struct Timers<'a> {
    entries: ManagedMap<'a, Handle, Entry>,
    generation: u32,
}

impl<'a> Timers<'a> {
    /// Create a timer table. The backing storage is cleared upon creation.
    pub fn new<T>(storage: T) -> Timers<'a>
    where
        T: Into<ManagedMap<'a, Handle, Entry>>,
    {
        let mut entries = storage.into();
        entries.clear();
        Timers {
            entries,
            generation: 0,
        }
    }

    /// Reserve a disarmed slot for `lease`, so that arming it later cannot fail.
    ///
    /// Returns `Err(Error::Exhausted)` if the backing storage is full.
    pub fn register(&mut self, lease: Handle) -> Result<()> {
        if self.entries.get(&lease).is_some() {
            return Ok(());
        }
        let entry = Entry {
            deadline: None,
            generation: self.generation,
        };
        match self.entries.insert(lease, entry) {
            Ok(_) => Ok(()),
            Err(_) => Err(Error::Exhausted),
        }
    }

    /// Drop the slot of a discarded lease.
    pub fn forget(&mut self, lease: Handle) {
        self.entries.remove(&lease);
    }

    fn next_generation(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// The deadline `lease` is armed for, if any.
    pub fn deadline(&self, lease: Handle) -> Option<Instant> {
        self.entries.get(&lease).and_then(|entry| entry.deadline)
    }

    /// The earliest timer that expired at or before `now`, with its generation.
    ///
    /// The timer stays armed until [fired](Timers::fired) is called for it.
    pub fn next_expired(&self, now: Instant) -> Option<(Handle, u32)> {
        self.entries
            .iter()
            .filter_map(|(handle, entry)| match entry.deadline {
                Some(deadline) if deadline <= now => Some((deadline, *handle, entry.generation)),
                _ => None,
            })
            .min_by_key(|&(deadline, handle, _)| (deadline, handle))
            .map(|(_, handle, generation)| (handle, generation))
    }

    /// Disarm the timer of `lease` after its timeout was handed off.
    /// The generation stays current, so the timeout is still acted upon.
    pub fn fired(&mut self, lease: Handle) {
        if let Some(entry) = self.entries.get_mut(&lease) {
            entry.deadline = None;
        }
    }

    /// Whether a timeout raised with `generation` still belongs to the latest
    /// arming of the timer of `lease`.
    pub fn is_current(&self, lease: Handle, generation: u32) -> bool {
        match self.entries.get(&lease) {
            Some(entry) => entry.generation == generation,
            None => false,
        }
    }

    /// How long until the earliest armed timer expires. `Some(Duration::ZERO)` if one
    /// already has; `None` if no timer is armed.
    pub fn poll_delay(&self, now: Instant) -> Option<Duration> {
        self.entries
            .iter()
            .filter_map(|(_, entry)| entry.deadline)
            .min()
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

impl<'a> TimerService for Timers<'a> {
    fn arm(&mut self, lease: Handle, at: Instant) {
        let generation = self.next_generation();
        let entry = Entry {
            deadline: Some(at),
            generation,
        };
        if let Some(slot) = self.entries.get_mut(&lease) {
            *slot = entry;
            return;
        }
        if self.entries.insert(lease, entry).is_err() {
            net_debug!("{}: no timer slot left, timer not armed", lease);
        }
    }

    fn cancel(&mut self, lease: Handle) {
        let generation = self.next_generation();
        if let Some(entry) = self.entries.get_mut(&lease) {
            entry.deadline = None;
            entry.generation = generation;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const A: Handle = Handle::new(0);
    const B: Handle = Handle::new(1);

    #[test]
    fn test_expiry_order() {
        let mut storage = [None; 4];
        let mut timers = Timers::new(&mut storage[..]);
        timers.arm(A, Instant::from_secs(10));
        timers.arm(B, Instant::from_secs(5));

        assert_eq!(timers.next_expired(Instant::from_secs(4)), None);
        assert_eq!(timers.poll_delay(Instant::from_secs(4)), Some(Duration::from_secs(1)));

        let (first, generation) = timers.next_expired(Instant::from_secs(20)).unwrap();
        assert_eq!(first, B);
        assert!(timers.is_current(B, generation));
        timers.fired(B);
        assert!(timers.is_current(B, generation));

        assert_eq!(timers.next_expired(Instant::from_secs(20)).map(|e| e.0), Some(A));
        timers.fired(A);
        assert_eq!(timers.next_expired(Instant::from_secs(20)), None);
        assert_eq!(timers.poll_delay(Instant::from_secs(20)), None);
    }

    #[test]
    fn test_rearm_invalidates() {
        let mut storage = [None; 2];
        let mut timers = Timers::new(&mut storage[..]);
        timers.arm(A, Instant::from_secs(1));
        let (_, stale) = timers.next_expired(Instant::from_secs(1)).unwrap();
        timers.arm(A, Instant::from_secs(9));
        assert!(!timers.is_current(A, stale));
        assert_eq!(timers.deadline(A), Some(Instant::from_secs(9)));
    }

    #[test]
    fn test_cancel_invalidates() {
        let mut storage = [None; 2];
        let mut timers = Timers::new(&mut storage[..]);
        timers.arm(A, Instant::from_secs(1));
        let (_, generation) = timers.next_expired(Instant::from_secs(2)).unwrap();
        timers.cancel(A);
        assert!(!timers.is_current(A, generation));
        assert_eq!(timers.next_expired(Instant::from_secs(2)), None);
        assert_eq!(timers.deadline(A), None);
    }

    #[test]
    fn test_overdue_delay_is_zero() {
        let mut storage = [None; 1];
        let mut timers = Timers::new(&mut storage[..]);
        timers.arm(A, Instant::from_secs(3));
        assert_eq!(timers.poll_delay(Instant::from_secs(7)), Some(Duration::ZERO));
    }

    #[test]
    fn test_register_and_forget() {
        let mut storage = [None; 1];
        let mut timers = Timers::new(&mut storage[..]);
        assert_eq!(timers.register(A), Ok(()));
        assert_eq!(timers.register(A), Ok(()));
        assert_eq!(timers.register(B), Err(Error::Exhausted));
        timers.forget(A);
        assert!(!timers.is_current(A, 0));
        assert_eq!(timers.register(B), Ok(()));
    }
}
