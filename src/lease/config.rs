use heapless::Vec;

use crate::time::Duration;

/// Maximum length of the parameter request list.
pub const MAX_REQUEST_LIST: usize = 32;

/// Subnet mask, router, DNS, host name, domain name, default TTL, interface MTU,
/// broadcast address, ARP cache timeout, TCP TTL, TCP keepalive, lease time, T1, T2.
const DEFAULT_REQUEST_LIST: [u8; 14] = [1, 3, 6, 12, 15, 23, 26, 28, 35, 37, 38, 51, 58, 59];

/// Tunables shared by every lease of a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long to keep collecting offers after the first acceptable one.
    /// Not jittered.
    pub offer_window: Duration,
    /// Offers for shorter leases than this are rejected, in seconds.
    pub min_lease: u32,
    /// Upper bound of the uniform random delay before the first DISCOVER,
    /// in seconds. Zero sends right away.
    pub max_startup_delay: u32,
    /// Lease time to ask for in DISCOVER and REQUEST, in seconds.
    pub requested_lease: Option<u32>,
    /// Value of the maximum DHCP message size option.
    pub max_message_size: u16,
    pub request_list: Vec<u8, MAX_REQUEST_LIST>,
    /// Ask servers to broadcast their replies.
    pub broadcast_flag: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            offer_window: Duration::from_secs(10),
            min_lease: 30,
            max_startup_delay: 4,
            requested_lease: None,
            max_message_size: 576,
            request_list: DEFAULT_REQUEST_LIST.iter().copied().collect(),
            broadcast_flag: true,
        }
    }
}

impl Config {
    pub fn offer_window(mut self, window: Duration) -> Self {
        self.offer_window = window;
        self
    }

    pub fn min_lease(mut self, secs: u32) -> Self {
        self.min_lease = secs;
        self
    }

    pub fn max_startup_delay(mut self, secs: u32) -> Self {
        self.max_startup_delay = secs;
        self
    }

    pub fn requested_lease(mut self, secs: Option<u32>) -> Self {
        self.requested_lease = secs;
        self
    }

    pub fn max_message_size(mut self, size: u16) -> Self {
        self.max_message_size = size;
        self
    }

    /// Replace the parameter request list. Codes beyond `MAX_REQUEST_LIST` are dropped.
    pub fn request_list(mut self, codes: &[u8]) -> Self {
        self.request_list = codes.iter().copied().take(MAX_REQUEST_LIST).collect();
        self
    }

    pub fn broadcast_flag(mut self, enabled: bool) -> Self {
        self.broadcast_flag = enabled;
        self
    }
}
