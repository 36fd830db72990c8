use core::fmt;

/// A client hardware address.
///
/// DHCP carries it in the `chaddr` field and, prefixed with the hardware type,
/// in the client identifier option. Only six-octet Ethernet addresses are
/// supported.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// Read an address from the first six octets of `data`.
    ///
    /// # Panics
    /// The function panics if `data` is shorter than six octets.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&data[..6]);
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
