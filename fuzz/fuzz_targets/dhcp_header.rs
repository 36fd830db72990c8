#![no_main]
use dhcpc::lease::Parameters;
use dhcpc::wire::{DhcpPacket, DhcpRepr};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let packet = match DhcpPacket::new_checked(data) {
        Ok(packet) => packet,
        Err(_) => return,
    };
    let _ = Parameters::decode(&packet);
    if let Ok(dhcp_repr) = DhcpRepr::parse(&packet) {
        let mut dhcp_payload = vec![0; dhcp_repr.buffer_len()];
        let mut dhcp_packet = DhcpPacket::new_unchecked(&mut dhcp_payload[..]);
        let _ = dhcp_repr.emit(&mut dhcp_packet);
    }
});
