use super::message::{build_reboot_request, Message};
use super::{
    Context, Event, EventKind, Lease, LeaseState, Outcome, Parameters, REQUEST_RETRANS,
};
use crate::wire::DhcpMessageType;

// INIT-REBOOT and REBOOTING, RFC 2131 section 3.2: confirm an address the client
// already knows instead of collecting offers.

impl Lease {
    pub(super) fn process_init_reboot(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        if event.kind == EventKind::UserRelease {
            return self.release(cx);
        }

        if self.prev_state == LeaseState::Bound {
            // Verifying a bound lease: the address to confirm is the one we hold.
            if let Some(offer) = &self.offer {
                self.binding.address = Some(offer.your_ip);
            }
        }

        cx.timers.cancel(self.handle);
        cx.status.set_lease_good(self.handle, false);
        self.legacy_format = false;
        self.xid = cx.rand.rand_u32();
        self.epoch = cx.now;

        if !self.send_reboot_request(cx) {
            return self.restart(LeaseState::InitReboot);
        }
        net_debug!("{}: confirming remembered address", self.handle);
        self.set_state(LeaseState::Rebooting);
        self.start_backoff(cx);
        Outcome::Continue
    }

    fn send_reboot_request(&mut self, cx: &mut Context) -> bool {
        let address = match self.binding.address {
            Some(address) => address,
            None => return false,
        };
        let message = build_reboot_request(&self.exchange(cx, 0), address);
        match message {
            Ok(message) => self.broadcast(cx, &message).is_ok(),
            Err(_) => false,
        }
    }

    pub(super) fn process_rebooting(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        match &event.kind {
            EventKind::UserRelease => self.release(cx),
            EventKind::Timeout { .. } => {
                self.retry += 1;
                if self.retry > REQUEST_RETRANS || !self.send_reboot_request(cx) {
                    return self.restart(LeaseState::Rebooting);
                }
                self.next_backoff(cx);
                Outcome::Continue
            }
            EventKind::MessageArrived(message) => self.consider_reboot_reply(cx, message),
            _ => Outcome::Continue,
        }
    }

    fn consider_reboot_reply(&mut self, cx: &mut Context, message: &Message) -> Outcome {
        let packet = match message.packet() {
            Ok(packet) => packet,
            Err(_) => return Outcome::Continue,
        };
        match packet.message_type() {
            Ok(Some(DhcpMessageType::Ack)) => (),
            Ok(Some(DhcpMessageType::Nak)) => {
                net_debug!("{}: remembered address refused", self.handle);
                self.offer = None;
                return self.restart(LeaseState::Rebooting);
            }
            _ => return Outcome::Continue,
        }
        let mut params = match Parameters::decode(&packet) {
            Ok(params) => params,
            Err(err) => {
                net_debug!("{}: undecodable ACK: {}", self.handle, err);
                return Outcome::Continue;
            }
        };
        if let Some(reason) = self.probe_conflict(cx, params.your_ip) {
            self.offer = Some(params);
            return self.decline_and_restart(cx, reason);
        }
        params.lease_origin = Some(self.epoch);
        self.offer = Some(params);
        self.set_state(LeaseState::Bound);
        self.bind(cx)
    }
}
