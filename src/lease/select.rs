use super::message::{build_request_or_inform, Message};
use super::{Context, Event, EventKind, Lease, LeaseState, LeaseTime, Outcome, Parameters};
use crate::wire::DhcpMessageType;

impl Lease {
    pub(super) fn long_enough(&self, cx: &Context, offer: &Parameters) -> bool {
        offer.lease_duration >= LeaseTime::Finite(cx.config.min_lease)
    }

    pub(super) fn process_selecting(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        match &event.kind {
            EventKind::UserRelease => self.release(cx),
            EventKind::Timeout { .. } => self.close_offer_window(cx),
            EventKind::MessageArrived(message) => self.arbitrate(cx, message),
            _ => Outcome::Continue,
        }
    }

    fn close_offer_window(&mut self, cx: &mut Context) -> Outcome {
        let bootp = match &self.offer {
            Some(offer) => offer.is_bootp(),
            None => return self.restart(LeaseState::Selecting),
        };

        if bootp {
            net_debug!("{}: BOOTP reply chosen, no request needed", self.handle);
            self.set_state(LeaseState::Bound);
            self.apply_offer(cx);
            self.arm_expiry(cx);
            return Outcome::Continue;
        }

        let message =
            build_request_or_inform(&self.exchange(cx, 0), DhcpMessageType::Request, self.offer());
        let sent = match message {
            Ok(message) => self.broadcast(cx, &message),
            Err(err) => Err(err),
        };
        if sent.is_err() {
            return self.restart(LeaseState::Selecting);
        }
        net_debug!("{}: REQUEST sent", self.handle);
        self.set_state(LeaseState::Requesting);
        self.start_backoff(cx);
        Outcome::Continue
    }

    /// DHCP beats BOOTP unconditionally; among DHCP offers a strictly longer lease
    /// wins and ties keep the incumbent.
    fn arbitrate(&mut self, cx: &mut Context, message: &Message) -> Outcome {
        let packet = match message.packet() {
            Ok(packet) => packet,
            Err(_) => return Outcome::Continue,
        };
        if packet.message_type() != Ok(Some(DhcpMessageType::Offer)) {
            return Outcome::Continue;
        }
        let mut offer = match Parameters::decode(&packet) {
            Ok(offer) => offer,
            Err(err) => {
                net_debug!("{}: undecodable offer: {}", self.handle, err);
                return Outcome::Continue;
            }
        };

        let better = match &self.offer {
            Some(incumbent) => {
                incumbent.is_bootp() || offer.lease_duration > incumbent.lease_duration
            }
            None => true,
        };
        if offer.server_identifier.is_unspecified() || !self.long_enough(cx, &offer) || !better {
            net_trace!(
                "{}: keeping current offer over {} from {}",
                self.handle,
                offer.your_ip,
                offer.server_identifier
            );
            return Outcome::Continue;
        }

        net_debug!(
            "{}: better offer of {} from {} for {}",
            self.handle,
            offer.your_ip,
            offer.server_identifier,
            offer.lease_duration
        );
        offer.lease_origin = Some(self.epoch);
        self.offer = Some(offer);
        Outcome::Continue
    }
}
