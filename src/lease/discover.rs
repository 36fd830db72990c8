use super::message::{build_discover, Message};
use super::{
    Context, Event, EventKind, Lease, LeaseEvent, LeaseState, Outcome, Parameters,
    BOOTP_REPLY_MAX_LEN, DISCOVER_RETRANS,
};
use crate::time::Duration;
use crate::wire::DhcpMessageType;
use crate::Error;

impl Lease {
    pub(super) fn process_init(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        if event.kind == EventKind::UserRelease {
            return self.release(cx);
        }
        if self.prev_state == LeaseState::Error {
            if event.kind != EventKind::UserBind {
                return Outcome::Continue;
            }
            net_debug!("{}: bind request clears the error", self.handle);
            self.prev_state = LeaseState::Init;
        }

        if self.start_pending {
            // Only the end of the startup delay moves us on.
            return match event.kind {
                EventKind::Timeout { .. } => self.send_first_discover(cx),
                _ => Outcome::Continue,
            };
        }

        cx.timers.cancel(self.handle);
        cx.status.set_lease_good(self.handle, false);
        self.legacy_format = false;
        self.xid = cx.rand.rand_u32();

        let after_reboot = matches!(
            self.prev_state,
            LeaseState::Rebooting | LeaseState::InitReboot
        );
        // A refused reboot keeps the interface untouched unless it still
        // carries a lease that was being verified.
        let was_configured = self.configured;
        if was_configured {
            net_debug!("{}: resetting {}", self.handle, self.binding.interface);
            cx.device.reset(&self.binding);
            self.configured = false;
        }
        if !after_reboot || was_configured {
            self.notify(LeaseEvent::Invalid);
        }

        let max_delay = cx.config.max_startup_delay;
        if max_delay == 0 {
            return self.send_first_discover(cx);
        }
        let delay = Duration::from_secs(cx.rand.rand_range(1, max_delay) as u64);
        net_debug!("{}: starting acquisition in {}", self.handle, delay);
        self.start_pending = true;
        self.arm_fixed(cx, delay);
        Outcome::Continue
    }

    fn send_first_discover(&mut self, cx: &mut Context) -> Outcome {
        self.start_pending = false;
        self.epoch = cx.now;
        let message = build_discover(&self.exchange(cx, 0));
        let message = match message {
            Ok(message) => message,
            Err(err) => return Outcome::Failed(err),
        };
        if let Err(err) = self.broadcast(cx, &message) {
            return Outcome::Failed(err);
        }
        net_debug!("{}: DISCOVER sent, xid {:#010x}", self.handle, self.xid);
        self.set_state(LeaseState::WaitOffer);
        self.start_backoff(cx);
        Outcome::Continue
    }

    pub(super) fn process_wait_offer(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        match event.kind {
            EventKind::UserRelease => return self.release(cx),
            EventKind::UserBind | EventKind::UserVerify | EventKind::UserInform => {
                return Outcome::Continue
            }
            _ => (),
        }

        if self.prev_state == LeaseState::Init {
            self.offer = None;
            self.prev_state = LeaseState::WaitOffer;
        }

        match &event.kind {
            EventKind::Timeout { .. } => self.retransmit_discover(cx),
            EventKind::MessageArrived(message) => self.consider_first_offer(cx, message),
            _ => Outcome::Continue,
        }
    }

    fn retransmit_discover(&mut self, cx: &mut Context) -> Outcome {
        self.retry += 1;
        if self.retry == DISCOVER_RETRANS {
            if self.legacy_format {
                net_debug!("{}: no offer in either message format", self.handle);
                return Outcome::Failed(Error::NoOffer);
            }
            net_debug!("{}: no offer, falling back to the legacy format", self.handle);
            self.legacy_format = true;
            self.backoff /= 2;
            self.retry = 0;
        }

        let secs = self.elapsed_secs(cx);
        let message = build_discover(&self.exchange(cx, secs));
        let sent = match message {
            Ok(message) => self.broadcast(cx, &message),
            Err(err) => Err(err),
        };
        if sent.is_err() {
            return self.restart(LeaseState::WaitOffer);
        }
        self.next_backoff(cx);
        Outcome::Continue
    }

    fn consider_first_offer(&mut self, cx: &mut Context, message: &Message) -> Outcome {
        let packet = match message.packet() {
            Ok(packet) => packet,
            Err(_) => return Outcome::Continue,
        };
        match packet.message_type() {
            Ok(Some(DhcpMessageType::Offer)) => (),
            Ok(None) if message.len() <= BOOTP_REPLY_MAX_LEN => (),
            Ok(None) => {
                net_debug!("{}: untyped reply too long for BOOTP", self.handle);
                return Outcome::Continue;
            }
            Ok(Some(_)) | Err(_) => return Outcome::Continue,
        }
        let mut offer = match Parameters::decode(&packet) {
            Ok(offer) => offer,
            Err(err) => {
                net_debug!("{}: undecodable offer: {}", self.handle, err);
                return Outcome::Continue;
            }
        };

        let from_server = offer.is_bootp() || !offer.server_identifier.is_unspecified();
        if !from_server || !self.long_enough(cx, &offer) {
            net_debug!(
                "{}: rejected offer of {} from {} ({})",
                self.handle,
                offer.your_ip,
                offer.server_identifier,
                offer.lease_duration
            );
            return Outcome::Continue;
        }

        net_debug!(
            "{}: offer of {} from {} for {}",
            self.handle,
            offer.your_ip,
            offer.server_identifier,
            offer.lease_duration
        );
        offer.lease_origin = Some(self.epoch);
        self.offer = Some(offer);
        self.set_state(LeaseState::Selecting);
        cx.timers.cancel(self.handle);
        let window = cx.config.offer_window;
        self.arm_fixed(cx, window);
        Outcome::Continue
    }
}
