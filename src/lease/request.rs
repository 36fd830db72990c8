use super::message::{build_decline, build_request_or_inform, Message};
use super::{
    Context, Event, EventKind, Lease, LeaseEvent, LeaseState, Outcome, Parameters, ProbeOutcome,
    REQUEST_RETRANS,
};
use crate::wire::{DhcpMessageType, Ipv4Address};
use crate::Error;

impl Lease {
    fn informing_exchange(&self) -> bool {
        self.prev_state == LeaseState::Informing
    }

    pub(super) fn process_requesting(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        let informing = self.informing_exchange();
        match &event.kind {
            EventKind::UserRelease => self.release(cx),
            _ if informing && self.inform_done => Outcome::Continue,
            EventKind::Timeout { .. } => self.retransmit_request(cx, informing),
            EventKind::MessageArrived(message) => self.consider_reply(cx, message, informing),
            _ => Outcome::Continue,
        }
    }

    /// Give up on the current exchange: fatal for an inform, a fresh start otherwise.
    fn abandon(&mut self, informing: bool, error: Error) -> Outcome {
        if informing {
            Outcome::Failed(error)
        } else {
            self.restart(LeaseState::Requesting)
        }
    }

    fn retransmit_request(&mut self, cx: &mut Context, informing: bool) -> Outcome {
        self.retry += 1;
        if self.retry > REQUEST_RETRANS {
            net_debug!("{}: no answer after {} retransmissions", self.handle, REQUEST_RETRANS);
            return self.abandon(informing, Error::NoReply);
        }

        let message_type = if informing {
            DhcpMessageType::Inform
        } else {
            DhcpMessageType::Request
        };
        let message = build_request_or_inform(&self.exchange(cx, 0), message_type, self.offer());
        let message = match message {
            Ok(message) => message,
            Err(err) => return self.abandon(informing, err),
        };
        if let Err(err) = self.broadcast(cx, &message) {
            return self.abandon(informing, err);
        }
        self.next_backoff(cx);
        Outcome::Continue
    }

    fn consider_reply(&mut self, cx: &mut Context, message: &Message, informing: bool) -> Outcome {
        let packet = match message.packet() {
            Ok(packet) => packet,
            Err(_) => return Outcome::Continue,
        };
        match packet.message_type() {
            Ok(Some(DhcpMessageType::Ack)) => (),
            Ok(Some(DhcpMessageType::Nak)) if informing => {
                net_debug!("{}: ignoring NAK to an inform", self.handle);
                return Outcome::Continue;
            }
            Ok(Some(DhcpMessageType::Nak)) => {
                net_debug!("{}: request refused", self.handle);
                self.offer = None;
                return self.restart(LeaseState::Requesting);
            }
            _ => return Outcome::Continue,
        }

        let mut scratch = match Parameters::decode(&packet) {
            Ok(params) => params,
            Err(err) if informing => {
                net_debug!("{}: undecodable ACK to an inform: {}", self.handle, err);
                return Outcome::Continue;
            }
            Err(err) => {
                net_debug!("{}: undecodable ACK: {}", self.handle, err);
                return self.decline_and_restart(cx, "malformed acknowledgement");
            }
        };

        if informing {
            return self.finish_inform(cx, scratch);
        }

        if let Some(reason) = self.probe_conflict(cx, scratch.your_ip) {
            self.offer = Some(scratch);
            return self.decline_and_restart(cx, reason);
        }
        scratch.lease_origin = Some(self.epoch);
        self.offer = Some(scratch);
        self.set_state(LeaseState::Bound);
        self.bind(cx)
    }

    fn finish_inform(&mut self, cx: &mut Context, mut scratch: Parameters) -> Outcome {
        scratch.lease_origin = self.offer.as_ref().and_then(|offer| offer.lease_origin);
        net_debug!("{}: inform answered by {}", self.handle, scratch.server_identifier);
        self.offer = Some(scratch.clone());
        self.inform_done = true;
        cx.timers.cancel(self.handle);
        self.notify(LeaseEvent::New);
        if let Some(waiter) = self.waiter.take() {
            waiter.complete(Ok(scratch));
        }
        Outcome::Continue
    }

    /// Probe `address` once; a reason for declining it, if anyone else has it.
    pub(super) fn probe_conflict(
        &self,
        cx: &mut Context,
        address: Ipv4Address,
    ) -> Option<&'static str> {
        match cx.device.probe(address, &self.binding) {
            ProbeOutcome::Free => None,
            ProbeOutcome::Conflict { owner } => {
                net_debug!("{}: {} is in use by {}", self.handle, address, owner);
                Some("address in use")
            }
            ProbeOutcome::Error => {
                net_debug!("{}: could not probe {}", self.handle, address);
                Some("address check failed")
            }
        }
    }

    /// Tell the server we will not use the offered address, then start over.
    pub(super) fn decline_and_restart(&mut self, cx: &mut Context, reason: &str) -> Outcome {
        let from = self.state;
        if let Some(offer) = self.offer.take() {
            let message = build_decline(&self.exchange(cx, 0), &offer, reason);
            match message {
                Ok(message) => {
                    net_debug!("{}: declining {}: {}", self.handle, offer.your_ip, reason);
                    let _ = self.broadcast(cx, &message);
                }
                Err(err) => net_debug!("{}: cannot build DECLINE: {}", self.handle, err),
            }
        }
        self.restart(from)
    }
}
