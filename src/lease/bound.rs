use super::message::build_release;
use super::{Context, Event, EventKind, Lease, LeaseEvent, LeaseState, Outcome};
use crate::Error;

impl Lease {
    /// Configure the interface with the chosen offer. Returns whether it worked.
    pub(super) fn apply_offer(&mut self, cx: &mut Context) -> bool {
        let offer = match &self.offer {
            Some(offer) => offer,
            None => return false,
        };
        match cx.device.apply(&self.binding, offer) {
            Ok(()) => {
                net_debug!(
                    "{}: bound {} to {} for {}",
                    self.handle,
                    offer.your_ip,
                    self.binding.interface,
                    offer.lease_duration
                );
                cx.status.set_lease_good(self.handle, true);
                self.configured = true;
                self.notify(LeaseEvent::New);
                true
            }
            Err(err) => {
                net_debug!("{}: cannot configure {}: {}", self.handle, self.binding.interface, err);
                cx.status.set_lease_good(self.handle, false);
                // The interface may hold part of the configuration.
                cx.device.revert(&self.binding);
                self.configured = false;
                false
            }
        }
    }

    /// Arm the expiry timer of a finite lease; an infinite one never expires.
    pub(super) fn arm_expiry(&mut self, cx: &mut Context) {
        cx.timers.cancel(self.handle);
        let expires_at = self.offer.as_ref().and_then(|offer| offer.expires_at());
        if let Some(at) = expires_at {
            net_trace!("{}: lease expires at {}", self.handle, at);
            cx.timers.arm(self.handle, at);
        }
    }

    /// Commit the offer. The state must already be BOUND.
    pub(super) fn bind(&mut self, cx: &mut Context) -> Outcome {
        if !self.apply_offer(cx) {
            self.send_release(cx);
            return Outcome::Failed(Error::Apply);
        }
        self.arm_expiry(cx);
        Outcome::Bound
    }

    /// Give a DHCP lease back to its server. BOOTP leases have nobody to tell.
    pub(super) fn send_release(&mut self, cx: &mut Context) {
        let params = match &self.offer {
            Some(params) if !params.is_bootp() => params,
            _ => return,
        };
        let server = params.server_identifier;
        let message = build_release(&self.exchange(cx, 0), params);
        let sent = match message {
            Ok(message) => self.send(cx, &message, server, false),
            Err(err) => Err(err),
        };
        match sent {
            Ok(()) => net_debug!("{}: RELEASE sent to {}", self.handle, server),
            Err(err) => net_debug!("{}: RELEASE not sent: {}", self.handle, err),
        }
    }

    pub(super) fn process_bound(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        match event.kind {
            EventKind::UserRelease => self.release(cx),
            EventKind::Timeout { .. } => {
                net_debug!("{}: lease expired", self.handle);
                self.offer = None;
                self.restart(LeaseState::Bound)
            }
            EventKind::UserVerify => {
                net_debug!("{}: confirming bound lease", self.handle);
                self.set_state(LeaseState::InitReboot);
                Outcome::Restart
            }
            _ => Outcome::Continue,
        }
    }
}
