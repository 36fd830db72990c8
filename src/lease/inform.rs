use super::message::build_request_or_inform;
use super::{Context, Event, EventKind, Lease, LeaseState, Outcome};
use crate::wire::DhcpMessageType;

impl Lease {
    /// Send one DHCPINFORM and hand the exchange over to REQUESTING, which
    /// handles the reply.
    pub(super) fn process_informing(&mut self, cx: &mut Context, event: &Event) -> Outcome {
        if event.kind == EventKind::UserRelease {
            return self.release(cx);
        }
        if event.kind != EventKind::UserInform {
            net_trace!("{}: waiting for the inform request", self.handle);
            return Outcome::Continue;
        }

        cx.timers.cancel(self.handle);
        self.legacy_format = false;
        self.inform_done = false;
        self.xid = cx.rand.rand_u32();
        self.epoch = cx.now;

        let message =
            build_request_or_inform(&self.exchange(cx, 0), DhcpMessageType::Inform, None);
        let message = match message {
            Ok(message) => message,
            Err(err) => return Outcome::Failed(err),
        };
        if let Err(err) = self.broadcast(cx, &message) {
            return Outcome::Failed(err);
        }
        net_debug!("{}: INFORM sent, xid {:#010x}", self.handle, self.xid);
        self.set_state(LeaseState::Requesting);
        self.start_backoff(cx);
        Outcome::Continue
    }
}
