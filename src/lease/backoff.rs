use super::message::{Exchange, Message};
use super::{jittered, Context, Lease, FIRST_TIMER, MAX_TIMER};
use crate::time::Duration;
use crate::wire::Ipv4Address;
use crate::Result;

impl Lease {
    /// Begin a new retransmission sequence and arm its first timeout.
    pub(super) fn start_backoff(&mut self, cx: &mut Context) {
        self.retry = 0;
        self.backoff = FIRST_TIMER;
        self.arm_backoff(cx);
    }

    /// Double the interval up to the ceiling and arm the next timeout.
    pub(super) fn next_backoff(&mut self, cx: &mut Context) {
        self.backoff = (self.backoff * 2).min(MAX_TIMER);
        self.arm_backoff(cx);
    }

    fn arm_backoff(&mut self, cx: &mut Context) {
        let delay = jittered(cx, self.backoff);
        net_trace!(
            "{}: retransmission {} in {} (backoff {}s)",
            self.handle,
            self.retry,
            delay,
            self.backoff
        );
        cx.timers.arm(self.handle, cx.now + delay);
    }

    /// Arm a timer for a fixed delay, without jitter.
    pub(super) fn arm_fixed(&mut self, cx: &mut Context, delay: Duration) {
        net_trace!("{}: timer in {}", self.handle, delay);
        cx.timers.arm(self.handle, cx.now + delay);
    }

    pub(super) fn exchange<'a>(&'a self, cx: &'a Context, secs: u16) -> Exchange<'a> {
        Exchange {
            binding: &self.binding,
            config: cx.config,
            transaction_id: self.xid,
            secs,
            legacy_format: self.legacy_format,
        }
    }

    /// Seconds elapsed since the exchange began, for DISCOVER.
    pub(super) fn elapsed_secs(&self, cx: &Context) -> u16 {
        let secs = cx.now.saturating_duration_since(self.epoch).secs();
        secs.min(u16::MAX as u64) as u16
    }

    pub(super) fn send(
        &self,
        cx: &mut Context,
        message: &Message,
        dst: Ipv4Address,
        broadcast: bool,
    ) -> Result<()> {
        net_trace!(
            "{}: sending {} octets to {} (xid {:#010x})",
            self.handle,
            message.len(),
            dst,
            self.xid
        );
        cx.device
            .transmit(&self.binding, dst, message.as_bytes(), broadcast)
            .map_err(|err| {
                net_debug!("{}: transmit failed: {}", self.handle, err);
                crate::Error::Transmit
            })
    }

    pub(super) fn broadcast(&self, cx: &mut Context, message: &Message) -> Result<()> {
        self.send(cx, message, Ipv4Address::BROADCAST, true)
    }
}
