//! Link bring-up retry supervision.
//!
//! The watchdog callback and the external link-up confirmation are the two
//! writers of the retry state; both take the compound mutex for the whole
//! read-modify-write of {state, counter, in-flight flag}, so a confirmation
//! arriving exactly as a watchdog fires cannot be lost. The request itself
//! is sent after the mutex is released.

use std::time::Duration;

use chassis_hal::work;
use tracing::{debug, info, warn};

use crate::error::IfaceMgrResult;
use crate::registry::InterfaceRegistry;
use crate::types::{IfaceState, Interface, LinkState, MAX_LINKUP_TRIES};

enum WatchdogVerdict {
    Resend,
    Exhausted,
    Stale,
}

impl InterfaceRegistry {
    /// Starts the retry envelope after power has been applied.
    ///
    /// No-op unless the supervisor is idle: an exhausted interface stays
    /// parked until operator action or a physical unplug.
    pub(crate) fn start_linkup(&self, index: usize) {
        let Some(iface) = self.get(index) else { return };
        let Some(portid) = iface.switch_portid() else {
            // no switch port wired: nothing to bring up
            return;
        };

        let armed = {
            let mut st = iface.state.lock();
            if st.linkup.state != LinkState::Idle {
                false
            } else {
                st.linkup.retries = 0;
                self.arm_attempt_locked(index, &mut st);
                true
            }
        };
        if armed {
            self.send_linkup_request(iface, portid);
        }
    }

    /// Arms one attempt: bumps the counter, marks the request in flight and
    /// starts the watchdog. The caller holds the compound mutex and sends
    /// the request after releasing it.
    fn arm_attempt_locked(&self, index: usize, st: &mut IfaceState) {
        st.linkup.state = LinkState::RequestSent;
        st.linkup.req_sent = true;
        st.linkup.retries += 1;
        if let Some(old) = st.linkup.watchdog.take() {
            old.cancel();
        }
        let registry = self.clone();
        st.linkup.watchdog = Some(work::schedule(
            self.inner.timings.linkup_watchdog,
            move || registry.linkup_watchdog_expired(index),
        ));
    }

    fn send_linkup_request(&self, iface: &Interface, portid: u8) {
        debug!(iface = %iface.name(), portid, "sending link-up request");
        if let Err(err) = self.inner.link.request_linkup(portid) {
            // a lost request is covered by the watchdog envelope
            warn!(iface = %iface.name(), error = %err, "link-up request failed");
        }
    }

    /// Watchdog expiry with no confirmation: resend or give up.
    fn linkup_watchdog_expired(&self, index: usize) {
        let Some(iface) = self.get(index) else { return };
        let Some(portid) = iface.switch_portid() else { return };

        let verdict = {
            let mut st = iface.state.lock();
            if st.linkup.state != LinkState::RequestSent {
                // confirmed or reset while this callback was queued
                WatchdogVerdict::Stale
            } else if st.linkup.retries < MAX_LINKUP_TRIES {
                self.arm_attempt_locked(index, &mut st);
                WatchdogVerdict::Resend
            } else {
                st.linkup.state = LinkState::Exhausted;
                st.linkup.req_sent = false;
                st.linkup.watchdog = None;
                WatchdogVerdict::Exhausted
            }
        };

        match verdict {
            WatchdogVerdict::Resend => {
                warn!(iface = %iface.name(), "link-up timed out, retrying");
                self.send_linkup_request(iface, portid);
            }
            WatchdogVerdict::Exhausted => {
                warn!(
                    iface = %iface.name(),
                    tries = MAX_LINKUP_TRIES,
                    "link-up retries exhausted, ejecting"
                );
                if let Err(err) = self.forcibly_eject(index, Duration::ZERO) {
                    warn!(iface = %iface.name(), error = %err, "ejection after exhaustion failed");
                }
            }
            WatchdogVerdict::Stale => {}
        }
    }

    /// External confirmation from the link layer.
    ///
    /// Cancels the watchdog, resets the counter and assigns the device id.
    /// A confirmation for an interface with no request in flight (e.g. it
    /// was unplugged meanwhile) is ignored.
    pub fn on_linkup_confirmed(&self, index: usize, dev_id: u8) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let mut st = iface.state.lock();
        if st.linkup.state != LinkState::RequestSent {
            debug!(
                iface = %iface.name(),
                state = ?st.linkup.state,
                "ignoring stale link-up confirmation"
            );
            return Ok(());
        }
        if let Some(watchdog) = st.linkup.watchdog.take() {
            watchdog.cancel();
        }
        st.linkup.state = LinkState::LinkUp;
        st.linkup.retries = 0;
        st.linkup.req_sent = false;
        st.dev_id = Some(dev_id);
        info!(iface = %iface.name(), dev_id, "link established");
        Ok(())
    }

    /// Unplug path: cancel the watchdog and return to idle with the counter
    /// reset. Physical removal is not a link failure, so there is no
    /// exhaustion penalty; the device id is cleared with the link.
    pub(crate) fn reset_linkup_on_unplug(&self, index: usize) {
        let Some(iface) = self.get(index) else { return };
        let mut st = iface.state.lock();
        Self::cancel_linkup_locked(&mut st, false);
    }

    /// Shared cancel/reset. With `park_exhausted` an exhausted supervisor
    /// keeps its state so the terminal outcome stays visible on the status
    /// surface.
    pub(crate) fn cancel_linkup_locked(st: &mut IfaceState, park_exhausted: bool) {
        if let Some(watchdog) = st.linkup.watchdog.take() {
            watchdog.cancel();
        }
        st.linkup.retries = 0;
        st.linkup.req_sent = false;
        st.dev_id = None;
        if !(park_exhausted && st.linkup.state == LinkState::Exhausted) {
            st.linkup.state = LinkState::Idle;
        }
    }

    /// Presets the retry counter.
    pub fn set_linkup_retries(&self, index: usize, value: u8) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        iface.state.lock().linkup.retries = value;
        Ok(())
    }

    /// Cancels the link-up watchdog. Idempotent: cancelling when none is
    /// armed is a no-op.
    pub fn cancel_linkup_watchdog(&self, index: usize) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let mut st = iface.state.lock();
        if let Some(watchdog) = st.linkup.watchdog.take() {
            watchdog.cancel();
        }
        Ok(())
    }
}
