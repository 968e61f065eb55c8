//! Wake/detect signal debouncing.
//!
//! Filters the raw detect level of a module port into a trustworthy stable
//! state. The sample path never blocks: a level change only arms a
//! polarity-dependent settle window, and the promotion (or bounce revert)
//! happens on a deferred re-check. Promotion and the hotplug comparison form
//! one compound update under the interface mutex; the resulting business
//! actions run after the mutex is released.

use chassis_hal::work;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::registry::InterfaceRegistry;
use crate::types::{DebounceState, WdHandler};

impl InterfaceRegistry {
    /// Entry point for an edge notification or poll tick on the detect line.
    ///
    /// Safe to call from signal-sample context: reads the pin, advances the
    /// debounce state and arms the deferred re-check. Re-entrant against
    /// concurrent samples; an opposite-direction sample during a settle
    /// window restarts the window for the new direction, a same-direction
    /// sample leaves the running window untouched.
    pub fn on_detect_signal(&self, index: usize) {
        let Some(iface) = self.get(index) else { return };
        if !iface.is_module_port() {
            return;
        }

        let mut st = iface.state.lock();
        if st.wd_handler != WdHandler::Active {
            // the core is driving the shared wake/detect line itself
            return;
        }

        let raw = self.inner.gpio.read(st.detect.gpio);
        let active = st.detect.polarity.is_active(raw);
        let target = if active {
            DebounceState::ActiveDebounce
        } else {
            DebounceState::InactiveDebounce
        };

        match st.detect.db_state {
            DebounceState::ActiveStable if active => return,
            DebounceState::InactiveStable if !active => return,
            current if current == target => return,
            _ => {}
        }

        st.detect.db_state = target;
        st.detect.last_check = Some(Instant::now());
        if let Some(old) = st.detect.recheck.take() {
            old.cancel();
        }

        let delay = if active {
            self.inner.timings.activation_debounce
        } else {
            self.inner.timings.inactivation_debounce
        };
        let registry = self.clone();
        st.detect.recheck = Some(work::schedule(delay, move || {
            registry.debounce_recheck(index);
        }));
        trace!(iface = %iface.name(), active, ?delay, "detect settle window armed");
    }

    /// Settle-window expiry: promote the pending transition if the pin still
    /// reads the new level, otherwise revert the transient.
    fn debounce_recheck(&self, index: usize) {
        let Some(iface) = self.get(index) else { return };

        let noted = {
            let mut st = iface.state.lock();
            st.detect.recheck = None;
            if st.wd_handler != WdHandler::Active {
                // our own pulse is driving the line; restart from the last
                // stable state once the handler comes back
                let prior = st.detect.last_state;
                st.detect.db_state = if prior.is_stable() {
                    prior
                } else {
                    DebounceState::Invalid
                };
                return;
            }
            let raw = self.inner.gpio.read(st.detect.gpio);
            let active = st.detect.polarity.is_active(raw);
            st.detect.last_check = Some(Instant::now());

            match (st.detect.db_state, active) {
                (DebounceState::ActiveDebounce, true) => {
                    self.promote_locked(iface, &mut st, DebounceState::ActiveStable)
                }
                (DebounceState::InactiveDebounce, false) => {
                    self.promote_locked(iface, &mut st, DebounceState::InactiveStable)
                }
                (DebounceState::ActiveDebounce, false)
                | (DebounceState::InactiveDebounce, true) => {
                    // bounce: revert and re-arm from scratch on the next raw sample
                    let prior = st.detect.last_state;
                    st.detect.db_state = if prior.is_stable() {
                        prior
                    } else {
                        DebounceState::Invalid
                    };
                    debug!(iface = %iface.name(), "detect bounce reverted");
                    None
                }
                // stale callback after cancellation or teardown
                _ => None,
            }
        };

        if let Some((transition, generation)) = noted {
            self.dispatch_transition(index, transition, generation);
        }
    }
}
