//! Module ejection and wakeout pulse generation.
//!
//! Ejection always resets link and power state; whether the mechanical
//! release actuator also fires depends on the port hardware. Wakeout pulses
//! drive the wake line towards the module; on first-generation module ports
//! that line is shared with detect, so the debounce handler is gated off for
//! the duration of a self-generated pulse.

use std::sync::Arc;
use std::time::Duration;

use chassis_hal::gpio::Pin;
use chassis_hal::work;
use tracing::{debug, info};

use crate::error::{IfaceMgrError, IfaceMgrResult};
use crate::registry::InterfaceRegistry;
use crate::types::{DebounceState, IfaceKind, IfaceState, Interface, Polarity, WdHandler};

/// Distinguishes a physical release from a purely logical shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EjectOutcome {
    /// The release actuator pulse was scheduled.
    Released,
    /// Power and link state were reset, but the port has no actuator.
    LogicalOnly,
}

impl InterfaceRegistry {
    /// Forced ejection: cancel link retry, clear the device id, drop power,
    /// and pulse the release actuator after `delay` if the port has one.
    ///
    /// Idempotent; safe to call on an already-ejected or exhausted
    /// interface. An exhausted supervisor keeps its parked state so the
    /// terminal outcome stays visible.
    pub fn forcibly_eject(&self, index: usize, delay: Duration) -> IfaceMgrResult<EjectOutcome> {
        let iface = self.require(index)?;
        info!(iface = %iface.name(), ?delay, "forced ejection requested");

        {
            let mut st = iface.state.lock();
            Self::cancel_linkup_locked(&mut st, true);
        }
        self.power_off(index)?;
        self.refclk_disable(index)?;

        let Some(release) = iface.release_gpio.filter(|_| iface.ejectable()) else {
            debug!(iface = %iface.name(), "no release actuator, logical ejection only");
            return Ok(EjectOutcome::LogicalOnly);
        };

        let gpio = Arc::clone(&self.inner.gpio);
        let pulse = self.inner.timings.release_pulse;
        let name = iface.name().to_string();
        let mut st = iface.state.lock();
        if let Some(old) = st.eject.take() {
            old.cancel();
        }
        st.eject = Some(work::schedule(delay, move || {
            info!(iface = %name, "release actuator asserted");
            gpio.write(release, true);
            // once the pulse is armed the deassert must complete; the inner
            // handle is deliberately detached
            work::schedule(pulse, move || {
                gpio.write(release, false);
                debug!(iface = %name, "release actuator deasserted");
            });
        }));
        Ok(EjectOutcome::Released)
    }

    /// Wake line of an interface: the dedicated wake pin on second-generation
    /// module ports, the shared detect line otherwise.
    fn wake_line(iface: &Interface, st: &IfaceState) -> Option<(Pin, Polarity, bool)> {
        match iface.kind() {
            IfaceKind::Builtin => None,
            IfaceKind::ModulePort2 => iface
                .wake_gpio
                .map(|pin| (pin, iface.wake_polarity, false)),
            IfaceKind::ModulePort => Some((st.detect.gpio, st.detect.polarity, true)),
        }
    }

    /// Drives the wake line towards the module.
    ///
    /// With `assert` set the line goes active and, given a nonzero `length`,
    /// a completion is scheduled that deasserts it again; a zero or absent
    /// length leaves the line asserted until [`Self::cancel_wakeout`]. On a
    /// shared wake/detect line the debounce handler is gated off while the
    /// pulse is in flight.
    pub fn generate_wakeout(
        &self,
        index: usize,
        assert: bool,
        length: Option<Duration>,
    ) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let mut st = iface.state.lock();
        let Some((pin, polarity, shared)) = Self::wake_line(iface, &st) else {
            return Err(IfaceMgrError::unsupported(iface.name(), "wakeout pulse"));
        };

        if let Some(old) = st.wakeout.take() {
            old.cancel();
        }
        if shared {
            // gate the debounce handler and drop any pending settle window
            // so our own pulse is not mistaken for a plug event
            st.wd_handler = WdHandler::Inactive;
            if let Some(pending) = st.detect.recheck.take() {
                pending.cancel();
            }
            let prior = st.detect.last_state;
            st.detect.db_state = if prior.is_stable() {
                prior
            } else {
                DebounceState::Invalid
            };
        }
        self.inner.gpio.write(pin, polarity.to_raw(assert));
        debug!(iface = %iface.name(), assert, ?length, "wakeout line driven");

        if assert {
            if let Some(len) = length.filter(|len| !len.is_zero()) {
                let registry = self.clone();
                st.wakeout = Some(work::schedule(len, move || {
                    registry.wakeout_complete(index);
                }));
            }
        } else if shared {
            st.wd_handler = WdHandler::Active;
        }
        Ok(())
    }

    /// Deferred wakeout completion: deassert and restore the detect handler.
    fn wakeout_complete(&self, index: usize) {
        let Some(iface) = self.get(index) else { return };
        let mut st = iface.state.lock();
        st.wakeout = None;
        if let Some((pin, polarity, shared)) = Self::wake_line(iface, &st) {
            self.inner.gpio.write(pin, polarity.to_raw(false));
            if shared {
                st.wd_handler = WdHandler::Active;
            }
            debug!(iface = %iface.name(), "wakeout pulse complete");
        }
    }

    /// Cancels an in-flight wakeout pulse and deasserts the line.
    ///
    /// Idempotent: cancelling with no pulse in flight only re-idles the
    /// line.
    pub fn cancel_wakeout(&self, index: usize) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let mut st = iface.state.lock();
        if let Some(wakeout) = st.wakeout.take() {
            wakeout.cancel();
        }
        if let Some((pin, polarity, shared)) = Self::wake_line(iface, &st) {
            self.inner.gpio.write(pin, polarity.to_raw(false));
            if shared {
                st.wd_handler = WdHandler::Active;
            }
        }
        Ok(())
    }
}
