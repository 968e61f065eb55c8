//! Hotplug tracking.
//!
//! Derives PLUGGED/UNPLUGGED from the stable detect state, reports each edge
//! exactly once, and runs the subscriber actions: power sequencing on both
//! edges, link bring-up on plug. Consumers react to these transitions, never
//! to raw debounce events.

use tracing::{debug, info, warn};

use crate::registry::InterfaceRegistry;
use crate::types::{DebounceState, HotplugState, IfaceKind, IfaceState, Interface};

/// A hotplug edge, reported exactly once per physical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotplugTransition {
    pub from: HotplugState,
    pub to: HotplugState,
}

impl InterfaceRegistry {
    /// Derives the hotplug state for an interface kind from a stable
    /// debounce state. Built-in peers are always present.
    pub(crate) fn derive_hotplug(kind: IfaceKind, stable: DebounceState) -> HotplugState {
        if kind == IfaceKind::Builtin {
            return HotplugState::Plugged;
        }
        match stable {
            DebounceState::ActiveStable => HotplugState::Plugged,
            DebounceState::InactiveStable => HotplugState::Unplugged,
            _ => HotplugState::Unknown,
        }
    }

    /// Promotes a pending debounce transition to its stable state and runs
    /// the hotplug comparison, all under the caller's lock.
    pub(crate) fn promote_locked(
        &self,
        iface: &Interface,
        st: &mut IfaceState,
        stable: DebounceState,
    ) -> Option<(HotplugTransition, u64)> {
        st.detect.db_state = stable;
        st.detect.last_state = stable;
        debug!(iface = %iface.name(), ?stable, "detect state promoted");
        let new = Self::derive_hotplug(iface.kind(), stable);
        self.note_hotplug_locked(iface, st, new)
    }

    /// Compares `new` against the last reported hotplug state and records it
    /// on change. Returns the transition together with the generation it
    /// created; `None` if nothing changed (repeated promotions of the same
    /// stable state stay silent).
    pub(crate) fn note_hotplug_locked(
        &self,
        iface: &Interface,
        st: &mut IfaceState,
        new: HotplugState,
    ) -> Option<(HotplugTransition, u64)> {
        let old = iface.hotplug_state();
        if old == new {
            return None;
        }
        iface.set_hotplug_state(new);
        st.plug_generation += 1;
        Some((HotplugTransition { from: old, to: new }, st.plug_generation))
    }

    /// Subscriber path for a reported transition. Runs without the compound
    /// mutex held; everything it calls takes its own bounded lock scopes.
    pub(crate) fn dispatch_transition(
        &self,
        index: usize,
        transition: HotplugTransition,
        generation: u64,
    ) {
        if let Some(iface) = self.get(index) {
            info!(
                iface = %iface.name(),
                from = ?transition.from,
                to = ?transition.to,
                "hotplug transition"
            );
        }
        match transition.to {
            HotplugState::Plugged => self.handle_plugged(index, generation),
            HotplugState::Unplugged => self.handle_unplugged(index),
            HotplugState::Unknown => {}
        }
    }

    /// Brings a built-in interface up at start of day.
    pub(crate) fn builtin_bringup(&self, index: usize) {
        let Some(iface) = self.get(index) else { return };
        let noted = {
            let mut st = iface.state.lock();
            self.note_hotplug_locked(iface, &mut st, HotplugState::Plugged)
        };
        if let Some((transition, generation)) = noted {
            self.dispatch_transition(index, transition, generation);
        }
    }

    fn handle_plugged(&self, index: usize, generation: u64) {
        let Some(iface) = self.get(index) else { return };

        if let Err(err) = self.power_on(index) {
            warn!(iface = %iface.name(), error = %err, "leaving interface unpowered");
            return;
        }
        if let Err(err) = self.refclk_enable(index) {
            // link bring-up without a reference clock will time out and the
            // retry envelope reports the failure
            warn!(iface = %iface.name(), error = %err, "reference clock unavailable");
        }

        // The rails may have taken a moment; skip link bring-up if an unplug
        // superseded this plug while power was being applied.
        {
            let st = iface.state.lock();
            if st.plug_generation != generation {
                debug!(iface = %iface.name(), "plug superseded during power-on");
                return;
            }
        }
        self.start_linkup(index);
    }

    fn handle_unplugged(&self, index: usize) {
        self.reset_linkup_on_unplug(index);
        if let Err(err) = self.power_off(index) {
            warn!(error = %err, "power-off on unplug failed");
        }
        if let Err(err) = self.refclk_disable(index) {
            warn!(error = %err, "refclk-off on unplug failed");
        }
    }
}
