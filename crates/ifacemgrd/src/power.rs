//! Power and reference-clock sequencing.
//!
//! The compound mutex is held only across one rail call plus its status
//! store, bounding hold time to a single (bounded) rail operation. The
//! status fields themselves are single-word atomics, so other subsystems
//! poll them without ever touching the mutex; a transient `Error` may be
//! followed immediately by a corrective retry from the command surface.

use tracing::{info, warn};

use crate::error::{IfaceMgrError, IfaceMgrResult};
use crate::registry::InterfaceRegistry;
use crate::types::{HotplugState, PowerState};

impl InterfaceRegistry {
    /// Enables the system-voltage rail.
    ///
    /// On a rail fault the state is forced to [`PowerState::Error`] and the
    /// fault returned; there is no automatic retry, a caller must re-issue
    /// the command explicitly.
    pub fn power_on(&self, index: usize) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let _guard = iface.state.lock();
        match iface.vsys.enable() {
            Ok(()) => {
                iface.set_power_state(PowerState::Up);
                info!(iface = %iface.name(), rail = iface.vsys.name(), "system voltage up");
                Ok(())
            }
            Err(fault) => {
                iface.set_power_state(PowerState::Error);
                warn!(
                    iface = %iface.name(),
                    rail = iface.vsys.name(),
                    error = %fault,
                    "system voltage enable failed"
                );
                Err(IfaceMgrError::rail(iface.vsys.name(), fault))
            }
        }
    }

    /// Disables the system-voltage rail.
    ///
    /// Best-effort: the logical state always drops to Down so later retries
    /// are never blocked by a rail left in an unknown state; a driver fault
    /// is surfaced as a diagnostic only.
    pub fn power_off(&self, index: usize) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let _guard = iface.state.lock();
        if let Err(fault) = iface.vsys.disable() {
            warn!(
                iface = %iface.name(),
                rail = iface.vsys.name(),
                error = %fault,
                "system voltage disable reported fault"
            );
        }
        iface.set_power_state(PowerState::Down);
        info!(iface = %iface.name(), rail = iface.vsys.name(), "system voltage down");
        Ok(())
    }

    /// Enables the reference-clock rail.
    pub fn refclk_enable(&self, index: usize) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let _guard = iface.state.lock();
        match iface.refclk.enable() {
            Ok(()) => {
                iface.set_refclk_state(PowerState::Up);
                info!(iface = %iface.name(), rail = iface.refclk.name(), "reference clock up");
                Ok(())
            }
            Err(fault) => {
                iface.set_refclk_state(PowerState::Error);
                warn!(
                    iface = %iface.name(),
                    rail = iface.refclk.name(),
                    error = %fault,
                    "reference clock enable failed"
                );
                Err(IfaceMgrError::rail(iface.refclk.name(), fault))
            }
        }
    }

    /// Disables the reference-clock rail. Best-effort like [`Self::power_off`].
    pub fn refclk_disable(&self, index: usize) -> IfaceMgrResult<()> {
        let iface = self.require(index)?;
        let _guard = iface.state.lock();
        if let Err(fault) = iface.refclk.disable() {
            warn!(
                iface = %iface.name(),
                rail = iface.refclk.name(),
                error = %fault,
                "reference clock disable reported fault"
            );
        }
        iface.set_refclk_state(PowerState::Down);
        Ok(())
    }

    /// System-voltage status for `index`. Non-blocking.
    pub fn power_state(&self, index: usize) -> Option<PowerState> {
        self.get(index).map(|iface| iface.power_state())
    }

    /// Reference-clock status for `index`. Non-blocking.
    pub fn refclk_state(&self, index: usize) -> Option<PowerState> {
        self.get(index).map(|iface| iface.refclk_state())
    }

    /// Hotplug status for `index`. Non-blocking.
    pub fn hotplug_state(&self, index: usize) -> Option<HotplugState> {
        self.get(index).map(|iface| iface.hotplug_state())
    }

    /// Link-layer power mode for `index`. Non-blocking.
    pub fn power_mode(&self, index: usize) -> Option<u32> {
        self.get(index).map(|iface| iface.power_mode())
    }
}
