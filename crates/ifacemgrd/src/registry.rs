//! The fixed interface table: construction, lifecycle and lookups.
//!
//! Interfaces are defined by board configuration and never created or
//! destroyed at run time; only their sub-state mutates. The registry owns
//! every record exclusively and hands out read access through accessors, so
//! no record is ever shared by value.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI8, AtomicU32, AtomicU8};
use std::sync::Arc;

use chassis_hal::{GpioBank, LinkCtrl};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::{InterfaceSpec, Timings};
use crate::error::{IfaceMgrError, IfaceMgrResult};
use crate::types::{
    HotplugState, IfaceKind, IfaceState, Interface, LinkRetry, LinkState, Polarity, PowerState,
    WakeDetect, WdHandler,
};

pub(crate) struct RegistryInner {
    pub(crate) interfaces: Vec<Interface>,
    pub(crate) gpio: Arc<dyn GpioBank>,
    pub(crate) link: Arc<dyn LinkCtrl>,
    pub(crate) timings: Timings,
}

/// The interface table plus the engine operating on it.
///
/// Cheap to clone; all clones share the same table. Deferred callbacks hold a
/// clone and address interfaces by index, never by pointer.
#[derive(Clone)]
pub struct InterfaceRegistry {
    pub(crate) inner: Arc<RegistryInner>,
}

impl InterfaceRegistry {
    /// Builds the table from the board specs.
    ///
    /// Rail handles inside the specs stay owned by the board layer; the
    /// registry only borrows them for the lifetime of the process.
    pub fn init(
        specs: Vec<InterfaceSpec>,
        gpio: Arc<dyn GpioBank>,
        link: Arc<dyn LinkCtrl>,
        timings: Timings,
    ) -> IfaceMgrResult<Self> {
        let mut names = HashSet::new();
        let mut portids = HashSet::new();
        let mut interfaces = Vec::with_capacity(specs.len());

        for (index, spec) in specs.into_iter().enumerate() {
            let c = spec.config;
            if !names.insert(c.name.clone()) {
                return Err(IfaceMgrError::invalid_config(
                    "name",
                    format!("duplicate interface name '{}'", c.name),
                ));
            }
            if let Some(portid) = c.switch_portid {
                if !portids.insert(portid) {
                    return Err(IfaceMgrError::invalid_config(
                        "switch_portid",
                        format!("switch port {} assigned twice", portid),
                    ));
                }
            }
            let detect_gpio = match (c.kind, c.detect_gpio) {
                (IfaceKind::Builtin, _) => c.detect_gpio.unwrap_or(0),
                (_, Some(pin)) => pin,
                (_, None) => {
                    return Err(IfaceMgrError::invalid_config(
                        "detect_gpio",
                        format!("module port '{}' has no detect signal", c.name),
                    ));
                }
            };
            if c.kind == IfaceKind::ModulePort2 && c.wake_gpio.is_none() {
                return Err(IfaceMgrError::invalid_config(
                    "wake_gpio",
                    format!("module port '{}' has no wake signal", c.name),
                ));
            }

            debug!(name = %c.name, index, kind = ?c.kind, "adding interface");
            interfaces.push(Interface {
                name: c.name,
                index,
                switch_portid: c.switch_portid,
                kind: c.kind,
                order: c.order,
                ejectable: c.ejectable,
                release_gpio: c.release_gpio,
                wake_gpio: c.wake_gpio,
                wake_polarity: Polarity::active_high(c.wake_active_high),
                vsys: spec.vsys,
                refclk: spec.refclk,
                power_state: AtomicI8::new(PowerState::Down.as_raw()),
                refclk_state: AtomicI8::new(PowerState::Down.as_raw()),
                hotplug_state: AtomicU8::new(HotplugState::Unknown.as_raw()),
                power_mode: AtomicU32::new(0),
                state: Mutex::new(IfaceState {
                    dev_id: None,
                    detect: WakeDetect::new(
                        detect_gpio,
                        Polarity::active_high(c.detect_active_high),
                    ),
                    linkup: LinkRetry::new(),
                    wd_handler: WdHandler::Active,
                    wakeout: None,
                    eject: None,
                    plug_generation: 0,
                }),
            });
        }

        info!(count = interfaces.len(), "interface table initialized");
        Ok(Self {
            inner: Arc::new(RegistryInner {
                interfaces,
                gpio,
                link,
                timings,
            }),
        })
    }

    /// Arms the first detect sample of every module port and brings built-in
    /// interfaces up.
    ///
    /// Must run on the runtime that executes the deferred work.
    pub fn start(&self) {
        for index in 0..self.count() {
            let builtin = self
                .get(index)
                .map(|iface| iface.is_builtin())
                .unwrap_or(false);
            if builtin {
                self.builtin_bringup(index);
            } else {
                self.on_detect_signal(index);
            }
        }
    }

    /// Cancels all outstanding deferred work and watchdogs across the table.
    ///
    /// The rail handles are owned by the board layer and left untouched.
    pub fn shutdown(&self) {
        for iface in self.iter() {
            let mut st = iface.state.lock();
            let handles = [
                st.detect.recheck.take(),
                st.linkup.watchdog.take(),
                st.wakeout.take(),
                st.eject.take(),
            ];
            for handle in handles.into_iter().flatten() {
                handle.cancel();
            }
        }
        info!("interface table shut down");
    }

    /// Number of interfaces in the table.
    pub fn count(&self) -> usize {
        self.inner.interfaces.len()
    }

    /// Interface by logical index.
    pub fn get(&self, index: usize) -> Option<&Interface> {
        self.inner.interfaces.get(index)
    }

    /// Interface by name; case-sensitive exact match, first match wins.
    pub fn get_by_name(&self, name: &str) -> Option<&Interface> {
        self.iter().find(|iface| iface.name == name)
    }

    /// Interface by switch port id.
    pub fn get_by_portid(&self, portid: u8) -> Option<&Interface> {
        self.iter().find(|iface| iface.switch_portid == Some(portid))
    }

    /// Logical index of the interface wired to `portid`.
    pub fn index_by_portid(&self, portid: u8) -> Option<usize> {
        self.get_by_portid(portid).map(|iface| iface.index)
    }

    /// Switch port id of the interface at `index`.
    pub fn portid_by_index(&self, index: usize) -> Option<u8> {
        self.get(index).and_then(|iface| iface.switch_portid)
    }

    /// Device id of the interface at `index`.
    ///
    /// Only link-established interfaces have one; `None` otherwise.
    pub fn devid_by_index(&self, index: usize) -> Option<u8> {
        let iface = self.get(index)?;
        let st = iface.state.lock();
        if st.linkup.state == LinkState::LinkUp {
            st.dev_id
        } else {
            None
        }
    }

    /// Interface currently link-established with device id `devid`.
    ///
    /// Misses once the device id is reset on unplug, even if the module was
    /// re-plugged without a fresh link.
    pub fn get_by_devid(&self, devid: u8) -> Option<&Interface> {
        self.iter().find(|iface| {
            let st = iface.state.lock();
            st.linkup.state == LinkState::LinkUp && st.dev_id == Some(devid)
        })
    }

    /// Iterates the table in stable (configuration) order.
    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.inner.interfaces.iter()
    }

    /// Assigns the peer device id.
    ///
    /// Normally done by the link layer on confirmation; the id is cleared
    /// again on unplug or link-down.
    pub fn set_device_id(&self, index: usize, dev_id: u8) -> IfaceMgrResult<()> {
        let iface = self
            .get(index)
            .ok_or_else(|| IfaceMgrError::out_of_range(index, self.count()))?;
        iface.state.lock().dev_id = Some(dev_id);
        Ok(())
    }

    /// Records the power mode indicated by the link layer.
    pub fn set_power_mode(&self, index: usize, mode: u32) -> IfaceMgrResult<()> {
        let iface = self
            .get(index)
            .ok_or_else(|| IfaceMgrError::out_of_range(index, self.count()))?;
        iface
            .power_mode
            .store(mode, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn require(&self, index: usize) -> IfaceMgrResult<&Interface> {
        self.get(index)
            .ok_or_else(|| IfaceMgrError::out_of_range(index, self.count()))
    }
}
