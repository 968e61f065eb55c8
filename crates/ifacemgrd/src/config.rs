//! Board configuration for the interface table.
//!
//! The table is fixed at build/configuration time: this module parses the
//! TOML board description, validates it, and joins it with the externally
//! owned rail handles before the registry turns it into runtime records.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chassis_hal::gpio::Pin;
use chassis_hal::Rail;
use serde::Deserialize;

use crate::error::{IfaceMgrError, IfaceMgrResult};
use crate::types::{
    IfaceKind, IfaceOrder, ACTIVATION_DEBOUNCE_MS, INACTIVATION_DEBOUNCE_MS, LINKUP_WATCHDOG_MS,
    RELEASE_PULSE_WIDTH_MS,
};

/// Timing knobs for the debounce/retry engine.
///
/// Defaults carry the platform values; boards and tests may tune them.
#[derive(Debug, Clone)]
pub struct Timings {
    /// Settle window for a transition to active.
    pub activation_debounce: Duration,
    /// Settle window for a transition to inactive.
    pub inactivation_debounce: Duration,
    /// Watchdog period for a single link-up attempt.
    pub linkup_watchdog: Duration,
    /// Width of the release actuator pulse.
    pub release_pulse: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            activation_debounce: Duration::from_millis(ACTIVATION_DEBOUNCE_MS),
            inactivation_debounce: Duration::from_millis(INACTIVATION_DEBOUNCE_MS),
            linkup_watchdog: Duration::from_millis(LINKUP_WATCHDOG_MS),
            release_pulse: Duration::from_millis(RELEASE_PULSE_WIDTH_MS),
        }
    }
}

/// `[timings]` section of the board file, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingsConfig {
    pub activation_debounce_ms: u64,
    pub inactivation_debounce_ms: u64,
    pub linkup_watchdog_ms: u64,
    pub release_pulse_ms: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            activation_debounce_ms: ACTIVATION_DEBOUNCE_MS,
            inactivation_debounce_ms: INACTIVATION_DEBOUNCE_MS,
            linkup_watchdog_ms: LINKUP_WATCHDOG_MS,
            release_pulse_ms: RELEASE_PULSE_WIDTH_MS,
        }
    }
}

impl From<&TimingsConfig> for Timings {
    fn from(cfg: &TimingsConfig) -> Self {
        Self {
            activation_debounce: Duration::from_millis(cfg.activation_debounce_ms),
            inactivation_debounce: Duration::from_millis(cfg.inactivation_debounce_ms),
            linkup_watchdog: Duration::from_millis(cfg.linkup_watchdog_ms),
            release_pulse: Duration::from_millis(cfg.release_pulse_ms),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One `[[interface]]` entry in the board description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceConfig {
    /// Interface name (e.g. "slot0").
    pub name: String,
    /// Interface kind.
    pub kind: IfaceKind,
    /// Switch port the interface is wired to, if any.
    #[serde(default)]
    pub switch_portid: Option<u8>,
    /// Detect (or latch) signal pin; required for module ports.
    #[serde(default)]
    pub detect_gpio: Option<Pin>,
    /// Polarity of the detect signal.
    #[serde(default = "default_true")]
    pub detect_active_high: bool,
    /// Dedicated wake pin; required for second-generation module ports.
    #[serde(default)]
    pub wake_gpio: Option<Pin>,
    /// Polarity of the wake signal.
    #[serde(default = "default_true")]
    pub wake_active_high: bool,
    /// Whether the port has a mechanical release mechanism.
    #[serde(default)]
    pub ejectable: bool,
    /// Release actuator pin, if one is wired.
    #[serde(default)]
    pub release_gpio: Option<Pin>,
    /// Bring-up order hint.
    #[serde(default)]
    pub order: IfaceOrder,
    /// Name of the system-voltage rail supplying the port.
    pub vsys_rail: String,
    /// Name of the reference-clock rail supplying the port.
    pub refclk_rail: String,
}

/// Parsed board description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    #[serde(default)]
    pub timings: TimingsConfig,
    #[serde(default, rename = "interface")]
    pub interfaces: Vec<InterfaceConfig>,
}

impl BoardConfig {
    /// Parses and validates a TOML board description.
    pub fn from_toml(input: &str) -> IfaceMgrResult<Self> {
        let config: BoardConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a board description file.
    pub fn from_file(path: impl AsRef<Path>) -> IfaceMgrResult<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml(&input)
    }

    /// Engine timings configured for this board.
    pub fn timings(&self) -> Timings {
        Timings::from(&self.timings)
    }

    fn validate(&self) -> IfaceMgrResult<()> {
        if self.interfaces.is_empty() {
            return Err(IfaceMgrError::invalid_config(
                "interface",
                "board defines no interfaces",
            ));
        }

        let mut names = std::collections::HashSet::new();
        let mut portids = std::collections::HashSet::new();
        for iface in &self.interfaces {
            if !names.insert(iface.name.as_str()) {
                return Err(IfaceMgrError::invalid_config(
                    "name",
                    format!("duplicate interface name '{}'", iface.name),
                ));
            }
            if let Some(portid) = iface.switch_portid {
                if !portids.insert(portid) {
                    return Err(IfaceMgrError::invalid_config(
                        "switch_portid",
                        format!("switch port {} assigned twice", portid),
                    ));
                }
            }
            match iface.kind {
                IfaceKind::Builtin => {}
                IfaceKind::ModulePort => {
                    if iface.detect_gpio.is_none() {
                        return Err(IfaceMgrError::invalid_config(
                            "detect_gpio",
                            format!("module port '{}' has no detect signal", iface.name),
                        ));
                    }
                }
                IfaceKind::ModulePort2 => {
                    if iface.detect_gpio.is_none() {
                        return Err(IfaceMgrError::invalid_config(
                            "detect_gpio",
                            format!("module port '{}' has no latch detect signal", iface.name),
                        ));
                    }
                    if iface.wake_gpio.is_none() {
                        return Err(IfaceMgrError::invalid_config(
                            "wake_gpio",
                            format!("module port '{}' has no wake signal", iface.name),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Build input for one runtime interface record: parsed configuration joined
/// with the rail handles owned by the board layer.
pub struct InterfaceSpec {
    pub config: InterfaceConfig,
    pub vsys: Arc<dyn Rail>,
    pub refclk: Arc<dyn Rail>,
}
