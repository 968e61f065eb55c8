//! Chassis interface hotplug, power and link-retry management.
//!
//! Each hot-pluggable module port of the chassis has its own power rails, a
//! wake/detect signal and a link-establishment handshake with the plugged
//! module. This crate turns the noisy detect line into a stable hotplug
//! state, sequences the system-voltage and reference-clock rails off the
//! resulting transitions, supervises link bring-up with bounded retries and
//! a watchdog, and drives module ejection, all while exposing lock-free
//! status queries to the rest of the system:
//!
//! - [`config`]: TOML board description and engine timings
//! - [`types`]: interface records and state machine types
//! - [`registry`]: the fixed interface table, lifecycle and lookups
//! - [`debounce`]: detect-signal settle machine
//! - [`hotplug`]: exactly-once plug/unplug transition tracking
//! - [`power`]: rail sequencing with atomic tri-state status
//! - [`linkup`]: bounded link-retry supervision
//! - [`eject`]: forced ejection and wakeout pulses
//! - [`error`]: error types

pub mod config;
pub mod debounce;
pub mod eject;
pub mod error;
pub mod hotplug;
pub mod linkup;
pub mod power;
pub mod registry;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{BoardConfig, InterfaceConfig, InterfaceSpec, Timings, TimingsConfig};
pub use eject::EjectOutcome;
pub use error::{IfaceMgrError, IfaceMgrResult};
pub use hotplug::HotplugTransition;
pub use registry::InterfaceRegistry;
pub use types::{
    DebounceState, HotplugState, IfaceKind, IfaceOrder, Interface, LinkState, Polarity,
    PowerState, ACTIVATION_DEBOUNCE_MS, INACTIVATION_DEBOUNCE_MS, LINKUP_WATCHDOG_MS,
    MAX_LINKUP_TRIES, RELEASE_PULSE_WIDTH_MS,
};
