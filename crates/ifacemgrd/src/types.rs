//! Interface records and state machine types.
//!
//! One [`Interface`] exists per physical port, owned by the registry for the
//! lifetime of the process. The handful of status fields polled by other
//! subsystems are single-word atomics; everything that changes as a group
//! lives in [`IfaceState`] behind one compound mutex.

use std::sync::atomic::{AtomicI8, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use chassis_hal::gpio::Pin;
use chassis_hal::{Rail, WorkHandle};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::time::Instant;

/// Settle window before a detect transition to active is trusted.
///
/// Longer than the inactivation window: going active applies power, so it
/// demands more confidence that something is really there.
pub const ACTIVATION_DEBOUNCE_MS: u64 = 300;

/// Settle window before a detect transition to inactive is trusted.
pub const INACTIVATION_DEBOUNCE_MS: u64 = 30;

/// Max number of link-up attempts before the interface is shut down.
pub const MAX_LINKUP_TRIES: u8 = 3;

/// Width of the mechanical release actuator pulse, in milliseconds.
pub const RELEASE_PULSE_WIDTH_MS: u64 = 1500;

/// Default watchdog period for a single link-up attempt, in milliseconds.
pub const LINKUP_WATCHDOG_MS: u64 = 1000;

/// Interface kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IfaceKind {
    /// Connected to a built-in peer on the board; always present.
    Builtin,
    /// Hot-pluggable module port with a shared wake/detect line.
    ModulePort,
    /// Module port with a dedicated wake line and a latch detect line.
    ModulePort2,
}

/// Bring-up order hint for multi-port modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IfaceOrder {
    #[default]
    Unknown,
    Primary,
    Secondary,
}

/// Polarity of the logical "active" level of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    /// Maps a raw pin level to the logical active/inactive boolean.
    pub fn is_active(self, raw: bool) -> bool {
        match self {
            Polarity::ActiveHigh => raw,
            Polarity::ActiveLow => !raw,
        }
    }

    /// Maps a logical active/inactive boolean to the raw pin level.
    pub fn to_raw(self, active: bool) -> bool {
        match self {
            Polarity::ActiveHigh => active,
            Polarity::ActiveLow => !active,
        }
    }

    pub fn active_high(high: bool) -> Self {
        if high {
            Polarity::ActiveHigh
        } else {
            Polarity::ActiveLow
        }
    }
}

/// Wake & detect debounce state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// Unknown state, before the first check.
    Invalid,
    /// Transition to inactive pending.
    InactiveDebounce,
    /// Transition to active pending.
    ActiveDebounce,
    /// Stable inactive.
    InactiveStable,
    /// Stable active.
    ActiveStable,
}

impl DebounceState {
    pub fn is_stable(self) -> bool {
        matches!(self, DebounceState::InactiveStable | DebounceState::ActiveStable)
    }
}

/// Tri-state power status, single-word so readers never need the mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Error,
    Down,
    Up,
}

impl PowerState {
    pub(crate) fn as_raw(self) -> i8 {
        match self {
            PowerState::Error => -1,
            PowerState::Down => 0,
            PowerState::Up => 1,
        }
    }

    pub(crate) fn from_raw(raw: i8) -> Self {
        match raw {
            1 => PowerState::Up,
            0 => PowerState::Down,
            _ => PowerState::Error,
        }
    }
}

/// Hotplug state derived from the stable detect state and interface kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugState {
    Unknown,
    Plugged,
    Unplugged,
}

impl HotplugState {
    pub(crate) fn as_raw(self) -> u8 {
        match self {
            HotplugState::Unknown => 0,
            HotplugState::Plugged => 1,
            HotplugState::Unplugged => 2,
        }
    }

    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            1 => HotplugState::Plugged,
            2 => HotplugState::Unplugged,
            _ => HotplugState::Unknown,
        }
    }
}

/// Link-retry supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing in flight.
    Idle,
    /// A request is out and the watchdog is armed.
    RequestSent,
    /// The link layer confirmed bring-up.
    LinkUp,
    /// All attempts timed out; parked until operator action or unplug.
    Exhausted,
}

/// Gate for the detect sample handler.
///
/// Turned off while the core drives a shared wake/detect line itself, so a
/// self-generated pulse is not mistaken for a plug event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WdHandler {
    Inactive,
    Active,
}

/// Wake & detect signal bookkeeping.
#[derive(Debug)]
pub struct WakeDetect {
    pub(crate) gpio: Pin,
    pub(crate) polarity: Polarity,
    /// Current debounce state.
    pub(crate) db_state: DebounceState,
    /// Last stable debounce state; only ever a stable variant once the first
    /// check completed.
    pub(crate) last_state: DebounceState,
    /// Time of the last debounce check.
    pub(crate) last_check: Option<Instant>,
    /// Deferred settle re-check, cancellable.
    pub(crate) recheck: Option<WorkHandle>,
}

impl WakeDetect {
    pub(crate) fn new(gpio: Pin, polarity: Polarity) -> Self {
        Self {
            gpio,
            polarity,
            db_state: DebounceState::Invalid,
            last_state: DebounceState::Invalid,
            last_check: None,
            recheck: None,
        }
    }
}

/// Link-up retry bookkeeping.
#[derive(Debug)]
pub struct LinkRetry {
    pub(crate) state: LinkState,
    pub(crate) retries: u8,
    pub(crate) req_sent: bool,
    /// Per-attempt watchdog, cancellable.
    pub(crate) watchdog: Option<WorkHandle>,
}

impl LinkRetry {
    pub(crate) fn new() -> Self {
        Self {
            state: LinkState::Idle,
            retries: 0,
            req_sent: false,
            watchdog: None,
        }
    }
}

/// Mutable per-interface state guarded by the compound mutex.
#[derive(Debug)]
pub(crate) struct IfaceState {
    /// Peer device id; valid only while the link is established.
    pub(crate) dev_id: Option<u8>,
    pub(crate) detect: WakeDetect,
    pub(crate) linkup: LinkRetry,
    pub(crate) wd_handler: WdHandler,
    /// Wakeout pulse completion work.
    pub(crate) wakeout: Option<WorkHandle>,
    /// Module ejection completion work.
    pub(crate) eject: Option<WorkHandle>,
    /// Bumped on every hotplug transition so in-flight deferred work can
    /// detect that a newer plug/unplug superseded its premise.
    pub(crate) plug_generation: u64,
}

/// One physical port of the chassis.
pub struct Interface {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) switch_portid: Option<u8>,
    pub(crate) kind: IfaceKind,
    pub(crate) order: IfaceOrder,
    pub(crate) ejectable: bool,
    pub(crate) release_gpio: Option<Pin>,
    /// Dedicated wake line on second-generation module ports.
    pub(crate) wake_gpio: Option<Pin>,
    pub(crate) wake_polarity: Polarity,
    pub(crate) vsys: Arc<dyn Rail>,
    pub(crate) refclk: Arc<dyn Rail>,
    pub(crate) power_state: AtomicI8,
    pub(crate) refclk_state: AtomicI8,
    /// Mirror of the tracker's last reported hotplug state, kept so the
    /// status surface stays lock-free.
    pub(crate) hotplug_state: AtomicU8,
    /// Power-mode indication written by the link layer.
    pub(crate) power_mode: AtomicU32,
    pub(crate) state: Mutex<IfaceState>,
}

impl Interface {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn switch_portid(&self) -> Option<u8> {
        self.switch_portid
    }

    pub fn kind(&self) -> IfaceKind {
        self.kind
    }

    pub fn order(&self) -> IfaceOrder {
        self.order
    }

    pub fn ejectable(&self) -> bool {
        self.ejectable
    }

    /// True if the interface connects to a built-in peer on the board.
    pub fn is_builtin(&self) -> bool {
        self.kind == IfaceKind::Builtin
    }

    /// True if the interface connects to a hot-pluggable module port.
    pub fn is_module_port(&self) -> bool {
        matches!(self.kind, IfaceKind::ModulePort | IfaceKind::ModulePort2)
    }

    /// System-voltage rail status. Lock-free.
    pub fn power_state(&self) -> PowerState {
        PowerState::from_raw(self.power_state.load(Ordering::SeqCst))
    }

    /// Reference-clock rail status. Lock-free.
    pub fn refclk_state(&self) -> PowerState {
        PowerState::from_raw(self.refclk_state.load(Ordering::SeqCst))
    }

    /// Last reported hotplug state. Lock-free.
    pub fn hotplug_state(&self) -> HotplugState {
        HotplugState::from_raw(self.hotplug_state.load(Ordering::SeqCst))
    }

    /// Link-layer power mode indication. Lock-free.
    pub fn power_mode(&self) -> u32 {
        self.power_mode.load(Ordering::SeqCst)
    }

    /// Peer device id, if the link is established.
    pub fn device_id(&self) -> Option<u8> {
        self.state.lock().dev_id
    }

    /// Current link-retry supervisor state.
    pub fn link_state(&self) -> LinkState {
        self.state.lock().linkup.state
    }

    /// True while a link-up request is in flight.
    pub fn linkup_request_sent(&self) -> bool {
        self.state.lock().linkup.req_sent
    }

    /// Time of the last debounce check on the detect line.
    pub fn last_debounce_check(&self) -> Option<Instant> {
        self.state.lock().detect.last_check
    }

    pub(crate) fn set_power_state(&self, state: PowerState) {
        self.power_state.store(state.as_raw(), Ordering::SeqCst);
    }

    pub(crate) fn set_refclk_state(&self, state: PowerState) {
        self.refclk_state.store(state.as_raw(), Ordering::SeqCst);
    }

    pub(crate) fn set_hotplug_state(&self, state: HotplugState) {
        self.hotplug_state.store(state.as_raw(), Ordering::SeqCst);
    }
}
