//! Shared test fixtures: a small board wired to mock hardware.

use std::sync::Arc;
use std::time::Duration;

use chassis_hal::mock::{MockGpioBank, MockLinkCtrl, MockRail};
use chassis_hal::{GpioBank, LinkCtrl, Rail};

use crate::config::{InterfaceConfig, InterfaceSpec, Timings};
use crate::error::IfaceMgrResult;
use crate::registry::InterfaceRegistry;
use crate::types::{IfaceKind, IfaceOrder, ACTIVATION_DEBOUNCE_MS, INACTIVATION_DEBOUNCE_MS};

pub(crate) const DETECT_PIN_BASE: u32 = 10;
pub(crate) const RELEASE_PIN_BASE: u32 = 30;
pub(crate) const WAKE_PIN_BASE: u32 = 50;

pub(crate) struct TestBoard {
    pub(crate) registry: InterfaceRegistry,
    pub(crate) gpio: Arc<MockGpioBank>,
    pub(crate) link: Arc<MockLinkCtrl>,
    pub(crate) vsys: Vec<Arc<MockRail>>,
    pub(crate) refclk: Vec<Arc<MockRail>>,
}

pub(crate) fn iface_config(index: usize, kind: IfaceKind) -> InterfaceConfig {
    InterfaceConfig {
        name: format!("slot{index}"),
        kind,
        switch_portid: Some(index as u8 + 1),
        detect_gpio: Some(DETECT_PIN_BASE + index as u32),
        detect_active_high: true,
        wake_gpio: (kind == IfaceKind::ModulePort2).then(|| WAKE_PIN_BASE + index as u32),
        wake_active_high: true,
        ejectable: true,
        release_gpio: Some(RELEASE_PIN_BASE + index as u32),
        order: IfaceOrder::Primary,
        vsys_rail: format!("vsys_slot{index}"),
        refclk_rail: format!("refclk_slot{index}"),
    }
}

pub(crate) fn builtin_config(name: &str, portid: u8) -> InterfaceConfig {
    InterfaceConfig {
        name: name.to_string(),
        kind: IfaceKind::Builtin,
        switch_portid: Some(portid),
        detect_gpio: None,
        detect_active_high: true,
        wake_gpio: None,
        wake_active_high: true,
        ejectable: false,
        release_gpio: None,
        order: IfaceOrder::Unknown,
        vsys_rail: format!("vsys_{name}"),
        refclk_rail: format!("refclk_{name}"),
    }
}

impl TestBoard {
    pub(crate) fn module_ports(count: usize) -> Self {
        Self::build(
            (0..count)
                .map(|i| iface_config(i, IfaceKind::ModulePort))
                .collect(),
        )
    }

    pub(crate) fn module_ports2(count: usize) -> Self {
        Self::build(
            (0..count)
                .map(|i| iface_config(i, IfaceKind::ModulePort2))
                .collect(),
        )
    }

    /// One built-in interface at index 0 plus one module port at index 1.
    pub(crate) fn with_builtin() -> Self {
        Self::build(vec![
            builtin_config("builtin0", 0),
            iface_config(1, IfaceKind::ModulePort),
        ])
    }

    pub(crate) fn build(configs: Vec<InterfaceConfig>) -> Self {
        Self::try_build(configs).expect("test board must be valid")
    }

    pub(crate) fn try_build(configs: Vec<InterfaceConfig>) -> IfaceMgrResult<Self> {
        let gpio = MockGpioBank::new();
        let link = MockLinkCtrl::new();
        let mut vsys = Vec::new();
        let mut refclk = Vec::new();
        let specs: Vec<InterfaceSpec> = configs
            .into_iter()
            .map(|config| {
                let v = MockRail::new(config.vsys_rail.clone());
                let r = MockRail::new(config.refclk_rail.clone());
                vsys.push(v.clone());
                refclk.push(r.clone());
                let vsys_dyn: Arc<dyn Rail> = v;
                let refclk_dyn: Arc<dyn Rail> = r;
                InterfaceSpec {
                    config,
                    vsys: vsys_dyn,
                    refclk: refclk_dyn,
                }
            })
            .collect();
        let gpio_dyn: Arc<dyn GpioBank> = gpio.clone();
        let link_dyn: Arc<dyn LinkCtrl> = link.clone();
        let registry = InterfaceRegistry::init(specs, gpio_dyn, link_dyn, Timings::default())?;
        Ok(Self {
            registry,
            gpio,
            link,
            vsys,
            refclk,
        })
    }

    pub(crate) fn try_duplicate_names() -> IfaceMgrResult<Self> {
        let mut a = iface_config(0, IfaceKind::ModulePort);
        let mut b = iface_config(1, IfaceKind::ModulePort);
        a.name = "dup".to_string();
        b.name = "dup".to_string();
        Self::try_build(vec![a, b])
    }

    /// Drives the raw detect level to its logical-active value.
    pub(crate) fn plug_raw(&self, index: usize) {
        self.gpio.set_level(DETECT_PIN_BASE + index as u32, true);
    }

    /// Drives the raw detect level to its logical-inactive value.
    pub(crate) fn unplug_raw(&self, index: usize) {
        self.gpio.set_level(DETECT_PIN_BASE + index as u32, false);
    }

    /// Full plug: raw level, sample, and the activation settle window.
    pub(crate) async fn plug(&self, index: usize) {
        self.plug_raw(index);
        self.registry.on_detect_signal(index);
        tokio::time::sleep(Duration::from_millis(ACTIVATION_DEBOUNCE_MS + 20)).await;
    }

    /// Full unplug: raw level, sample, and the inactivation settle window.
    pub(crate) async fn unplug(&self, index: usize) {
        self.unplug_raw(index);
        self.registry.on_detect_signal(index);
        tokio::time::sleep(Duration::from_millis(INACTIVATION_DEBOUNCE_MS + 20)).await;
    }
}
