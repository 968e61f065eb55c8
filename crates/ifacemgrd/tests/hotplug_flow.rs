//! End-to-end hotplug scenarios against the public surface.
//!
//! Drives the full chain from raw detect samples through debounce, hotplug
//! tracking, power sequencing, link retry and ejection, on mock hardware
//! with the paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use chassis_hal::mock::{MockGpioBank, MockLinkCtrl, MockRail};
use chassis_hal::{GpioBank, LinkCtrl, Rail};
use chassis_ifacemgrd::{
    HotplugState, IfaceKind, IfaceOrder, InterfaceConfig, InterfaceRegistry, InterfaceSpec,
    LinkState, PowerState, Timings,
};

const DETECT_PIN: u32 = 10;
const RELEASE_PIN: u32 = 30;

struct Board {
    registry: InterfaceRegistry,
    gpio: Arc<MockGpioBank>,
    link: Arc<MockLinkCtrl>,
    vsys: Vec<Arc<MockRail>>,
}

fn slot_config(index: usize) -> InterfaceConfig {
    InterfaceConfig {
        name: format!("slot{index}"),
        kind: IfaceKind::ModulePort,
        switch_portid: Some(index as u8 + 1),
        detect_gpio: Some(DETECT_PIN + index as u32),
        detect_active_high: true,
        wake_gpio: None,
        wake_active_high: true,
        ejectable: true,
        release_gpio: Some(RELEASE_PIN + index as u32),
        order: IfaceOrder::Primary,
        vsys_rail: format!("vsys_slot{index}"),
        refclk_rail: format!("refclk_slot{index}"),
    }
}

fn board(slots: usize) -> Board {
    let gpio = MockGpioBank::new();
    let link = MockLinkCtrl::new();
    let mut vsys = Vec::new();
    let specs: Vec<InterfaceSpec> = (0..slots)
        .map(|index| {
            let v = MockRail::new(format!("vsys_slot{index}"));
            vsys.push(v.clone());
            let vsys_dyn: Arc<dyn Rail> = v;
            let refclk_dyn: Arc<dyn Rail> = MockRail::new(format!("refclk_slot{index}"));
            InterfaceSpec {
                config: slot_config(index),
                vsys: vsys_dyn,
                refclk: refclk_dyn,
            }
        })
        .collect();
    let gpio_dyn: Arc<dyn GpioBank> = gpio.clone();
    let link_dyn: Arc<dyn LinkCtrl> = link.clone();
    let registry =
        InterfaceRegistry::init(specs, gpio_dyn, link_dyn, Timings::default()).unwrap();
    Board {
        registry,
        gpio,
        link,
        vsys,
    }
}

impl Board {
    fn sample(&self, index: usize, level: bool) {
        self.gpio.set_level(DETECT_PIN + index as u32, level);
        self.registry.on_detect_signal(index);
    }

    async fn plug(&self, index: usize) {
        self.sample(index, true);
        tokio::time::sleep(Duration::from_millis(320)).await;
    }

    async fn unplug(&self, index: usize) {
        self.sample(index, false);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Scenario A: bounce on insertion, then no link-up confirmation. The
/// interface must settle, power on, exhaust three attempts, power off and
/// fire the release actuator.
#[tokio::test(start_paused = true)]
async fn scenario_a_bounce_retry_exhaustion_ejects() {
    let b = board(1);
    b.registry.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let iface = b.registry.get(0).unwrap();
    assert_eq!(iface.hotplug_state(), HotplugState::Unplugged);
    assert_eq!(b.vsys[0].enable_count(), 0);

    // t=0: goes active; t=10ms: bounces low; t=15ms: active again and stays
    b.sample(0, true);
    tokio::time::sleep(Duration::from_millis(10)).await;
    b.sample(0, false);
    tokio::time::sleep(Duration::from_millis(5)).await;
    b.sample(0, true);

    // the settle window restarted at the last reversal: not plugged at 305ms
    tokio::time::sleep(Duration::from_millis(290)).await;
    assert_eq!(iface.hotplug_state(), HotplugState::Unplugged);

    // plugged at ~315ms: power applied, first link-up request out
    tokio::time::sleep(Duration::from_millis(25)).await;
    assert_eq!(iface.hotplug_state(), HotplugState::Plugged);
    assert_eq!(iface.power_state(), PowerState::Up);
    assert_eq!(iface.refclk_state(), PowerState::Up);
    assert_eq!(b.link.requests(), vec![1]);
    assert_eq!(iface.link_state(), LinkState::RequestSent);

    // two watchdog timeouts resend, the third exhausts
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(b.link.requests(), vec![1, 1]);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(b.link.requests(), vec![1, 1, 1]);
    tokio::time::sleep(Duration::from_millis(1_050)).await;

    assert_eq!(iface.link_state(), LinkState::Exhausted);
    assert_eq!(iface.power_state(), PowerState::Down);
    assert_eq!(b.gpio.writes(), vec![(RELEASE_PIN, true)]);

    // release pulse completes after its fixed width
    tokio::time::sleep(Duration::from_millis(1_550)).await;
    assert_eq!(
        b.gpio.writes(),
        vec![(RELEASE_PIN, true), (RELEASE_PIN, false)]
    );
}

/// Scenario B: confirmation arrives 50 ms after the first request. The
/// counter resets, the device id is assigned and becomes visible on the
/// registry query surface.
#[tokio::test(start_paused = true)]
async fn scenario_b_confirmed_link_assigns_device_id() {
    let b = board(1);
    b.registry.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    b.plug(0).await;
    assert_eq!(b.link.requests(), vec![1]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    b.registry.on_linkup_confirmed(0, 0x2a).unwrap();

    let iface = b.registry.get(0).unwrap();
    assert_eq!(iface.link_state(), LinkState::LinkUp);
    assert_eq!(b.registry.devid_by_index(0), Some(0x2a));
    assert_eq!(b.registry.get_by_devid(0x2a).unwrap().name(), "slot0");

    // the watchdog was cancelled: no resends
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(b.link.requests(), vec![1]);
}

/// Scenario C: established link, then the detect signal drops for good. One
/// unplug transition, retry state cleared, power off, device id gone.
#[tokio::test(start_paused = true)]
async fn scenario_c_unplug_clears_link_and_device_id() {
    let b = board(1);
    b.registry.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    b.plug(0).await;
    b.registry.on_linkup_confirmed(0, 0x2a).unwrap();
    assert!(b.registry.get_by_devid(0x2a).is_some());

    b.unplug(0).await;
    let iface = b.registry.get(0).unwrap();
    assert_eq!(iface.hotplug_state(), HotplugState::Unplugged);
    assert_eq!(iface.link_state(), LinkState::Idle);
    assert_eq!(iface.power_state(), PowerState::Down);
    assert!(b.registry.get_by_devid(0x2a).is_none());
    assert_eq!(b.registry.devid_by_index(0), None);

    // a re-plug without a fresh confirmation must not resurrect the id
    b.plug(0).await;
    assert!(b.registry.get_by_devid(0x2a).is_none());
    assert_eq!(b.registry.devid_by_index(0), None);
}

/// Unplug while attempt 2 is in flight: the supervisor resets without an
/// exhaustion penalty and a re-plug starts over from attempt 1.
#[tokio::test(start_paused = true)]
async fn unplug_mid_retry_resets_attempt_counter() {
    let b = board(1);
    b.registry.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    b.plug(0).await;
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(b.link.requests().len(), 2);

    b.unplug(0).await;
    let iface = b.registry.get(0).unwrap();
    assert_eq!(iface.link_state(), LinkState::Idle);

    b.plug(0).await;
    assert_eq!(b.link.requests().len(), 3);

    // two more timeouts still available before exhaustion
    tokio::time::sleep(Duration::from_millis(2_050)).await;
    assert_eq!(b.link.requests().len(), 5);
    assert_eq!(iface.link_state(), LinkState::RequestSent);
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(iface.link_state(), LinkState::Exhausted);
}

/// One plug and one unplug produce exactly one transition each, however many
/// samples and re-checks happen in between.
#[tokio::test(start_paused = true)]
async fn exactly_one_transition_per_physical_event() {
    let b = board(1);
    b.registry.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    b.plug(0).await;
    for _ in 0..5 {
        b.registry.on_detect_signal(0);
        tokio::time::sleep(Duration::from_millis(350)).await;
    }
    assert_eq!(b.vsys[0].enable_count(), 1);

    b.unplug(0).await;
    for _ in 0..5 {
        b.registry.on_detect_signal(0);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(b.vsys[0].enable_count(), 1);
    assert_eq!(b.vsys[0].disable_count(), 2); // initial determination + unplug
}

/// Two slots stay independent: plugging one never touches the other's
/// rails or link state.
#[tokio::test(start_paused = true)]
async fn slots_are_independent() {
    let b = board(2);
    b.registry.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    b.plug(0).await;
    assert_eq!(b.vsys[0].enable_count(), 1);
    assert_eq!(b.vsys[1].enable_count(), 0);
    assert_eq!(b.link.requests(), vec![1]);

    let other = b.registry.get(1).unwrap();
    assert_eq!(other.hotplug_state(), HotplugState::Unplugged);
    assert_eq!(other.link_state(), LinkState::Idle);
}

/// Teardown cancels every outstanding timer: no watchdog fires after
/// shutdown.
#[tokio::test(start_paused = true)]
async fn shutdown_cancels_outstanding_work() {
    let b = board(1);
    b.registry.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    b.plug(0).await;
    assert_eq!(b.link.requests(), vec![1]);

    b.registry.shutdown();
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(b.link.requests(), vec![1]);
}
