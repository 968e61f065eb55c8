//! In-memory hardware backends.
//!
//! Used by the test suites and by board-less daemon runs. Shipped in `src/`
//! rather than behind `cfg(test)` so downstream crates can drive them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::gpio::{GpioBank, Pin};
use crate::link::{LinkCtrl, LinkFault};
use crate::rail::{Rail, RailFault, RailStatus};

/// Rail backed by memory, with a programmable enable failure.
pub struct MockRail {
    name: String,
    status: Mutex<RailStatus>,
    fail_enable: AtomicBool,
    fail_disable: AtomicBool,
    enable_count: AtomicUsize,
    disable_count: AtomicUsize,
}

impl MockRail {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            status: Mutex::new(RailStatus::Down),
            fail_enable: AtomicBool::new(false),
            fail_disable: AtomicBool::new(false),
            enable_count: AtomicUsize::new(0),
            disable_count: AtomicUsize::new(0),
        })
    }

    /// Makes subsequent enable calls fail with [`RailFault::NoResponse`].
    pub fn set_fail_enable(&self, fail: bool) {
        self.fail_enable.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent disable calls report a fault.
    pub fn set_fail_disable(&self, fail: bool) {
        self.fail_disable.store(fail, Ordering::SeqCst);
    }

    /// Number of enable calls seen so far.
    pub fn enable_count(&self) -> usize {
        self.enable_count.load(Ordering::SeqCst)
    }

    /// Number of disable calls seen so far.
    pub fn disable_count(&self) -> usize {
        self.disable_count.load(Ordering::SeqCst)
    }
}

impl Rail for MockRail {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&self) -> Result<(), RailFault> {
        self.enable_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_enable.load(Ordering::SeqCst) {
            *self.status.lock() = RailStatus::Error;
            return Err(RailFault::NoResponse);
        }
        *self.status.lock() = RailStatus::Up;
        Ok(())
    }

    fn disable(&self) -> Result<(), RailFault> {
        self.disable_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_disable.load(Ordering::SeqCst) {
            *self.status.lock() = RailStatus::Error;
            return Err(RailFault::Driver("disable refused".to_string()));
        }
        *self.status.lock() = RailStatus::Down;
        Ok(())
    }

    fn status(&self) -> RailStatus {
        *self.status.lock()
    }
}

/// GPIO bank backed by a level map. Unset pins read low.
#[derive(Default)]
pub struct MockGpioBank {
    levels: Mutex<HashMap<Pin, bool>>,
    writes: Mutex<Vec<(Pin, bool)>>,
}

impl MockGpioBank {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the level an external device is driving on `pin`.
    pub fn set_level(&self, pin: Pin, level: bool) {
        self.levels.lock().insert(pin, level);
    }

    /// Current level of `pin`.
    pub fn level(&self, pin: Pin) -> bool {
        self.levels.lock().get(&pin).copied().unwrap_or(false)
    }

    /// All writes issued through the bank, oldest first.
    pub fn writes(&self) -> Vec<(Pin, bool)> {
        self.writes.lock().clone()
    }
}

impl GpioBank for MockGpioBank {
    fn read(&self, pin: Pin) -> bool {
        self.level(pin)
    }

    fn write(&self, pin: Pin, level: bool) {
        self.writes.lock().push((pin, level));
        self.levels.lock().insert(pin, level);
    }
}

/// Link layer double that records bring-up requests.
#[derive(Default)]
pub struct MockLinkCtrl {
    requests: Mutex<Vec<u8>>,
    fail: AtomicBool,
}

impl MockLinkCtrl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes subsequent requests fail with [`LinkFault::Unavailable`].
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Switch port ids of all requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<u8> {
        self.requests.lock().clone()
    }
}

impl LinkCtrl for MockLinkCtrl {
    fn request_linkup(&self, switch_portid: u8) -> Result<(), LinkFault> {
        self.requests.lock().push(switch_portid);
        if self.fail.load(Ordering::SeqCst) {
            return Err(LinkFault::Unavailable("mock failure".to_string()));
        }
        Ok(())
    }
}
