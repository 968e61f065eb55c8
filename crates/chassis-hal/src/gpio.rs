//! GPIO bank contract.
//!
//! The interface manager applies signal polarity itself; this contract deals
//! in raw electrical levels only. Edge notifications are delivered out of
//! band as an opaque "check now" trigger, so the bank only needs reads and
//! writes.

/// Pin identifier within the bank.
pub type Pin = u32;

/// Raw digital pin access.
pub trait GpioBank: Send + Sync {
    /// Reads the current level of `pin`.
    fn read(&self, pin: Pin) -> bool;

    /// Drives `pin` to `level`.
    fn write(&self, pin: Pin, level: bool);
}
