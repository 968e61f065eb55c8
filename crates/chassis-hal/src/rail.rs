//! Power and reference-clock rail contract.

use thiserror::Error;

/// State of a rail as reported by its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailStatus {
    /// Rail is enabled and in regulation.
    Up,
    /// Rail is disabled.
    Down,
    /// Driver reported a fault; the rail state is not trustworthy.
    Error,
}

/// The regulator failed to respond or reported a hardware problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RailFault {
    /// The regulator did not acknowledge the request.
    #[error("rail did not respond to the request")]
    NoResponse,

    /// The driver reported a concrete failure.
    #[error("rail driver error: {0}")]
    Driver(String),
}

/// A controllable power or clock source supplying a port.
///
/// Rail objects are owned by board configuration; the interface manager only
/// borrows them. Enable and disable are bounded operations: a driver that
/// cannot complete promptly must fail with [`RailFault`] rather than block.
pub trait Rail: Send + Sync {
    /// Rail name for diagnostics.
    fn name(&self) -> &str;

    /// Enables the rail.
    fn enable(&self) -> Result<(), RailFault>;

    /// Disables the rail.
    fn disable(&self) -> Result<(), RailFault>;

    /// Last known rail state.
    fn status(&self) -> RailStatus;
}
