//! Link bring-up contract towards the switch fabric.
//!
//! Only the request side lives here; confirmation that a link came up is
//! delivered back to the interface manager by the link layer calling its
//! confirmation entry point.

use thiserror::Error;

/// The link layer could not accept or deliver a bring-up request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkFault {
    /// The switch rejected the request for this port.
    #[error("switch port {0} rejected the link-up request")]
    Rejected(u8),

    /// The link layer is not reachable.
    #[error("link layer unavailable: {0}")]
    Unavailable(String),
}

/// Link bring-up entry point, keyed by switch port id.
pub trait LinkCtrl: Send + Sync {
    /// Asks the link layer to start bring-up on `switch_portid`.
    ///
    /// A successful return only means the request was accepted; completion is
    /// signalled asynchronously.
    fn request_linkup(&self, switch_portid: u8) -> Result<(), LinkFault>;
}
