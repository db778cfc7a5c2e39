//! Ephemeral port allocation.
//!
//! Tests that stand up servers concurrently need port numbers that are free now and won't be
//! handed to anybody else in the same process a moment later. [`PortAllocator`] asks the OS for
//! free ports and filters them through a small [`PortGate`] of recently vended ports.
//!
//! ```no_run
//! # async fn run() -> Result<(), testacme::error::Error> {
//! let (http, tls) = testacme::ports::random_port_pair().await?;
//! assert_ne!(http, tls);
//! # Ok(())
//! # }
//! ```

mod bind;
mod gate;

use crate::error::Error;
use std::fmt;
use std::num::NonZeroU16;

pub use bind::PortAllocator;
pub use gate::PortGate;

/// A transport-layer port number. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(NonZeroU16);

impl Port {
    /// `None` for port `0`, which means "unassigned".
    #[must_use]
    pub fn new(port: u16) -> Option<Self> {
        NonZeroU16::new(port).map(Port)
    }

    /// The port number.
    #[must_use]
    pub fn get(self) -> u16 {
        self.0.get()
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.get()
    }
}

impl From<Port> for u32 {
    fn from(port: Port) -> Self {
        u32::from(port.get())
    }
}

impl From<Port> for usize {
    fn from(port: Port) -> Self {
        usize::from(port.get())
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Allocate `n` ports from the [shared allocator][PortAllocator::shared].
///
/// # Errors
///
/// See [`PortAllocator::allocate`].
pub async fn random_ports(n: usize) -> Result<Vec<Port>, Error> {
    PortAllocator::shared().allocate(n).await
}

/// Allocate one port from the [shared allocator][PortAllocator::shared].
///
/// # Errors
///
/// See [`PortAllocator::allocate`].
pub async fn random_port() -> Result<Port, Error> {
    PortAllocator::shared().allocate_one().await
}

/// Allocate two distinct ports from the [shared allocator][PortAllocator::shared].
///
/// # Errors
///
/// See [`PortAllocator::allocate`].
pub async fn random_port_pair() -> Result<(Port, Port), Error> {
    PortAllocator::shared().allocate_pair().await
}
