use crate::config::PortsConfig;
use crate::error::Error;
use crate::ports::gate::PortGate;
use crate::ports::Port;
use lazy_static::lazy_static;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tokio::time::{timeout, Instant};

static SHARED_GATE: OnceLock<Arc<PortGate>> = OnceLock::new();

lazy_static! {
    static ref SHARED_ALLOCATOR: PortAllocator = PortAllocator::new(&PortsConfig::default());
}

/// The process-wide [`PortGate`]. Sized by whichever caller initializes it first.
fn shared_gate(capacity: usize) -> Arc<PortGate> {
    SHARED_GATE
        .get_or_init(|| Arc::new(PortGate::new(capacity)))
        .clone()
}

/// Vends port numbers that are safe to assume free.
///
/// Ports are discovered by binding a throwaway UDP socket to port `0` and reading back what the
/// OS assigned. UDP and TCP port spaces aren't identical, so a vended port is a strong hint rather
/// than a guarantee that a TCP listener can bind it. Every vended port passes through a shared
/// [`PortGate`] so that concurrent callers in this process never receive the same recent port.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    gate: Arc<PortGate>,
    bind_ip: Arc<OnceCell<IpAddr>>,
    max_attempts: u8,
    per_port_budget: Duration,
}

impl PortAllocator {
    /// An allocator using the process-wide [`PortGate`], so it never vends a port another
    /// allocator in this process handed out recently.
    ///
    /// `config.cache_capacity` only takes effect if this is the first use of the process-wide
    /// gate.
    #[must_use]
    pub fn new(config: &PortsConfig) -> Self {
        Self::with_gate(config, shared_gate(config.cache_capacity))
    }

    /// An allocator using `gate` instead of the process-wide one.
    #[must_use]
    pub fn with_gate(config: &PortsConfig, gate: Arc<PortGate>) -> Self {
        PortAllocator {
            gate,
            bind_ip: Arc::new(OnceCell::new_with(config.bind_ip)),
            max_attempts: config.max_attempts.max(1),
            per_port_budget: config.per_port_budget,
        }
    }

    /// The process-wide allocator, using the default [`PortsConfig`].
    #[must_use]
    pub fn shared() -> &'static PortAllocator {
        &SHARED_ALLOCATOR
    }

    /// The gate this allocator reserves ports through.
    #[must_use]
    pub fn gate(&self) -> &PortGate {
        &self.gate
    }

    /// Allocate `n` distinct ports, in the order they were found.
    ///
    /// The whole call is bounded by `n` times the per-port budget. Either all `n` ports are
    /// returned or none are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPortCount`] when `n` is zero, [`Error::PortAllocation`] when
    /// binding a discovery socket keeps failing for one port and [`Error::DeadlineExceeded`] when
    /// the budget runs out.
    pub async fn allocate(&self, n: usize) -> Result<Vec<Port>, Error> {
        if n == 0 {
            return Err(Error::InvalidPortCount);
        }

        let budget = self
            .per_port_budget
            .saturating_mul(u32::try_from(n).unwrap_or(u32::MAX));
        let deadline = Deadline {
            at: Instant::now() + budget,
            requested: n,
            budget,
        };
        timeout(budget, self.allocate_before(deadline))
            .await
            .unwrap_or_else(|_| Err(deadline.exceeded()))
    }

    /// Allocate a single port.
    ///
    /// # Errors
    ///
    /// See [`PortAllocator::allocate`].
    pub async fn allocate_one(&self) -> Result<Port, Error> {
        let ports = self.allocate(1).await?;
        Ok(ports[0])
    }

    /// Allocate two distinct ports, e.g. for HTTP and TLS challenge verification.
    ///
    /// # Errors
    ///
    /// See [`PortAllocator::allocate`].
    pub async fn allocate_pair(&self) -> Result<(Port, Port), Error> {
        let ports = self.allocate(2).await?;
        Ok((ports[0], ports[1]))
    }

    async fn allocate_before(&self, deadline: Deadline) -> Result<Vec<Port>, Error> {
        let ip = self.bind_ip().await;
        let mut ports = Vec::with_capacity(deadline.requested);
        while ports.len() < deadline.requested {
            let port = self.next_port(ip, deadline, &ports).await?;
            ports.push(port);
        }
        Ok(ports)
    }

    async fn next_port(
        &self,
        ip: IpAddr,
        deadline: Deadline,
        taken: &[Port],
    ) -> Result<Port, Error> {
        let mut attempts = 0;
        loop {
            deadline.check()?;

            match free_port(ip).await {
                Ok(port) if !taken.contains(&port) && self.gate.reserve(port) => return Ok(port),
                Ok(port) => {
                    // Not counted as an attempt: already in this batch, or vended recently.
                    tracing::trace!("port {port} was vended recently, retrying");
                    tokio::task::yield_now().await;
                }
                Err(err) => {
                    attempts += 1;
                    tracing::debug!("bind attempt {attempts}/{} failed: {err}", self.max_attempts);
                    if attempts >= self.max_attempts {
                        return Err(Error::PortAllocation {
                            attempts,
                            source: err,
                        });
                    }
                }
            }
        }
    }

    async fn bind_ip(&self) -> IpAddr {
        *self.bind_ip.get_or_init(discover_loopback).await
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    requested: usize,
    budget: Duration,
}

impl Deadline {
    fn check(&self) -> Result<(), Error> {
        if Instant::now() >= self.at {
            return Err(self.exceeded());
        }
        Ok(())
    }

    fn exceeded(&self) -> Error {
        Error::DeadlineExceeded {
            requested: self.requested,
            budget: self.budget,
        }
    }
}

/// Prefer the host's IPv4 loopback address as resolved for `localhost`, falling back to the
/// wildcard address.
async fn discover_loopback() -> IpAddr {
    let found = match tokio::net::lookup_host(("localhost", 0)).await {
        Ok(mut addrs) => addrs
            .map(|addr| addr.ip())
            .find(|ip| ip.is_ipv4() && ip.is_loopback()),
        Err(err) => {
            tracing::debug!("cannot resolve localhost: {err}");
            None
        }
    };
    found.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Bind and immediately close a UDP socket, returning the port the OS assigned it.
async fn free_port(ip: IpAddr) -> io::Result<Port> {
    let socket = UdpSocket::bind(SocketAddr::new(ip, 0)).await?;
    let addr = socket.local_addr()?;
    drop(socket);
    Port::new(addr.port())
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "OS assigned port 0"))
}
