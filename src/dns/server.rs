use crate::config::DnsConfig;
use crate::dns::handlers::{Handler, NotImplemented, UnhandledQuery};
use crate::error::Error;
use crate::record_store::SharedRecordStore;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use trust_dns_server::proto::error::ProtoError;
use trust_dns_server::ServerFuture;

/// A running stub resolver listening on UDP.
///
/// The serve loop runs as a background task. It is cancelled by [`Dns::shutdown`] or by
/// dropping the `Dns`; in-flight queries are abandoned.
#[derive(Debug)]
pub struct Dns {
    addr: SocketAddr,
    task: JoinHandle<Result<(), ProtoError>>,
}

impl Dns {
    /// Bind `config.bind_addr` and serve `store` on the current runtime, delegating unsupported
    /// queries to [`NotImplemented`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsecureDnsBind`] for a public bind address and [`Error::IO`] if the
    /// socket can't be bound.
    pub async fn new(config: &DnsConfig, store: SharedRecordStore) -> Result<Self, Error> {
        Self::with_fallback(config, store, NotImplemented).await
    }

    /// Like [`Dns::new`], delegating unsupported queries to `unhandled`.
    ///
    /// # Errors
    ///
    /// See [`Dns::new`].
    pub async fn with_fallback<U: UnhandledQuery>(
        config: &DnsConfig,
        store: SharedRecordStore,
        unhandled: U,
    ) -> Result<Self, Error> {
        config.bind_addr_is_secure()?;
        let socket = UdpSocket::bind(config.bind_addr).await?;
        Self::serve(socket, Handler::new(store, unhandled))
    }

    /// Bind and serve on the runtime behind `handle`, from synchronous code. Used for listeners
    /// that must outlive the caller's runtime.
    ///
    /// # Errors
    ///
    /// See [`Dns::new`].
    pub fn spawn_on(
        handle: &Handle,
        config: &DnsConfig,
        store: SharedRecordStore,
    ) -> Result<Self, Error> {
        config.bind_addr_is_secure()?;
        let _guard = handle.enter();
        let socket = std::net::UdpSocket::bind(config.bind_addr)?;
        socket.set_nonblocking(true)?;
        Self::serve(UdpSocket::from_std(socket)?, Handler::new(store, NotImplemented))
    }

    fn serve<U: UnhandledQuery>(socket: UdpSocket, handler: Handler<U>) -> Result<Self, Error> {
        let addr = socket.local_addr()?;
        let mut server = ServerFuture::new(handler);
        server.register_socket(socket);
        let task = tokio::spawn(server.block_until_done());
        tracing::debug!("DNS listening on UDP {addr}");
        Ok(Dns { addr, task })
    }

    /// The address the resolver is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The transport the resolver is listening on, always `"udp"`.
    #[must_use]
    pub fn network(&self) -> &'static str {
        "udp"
    }

    /// Stop serving. Queries already received are dropped without a reply.
    pub fn shutdown(self) {
        tracing::debug!("DNS on UDP {} shutting down", self.addr);
    }
}

impl Drop for Dns {
    fn drop(&mut self) {
        self.task.abort();
    }
}
