//! testacme
//!
//! Network plumbing for exercising an [RFC-8555][RFC-8555] ACME flow end-to-end in tests,
//! without real DNS or fixed ports.
//!
//! * [`dns`]: a stub DNS resolver that answers challenge names with stored replies or with the
//!   local host's address, so a certificate authority under test validates against the test
//!   process.
//! * [`ports`]: collision-free ephemeral ports for concurrently running test servers.
//! * [`rfc6761`]: helpers for names under the reserved `.test` TLD.
//!
//! ```no_run
//! # async fn run() -> Result<(), testacme::error::Error> {
//! use testacme::{shared_dns, shared_record_store};
//!
//! let dns = shared_dns();
//! let store = shared_record_store();
//! let (http_port, tls_port) = testacme::ports::random_port_pair().await?;
//! println!("resolver at {}/{}; challenge ports {http_port}, {tls_port}", dns.network(), dns.addr());
//! # let _ = store;
//! # Ok(())
//! # }
//! ```
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//!
#![warn(clippy::pedantic)]

pub mod config;
pub mod dns;
pub mod error;
pub mod ports;
pub mod record_store;
pub mod rfc6761;

pub use config::{Config, SharedConfig};
pub use dns::{shared_dns, shared_record_store, Dns};
pub use ports::{Port, PortAllocator};
pub use record_store::{DefaultA, RecordStore, SharedRecordStore};
