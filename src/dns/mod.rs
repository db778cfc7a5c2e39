//! Stub DNS resolver for ACME challenge verification.
//!
//! The resolver answers just enough of DNS for a certificate authority under test to resolve
//! challenge names to the local host, without touching real DNS infrastructure. Each query must
//! carry a single question and is answered by the first rule that applies:
//!
//! 1. **Exact match.** A reply stored in the [`RecordStore`][crate::record_store::RecordStore]
//!    for the same name and type is served with its answers unchanged, under the query's
//!    transaction id.
//! 2. **Default `A`.** Any other `A` query is answered with the
//!    [`DefaultA`][crate::record_store::DefaultA] template (`127.0.0.1`, TTL 1800 by default),
//!    renamed to the queried name.
//! 3. **`AAAA`.** Answered with `NXDOMAIN`. IPv6 addresses are never synthesized.
//! 4. **Anything else** is handed to an [`UnhandledQuery`] delegate, by default
//!    [`NotImplemented`], which replies `NOTIMP`.
//!
//! E.g. with nothing stored:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 41953 +short anything.test A
//! 127.0.0.1
//! ❯ dig @127.0.0.1 -p 41953 anything.test AAAA | grep status
//! ;; ->>HEADER<<- opcode: QUERY, status: NXDOMAIN, id: 2020
//! ```
//!
//! Listeners bind an ephemeral port unless configured otherwise; use [`Dns::addr`] to find it.

mod handlers;
pub mod server;
mod shared;

pub use handlers::{Decision, Handler, NotImplemented, UnhandledQuery};
pub use server::Dns;
pub use shared::{shared_dns, shared_record_store};
