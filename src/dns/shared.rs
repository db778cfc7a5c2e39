use crate::config::DnsConfig;
use crate::dns::server::Dns;
use crate::record_store::{RecordStore, SharedRecordStore};
use lazy_static::lazy_static;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

lazy_static! {
    static ref SHARED_RECORD_STORE: SharedRecordStore = Arc::new(RecordStore::default());

    // The shared listener gets a runtime of its own so it keeps serving after the runtime of
    // whichever test touched it first is gone.
    static ref SHARED_RUNTIME: Runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("testacme-dns")
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("cannot start shared DNS runtime: {err}"));

    static ref SHARED_DNS: Dns = Dns::spawn_on(
        SHARED_RUNTIME.handle(),
        &DnsConfig::default(),
        shared_record_store(),
    )
    .unwrap_or_else(|err| panic!("cannot start shared DNS server: {err}"));
}

/// The process-wide [`RecordStore`] served by [`shared_dns`]. Tests may store and remove replies
/// on it concurrently.
#[must_use]
pub fn shared_record_store() -> SharedRecordStore {
    SHARED_RECORD_STORE.clone()
}

/// The process-wide stub resolver, started on first use with the default [`DnsConfig`] and
/// serving [`shared_record_store`]. It is never shut down.
///
/// # Panics
///
/// Panics on first use if the background runtime can't be built or the UDP socket can't be
/// bound.
#[must_use]
pub fn shared_dns() -> &'static Dns {
    &SHARED_DNS
}
