//! Error types.

use std::net::IpAddr;
use std::time::Duration;
use trust_dns_server::proto::error::ProtoError;

/// Error enumerates the possible testacme error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a message with anything other than exactly one question is given to the
    /// [`RecordStore`][crate::record_store::RecordStore]. Only single-question messages can be
    /// keyed, so this always indicates caller misuse.
    #[error("message must carry exactly one question, found {questions}")]
    ContractViolation { questions: usize },

    /// Returned when zero ports are requested from the
    /// [`PortAllocator`][crate::ports::PortAllocator].
    #[error("invalid arg: 0 random ports")]
    InvalidPortCount,

    /// Returned when binding a discovery socket failed on every attempt allowed for a single port.
    #[error("cannot allocate port after {attempts} attempts")]
    PortAllocation {
        attempts: u8,
        #[source]
        source: std::io::Error,
    },

    /// Returned when the overall wall-clock budget for an allocation elapsed before every
    /// requested port was found. No ports are handed out in this case.
    #[error("port allocation deadline of {budget:?} exceeded before {requested} ports were found")]
    DeadlineExceeded { requested: usize, budget: Duration },

    /// Returned when the [`DnsConfig::bind_addr`][crate::config::DnsConfig::bind_addr] is a
    /// public address. The stub resolver answers every `A` query with a local address and is only
    /// meant to be reachable from the test host or a private network.
    #[error("DNS bind address ({0}) must be a loopback, private or unspecified IP")]
    InsecureDnsBind(IpAddr),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [loading a `Config`][crate::config::Config::try_from_file] fails due to
    /// invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}
