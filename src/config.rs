use crate::error::Error;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub dns: DnsConfig,
    pub ports: PortsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DnsConfig {
    /// Where the stub resolver listens. Port `0` lets the OS pick an ephemeral port.
    pub bind_addr: SocketAddr,
    /// Address synthesized for `A` queries without an exact match.
    pub default_a: Ipv4Addr,
    /// TTL (seconds) of the synthesized `A` record.
    pub default_ttl: u32,
}

impl Default for DnsConfig {
    fn default() -> Self {
        DnsConfig {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            default_a: Ipv4Addr::LOCALHOST,
            default_ttl: 1800,
        }
    }
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PortsConfig {
    /// Address discovery sockets are bound to. When unset the loopback address is discovered,
    /// falling back to the wildcard address.
    pub bind_ip: Option<IpAddr>,
    /// Bind failures tolerated for each port. Recently vended ports don't count.
    pub max_attempts: u8,
    /// Time slice per requested port, scaled by the request size to bound the whole allocation.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "per_port_budget_ms")]
    pub per_port_budget: Duration,
    /// Number of recently vended ports tracked to avoid handing them out twice.
    pub cache_capacity: usize,
}

impl Default for PortsConfig {
    fn default() -> Self {
        PortsConfig {
            bind_ip: None,
            max_attempts: 3,
            per_port_budget: Duration::from_millis(100),
            cache_capacity: 64,
        }
    }
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    /// Load a [`Config`] from the JSON file at the given path, or return an Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the path can't be opened, [`Error::InvalidJSON`] if it doesn't
    /// hold a valid config and [`Error::InsecureDnsBind`] if the DNS bind address is public.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.dns.bind_addr_is_secure()?;
        Ok(conf)
    }
}

impl DnsConfig {
    pub(crate) fn bind_addr_is_secure(&self) -> Result<(), Error> {
        let ip = self.bind_addr.ip();
        if ip.is_loopback() || ip.is_unspecified() {
            return Ok(());
        }
        match ip {
            IpAddr::V4(v4) if v4.is_private() => Ok(()),
            IpAddr::V6(_) if IPV6_UNIQUE_LOCAL_NETWORK.contains(ip) => Ok(()),
            _ => Err(Error::InsecureDnsBind(ip)),
        }
    }
}
