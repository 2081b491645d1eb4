/// Host address detection for the kind API server
use std::net::{IpAddr, Ipv4Addr};

use tracing::{info, warn};

use crate::error::{Error, Result};

/// First non-loopback IPv4 address of this host, if any
///
/// Returns `Ok(None)` when no interface qualifies; the caller renders an empty
/// address in that case and lets kind fall back to its own default.
pub fn detect_host_ip() -> Result<Option<Ipv4Addr>> {
    let interfaces = if_addrs::get_if_addrs().map_err(Error::HostAddress)?;
    let selected = select_host_ip(interfaces.iter().map(|iface| iface.ip()));

    match selected {
        Some(ip) => info!("Current IP address: {}", ip),
        None => warn!("No non-loopback IPv4 address found, leaving API server address empty"),
    }

    Ok(selected)
}

/// Pick the first address that is IPv4 and not loopback
pub fn select_host_ip<I>(addrs: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs.into_iter().find_map(|addr| match addr {
        IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
        _ => None,
    })
}
