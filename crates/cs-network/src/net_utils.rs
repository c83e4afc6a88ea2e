use local_ip_address::list_afinet_netifas;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, warn};

const PREFERRED_INTERFACE_PREFIXES: &[&str] = &["eth", "en", "lan", "wi-fi", "ethernet"];

/// Pick the LAN IPv4 address a relay advertises.
///
/// Interfaces whose name looks like a physical adapter win, then any private
/// address on a non-tunnel interface, then loopback.
pub fn preferred_lan_ip() -> Ipv4Addr {
    let interfaces = match list_afinet_netifas() {
        Ok(ifaces) => ifaces,
        Err(e) => {
            warn!(error = %e, "failed to enumerate network interfaces");
            return Ipv4Addr::LOCALHOST;
        }
    };

    let candidates: Vec<(String, Ipv4Addr)> = interfaces
        .into_iter()
        .filter_map(|(name, ip)| match ip {
            IpAddr::V4(v4) if is_usable(&name, v4) => Some((name, v4)),
            _ => None,
        })
        .collect();

    select_address(&candidates)
}

fn select_address(candidates: &[(String, Ipv4Addr)]) -> Ipv4Addr {
    if let Some((name, ip)) = candidates
        .iter()
        .find(|(name, _)| is_preferred_interface(name))
    {
        debug!(ip = %ip, interface = %name, "using preferred interface address");
        return *ip;
    }

    if let Some((name, ip)) = candidates.iter().find(|(_, ip)| is_private_ipv4(*ip)) {
        debug!(ip = %ip, interface = %name, "using private interface address");
        return *ip;
    }

    warn!("no suitable LAN address found, advertising loopback");
    Ipv4Addr::LOCALHOST
}

fn is_usable(name: &str, ip: Ipv4Addr) -> bool {
    !ip.is_loopback() && !ip.is_link_local() && !is_tunnel_interface(name)
}

fn is_preferred_interface(name: &str) -> bool {
    let name = name.to_lowercase();
    PREFERRED_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn is_tunnel_interface(name: &str) -> bool {
    name.contains("utun") || name.contains("tun") || name.contains("tap")
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    match octets[0] {
        10 => true,
        172 => (16..=31).contains(&octets[1]),
        192 => octets[1] == 168,
        _ => false,
    }
}
