use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use cs_core::ports::DiscoveryError;
use cs_core::settings::model::DiscoverySettings;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Multicast destination for discovery datagrams.
pub fn group_addr(settings: &DiscoverySettings) -> Result<SocketAddr, DiscoveryError> {
    let group = parse_group(&settings.multicast_group)?;
    Ok(SocketAddr::V4(SocketAddrV4::new(group, settings.port)))
}

/// Bind a reusable UDP socket on the discovery port and join the group.
///
/// Address reuse lets a relay and a client share the port on one host.
pub fn bind_multicast(settings: &DiscoverySettings) -> Result<UdpSocket, DiscoveryError> {
    let group = parse_group(&settings.multicast_group)?;

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(socket_err)?;
    socket.set_reuse_address(true).map_err(socket_err)?;
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    socket.set_reuse_port(true).map_err(socket_err)?;
    socket.set_nonblocking(true).map_err(socket_err)?;

    let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, settings.port));
    socket.bind(&bind_addr.into()).map_err(socket_err)?;
    socket
        .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
        .map_err(socket_err)?;
    socket.set_multicast_loop_v4(true).map_err(socket_err)?;

    UdpSocket::from_std(socket.into()).map_err(socket_err)
}

fn parse_group(group: &str) -> Result<Ipv4Addr, DiscoveryError> {
    let addr: Ipv4Addr = group
        .parse()
        .map_err(|e| DiscoveryError::Socket(format!("invalid multicast group {}: {}", group, e)))?;
    if !addr.is_multicast() {
        return Err(DiscoveryError::Socket(format!(
            "{} is not a multicast address",
            group
        )));
    }
    Ok(addr)
}

fn socket_err(e: std::io::Error) -> DiscoveryError {
    DiscoveryError::Socket(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_addr_uses_configured_port() {
        let settings = DiscoverySettings::default();
        let addr = group_addr(&settings).expect("group addr");
        assert_eq!(addr.to_string(), "224.0.0.251:8081");
    }

    #[test]
    fn non_multicast_group_is_rejected() {
        let settings = DiscoverySettings {
            multicast_group: "192.168.1.1".to_string(),
            ..DiscoverySettings::default()
        };
        assert!(matches!(
            group_addr(&settings),
            Err(DiscoveryError::Socket(_))
        ));
    }

    #[test]
    fn unparsable_group_is_rejected() {
        let settings = DiscoverySettings {
            multicast_group: "not-an-ip".to_string(),
            ..DiscoverySettings::default()
        };
        assert!(bind_multicast(&settings).is_err());
    }
}
