use {std::net::UdpSocket, std::time::Duration};

/// The `auto` bind host sentinel: resolve the local address used to reach a
/// public IP. No packet actually leaves the host — connecting a UDP socket
/// only forces a routing-table lookup.
const AUTO_HOST: &str = "auto";
const AUTO_PROBE_TARGET: &str = "8.8.8.8:80";

#[derive(Debug, Clone)]
pub struct Config {
  pub bind_host: String,
  pub port: u16,
  pub gossip_interval: Duration,
  pub connect_timeout: Duration,
  pub send_timeout: Duration,
  /// Wire compatibility cap on the info response: implementations must
  /// keep the response under this many bytes (default matches the
  /// original protocol's 1024-byte single-chunk read).
  pub info_response_cap: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      bind_host: "127.0.0.1".to_string(),
      port: 5000,
      gossip_interval: Duration::from_secs(1),
      connect_timeout: Duration::from_secs(5),
      send_timeout: Duration::from_secs(5),
      info_response_cap: 1024,
    }
  }
}

impl Config {
  pub fn new(bind_host: impl Into<String>, port: u16) -> Self {
    Self { bind_host: bind_host.into(), port, ..Default::default() }
  }

  /// Resolves `bind_host`, expanding the `auto` sentinel to a concrete
  /// address. Falls back to loopback if no route to a public IP exists.
  pub fn resolve_bind_host(&self) -> String {
    if self.bind_host != AUTO_HOST {
      return self.bind_host.clone();
    }
    local_ip_via_udp_connect().unwrap_or_else(|| "127.0.0.1".to_string())
  }
}

fn local_ip_via_udp_connect() -> Option<String> {
  let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
  socket.connect(AUTO_PROBE_TARGET).ok()?;
  socket.local_addr().ok().map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn literal_host_passes_through() {
    let config = Config::new("10.0.0.5", 6000);
    assert_eq!(config.resolve_bind_host(), "10.0.0.5");
  }

  #[test]
  fn auto_resolves_to_something_nonempty() {
    let config = Config::new(AUTO_HOST, 6000);
    assert!(!config.resolve_bind_host().is_empty());
  }
}
