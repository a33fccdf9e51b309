use {std::collections::HashSet, std::fmt};

/// The unique key for a peer: an address string (IPv4/IPv6) and a TCP port.
/// Equality is structural on both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId {
  pub ip: String,
  pub port: u16,
}

impl PeerId {
  pub fn new(ip: impl Into<String>, port: u16) -> Self {
    Self { ip: ip.into(), port }
  }
}

impl fmt::Display for PeerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.ip, self.port)
  }
}

/// A peer's identity plus its declared topic interests. Topic membership is
/// monotonic within a run: topics accumulate and are never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescriptor {
  pub id: PeerId,
  pub subscribed_topics: HashSet<String>,
}

impl PeerDescriptor {
  pub fn new(id: PeerId) -> Self {
    Self { id, subscribed_topics: HashSet::new() }
  }
}
