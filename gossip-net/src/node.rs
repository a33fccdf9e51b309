//! The public facade wiring the wire codec, membership view, local
//! subscriptions, server loop and gossip/publish engine into the four
//! operations an embedder needs.

use {
  crate::{
    config::Config,
    engine,
    error::Error,
    peer::PeerId,
    pool::ConnectionPool,
    server,
    subscriptions::{Callback, Subscriptions},
    view::{self, ViewHandle},
    wire::OutgoingView,
  },
  std::sync::Arc,
};

/// A running gossip node: owns a listener, a gossip ticker, a membership
/// view, local subscriptions, and an outbound connection pool.
#[derive(Clone)]
pub struct Node {
  self_id: PeerId,
  view: ViewHandle,
  subs: Subscriptions,
  pool: ConnectionPool,
  config: Config,
}

impl Node {
  /// Resolves `config.bind_host` (expanding the `auto` sentinel), binds
  /// the listener, and spawns the accept loop and gossip ticker as
  /// background tasks.
  pub async fn bind(config: Config) -> Result<Self, Error> {
    let host = config.resolve_bind_host();
    let self_id = PeerId::new(host.clone(), config.port);

    // bind synchronously (retrying on contention) so a caller's await
    // on `bind` only returns once the listener is actually held.
    let listener = server::bind_with_retry(&host, config.port).await;

    let view = view::spawn(self_id.clone());
    let subs = Subscriptions::new();
    let pool = ConnectionPool::new();

    let node = Self {
      self_id: self_id.clone(),
      view: view.clone(),
      subs: subs.clone(),
      pool: pool.clone(),
      config: config.clone(),
    };

    let server_view = view.clone();
    let server_subs = subs.clone();
    tokio::spawn(async move {
      server::run(listener, server_view, server_subs).await;
    });

    let gossip_view = view;
    let gossip_config = config;
    tokio::spawn(async move {
      engine::run_gossip_ticker(gossip_view, gossip_config).await;
    });

    Ok(node)
  }

  pub fn self_id(&self) -> &PeerId {
    &self.self_id
  }

  /// Seeds a statically configured neighbor with no declared topics; its
  /// real interests arrive on the next gossip round.
  pub fn add_known_node(&self, ip: impl Into<String>, port: u16) {
    self.view.add_known_node(PeerId::new(ip, port), Vec::new());
  }

  /// Registers `callback` for `topic`. If this is the first local
  /// subscription to `topic`, it is also added to the self-descriptor so
  /// remote peers learn of the interest on the next gossip round.
  pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F)
  where
    F: Fn(&str, &str) + Send + Sync + 'static,
  {
    let topic = topic.into();
    let callback: Callback = Arc::new(callback);
    if self.subs.subscribe(&topic, callback) {
      self.view.add_self_topic(topic);
    }
  }

  /// Dispatches `content` to every peer interested in `topic` and
  /// delivers it to local subscribers. Returns once local delivery is
  /// complete; remote fan-out continues in the background.
  pub async fn publish(&self, topic: impl Into<String>, content: impl Into<String>) {
    let topic = topic.into();
    let content = content.into();
    engine::publish(
      &topic,
      &content,
      &self.self_id,
      &self.view,
      &self.subs,
      &self.pool,
      self.config.connect_timeout,
      self.config.send_timeout,
    )
    .await;
  }

  /// A snapshot of the current membership view, self included.
  pub async fn get_info(&self) -> OutgoingView {
    self.view.snapshot().await
  }

  /// Closes every pooled outbound connection. Ambient housekeeping for
  /// tests and graceful process exit; the protocol itself has no
  /// departure announcement.
  pub async fn shutdown(&self) {
    self.pool.shutdown().await;
  }
}

#[cfg(test)]
mod tests {
  use {
    super::*,
    std::{
      sync::atomic::{AtomicBool, Ordering},
      time::Duration,
    },
  };

  #[tokio::test]
  async fn loopback_publish_invokes_local_callback_only() {
    let node = Node::bind(Config::new("127.0.0.1", 0)).await.unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    node.subscribe("T", move |topic: &str, content: &str| {
      tx.send((topic.to_string(), content.to_string())).unwrap();
    });

    node.publish("T", "hello").await;

    let (topic, content) = rx.recv().unwrap();
    assert_eq!(topic, "T");
    assert_eq!(content, "hello");
    assert_eq!(node.get_info().await.known_nodes.len(), 0);
  }

  #[tokio::test]
  async fn two_nodes_gossip_and_deliver() {
    // explicit ports so A and B can address each other, matching
    // spec scenario 2 (two-node delivery).
    let a = Node::bind(Config::new("127.0.0.1", 15000)).await.unwrap();
    let b = Node::bind(Config::new("127.0.0.1", 15001)).await.unwrap();

    let received = Arc::new(AtomicBool::new(false));
    let received_clone = received.clone();
    b.subscribe("T", move |_, _| {
      received_clone.store(true, Ordering::SeqCst);
    });

    b.add_known_node("127.0.0.1", 15000);

    // allow at least one gossip round (interval defaults to 1s) to
    // propagate B's interest in "T" to A.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    a.publish("T", "hello").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(received.load(Ordering::SeqCst));
  }
}
