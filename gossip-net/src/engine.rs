//! The publish path (fan-out to interested peers plus local delivery) and
//! the background gossip ticker (periodic random-peer reconciliation).

use {
  crate::{
    config::Config,
    error::Error,
    peer::PeerId,
    pool::ConnectionPool,
    subscriptions::Subscriptions,
    view::ViewHandle,
    wire::{self, IncomingView},
  },
  std::time::Duration,
  tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpStream, time::timeout},
  tracing::warn,
};

/// Dispatches `content` to every peer interested in `topic` on its own
/// task (so one stuck peer can't delay the others), then delivers to local
/// subscribers synchronously before returning.
///
/// Eviction on a failed send happens inside that per-peer task, so it is
/// not guaranteed to have happened by the time this call returns to its
/// caller -- only by the time the spawned task itself finishes. See
/// DESIGN.md's Open Question decisions for why this follows the original
/// fire-and-forget dispatch rather than joining every peer send first.
pub async fn publish(
  topic: &str,
  content: &str,
  self_id: &PeerId,
  view: &ViewHandle,
  subs: &Subscriptions,
  pool: &ConnectionPool,
  connect_timeout: Duration,
  send_timeout: Duration,
) {
  let targets = view.publish_targets(topic).await;
  for peer in targets {
    let pool = pool.clone();
    let view = view.clone();
    let sender = self_id.clone();
    let topic = topic.to_string();
    let content = content.to_string();
    tokio::spawn(async move {
      let frame = wire::render_publish_frame(&sender, &topic, &content);
      if let Err(err) = pool.send(&peer, &frame, connect_timeout, send_timeout).await {
        warn!(%peer, topic, %err, "publish send failed, evicting peer");
        view.remove_node(peer);
      }
    });
  }

  subs.deliver(topic, content);
}

/// Runs forever: every `gossip_interval`, picks one random peer (if the view
/// is non-empty) and reconciles with it.
pub async fn run_gossip_ticker(view: ViewHandle, config: Config) {
  let mut interval = tokio::time::interval(config.gossip_interval);
  loop {
    interval.tick().await;
    let Some(peer) = view.random_peer().await else { continue };
    if let Err(err) = reconcile_once(&peer, &view, &config).await {
      warn!(%peer, %err, "gossip reconciliation failed, evicting peer");
      view.remove_node(peer);
    }
  }
}

async fn reconcile_once(peer: &PeerId, view: &ViewHandle, config: &Config) -> Result<(), Error> {
  let local_view = view.snapshot().await;
  let request = wire::render_info_request(&local_view)?;

  let mut stream = timeout(config.connect_timeout, TcpStream::connect((peer.ip.as_str(), peer.port)))
    .await
    .map_err(|_| Error::Connect)??;

  timeout(config.send_timeout, stream.write_all(&request))
    .await
    .map_err(|_| Error::Send)??;

  let incoming: IncomingView =
    read_bounded_json(&mut stream, config.info_response_cap, config.send_timeout).await?;

  view.add_known_node(peer.clone(), incoming.this_node.subscribed_topics.clone());
  for node in incoming.known_nodes.into_vec() {
    view.add_known_node(node.id(), node.subscribed_topics);
  }
  for topic in incoming.this_node.subscribed_topics {
    view.add_self_topic(topic);
  }

  Ok(())
}

/// Reads from `stream` until the accumulated bytes parse as JSON, the
/// `cap` byte ceiling is hit, or `deadline` elapses — rather than assuming
/// a single `recv` always suffices for the whole response.
async fn read_bounded_json<T: serde::de::DeserializeOwned>(
  stream: &mut TcpStream,
  cap: usize,
  deadline: Duration,
) -> Result<T, Error> {
  let mut buf = Vec::with_capacity(cap.min(4096));
  let start = tokio::time::Instant::now();

  loop {
    if let Ok(parsed) = serde_json::from_slice::<T>(&buf) {
      return Ok(parsed);
    }
    if buf.len() >= cap {
      return Err(Error::Recv);
    }
    let remaining = deadline.saturating_sub(start.elapsed());
    if remaining.is_zero() {
      return Err(Error::Recv);
    }

    let mut chunk = vec![0u8; cap - buf.len()];
    let n = timeout(remaining, stream.read(&mut chunk)).await.map_err(|_| Error::Recv)??;
    if n == 0 {
      break; // EOF
    }
    buf.extend_from_slice(&chunk[..n]);
  }

  serde_json::from_slice::<T>(&buf).map_err(Error::from)
}

#[cfg(test)]
mod tests {
  use {
    super::*,
    crate::wire::OutgoingView,
    std::collections::{HashMap, HashSet},
    tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpListener},
  };

  #[tokio::test]
  async fn publish_delivers_locally_with_no_known_peers() {
    let self_id = PeerId::new("127.0.0.1", 5000);
    let view = crate::view::spawn(self_id.clone());
    let subs = Subscriptions::new();
    let pool = ConnectionPool::new();

    let (tx, rx) = std::sync::mpsc::channel();
    subs.subscribe(
      "T",
      std::sync::Arc::new(move |topic: &str, content: &str| {
        tx.send((topic.to_string(), content.to_string())).unwrap();
      }),
    );

    publish(
      "T",
      "hello",
      &self_id,
      &view,
      &subs,
      &pool,
      Duration::from_secs(1),
      Duration::from_secs(1),
    )
    .await;

    let (topic, content) = rx.recv().unwrap();
    assert_eq!(topic, "T");
    assert_eq!(content, "hello");
    assert_eq!(pool.contains(&PeerId::new("anyone", 1)).await, false);
  }

  #[tokio::test]
  async fn reconcile_merges_peer_and_transitive_nodes() {
    let self_id = PeerId::new("127.0.0.1", 0);
    let view = crate::view::spawn(self_id);

    let far_peer = PeerId::new("10.0.0.9", 9000);
    let queried = PeerId::new("127.0.0.1", 0);

    let responder_view = OutgoingView::build(
      &queried,
      &HashSet::from(["Q".to_string()]),
      &HashMap::from([(far_peer.clone(), HashSet::from(["F".to_string()]))]),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let (mut stream, _) = listener.accept().await.unwrap();
      let mut buf = vec![0u8; 4096];
      let _ = stream.read(&mut buf).await.unwrap();
      let body = wire::to_json_4space(&responder_view).unwrap();
      stream.write_all(body.as_bytes()).await.unwrap();
    });

    let config = Config {
      connect_timeout: Duration::from_secs(1),
      send_timeout: Duration::from_secs(1),
      ..Config::default()
    };
    let peer = PeerId::new(addr.ip().to_string(), addr.port());
    reconcile_once(&peer, &view, &config).await.unwrap();

    let snapshot = view.snapshot().await;
    let ids: Vec<_> = snapshot.known_nodes.iter().map(|n| n.id()).collect();
    assert!(ids.contains(&peer));
    assert!(ids.contains(&far_peer));
    assert!(snapshot.this_node.subscribed_topics.contains(&"Q".to_string()));
  }
}
