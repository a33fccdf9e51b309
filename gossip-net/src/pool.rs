//! Outbound connection reuse for the publish path.
//!
//! The pool's own mutex guards only the lookup/insert into the peer map; the
//! per-connection mutex it hands back guards the actual write, which is what
//! gives same-peer sends on a reused connection their ordering guarantee
//! without holding the pool-wide lock across network I/O.

use {
  crate::{error::Error, peer::PeerId},
  std::{collections::HashMap, sync::Arc, time::Duration},
  tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::Mutex,
    time::timeout,
  },
};

type Conn = Arc<Mutex<TcpStream>>;

#[derive(Clone, Default)]
pub struct ConnectionPool {
  inner: Arc<Mutex<HashMap<PeerId, Conn>>>,
}

impl ConnectionPool {
  pub fn new() -> Self {
    Self::default()
  }

  /// Looks up (or lazily connects) the peer's outbound connection and
  /// writes `frame` to it. On any I/O error the entry is evicted.
  pub async fn send(
    &self,
    peer: &PeerId,
    frame: &[u8],
    connect_timeout: Duration,
    send_timeout: Duration,
  ) -> Result<(), Error> {
    let conn = self.get_or_connect(peer, connect_timeout).await?;

    let mut stream = conn.lock().await;
    let result = timeout(send_timeout, stream.write_all(frame)).await;
    drop(stream);

    match result {
      Ok(Ok(())) => Ok(()),
      Ok(Err(err)) => {
        self.evict(peer).await;
        Err(Error::Io(err))
      }
      Err(_) => {
        self.evict(peer).await;
        Err(Error::Send)
      }
    }
  }

  async fn get_or_connect(&self, peer: &PeerId, connect_timeout: Duration) -> Result<Conn, Error> {
    {
      let guard = self.inner.lock().await;
      if let Some(conn) = guard.get(peer) {
        return Ok(conn.clone());
      }
    }

    let stream = timeout(connect_timeout, TcpStream::connect((peer.ip.as_str(), peer.port)))
      .await
      .map_err(|_| Error::Connect)?
      .map_err(Error::Io)?;
    let conn: Conn = Arc::new(Mutex::new(stream));

    let mut guard = self.inner.lock().await;
    let conn = guard.entry(peer.clone()).or_insert(conn).clone();
    Ok(conn)
  }

  pub async fn evict(&self, peer: &PeerId) {
    self.inner.lock().await.remove(peer);
  }

  pub async fn contains(&self, peer: &PeerId) -> bool {
    self.inner.lock().await.contains_key(peer)
  }

  /// Closes every pooled connection. Ambient housekeeping for clean
  /// shutdown; not itself a protocol operation.
  pub async fn shutdown(&self) {
    let mut guard = self.inner.lock().await;
    for (_, conn) in guard.drain() {
      let mut stream = conn.lock().await;
      let _ = stream.shutdown().await;
    }
  }
}
