//! The inbound side: one listener, one task per accepted connection.

use {
  crate::{
    codec::FrameCodec,
    subscriptions::Subscriptions,
    view::ViewHandle,
    wire::{self, FrameError, Request},
  },
  std::time::Duration,
  tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
  },
  tracing::{debug, info, warn},
};

const READ_CHUNK: usize = 4096;
const BIND_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Binds to `(host, port)`, retrying indefinitely (with a 5-second backoff)
/// on failure so a newly restarted peer can reclaim its port once a
/// predecessor's socket leaves TIME_WAIT.
pub async fn bind_with_retry(host: &str, port: u16) -> TcpListener {
  loop {
    match TcpListener::bind((host, port)).await {
      Ok(listener) => return listener,
      Err(err) => {
        warn!(%err, host, port, "bind failed, retrying in 5s");
        tokio::time::sleep(BIND_RETRY_BACKOFF).await;
      }
    }
  }
}

/// Accepts connections forever on `listener`, one concurrent task per
/// connection.
pub async fn run(listener: TcpListener, view: ViewHandle, subs: Subscriptions) {
  info!(
    addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
    "listening"
  );

  loop {
    match listener.accept().await {
      Ok((stream, peer_addr)) => {
        let view = view.clone();
        let subs = subs.clone();
        tokio::spawn(async move {
          if let Err(err) = handle_connection(stream, view, subs).await {
            debug!(%peer_addr, %err, "connection ended with an error");
          }
        });
      }
      Err(err) => {
        warn!(%err, "accept failed");
      }
    }
  }
}

async fn handle_connection(
  mut stream: TcpStream,
  view: ViewHandle,
  subs: Subscriptions,
) -> std::io::Result<()> {
  let mut codec = FrameCodec::new();
  let mut buf = [0u8; READ_CHUNK];

  loop {
    let n = stream.read(&mut buf).await?;
    if n == 0 {
      break; // client disconnected
    }
    codec.feed(&buf[..n]);

    while let Some(frame) = codec.next_frame() {
      match wire::parse_frame(&frame) {
        Ok(Request::Info(incoming)) => {
          let sender_id = incoming.this_node.id();
          view.add_known_node(sender_id, incoming.this_node.subscribed_topics.clone());
          let snapshot = view.snapshot().await;
          let body = wire::to_json_4space(&snapshot).unwrap_or_default();
          stream.write_all(body.as_bytes()).await?;
        }
        Ok(Request::Publish { topic, content }) => {
          if subs.has_subscribers(&topic) {
            subs.deliver(&topic, &content);
          }
          stream.write_all(wire::OK_RESPONSE.as_bytes()).await?;
        }
        Err(FrameError::Malformed) => {
          stream.write_all(wire::NOT_FOUND_RESPONSE.as_bytes()).await?;
        }
        Err(FrameError::InfoJson(err)) => {
          warn!(%err, "malformed info request body, closing connection");
          return Ok(());
        }
      }
    }
  }

  Ok(())
}
