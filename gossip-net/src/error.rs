use {std::io, thiserror::Error};

/// Failure modes surfaced by the gossip core.
///
/// Per the recovery principle: none of these ever unwind a task as a panic.
/// They are logged and handled per-peer (evict, reply 404, drop frame, ...)
/// by the caller that produced them.
#[derive(Debug, Error)]
pub enum Error {
  #[error("bind failed: {0}")]
  Bind(String),

  #[error("outbound connect timed out or was refused")]
  Connect,

  #[error("outbound send timed out or failed")]
  Send,

  #[error("response read timed out or exceeded the size cap")]
  Recv,

  #[error("frame did not match any recognized shape")]
  MalformedFrame,

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}
