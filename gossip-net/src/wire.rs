//! The length-delimited text protocol: frame sentinel, request/response
//! rendering, and the JSON view schema.

use {
  crate::peer::PeerId,
  serde::{Deserialize, Serialize},
  std::collections::{HashMap, HashSet},
  thiserror::Error,
};

/// Terminates every inbound frame. Payloads must not contain it.
pub const SENTINEL: &str = "END238973";

pub const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n";
pub const NOT_FOUND_RESPONSE: &str = "HTTP/1.1 404 Not Found\r\n\r\n";

/// One peer as it appears on the wire: flattened id plus topic list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireNode {
  #[serde(rename = "IP")]
  pub ip: String,
  pub port: u16,
  #[serde(default)]
  pub subscribed_topics: Vec<String>,
}

impl WireNode {
  pub fn id(&self) -> PeerId {
    PeerId { ip: self.ip.clone(), port: self.port }
  }
}

/// A view as we serialize it: `known_nodes` is always the list form, per
/// the wire compatibility contract.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingView {
  #[serde(rename = "self")]
  pub this_node: WireNode,
  pub known_nodes: Vec<WireNode>,
}

impl OutgoingView {
  pub fn build(
    self_id: &PeerId,
    self_topics: &HashSet<String>,
    known: &HashMap<PeerId, HashSet<String>>,
  ) -> Self {
    Self {
      this_node: WireNode {
        ip: self_id.ip.clone(),
        port: self_id.port,
        subscribed_topics: self_topics.iter().cloned().collect(),
      },
      known_nodes: known
        .iter()
        .map(|(id, topics)| WireNode {
          ip: id.ip.clone(),
          port: id.port,
          subscribed_topics: topics.iter().cloned().collect(),
        })
        .collect(),
    }
  }
}

/// A view as we accept it on parse: `known_nodes` may be either the list
/// form or the legacy map-keyed form.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingView {
  #[serde(rename = "self")]
  pub this_node: WireNode,
  pub known_nodes: KnownNodes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KnownNodes {
  List(Vec<WireNode>),
  Map(HashMap<String, WireNode>),
}

impl KnownNodes {
  pub fn into_vec(self) -> Vec<WireNode> {
    match self {
      KnownNodes::List(list) => list,
      KnownNodes::Map(map) => map.into_values().collect(),
    }
  }
}

/// Serializes with 4-space indentation, the shape the info response is
/// required to use for wire compatibility.
pub fn to_json_4space<T: Serialize>(value: &T) -> serde_json::Result<String> {
  let mut buf = Vec::new();
  let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
  let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
  value.serialize(&mut ser)?;
  Ok(String::from_utf8(buf).expect("serde_json never emits invalid utf8"))
}

pub fn render_info_request(view: &OutgoingView) -> serde_json::Result<Vec<u8>> {
  let body = serde_json::to_string(view)?;
  Ok(format!("GET /info\r\n\r\n{body}{SENTINEL}").into_bytes())
}

pub fn render_publish_frame(sender: &PeerId, topic: &str, content: &str) -> Vec<u8> {
  format!(
    "POST /{}:{}/{} HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n{}{}",
    sender.ip, sender.port, topic, content, SENTINEL
  )
  .into_bytes()
}

/// A parsed inbound frame.
#[derive(Debug)]
pub enum Request {
  Info(IncomingView),
  Publish { topic: String, content: String },
}

#[derive(Debug, Error)]
pub enum FrameError {
  #[error("frame is missing a recognized method/target or header/body separator")]
  Malformed,
  #[error("info request body is not valid JSON: {0}")]
  InfoJson(#[source] serde_json::Error),
}

/// Parses one sentinel-stripped frame. Textual and lenient: the first
/// space-delimited token of the first line is the method, the second is the
/// target, and everything after the first `\r\n\r\n` is the body.
pub fn parse_frame(raw: &[u8]) -> Result<Request, FrameError> {
  let text = String::from_utf8_lossy(raw);
  let (head, body) = text.split_once("\r\n\r\n").ok_or(FrameError::Malformed)?;
  let first_line = head.lines().next().unwrap_or_default();
  let mut tokens = first_line.split(' ');
  let method = tokens.next().ok_or(FrameError::Malformed)?;
  let target = tokens.next().ok_or(FrameError::Malformed)?;

  if method == "GET" && target.starts_with("/info") {
    let view: IncomingView = serde_json::from_str(body).map_err(FrameError::InfoJson)?;
    return Ok(Request::Info(view));
  }

  if method == "POST" {
    let trimmed = target.trim_matches('/');
    let (_sender, topic) = trimmed.split_once('/').ok_or(FrameError::Malformed)?;
    return Ok(Request::Publish { topic: topic.to_string(), content: body.to_string() });
  }

  Err(FrameError::Malformed)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_publish_frame() {
    let sender = PeerId::new("127.0.0.1", 5000);
    let frame = render_publish_frame(&sender, "T", "hello");
    // strip the sentinel the way the codec would before handing us the frame
    let raw = &frame[..frame.len() - SENTINEL.len()];
    match parse_frame(raw).unwrap() {
      Request::Publish { topic, content } => {
        assert_eq!(topic, "T");
        assert_eq!(content, "hello");
      }
      other => panic!("expected publish, got {other:?}"),
    }
  }

  #[test]
  fn publish_payload_with_crlf_survives() {
    let sender = PeerId::new("127.0.0.1", 5000);
    let payload = "line1\r\n\r\nline2";
    let frame = render_publish_frame(&sender, "T", payload);
    let raw = &frame[..frame.len() - SENTINEL.len()];
    match parse_frame(raw).unwrap() {
      Request::Publish { content, .. } => assert_eq!(content, payload),
      other => panic!("expected publish, got {other:?}"),
    }
  }

  #[test]
  fn parses_info_request() {
    let id = PeerId::new("127.0.0.1", 5001);
    let view = OutgoingView::build(&id, &HashSet::from(["T".to_string()]), &HashMap::new());
    let frame = render_info_request(&view).unwrap();
    let raw = &frame[..frame.len() - SENTINEL.len()];
    match parse_frame(raw).unwrap() {
      Request::Info(incoming) => {
        assert_eq!(incoming.this_node.ip, "127.0.0.1");
        assert_eq!(incoming.this_node.subscribed_topics, vec!["T".to_string()]);
      }
      other => panic!("expected info, got {other:?}"),
    }
  }

  #[test]
  fn accepts_known_nodes_as_map_or_list() {
    let list_json = r#"{"self":{"IP":"1.2.3.4","port":1,"subscribed_topics":[]},"known_nodes":[{"IP":"5.6.7.8","port":2,"subscribed_topics":["A"]}]}"#;
    let map_json = r#"{"self":{"IP":"1.2.3.4","port":1,"subscribed_topics":[]},"known_nodes":{"('5.6.7.8', 2)":{"IP":"5.6.7.8","port":2,"subscribed_topics":["A"]}}}"#;

    let from_list: IncomingView = serde_json::from_str(list_json).unwrap();
    let from_map: IncomingView = serde_json::from_str(map_json).unwrap();

    assert_eq!(from_list.known_nodes.into_vec().len(), 1);
    assert_eq!(from_map.known_nodes.into_vec().len(), 1);
  }

  #[test]
  fn malformed_frame_is_rejected() {
    let raw = b"garbage with no separator";
    assert!(matches!(parse_frame(raw), Err(FrameError::Malformed)));
  }

  #[test]
  fn info_request_with_broken_json_is_distinguished() {
    let raw = b"GET /info\r\n\r\nnot json";
    assert!(matches!(parse_frame(raw), Err(FrameError::InfoJson(_))));
  }
}
