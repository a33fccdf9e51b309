//! The membership view, run as a single actor task. All mutation happens on
//! that task; every other task (server handlers, the gossip ticker, publish
//! dispatch) reaches it through [`ViewHandle`], which doubles as the
//! implicit per-node lock the view requires.

use {
  crate::{peer::PeerId, wire::OutgoingView},
  rand::seq::IteratorRandom,
  std::collections::{HashMap, HashSet},
  tokio::sync::{mpsc, oneshot},
};

enum Command {
  AddKnownNode { id: PeerId, topics: Vec<String> },
  RemoveNode { id: PeerId },
  AddSelfTopic { topic: String },
  Snapshot { reply: oneshot::Sender<OutgoingView> },
  PublishTargets { topic: String, reply: oneshot::Sender<Vec<PeerId>> },
  RandomPeer { reply: oneshot::Sender<Option<PeerId>> },
  Len { reply: oneshot::Sender<usize> },
}

/// A cheaply cloneable front for the view actor.
#[derive(Clone)]
pub struct ViewHandle {
  tx: mpsc::UnboundedSender<Command>,
}

impl ViewHandle {
  /// Union `topics` into the existing descriptor, or insert a new one.
  /// A no-op if `id` is this node's own id (no self-loop, invariant I1).
  pub fn add_known_node(&self, id: PeerId, topics: Vec<String>) {
    let _ = self.tx.send(Command::AddKnownNode { id, topics });
  }

  /// Idempotent; a no-op if `id` is not present.
  pub fn remove_node(&self, id: PeerId) {
    let _ = self.tx.send(Command::RemoveNode { id });
  }

  /// Adds `topic` to this node's self-descriptor so remote peers learn of
  /// the interest on their next reconciliation with us.
  pub fn add_self_topic(&self, topic: String) {
    let _ = self.tx.send(Command::AddSelfTopic { topic });
  }

  /// A deep, serializable snapshot of the whole view, self included.
  pub async fn snapshot(&self) -> OutgoingView {
    let (reply, rx) = oneshot::channel();
    let _ = self.tx.send(Command::Snapshot { reply });
    rx.await.expect("view actor task is never dropped while a handle is live")
  }

  /// Every peer whose descriptor currently declares interest in `topic`.
  pub async fn publish_targets(&self, topic: &str) -> Vec<PeerId> {
    let (reply, rx) = oneshot::channel();
    let _ = self.tx.send(Command::PublishTargets { topic: topic.to_string(), reply });
    rx.await.expect("view actor task is never dropped while a handle is live")
  }

  /// A uniformly random peer from the current view, or `None` if empty.
  pub async fn random_peer(&self) -> Option<PeerId> {
    let (reply, rx) = oneshot::channel();
    let _ = self.tx.send(Command::RandomPeer { reply });
    rx.await.expect("view actor task is never dropped while a handle is live")
  }

  pub async fn len(&self) -> usize {
    let (reply, rx) = oneshot::channel();
    let _ = self.tx.send(Command::Len { reply });
    rx.await.expect("view actor task is never dropped while a handle is live")
  }
}

/// Spawns the view actor for `self_id` and returns a handle to it.
pub fn spawn(self_id: PeerId) -> ViewHandle {
  let (tx, rx) = mpsc::unbounded_channel();
  tokio::spawn(run(self_id, rx));
  ViewHandle { tx }
}

async fn run(self_id: PeerId, mut rx: mpsc::UnboundedReceiver<Command>) {
  let mut self_topics: HashSet<String> = HashSet::new();
  let mut known: HashMap<PeerId, HashSet<String>> = HashMap::new();

  while let Some(command) = rx.recv().await {
    match command {
      Command::AddKnownNode { id, topics } => {
        if id == self_id {
          continue;
        }
        known.entry(id).or_default().extend(topics);
      }
      Command::RemoveNode { id } => {
        known.remove(&id);
      }
      Command::AddSelfTopic { topic } => {
        self_topics.insert(topic);
      }
      Command::Snapshot { reply } => {
        let view = OutgoingView::build(&self_id, &self_topics, &known);
        let _ = reply.send(view);
      }
      Command::PublishTargets { topic, reply } => {
        let targets = known
          .iter()
          .filter(|(_, topics)| topics.contains(&topic))
          .map(|(id, _)| id.clone())
          .collect();
        let _ = reply.send(targets);
      }
      Command::RandomPeer { reply } => {
        let peer = known.keys().choose(&mut rand::thread_rng()).cloned();
        let _ = reply.send(peer);
      }
      Command::Len { reply } => {
        let _ = reply.send(known.len());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn self_never_appears_in_its_own_view() {
    let self_id = PeerId::new("127.0.0.1", 5000);
    let handle = spawn(self_id.clone());
    handle.add_known_node(self_id.clone(), vec!["T".to_string()]);
    assert_eq!(handle.len().await, 0);
  }

  #[tokio::test]
  async fn topic_sets_only_grow() {
    let self_id = PeerId::new("127.0.0.1", 5000);
    let handle = spawn(self_id);
    let peer = PeerId::new("127.0.0.1", 5001);

    handle.add_known_node(peer.clone(), vec!["A".to_string()]);
    handle.add_known_node(peer.clone(), vec!["B".to_string()]);

    let snapshot = handle.snapshot().await;
    let node = snapshot.known_nodes.iter().find(|n| n.id() == peer).unwrap();
    let mut topics = node.subscribed_topics.clone();
    topics.sort();
    assert_eq!(topics, vec!["A".to_string(), "B".to_string()]);
  }

  #[tokio::test]
  async fn publish_targets_filters_by_topic() {
    let self_id = PeerId::new("127.0.0.1", 5000);
    let handle = spawn(self_id);
    let interested = PeerId::new("127.0.0.1", 5001);
    let uninterested = PeerId::new("127.0.0.1", 5002);

    handle.add_known_node(interested.clone(), vec!["T".to_string()]);
    handle.add_known_node(uninterested, vec!["Other".to_string()]);

    let targets = handle.publish_targets("T").await;
    assert_eq!(targets, vec![interested]);
  }

  #[tokio::test]
  async fn remove_node_is_idempotent() {
    let self_id = PeerId::new("127.0.0.1", 5000);
    let handle = spawn(self_id);
    let peer = PeerId::new("127.0.0.1", 5001);

    handle.remove_node(peer.clone());
    handle.add_known_node(peer.clone(), vec![]);
    handle.remove_node(peer.clone());
    handle.remove_node(peer);

    assert_eq!(handle.len().await, 0);
  }
}
