//! A decentralized, topic-based publish/subscribe overlay for small,
//! trust-internal networks. Peers discover each other by transitive gossip
//! seeded from statically configured neighbors; there is no broker and no
//! naming service.
//!
//! The four operations a caller needs are on [`Node`]: [`Node::publish`],
//! [`Node::subscribe`], [`Node::add_known_node`] and [`Node::get_info`].

mod codec;
mod engine;
mod pool;
mod server;
mod subscriptions;
mod view;
mod wire;

pub mod config;
pub mod error;
pub mod peer;

pub use config::Config;
pub use error::Error;
pub use peer::{PeerDescriptor, PeerId};
pub use wire::OutgoingView;

mod node;
pub use node::Node;
