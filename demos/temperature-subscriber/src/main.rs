//! Stands in for a display/alerting consumer: subscribes to temperature
//! readings and logs each one as it arrives. Not core to the gossip
//! protocol -- see `examples/original_source/subscriber.py`.

use {
  clap::Parser,
  gossip_net::{Config, Node},
  std::future,
  tracing::info,
};

#[derive(Parser, Debug)]
struct Args {
  /// Bind address, or "auto" to discover the local address used to
  /// reach a public IP.
  #[arg(long, default_value = "auto")]
  host: String,

  #[arg(long, default_value_t = 5001)]
  port: u16,

  /// A neighbor to seed the membership view with at startup.
  #[arg(long)]
  known_host: Option<String>,

  #[arg(long)]
  known_port: Option<u16>,

  #[arg(long, default_value = "Temperature")]
  topic: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let args = Args::parse();
  let node = Node::bind(Config::new(args.host, args.port)).await?;
  info!(self_id = %node.self_id(), "node bound");

  if let (Some(host), Some(port)) = (args.known_host, args.known_port) {
    node.add_known_node(host, port);
  }

  node.subscribe(args.topic.clone(), |topic: &str, content: &str| {
    info!(%topic, %content, "reading received");
  });

  info!(topic = %args.topic, "subscribed, waiting for readings");
  future::pending::<()>().await;
  Ok(())
}
