//! Stands in for a real sensor: publishes a synthetic, monotonically
//! increasing temperature reading on a fixed interval. Not core to the
//! gossip protocol -- see `examples/original_source/publisher.py`.

use {
  clap::Parser,
  gossip_net::{Config, Node},
  std::time::Duration,
  tracing::info,
};

#[derive(Parser, Debug)]
struct Args {
  /// Bind address, or "auto" to discover the local address used to
  /// reach a public IP.
  #[arg(long, default_value = "auto")]
  host: String,

  #[arg(long, default_value_t = 5000)]
  port: u16,

  /// A neighbor to seed the membership view with at startup.
  #[arg(long)]
  known_host: Option<String>,

  #[arg(long)]
  known_port: Option<u16>,

  #[arg(long, default_value = "Temperature")]
  topic: String,

  #[arg(long, default_value_t = 10)]
  interval_ms: u64,
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

  let mut reading = 0i64;
  loop {
    let content = format!("Temperature is {reading}\u{00b0}C");
    node.publish(args.topic.clone(), content).await;
    reading += 1;
    tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
  }
}
