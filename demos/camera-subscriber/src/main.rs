//! Stands in for a display window: decodes each received base64 JPEG
//! payload and writes it to a numbered file on disk. Not core to the
//! gossip protocol -- see `examples/original_source/CameraSub.py`,
//! whose `cv2.imshow` has no headless equivalent here.

use {
  base64::{engine::general_purpose::STANDARD as BASE64, Engine},
  clap::Parser,
  gossip_net::{Config, Node},
  parking_lot::Mutex,
  std::{fs, future, path::PathBuf, sync::Arc},
  tracing::{info, warn},
};

#[derive(Parser, Debug)]
struct Args {
  #[arg(long, default_value = "auto")]
  host: String,

  #[arg(long, default_value_t = 5001)]
  port: u16,

  #[arg(long)]
  known_host: Option<String>,

  #[arg(long)]
  known_port: Option<u16>,

  #[arg(long, default_value = "CameraData")]
  topic: String,

  /// Directory to write decoded frames into, as frame-0000001.jpg etc.
  #[arg(long, default_value = "./frames-out")]
  out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let args = Args::parse();
  fs::create_dir_all(&args.out_dir)?;

  let node = Node::bind(Config::new(args.host, args.port)).await?;
  info!(self_id = %node.self_id(), "node bound");

  if let (Some(host), Some(port)) = (args.known_host, args.known_port) {
    node.add_known_node(host, port);
  }

  let out_dir = args.out_dir.clone();
  let counter = Arc::new(Mutex::new(0u64));
  node.subscribe(args.topic.clone(), move |_topic: &str, content: &str| {
    let bytes = match BASE64.decode(content) {
      Ok(bytes) => bytes,
      Err(err) => {
        warn!(%err, "dropping frame with invalid base64 payload");
        return;
      }
    };
    let mut count = counter.lock();
    let path = out_dir.join(format!("frame-{:07}.jpg", *count));
    *count += 1;
    if let Err(err) = fs::write(&path, &bytes) {
      warn!(%err, path = %path.display(), "failed to write frame");
    }
  });

  info!(topic = %args.topic, "subscribed, waiting for frames");
  future::pending::<()>().await;
  Ok(())
}
