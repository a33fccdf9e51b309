//! Stands in for a camera feed: reads JPEG frames from a directory in
//! sequence and publishes each as a base64-encoded payload. Not core to
//! the gossip protocol -- see `examples/original_source/CameraPub.py`,
//! whose `cv2.VideoCapture(0)` has no portable equivalent here.

use {
  base64::{engine::general_purpose::STANDARD as BASE64, Engine},
  clap::Parser,
  gossip_net::{Config, Node},
  std::{fs, path::PathBuf, time::Duration},
  tracing::info,
};

#[derive(Parser, Debug)]
struct Args {
  #[arg(long, default_value = "auto")]
  host: String,

  #[arg(long, default_value_t = 5000)]
  port: u16,

  #[arg(long)]
  known_host: Option<String>,

  #[arg(long)]
  known_port: Option<u16>,

  #[arg(long, default_value = "CameraData")]
  topic: String,

  /// Directory of .jpg frames to cycle through, in sorted order.
  #[arg(long)]
  frames_dir: PathBuf,

  #[arg(long, default_value_t = 33)]
  interval_ms: u64,
}

/// Abstracts over where frame bytes come from, standing in for
/// `cv2.VideoCapture`.
trait FrameSource {
  fn next_frame(&mut self) -> anyhow::Result<Vec<u8>>;
}

/// Cycles through JPEG files in a directory, looping once exhausted.
struct FileFrameSource {
  paths: Vec<PathBuf>,
  cursor: usize,
}

impl FileFrameSource {
  fn new(dir: &PathBuf) -> anyhow::Result<Self> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
      .filter_map(|entry| entry.ok())
      .map(|entry| entry.path())
      .filter(|path| path.extension().map(|ext| ext == "jpg").unwrap_or(false))
      .collect();
    paths.sort();
    if paths.is_empty() {
      anyhow::bail!("no .jpg frames found in {}", dir.display());
    }
    Ok(Self { paths, cursor: 0 })
  }
}

impl FrameSource for FileFrameSource {
  fn next_frame(&mut self) -> anyhow::Result<Vec<u8>> {
    let path = &self.paths[self.cursor];
    self.cursor = (self.cursor + 1) % self.paths.len();
    Ok(fs::read(path)?)
  }
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

  let mut source = FileFrameSource::new(&args.frames_dir)?;
  loop {
    let frame = source.next_frame()?;
    let encoded = BASE64.encode(frame);
    node.publish(args.topic.clone(), encoded).await;
    tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
  }
}
