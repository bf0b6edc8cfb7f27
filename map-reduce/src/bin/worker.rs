use log::error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use structopt::StructOpt;

use map_reduce::{app, Worker, WorkerConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "mr-worker", version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Coordinator address
    #[structopt(short, long, default_value = "127.0.0.1:9999")]
    server: SocketAddr,

    /// Directory for intermediate and output files
    #[structopt(short, long, default_value = ".", parse(from_os_str))]
    dir: PathBuf,

    /// Application to run: wc, grep or indexer
    #[structopt(short, long, default_value = "wc")]
    app: String,

    /// Pattern searched for by grep
    #[structopt(long)]
    pattern: Option<String>,

    /// Milliseconds to wait when no task is ready
    #[structopt(long, default_value = "500")]
    idle_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let app = app::named(&opt.app, opt.pattern.as_deref())?;
    let config = WorkerConfig {
        dir: opt.dir,
        idle_interval: Duration::from_millis(opt.idle_ms),
    };

    let result = match Worker::connect(opt.server, app, config).await {
        Ok(w) => w.launch().await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
    Ok(())
}
