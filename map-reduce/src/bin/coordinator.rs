use log::info;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

use map_reduce::{Coordinator, CoordinatorConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "mr-coordinator", version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Port to serve workers on
    #[structopt(short, long, default_value = "9999")]
    port: u16,

    /// Seconds a task may stay unreported before it is handed to another worker
    #[structopt(short, long, default_value = "10")]
    timeout: u64,

    /// Input files, one map task each
    #[structopt(name = "FILE", parse(from_os_str))]
    files: Vec<PathBuf>,

    /// Number of reduce buckets
    #[structopt(long, default_value = "10")]
    nreduce: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();

    let files = opt
        .files
        .iter()
        .map(|f| f.to_string_lossy().into_owned())
        .collect();
    let config = CoordinatorConfig {
        addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, opt.port).into(),
        n_reduce: opt.nreduce,
        lease_timeout: Duration::from_secs(opt.timeout),
    };
    let coordinator = Coordinator::from_config(files, &config)?;
    let (_, serving) = coordinator.clone().listen(config.addr).await?;
    tokio::spawn(serving);

    let mut ticks = 0u64;
    while !coordinator.done() {
        tokio::time::sleep(Duration::from_secs(1)).await;
        ticks += 1;
        if ticks % 10 == 0 {
            let p = coordinator.progress();
            info!(
                "map {}/{} done, reduce {}/{} done",
                p.n_map - p.map_remaining,
                p.n_map,
                p.n_reduce - p.reduce_remaining,
                p.n_reduce
            );
        }
    }
    // Let polling workers collect their Exit before the socket goes away.
    tokio::time::sleep(Duration::from_secs(1)).await;
    info!("job done");
    Ok(())
}
