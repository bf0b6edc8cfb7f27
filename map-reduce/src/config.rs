//! Runtime settings for the coordinator and workers.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_NREDUCE: usize = 10;
/// How long an assigned task may go unreported before it is offered again.
pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub addr: SocketAddr,
    pub n_reduce: usize,
    pub lease_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT).into(),
            n_reduce: DEFAULT_NREDUCE,
            lease_timeout: DEFAULT_LEASE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Where intermediate and output artifacts are written.
    pub dir: PathBuf,
    /// Pause taken when the coordinator answers Sleep.
    pub idle_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }
}
