use futures::{future, prelude::*};
use log::{debug, info, trace, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tarpc::{
    context,
    server::{self, Channel},
    tokio_serde::formats::Json,
};

use crate::{CoordinatorConfig, Error, Result, Service, TaskAssignment, TaskKind, TaskReport};

#[derive(Debug)]
struct MapTask {
    file: String,
    done: bool,
    assigned_at: Option<Instant>,
}

#[derive(Debug)]
struct ReduceTask {
    files: Vec<String>,
    done: bool,
    assigned_at: Option<Instant>,
}

/// Whether a task may be handed out at `now`: never assigned, or its lease ran out.
fn leasable(done: bool, assigned_at: Option<Instant>, now: Instant, timeout: Duration) -> bool {
    !done
        && match assigned_at {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= timeout,
        }
}

#[derive(Debug)]
struct JobState {
    timeout: Duration,
    map_tasks: Vec<MapTask>,
    reduce_tasks: Vec<ReduceTask>,
    map_remain: usize,
    reduce_remain: usize,
}

impl JobState {
    fn commit(&mut self, report: TaskReport) {
        match report.kind {
            TaskKind::None => {}
            TaskKind::Map => {
                let n_reduce = self.reduce_tasks.len();
                let Some(task) = self.map_tasks.get_mut(report.id) else {
                    warn!("ignoring report for unknown map task {}", report.id);
                    return;
                };
                if task.done {
                    debug!("map task {} already committed", report.id);
                    return;
                }
                if report.files.len() > n_reduce {
                    warn!(
                        "map task {} reported {} buckets, expected {}",
                        report.id,
                        report.files.len(),
                        n_reduce
                    );
                }
                task.done = true;
                for (reduce, file) in self.reduce_tasks.iter_mut().zip(report.files) {
                    if !file.is_empty() {
                        reduce.files.push(file);
                    }
                }
                self.map_remain -= 1;
                debug!("map task {} done, {} remaining", report.id, self.map_remain);
                if self.map_remain == 0 {
                    info!("map phase complete");
                }
            }
            TaskKind::Reduce => {
                let Some(task) = self.reduce_tasks.get_mut(report.id) else {
                    warn!("ignoring report for unknown reduce task {}", report.id);
                    return;
                };
                if task.done {
                    debug!("reduce task {} already committed", report.id);
                    return;
                }
                task.done = true;
                self.reduce_remain -= 1;
                debug!(
                    "reduce task {} done, {} remaining",
                    report.id, self.reduce_remain
                );
                if self.reduce_remain == 0 {
                    info!("reduce phase complete, job done");
                }
            }
            kind => warn!("ignoring report of kind {}", kind),
        }
    }

    fn assign(&mut self, now: Instant) -> TaskAssignment {
        let timeout = self.timeout;
        if self.map_remain > 0 {
            let n_reduce = self.reduce_tasks.len();
            for (id, task) in self.map_tasks.iter_mut().enumerate() {
                if leasable(task.done, task.assigned_at, now, timeout) {
                    if task.assigned_at.is_some() {
                        info!("map task {} timed out, reassigning", id);
                    }
                    task.assigned_at = Some(now);
                    debug!("assigning map task {} ({})", id, task.file);
                    return TaskAssignment {
                        kind: TaskKind::Map,
                        id,
                        files: vec![task.file.clone()],
                        n_reduce,
                    };
                }
            }
            TaskAssignment::sleep()
        } else if self.reduce_remain > 0 {
            for (id, task) in self.reduce_tasks.iter_mut().enumerate() {
                if leasable(task.done, task.assigned_at, now, timeout) {
                    if task.assigned_at.is_some() {
                        info!("reduce task {} timed out, reassigning", id);
                    }
                    task.assigned_at = Some(now);
                    debug!(
                        "assigning reduce task {} over {} files",
                        id,
                        task.files.len()
                    );
                    return TaskAssignment {
                        kind: TaskKind::Reduce,
                        id,
                        files: task.files.clone(),
                        n_reduce: 0,
                    };
                }
            }
            TaskAssignment::sleep()
        } else {
            TaskAssignment::exit()
        }
    }
}

/// Snapshot of job progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub n_map: usize,
    pub n_reduce: usize,
    pub map_remaining: usize,
    pub reduce_remaining: usize,
}

/// Owner of all job state. Cloning yields another handle to the same job.
#[derive(Debug, Clone)]
pub struct Coordinator {
    state: Arc<Mutex<JobState>>,
}

impl Coordinator {
    /// One map task per input, in order, and `n_reduce` empty reduce tasks.
    pub fn new(files: Vec<String>, n_reduce: usize, lease_timeout: Duration) -> Result<Self> {
        if n_reduce == 0 {
            return Err(Error::Config("n_reduce must be non-zero".into()));
        }
        let map_tasks: Vec<MapTask> = files
            .into_iter()
            .map(|file| MapTask {
                file,
                done: false,
                assigned_at: None,
            })
            .collect();
        let reduce_tasks = (0..n_reduce)
            .map(|_| ReduceTask {
                files: Vec::new(),
                done: false,
                assigned_at: None,
            })
            .collect();
        info!(
            "job created: {} map tasks, {} reduce tasks, lease {:?}",
            map_tasks.len(),
            n_reduce,
            lease_timeout
        );
        Ok(Self {
            state: Arc::new(Mutex::new(JobState {
                timeout: lease_timeout,
                map_remain: map_tasks.len(),
                reduce_remain: n_reduce,
                map_tasks,
                reduce_tasks,
            })),
        })
    }

    pub fn from_config(files: Vec<String>, config: &CoordinatorConfig) -> Result<Self> {
        Self::new(files, config.n_reduce, config.lease_timeout)
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().expect("coordinator state poisoned")
    }

    /// Commit `report`, then pick the next task as of `now`.
    ///
    /// Both steps happen under one lock acquisition.
    pub fn handle(&self, report: TaskReport, now: Instant) -> TaskAssignment {
        trace!("report: {:?}", report);
        let mut state = self.lock();
        state.commit(report);
        state.assign(now)
    }

    /// True once every map and reduce task has been committed.
    pub fn done(&self) -> bool {
        let state = self.lock();
        state.map_remain == 0 && state.reduce_remain == 0
    }

    pub fn progress(&self) -> Progress {
        let state = self.lock();
        Progress {
            n_map: state.map_tasks.len(),
            n_reduce: state.reduce_tasks.len(),
            map_remaining: state.map_remain,
            reduce_remaining: state.reduce_remain,
        }
    }

    /// Bind `addr` and return the bound address with the future that serves it.
    pub async fn listen(
        self,
        addr: SocketAddr,
    ) -> io::Result<(SocketAddr, impl Future<Output = ()>)> {
        let mut listener = tarpc::serde_transport::tcp::listen(&addr, Json::default).await?;
        listener.config_mut().max_frame_length(usize::MAX);
        let local_addr = listener.local_addr();
        info!("coordinator listening on {}", local_addr);

        let coordinator = self;
        // Each connection gets its own task, so the number of workers is not capped.
        let serving = listener
            // Ignore accept errors.
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            .for_each(move |channel| {
                let serve = coordinator.clone().serve();
                tokio::spawn(channel.execute(serve).for_each(spawn));
                future::ready(())
            });
        Ok((local_addr, serving))
    }

    /// Serve workers on `addr` until the process exits.
    pub async fn launch(self, addr: SocketAddr) -> io::Result<()> {
        let (_, serving) = self.listen(addr).await?;
        serving.await;
        Ok(())
    }
}

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

impl Service for Coordinator {
    async fn get_task(self, _: context::Context, report: TaskReport) -> TaskAssignment {
        self.handle(report, Instant::now())
    }
}
