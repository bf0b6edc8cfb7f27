use log::{debug, info, trace, warn};
use std::borrow::Cow;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tarpc::{client, context, tokio_serde::formats::Json};

use crate::app::Application;
use crate::artifact::{self, intermediate_name, output_name};
use crate::partition::bucket;
use crate::{
    Error, KeyValue, Result, ServiceClient, TaskAssignment, TaskKind, TaskReport, WorkerConfig,
};

/// Run one map task: read `input`, apply the transform and publish one
/// intermediate artifact per non-empty bucket.
///
/// Returns the artifact paths indexed by bucket, with empty strings for
/// buckets that received nothing.
pub fn execute_map(
    app: &dyn Application,
    dir: &Path,
    id: usize,
    input: &str,
    n_reduce: usize,
) -> Result<Vec<String>> {
    if n_reduce == 0 {
        return Err(Error::Config("n_reduce must be non-zero".into()));
    }
    let raw = fs::read(input).map_err(|e| Error::io(input, e))?;
    // Invalid UTF-8 is replaced rather than failing the task: a retry would
    // read the same bytes and fail forever.
    let contents = String::from_utf8_lossy(&raw);
    if let Cow::Owned(_) = contents {
        warn!("{} is not valid UTF-8, invalid bytes replaced", input);
    }

    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); n_reduce];
    for kv in app.map(input, &contents) {
        buckets[bucket(&kv.key, n_reduce)].push(kv);
    }

    let mut files = vec![String::new(); n_reduce];
    for (r, kvs) in buckets.iter().enumerate() {
        if kvs.is_empty() {
            continue;
        }
        let path = dir.join(intermediate_name(id, r));
        artifact::write_records(&path, kvs)?;
        files[r] = path.to_string_lossy().into_owned();
    }
    trace!("map {} wrote {:?}", id, files);
    Ok(files)
}

/// Run one reduce task over every intermediate artifact of its bucket and
/// publish the sorted, grouped result. Returns the output artifact path.
pub fn execute_reduce(
    app: &dyn Application,
    dir: &Path,
    id: usize,
    files: &[String],
) -> Result<String> {
    let mut intermediate = Vec::new();
    for f in files {
        intermediate.extend(artifact::read_records(Path::new(f))?);
    }
    intermediate.sort_by(|a, b| a.key.cmp(&b.key));

    let mut groups = Vec::new();
    let mut i = 0;
    while i < intermediate.len() {
        let key = &intermediate[i].key;
        let mut j = i + 1;
        while j < intermediate.len() && intermediate[j].key == *key {
            j += 1;
        }
        let values: Vec<String> = intermediate[i..j].iter().map(|kv| kv.value.clone()).collect();
        groups.push((key.clone(), app.reduce(key, &values)));
        i = j;
    }

    let path = dir.join(output_name(id));
    artifact::write_output(&path, &groups)?;
    trace!("reduce {} wrote {} keys to {:?}", id, groups.len(), path);
    Ok(path.to_string_lossy().into_owned())
}

/// Polls the coordinator for tasks until told to exit.
pub struct Worker {
    client: ServiceClient,
    app: Arc<dyn Application>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(client: ServiceClient, app: Arc<dyn Application>, config: WorkerConfig) -> Self {
        Self {
            client,
            app,
            config,
        }
    }

    /// Open a JSON-over-TCP connection to the coordinator at `addr`.
    pub async fn connect(
        addr: SocketAddr,
        app: Arc<dyn Application>,
        config: WorkerConfig,
    ) -> Result<Self> {
        let mut transport = tarpc::serde_transport::tcp::connect(addr, Json::default);
        transport.config_mut().max_frame_length(usize::MAX);
        let transport = transport
            .await
            .map_err(|source| Error::Connect { addr, source })?;
        let client = ServiceClient::new(client::Config::default(), transport).spawn();
        Ok(Self::new(client, app, config))
    }

    /// Run until the coordinator answers Exit.
    ///
    /// A failed RPC ends the loop with an error. A failed task attempt is
    /// logged and dropped; the coordinator re-offers it once its lease runs out.
    pub async fn launch(self) -> Result<()> {
        let mut report = TaskReport::none();
        loop {
            let task = self.client.get_task(context::current(), report).await?;
            report = match task.kind {
                TaskKind::Map | TaskKind::Reduce => {
                    let kind = task.kind;
                    let id = task.id;
                    match self.execute(task).await {
                        Ok(report) => report,
                        Err(e @ Error::Protocol(_)) => return Err(e),
                        Err(e) => {
                            warn!("{} task {} failed: {}", kind, id, e);
                            TaskReport::none()
                        }
                    }
                }
                TaskKind::Sleep => {
                    trace!("no task ready, sleeping");
                    tokio::time::sleep(self.config.idle_interval).await;
                    TaskReport::none()
                }
                TaskKind::Exit => {
                    info!("job finished, exiting");
                    return Ok(());
                }
                TaskKind::None => return Err(Error::Protocol(task.kind)),
            };
        }
    }

    async fn execute(&self, task: TaskAssignment) -> Result<TaskReport> {
        let app = self.app.clone();
        let dir = self.config.dir.clone();
        let TaskAssignment {
            kind,
            id,
            files,
            n_reduce,
        } = task;
        debug!("running {} task {}", kind, id);
        match kind {
            TaskKind::Map => {
                if files.len() != 1 {
                    return Err(Error::Protocol(kind));
                }
                let produced = tokio::task::spawn_blocking(move || {
                    execute_map(app.as_ref(), &dir, id, &files[0], n_reduce)
                })
                .await??;
                Ok(TaskReport::map(id, produced))
            }
            TaskKind::Reduce => {
                let output = tokio::task::spawn_blocking(move || {
                    execute_reduce(app.as_ref(), &dir, id, &files)
                })
                .await??;
                Ok(TaskReport::reduce(id, output))
            }
            _ => Err(Error::Protocol(kind)),
        }
    }
}
