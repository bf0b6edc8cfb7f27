use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use map_reduce::app::{self, wc::WordCount, Application};
use map_reduce::{
    execute_map, execute_reduce, Coordinator, ServiceClient, TaskKind, TaskReport, Worker,
    WorkerConfig,
};
use tarpc::{client, context, tokio_serde::formats::Json};
use tempfile::TempDir;

const TEXTS: [&str; 4] = [
    "the quick brown fox jumps over the lazy dog",
    "And the dog sleeps\nAnd the fox runs\nnobody cares",
    "a b a b a c",
    "",
];

fn write_inputs(dir: &Path, texts: &[&str]) -> Vec<String> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let p = dir.join(format!("pg-{}.txt", i));
            fs::write(&p, t).unwrap();
            p.to_string_lossy().into_owned()
        })
        .collect()
}

/// Every `key value` line across all `mr-out-*` files, checking each key
/// appears in exactly one file and files are sorted.
fn collect_output(dir: &Path) -> HashMap<String, String> {
    let mut result = HashMap::new();
    for ent in fs::read_dir(dir).unwrap() {
        let p = ent.unwrap().path();
        let name = p.file_name().unwrap().to_string_lossy().into_owned();
        if !name.starts_with("mr-out") {
            continue;
        }
        let s = fs::read_to_string(&p).unwrap();
        let keys: Vec<&str> = s.lines().map(|l| l.split_once(' ').unwrap().0).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted, "{} is not sorted", name);
        for l in s.lines() {
            let (k, v) = l.split_once(' ').unwrap();
            assert!(result.insert(k.to_owned(), v.to_owned()).is_none());
        }
    }
    result
}

fn sequential(app: &dyn Application, files: &[String]) -> HashMap<String, String> {
    let mut grouped = BTreeMap::<String, Vec<String>>::new();
    for f in files {
        let contents = fs::read_to_string(f).unwrap();
        for kv in app.map(f, &contents) {
            grouped.entry(kv.key).or_default().push(kv.value);
        }
    }
    grouped
        .iter()
        .map(|(k, vs)| (k.clone(), app.reduce(k, vs)))
        .collect()
}

async fn start_coordinator(
    files: Vec<String>,
    n_reduce: usize,
    lease: Duration,
) -> (Coordinator, SocketAddr) {
    let c = Coordinator::new(files, n_reduce, lease).unwrap();
    let any_port = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0).into();
    let (addr, serving) = c.clone().listen(any_port).await.unwrap();
    tokio::spawn(serving);
    (c, addr)
}

async fn run_workers(addr: SocketAddr, dir: &Path, app: Arc<dyn Application>, n: usize) {
    let mut workers = Vec::new();
    for _ in 0..n {
        let config = WorkerConfig {
            dir: dir.to_owned(),
            idle_interval: Duration::from_millis(50),
        };
        let w = Worker::connect(addr, app.clone(), config).await.unwrap();
        workers.push(tokio::spawn(w.launch()));
    }
    for w in workers {
        w.await.expect("worker panicked").unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn word_count_two_inputs() {
    let _ = pretty_env_logger::try_init();
    let dir = TempDir::new().unwrap();
    let files = write_inputs(dir.path(), &["a b a", "b c"]);
    let (c, addr) = start_coordinator(files, 2, Duration::from_secs(10)).await;

    run_workers(addr, dir.path(), Arc::new(WordCount), 2).await;
    assert!(c.done());

    let result = collect_output(dir.path());
    let expected: HashMap<String, String> = [("a", "2"), ("b", "2"), ("c", "1")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert_eq!(result, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn matches_sequential_run() {
    let _ = pretty_env_logger::try_init();
    for name in ["wc", "grep", "indexer"] {
        let dir = TempDir::new().unwrap();
        let files = write_inputs(dir.path(), &TEXTS);
        let app = app::named(name, None).unwrap();
        let (c, addr) = start_coordinator(files.clone(), 3, Duration::from_secs(10)).await;

        run_workers(addr, dir.path(), app.clone(), 5).await;
        assert!(c.done());
        assert_eq!(collect_output(dir.path()), sequential(app.as_ref(), &files), "{}", name);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn recovers_from_crashed_worker() {
    let _ = pretty_env_logger::try_init();
    let dir = TempDir::new().unwrap();
    let files = write_inputs(dir.path(), &TEXTS);
    let lease = Duration::from_millis(500);
    let (c, addr) = start_coordinator(files.clone(), 2, lease).await;

    // Takes the first map task and never reports back.
    let transport = tarpc::serde_transport::tcp::connect(addr, Json::default)
        .await
        .unwrap();
    let crashed = ServiceClient::new(client::Config::default(), transport).spawn();
    let task = crashed
        .get_task(context::current(), TaskReport::none())
        .await
        .unwrap();
    assert_eq!((task.kind, task.id), (TaskKind::Map, 0));
    drop(crashed);

    run_workers(addr, dir.path(), Arc::new(WordCount), 3).await;
    assert!(c.done());
    assert_eq!(collect_output(dir.path()), sequential(&WordCount, &files));
}

#[test]
fn straggler_and_replacement_both_report() {
    let dir = TempDir::new().unwrap();
    let files = write_inputs(dir.path(), &["a b a", "b c"]);
    let lease = Duration::from_secs(10);
    let c = Coordinator::new(files, 2, lease).unwrap();
    let t = Instant::now();

    let first = c.handle(TaskReport::none(), t);
    let second = c.handle(TaskReport::none(), t);
    assert_eq!((first.id, second.id), (0, 1));
    let produced = execute_map(&WordCount, dir.path(), 1, &second.files[0], 2).unwrap();
    c.handle(TaskReport::map(1, produced), t);

    // Map 0 is leased around; original and replacement both finish.
    let replacement = c.handle(TaskReport::none(), t + lease);
    assert_eq!((replacement.kind, replacement.id), (TaskKind::Map, 0));
    let slow = execute_map(&WordCount, dir.path(), 0, &first.files[0], 2).unwrap();
    let fast = execute_map(&WordCount, dir.path(), 0, &replacement.files[0], 2).unwrap();
    assert_eq!(slow, fast);

    let next = c.handle(TaskReport::map(0, fast), t + lease);
    let late = c.handle(TaskReport::map(0, slow), t + lease);

    for a in [next, late] {
        assert_eq!(a.kind, TaskKind::Reduce);
        let distinct: HashSet<&String> = a.files.iter().collect();
        assert_eq!(distinct.len(), a.files.len(), "duplicate reduce inputs");
        assert!(a.files.len() <= 2);
        let out = execute_reduce(&WordCount, dir.path(), a.id, &a.files).unwrap();
        c.handle(TaskReport::reduce(a.id, out), t + lease);
    }
    assert!(c.done());

    let mut lines: Vec<String> = collect_output(dir.path())
        .into_iter()
        .map(|(k, v)| format!("{} {}", k, v))
        .collect();
    lines.sort();
    assert_eq!(lines, vec!["a 2", "b 2", "c 1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serves_beyond_many_idle_connections() {
    const IDLE: usize = 300;
    let _ = pretty_env_logger::try_init();
    let dir = TempDir::new().unwrap();
    let files = write_inputs(dir.path(), &["a b a", "b c"]);
    let (c, addr) = start_coordinator(files, 2, Duration::from_secs(10)).await;

    // Connected workers that never ask for anything.
    let mut idle = Vec::new();
    for _ in 0..IDLE {
        let transport = tarpc::serde_transport::tcp::connect(addr, Json::default)
            .await
            .unwrap();
        idle.push(ServiceClient::new(client::Config::default(), transport).spawn());
    }

    tokio::time::timeout(
        Duration::from_secs(10),
        run_workers(addr, dir.path(), Arc::new(WordCount), 1),
    )
    .await
    .expect("worker was not served");
    assert!(c.done());
    drop(idle);
}
