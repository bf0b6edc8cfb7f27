use log::trace;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use structopt::StructOpt;

use map_reduce::app;
use map_reduce::artifact::{output_name, write_output};
use map_reduce::partition::bucket;

#[derive(StructOpt, Debug)]
#[structopt(name = "mr-sequential", version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Files to process
    #[structopt(name = "FILE", parse(from_os_str))]
    files: Vec<PathBuf>,

    #[structopt(long, default_value = "10")]
    nreduce: usize,

    /// Directory for output files
    #[structopt(short, long, default_value = ".", parse(from_os_str))]
    dir: PathBuf,

    /// Application to run: wc, grep or indexer
    #[structopt(short, long, default_value = "wc")]
    app: String,

    /// Pattern searched for by grep
    #[structopt(long)]
    pattern: Option<String>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    anyhow::ensure!(opt.nreduce > 0, "--nreduce must be non-zero");
    let app = app::named(&opt.app, opt.pattern.as_deref())?;

    let mut grouped = BTreeMap::<String, Vec<String>>::new();
    for fname in opt.files.iter() {
        let raw = fs::read(fname)?;
        let name = fname.to_string_lossy();
        for kv in app.map(&name, &String::from_utf8_lossy(&raw)) {
            grouped.entry(kv.key).or_default().push(kv.value);
        }
    }

    let mut outputs = vec![Vec::new(); opt.nreduce];
    for (k, vs) in grouped.iter() {
        let v = app.reduce(k, vs);
        outputs[bucket(k, opt.nreduce)].push((k.clone(), v));
    }
    for (r, groups) in outputs.iter().enumerate() {
        let path = opt.dir.join(output_name(r));
        write_output(&path, groups)?;
        trace!("output {:?} ({} keys)", path, groups.len());
    }
    Ok(())
}
