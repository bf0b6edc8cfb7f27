//! Naming, encoding and publication of intermediate and output artifacts.
//!
//! Every artifact is written to a temporary file next to its final name and
//! renamed into place, so concurrent writers of the same name leave one
//! complete copy behind and readers never see a partial file.

use atomicwrites::{AllowOverwrite, AtomicFile};
use log::trace;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use crate::{Error, KeyValue, Result};

/// `mr-<m>-<r>`: records emitted by map task `m` for bucket `r`.
pub fn intermediate_name(map_id: usize, bucket: usize) -> String {
    format!("mr-{}-{}", map_id, bucket)
}

/// `mr-out-<r>`: final output of reduce task `r`.
pub fn output_name(reduce_id: usize) -> String {
    format!("mr-out-{}", reduce_id)
}

/// Atomically replace whatever is at `path` with `contents`.
pub fn publish(path: &Path, contents: &[u8]) -> Result<()> {
    AtomicFile::new(path, AllowOverwrite)
        .write(|f| f.write_all(contents))
        .map_err(|e| match e {
            atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::io(path, e),
        })?;
    trace!("published {:?} ({} bytes)", path, contents.len());
    Ok(())
}

/// One JSON object per record, newline terminated, in the given order.
pub fn write_records(path: &Path, records: &[KeyValue]) -> Result<()> {
    let mut buf = Vec::new();
    for kv in records {
        serde_json::to_writer(&mut buf, kv)?;
        buf.push(b'\n');
    }
    publish(path, &buf)
}

/// Decode every record of an intermediate artifact.
///
/// A truncated or corrupt artifact is an error rather than a short read.
pub fn read_records(path: &Path) -> Result<Vec<KeyValue>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let stream = serde_json::Deserializer::from_reader(BufReader::new(file)).into_iter::<KeyValue>();
    let mut records = Vec::new();
    for kv in stream {
        records.push(kv?);
    }
    trace!("read {} records from {:?}", records.len(), path);
    Ok(records)
}

/// `<key> <value>` per line, in the order given.
pub fn write_output(path: &Path, groups: &[(String, String)]) -> Result<()> {
    let mut s = String::new();
    for (k, v) in groups {
        s.push_str(k);
        s.push(' ');
        s.push_str(v);
        s.push('\n');
    }
    publish(path, s.as_bytes())
}
